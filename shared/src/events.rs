use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use log::warn;

/// Handle returned by listener registration, used to remove the listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

type Listener<E> = Rc<RefCell<dyn FnMut(&E)>>;

/// Synchronous event dispatch. Listeners run in registration order, on the
/// call stack of whatever applied the op.
pub struct EventEmitter<E> {
    listeners: RefCell<Vec<(ListenerKey, Listener<E>)>>,
    next_key: Cell<u64>,
}

impl<E: 'static> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_key: Cell::new(0),
        }
    }

    pub fn on(&self, listener: impl FnMut(&E) + 'static) -> ListenerKey {
        let key = ListenerKey(self.next_key.get());
        self.next_key.set(key.0 + 1);
        let listener: Listener<E> = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((key, listener));
        key
    }

    /// Removes a listener. Returns false if it was already removed.
    pub fn off(&self, key: ListenerKey) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(k, _)| *k != key);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Calls every listener registered at the time of the call. Listeners may
    /// register or remove listeners, and may trigger further events.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut listener) => (&mut *listener)(event),
                Err(_) => warn!("Skipping a listener that re-entered its own event"),
            }
        }
    }
}

impl<E: 'static> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}
