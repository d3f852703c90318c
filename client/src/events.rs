use std::{mem, vec::IntoIter};

use canopy_shared::{LoadEvent as RuntimeLoadEvent, ReceiveSummary};

use crate::error::ClientError;

pub struct ClientEvents {
    loads: Vec<RuntimeLoadEvent>,
    messages: Vec<ReceiveSummary>,
    errors: Vec<ClientError>,

    empty: bool,
}

impl ClientEvents {
    pub(crate) fn new() -> Self {
        Self {
            loads: Vec::new(),
            messages: Vec::new(),
            errors: Vec::new(),

            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: ClientEvent>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: ClientEvent>(&self) -> bool {
        V::has(self)
    }

    pub(crate) fn push_load(&mut self, event: RuntimeLoadEvent) {
        self.loads.push(event);
        self.empty = false;
    }

    pub(crate) fn push_message(&mut self, summary: ReceiveSummary) {
        self.messages.push(summary);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: ClientError) {
        self.errors.push(error);
        self.empty = false;
    }
}

// Event Trait
pub trait ClientEvent {
    type Iter;

    fn iter(events: &mut ClientEvents) -> Self::Iter;

    fn has(events: &ClientEvents) -> bool;
}

// LoadEvent
/// The replica was loaded from the relay's snapshot
pub struct LoadEvent;
impl ClientEvent for LoadEvent {
    type Iter = IntoIter<RuntimeLoadEvent>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.loads))
    }

    fn has(events: &ClientEvents) -> bool {
        !events.loads.is_empty()
    }
}

// MessageEvent
pub struct MessageEvent;
impl ClientEvent for MessageEvent {
    type Iter = IntoIter<ReceiveSummary>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.messages))
    }

    fn has(events: &ClientEvents) -> bool {
        !events.messages.is_empty()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl ClientEvent for ErrorEvent {
    type Iter = IntoIter<ClientError>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.errors))
    }

    fn has(events: &ClientEvents) -> bool {
        !events.errors.is_empty()
    }
}
