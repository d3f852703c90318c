use std::{cell::RefCell, rc::Rc};

use canopy_serde::Serde;

use crate::{
    echo_policy::EchoPolicy,
    events::{EventEmitter, ListenerKey},
    message_meta::MessageMeta,
    primitives::serializer::{DefaultSerializer, Serializer},
    runtime::error::RuntimeError,
    tree::{
        address::{Address, MessagePath},
        error::{ReceiveError, SnapshotError},
        node::{Node, NodeContext},
        snapshot::Snapshot,
    },
};

/// Fired when an applied op changes a register's value
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterEvent<T> {
    pub previous: T,
    pub value: T,
    pub meta: MessageMeta,
}

/// A single replicated value. The value only changes when an op is applied,
/// so a write is visible immediately only if the echo policy processes local
/// echoes.
pub struct Register<T> {
    inner: Rc<RegisterInner<T>>,
}

struct RegisterInner<T> {
    context: NodeContext,
    policy: EchoPolicy,
    value: RefCell<T>,
    serializer: Rc<dyn Serializer<T>>,
    events: EventEmitter<RegisterEvent<T>>,
}

impl<T> Clone for Register<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Serde + 'static> Register<T> {
    pub fn new(context: NodeContext, initial: T, policy: EchoPolicy) -> Self {
        Self::with_serializer(context, initial, policy, DefaultSerializer::shared())
    }
}

impl<T: Clone + PartialEq + 'static> Register<T> {
    pub fn with_serializer(
        context: NodeContext,
        initial: T,
        policy: EchoPolicy,
        serializer: Rc<dyn Serializer<T>>,
    ) -> Self {
        Self {
            inner: Rc::new(RegisterInner {
                context,
                policy,
                value: RefCell::new(initial),
                serializer,
                events: EventEmitter::new(),
            }),
        }
    }

    /// The value of the most recently applied op
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Sends `value` to every replica. Returns the value read back after the
    /// local echo, or `None` if this register ignores local echoes and the
    /// value will only arrive with the relayed copy.
    ///
    /// # Panics
    ///
    /// Panics if the runtime isn't loaded or has been dropped.
    /// Consider using `try_set` for non-panicking error handling.
    pub fn set(&self, value: T) -> Option<T> {
        self.try_set(value)
            .expect("Register::set called outside a loaded runtime")
    }

    pub fn try_set(&self, value: T) -> Result<Option<T>, RuntimeError> {
        let payload = self.inner.serializer.serialize(&value);
        self.inner.context.send(payload)?;
        if self.processes_own_local_echo() {
            Ok(Some(self.get()))
        } else {
            Ok(None)
        }
    }

    pub fn policy(&self) -> EchoPolicy {
        self.inner.policy
    }

    pub fn address(&self) -> &Address {
        self.inner.context.address()
    }

    /// The relay never gets its own ops back, so its replica applies them
    /// at the local echo whatever the policy
    fn processes_own_local_echo(&self) -> bool {
        self.inner.policy.processes_local_echo() || self.inner.context.is_server()
    }

    fn should_process(&self, meta: &MessageMeta) -> bool {
        self.inner.policy.should_process(meta)
            || (meta.is_local_echo() && self.inner.context.is_server())
    }

    pub fn on_change(&self, listener: impl FnMut(&RegisterEvent<T>) + 'static) -> ListenerKey {
        self.inner.events.on(listener)
    }

    pub fn off_change(&self, key: ListenerKey) -> bool {
        self.inner.events.off(key)
    }
}

impl<T: Clone + PartialEq + 'static> Node for Register<T> {
    fn context(&self) -> &NodeContext {
        &self.inner.context
    }

    fn receive(&self, path: &mut MessagePath, meta: &MessageMeta) -> Result<(), ReceiveError> {
        let address = self.inner.context.address();
        let payload = path.expect_payload(address)?;
        if !self.should_process(meta) {
            return Ok(());
        }

        let value = self
            .inner
            .serializer
            .deserialize(&payload)
            .map_err(|source| ReceiveError::Decode {
                address: address.clone(),
                source,
            })?;
        let previous = self.inner.value.replace(value.clone());

        if previous != value {
            self.inner.events.emit(&RegisterEvent {
                previous,
                value,
                meta: meta.clone(),
            });
        }
        Ok(())
    }

    fn save(&self) -> Snapshot {
        Snapshot::Leaf(self.inner.serializer.serialize(&self.inner.value.borrow()))
    }

    fn load(&self, snapshot: Option<Snapshot>) -> Result<(), SnapshotError> {
        let address = self.inner.context.address();
        match snapshot {
            None => Ok(()),
            Some(Snapshot::Leaf(bytes)) => {
                let value = self.inner.serializer.deserialize(&bytes).map_err(|source| {
                    SnapshotError::Decode {
                        address: address.clone(),
                        source,
                    }
                })?;
                self.inner.value.replace(value);
                Ok(())
            }
            Some(Snapshot::Children(_)) => Err(SnapshotError::UnexpectedShape {
                address: address.clone(),
                expected: "leaf",
            }),
        }
    }
}
