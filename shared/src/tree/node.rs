use std::rc::{Rc, Weak};

use crate::{
    message_meta::MessageMeta,
    replica_id::ReplicaId,
    runtime::{error::RuntimeError, runtime::RuntimeShared},
    tree::{
        address::{Address, MessagePath},
        error::{ReceiveError, SnapshotError},
        snapshot::Snapshot,
    },
};

/// A member of the replicated tree.
///
/// Registers, maps, sets and containers implement this directly. Application
/// objects compose a [`crate::Container`] with primitives and implement it by
/// delegating to that container.
pub trait Node {
    /// The context this node was constructed with
    fn context(&self) -> &NodeContext;

    /// Applies an op whose remaining path starts at this node
    fn receive(&self, path: &mut MessagePath, meta: &MessageMeta) -> Result<(), ReceiveError>;

    fn save(&self) -> Snapshot;

    /// Restores saved state, or keeps the constructed defaults for `None`.
    /// Called exactly once, before any op is received.
    fn load(&self, snapshot: Option<Snapshot>) -> Result<(), SnapshotError>;

    /// No node supports tombstone compaction
    fn can_gc(&self) -> bool {
        false
    }
}

/// What a node needs from the tree: its own address, and a handle back to the
/// runtime it sends ops through. Passed explicitly to every constructor.
#[derive(Clone)]
pub struct NodeContext {
    address: Address,
    runtime: Weak<RuntimeShared>,
}

impl NodeContext {
    pub(crate) fn root(runtime: Weak<RuntimeShared>) -> Self {
        Self {
            address: Address::root(),
            runtime,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Name among siblings; empty for the root registry
    pub fn name(&self) -> &str {
        self.address.name().unwrap_or("")
    }

    /// Context for a child named `name`
    pub fn child(&self, name: &str) -> Self {
        Self {
            address: self.address.child(name),
            runtime: self.runtime.clone(),
        }
    }

    /// Identity of the owning replica, if the runtime is still alive
    pub fn replica_id(&self) -> Option<ReplicaId> {
        self.runtime
            .upgrade()
            .map(|runtime| runtime.replica_id().clone())
    }

    pub fn is_server(&self) -> bool {
        self.runtime
            .upgrade()
            .is_some_and(|runtime| runtime.is_server())
    }

    pub(crate) fn runtime(&self) -> Result<Rc<RuntimeShared>, RuntimeError> {
        self.runtime.upgrade().ok_or(RuntimeError::RuntimeDropped)
    }

    /// Sends an op addressed to this node. The local echo has been applied by
    /// the time this returns.
    pub(crate) fn send(&self, payload: Vec<u8>) -> Result<(), RuntimeError> {
        self.runtime()?.send(&self.address, payload)
    }
}
