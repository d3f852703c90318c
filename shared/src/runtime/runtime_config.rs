use std::default::Default;

use crate::runtime::batching::BatchingStrategy;

/// Contains Config properties which will be used by a Runtime
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Fixed identity for this replica. A random 10 character id is generated
    /// when unset.
    pub replica_id: Option<String>,
    /// Determines how ops are grouped into outgoing messages
    pub batching: BatchingStrategy,
    /// Set on the relay's own replica, which never receives its ops back.
    /// Sets then build members from their local echo regardless of policy.
    pub is_server: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            replica_id: None,
            batching: BatchingStrategy::default(),
            is_server: false,
        }
    }
}
