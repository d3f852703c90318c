use std::{default::Default, time::Duration};

use canopy_shared::BatchingStrategy;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Replica identity of the relay's own runtime
    pub replica_id: String,
    /// Determines how ops made by the relay's own runtime are grouped. Pending
    /// ops are always committed before a client message is relayed, so the
    /// relay's view never diverges from the order clients see.
    pub batching: BatchingStrategy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            replica_id: "server".to_string(),
            batching: BatchingStrategy::RateLimited(Duration::from_millis(100)),
        }
    }
}
