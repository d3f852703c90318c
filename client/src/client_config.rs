use std::{default::Default, time::Duration};

use canopy_shared::RuntimeConfig;

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Used to configure the Client's replica
    pub runtime: RuntimeConfig,
    /// The duration between keepalive pings sent to the relay
    pub ping_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            ping_interval: Duration::from_secs(10),
        }
    }
}
