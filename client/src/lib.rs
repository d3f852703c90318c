//! # Canopy Client
//! Connects a replica to the canopy relay: announces its identity, forwards
//! the ops it commits, and applies the relay's snapshot and broadcasts.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use canopy_shared::{
        BatchingStrategy, EchoPolicy, Map, MutSet, Node, NodeContext, Register, Runtime,
        RuntimeConfig, SessionMessage,
    };
}

mod client;
mod client_config;
mod error;
mod events;

pub use client::Client;
pub use client_config::ClientConfig;
pub use error::ClientError;
pub use events::{ClientEvent, ClientEvents, ErrorEvent, LoadEvent, MessageEvent};
