//! # Canopy Server
//! A relay that sequences messages from every connected client into a single
//! order, rebroadcasts them to all clients, and keeps a replica of its own to
//! hand new clients the current state.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use canopy_shared::{
        BatchingStrategy, EchoPolicy, Map, MutSet, Node, NodeContext, Register, Runtime,
        SessionMessage,
    };
}

mod error;
mod events;
mod server;
mod user;

pub use error::ServerError;
pub use events::{
    ConnectEvent, DisconnectEvent, ErrorEvent, IdentifyEvent, MessageEvent, ServerEvent,
    ServerEvents,
};
pub use server::{Server, ServerConfig};
pub use user::UserKey;
