use thiserror::Error;

use canopy_serde::SerdeErr;

use crate::tree::address::Address;

/// Errors that reject a single incoming op. The runtime logs these and keeps
/// routing the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiveError {
    /// Path ended before reaching a payload
    #[error("Op path ended at {address} without a payload")]
    EmptyPath { address: Address },

    /// A container was handed a payload, but containers have no ops of their own
    #[error("Container at {address} received a payload, but has no ops of its own")]
    UnexpectedPayload { address: Address },

    /// A leaf was handed a child name
    #[error("Leaf at {address} has no child {name:?}")]
    UnexpectedName { address: Address, name: String },

    /// The payload was followed by further segments
    #[error("Payload for {address} is followed by {remaining} more segment(s)")]
    TrailingSegments { address: Address, remaining: usize },

    /// The payload could not be decoded by the target node
    #[error("Failed to decode op for {address}: {source}")]
    Decode {
        address: Address,
        #[source]
        source: SerdeErr,
    },

    /// A child name that the container could not have generated
    #[error("Invalid child name {name:?} under {address}")]
    InvalidChildName { address: Address, name: String },
}

/// Errors that abort loading a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Snapshot kind doesn't match the node kind
    #[error("Node at {address} expected a {expected} snapshot")]
    UnexpectedShape {
        address: Address,
        expected: &'static str,
    },

    /// A set member was saved without its constructor arguments
    #[error("Saved member {name:?} under {address} has no constructor arguments")]
    MissingArgs { address: Address, name: String },

    /// Snapshot bytes could not be decoded
    #[error("Failed to decode snapshot for {address}: {source}")]
    Decode {
        address: Address,
        #[source]
        source: SerdeErr,
    },

    /// Saved child name could not be mapped back to a child
    #[error("Invalid child name {name:?} in snapshot for {address}")]
    InvalidChildName { address: Address, name: String },
}

/// Errors that occur while building the static part of the tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Two children registered under the same name
    #[error("Container at {address} already has a child named {name:?}")]
    DuplicateName { address: Address, name: String },

    /// Name collides with the naming scheme used for set members
    #[error("Child name {name:?} under {address} contains the reserved delimiter {delimiter:?}")]
    ReservedDelimiter {
        address: Address,
        name: String,
        delimiter: char,
    },
}
