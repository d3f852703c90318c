use thiserror::Error;

use canopy_serde::SerdeErr;

use crate::tree::error::{ContainerError, SnapshotError};

/// Errors surfaced by the runtime's lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// `receive`, `save` or a mutator was called before `load`
    #[error("Runtime is not loaded yet. Call load() before sending, receiving or saving")]
    NotLoaded,

    /// `load` or `register` was called after `load`
    #[error("Runtime is already loaded. Register every top-level node before calling load()")]
    AlreadyLoaded,

    /// A node outlived the runtime it was registered with
    #[error("Runtime has been dropped, but a node still tried to use it")]
    RuntimeDropped,

    /// The wire envelope or its op batch could not be decoded
    #[error("Malformed message: {0}")]
    MalformedMessage(SerdeErr),

    /// Saved state could not be decoded
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(SerdeErr),

    /// Saved state did not match the registered tree
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Top-level node could not be registered
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}
