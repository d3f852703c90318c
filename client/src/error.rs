use thiserror::Error;

use canopy_shared::{RuntimeError, SerdeErr};

/// Errors that can occur while applying messages from the relay
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The client's replica rejected an operation
    #[error("Replica error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Bytes from the relay were not a session message
    #[error("Malformed session message from the relay: {0}")]
    MalformedMessage(SerdeErr),

    /// The relay sent a message only clients may send
    #[error("Relay sent a {kind:?} message, which only clients may send")]
    UnexpectedMessage { kind: &'static str },
}
