use thiserror::Error;

use canopy_shared::{ReplicaId, RuntimeError, SerdeErr};

use crate::user::UserKey;

/// Errors that can occur while relaying between clients
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// The relay's own runtime rejected an operation
    #[error("Relay runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Bytes from a client were not a session message
    #[error("Malformed session message from {user_key:?}: {source}")]
    MalformedMessage {
        user_key: UserKey,
        #[source]
        source: SerdeErr,
    },

    /// A message arrived for a user that isn't connected
    #[error("No connected user for {user_key:?}")]
    UnknownUser { user_key: UserKey },

    /// A client sent a message only the server may send
    #[error("Client {user_key:?} sent a {kind:?} message, which only the server may send")]
    UnexpectedMessage {
        user_key: UserKey,
        kind: &'static str,
    },

    /// A client sent ops under a replica id other than the one it announced
    #[error("User {user_key:?} announced {announced:?} but sent a message from {sender}")]
    SenderMismatch {
        user_key: UserKey,
        announced: Option<ReplicaId>,
        sender: ReplicaId,
    },
}
