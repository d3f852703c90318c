use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    mem,
    rc::Rc,
};

use log::{debug, info, warn};

use canopy_shared::{
    ReplicaId, Runtime, RuntimeConfig, RuntimeError, SessionMessage, WireMessage,
};

use crate::{
    error::ServerError,
    events::ServerEvents,
    user::{User, UserKey},
    ServerConfig,
};

/// A relay that sequences the messages of every connected client into one
/// order and rebroadcasts them to all clients, the sender included. It also
/// keeps its own replica of the tree, used to hand new clients the current
/// state and to let server-side logic make changes of its own.
///
/// Transport-agnostic: feed it bytes with [`Server::receive_message`] and
/// ship whatever [`Server::take_outgoing`] returns.
pub struct Server {
    runtime: Runtime,
    users: BTreeMap<UserKey, User>,
    next_user_key: u64,
    pending_broadcasts: Rc<RefCell<Vec<Vec<u8>>>>,
    outgoing: VecDeque<(UserKey, Vec<u8>)>,
    incoming_events: ServerEvents,
}

impl Server {
    /// Create a new Server
    pub fn new(config: ServerConfig) -> Self {
        let runtime = Runtime::new(RuntimeConfig {
            replica_id: Some(config.replica_id),
            batching: config.batching,
            is_server: true,
        });

        let pending_broadcasts = Rc::new(RefCell::new(Vec::new()));
        let sink = pending_broadcasts.clone();
        runtime.on_send(move |event| sink.borrow_mut().push(event.message.clone()));

        Self {
            runtime,
            users: BTreeMap::new(),
            next_user_key: 0,
            pending_broadcasts,
            outgoing: VecDeque::new(),
            incoming_events: ServerEvents::new(),
        }
    }

    /// The relay's own replica. Register the shared tree on it before
    /// calling [`Server::load`].
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Loads the relay's replica, from saved state or empty
    ///
    /// # Panics
    ///
    /// Panics if already loaded or the saved state doesn't match the tree.
    /// Consider using `try_load` for non-panicking error handling.
    pub fn load(&mut self, saved: Option<&[u8]>) {
        self.try_load(saved).expect("Server::load failed")
    }

    pub fn try_load(&mut self, saved: Option<&[u8]>) -> Result<(), ServerError> {
        self.runtime.try_load(saved)?;
        info!("Relay {} listening", self.runtime.replica_id());
        Ok(())
    }

    /// Must be called regularly. Commits the relay's rate-limited batch when
    /// it is due and returns every event since the last call.
    pub fn receive(&mut self) -> ServerEvents {
        self.runtime.update();
        self.flush_broadcasts();
        mem::replace(&mut self.incoming_events, ServerEvents::new())
    }

    // Connections

    /// Accepts a new client and queues the current state for it
    ///
    /// # Panics
    ///
    /// Panics if the relay's replica isn't loaded.
    /// Consider using `try_connect_user` for non-panicking error handling.
    pub fn connect_user(&mut self) -> UserKey {
        self.try_connect_user()
            .expect("Server::connect_user called before load")
    }

    pub fn try_connect_user(&mut self) -> Result<UserKey, ServerError> {
        // saving commits the pending batch, which existing users must get
        // before the new user is added, or it would apply those ops twice
        let snapshot = self.runtime.try_save()?;
        self.flush_broadcasts();

        let user_key = UserKey::new(self.next_user_key);
        self.next_user_key += 1;
        self.users.insert(user_key, User::new());

        info!("Connecting user {:?}, sending {} byte snapshot", user_key, snapshot.len());
        self.outgoing
            .push_back((user_key, SessionMessage::Load { snapshot }.to_bytes()));
        self.incoming_events.push_connection(&user_key);
        Ok(user_key)
    }

    pub fn disconnect_user(&mut self, user_key: &UserKey) {
        let Some(user) = self.users.remove(user_key) else {
            warn!("Attempting to disconnect unknown user {:?}", user_key);
            return;
        };
        self.outgoing.retain(|(key, _)| key != user_key);

        let replica_id = user.take_replica_id();
        info!("Disconnected user {:?} (replica {:?})", user_key, replica_id);
        self.incoming_events
            .push_disconnection(user_key, replica_id);
    }

    // Users

    pub fn user_exists(&self, user_key: &UserKey) -> bool {
        self.users.contains_key(user_key)
    }

    /// Return a list of all currently connected Users' keys
    pub fn user_keys(&self) -> Vec<UserKey> {
        self.users.keys().copied().collect()
    }

    pub fn users_count(&self) -> usize {
        self.users.len()
    }

    /// The replica id a user announced, once it has
    pub fn user_replica_id(&self, user_key: &UserKey) -> Option<&ReplicaId> {
        self.users.get(user_key)?.replica_id()
    }

    // Messages

    /// Handles bytes a client sent. Failures are logged and reported as
    /// [`crate::ErrorEvent`]s; a message that fails is never rebroadcast.
    pub fn receive_message(&mut self, user_key: &UserKey, bytes: &[u8]) {
        if let Err(error) = self.try_receive_message(user_key, bytes) {
            warn!("Dropping message from {:?}: {}", user_key, error);
            self.incoming_events.push_error(error);
        }
    }

    pub fn try_receive_message(
        &mut self,
        user_key: &UserKey,
        bytes: &[u8],
    ) -> Result<(), ServerError> {
        let Some(user) = self.users.get_mut(user_key) else {
            return Err(ServerError::UnknownUser {
                user_key: *user_key,
            });
        };
        let message = SessionMessage::from_bytes(bytes).map_err(|source| {
            ServerError::MalformedMessage {
                user_key: *user_key,
                source,
            }
        })?;

        match message {
            SessionMessage::Id { replica_id } => {
                info!("User {:?} identified as {}", user_key, replica_id);
                user.set_replica_id(replica_id.clone());
                self.incoming_events
                    .push_identification(user_key, replica_id);
                Ok(())
            }
            SessionMessage::Ping => {
                debug!("Ping from {:?}", user_key);
                Ok(())
            }
            SessionMessage::Msg { message } => self.relay(user_key, message),
            other @ SessionMessage::Load { .. } => Err(ServerError::UnexpectedMessage {
                user_key: *user_key,
                kind: other.kind(),
            }),
        }
    }

    /// Queued messages for clients, in the order they must be delivered
    pub fn take_outgoing(&mut self) -> Vec<(UserKey, Vec<u8>)> {
        self.flush_broadcasts();
        self.outgoing.drain(..).collect()
    }

    // Private methods

    fn relay(&mut self, user_key: &UserKey, message: Vec<u8>) -> Result<(), ServerError> {
        let envelope =
            WireMessage::from_bytes(&message).map_err(|source| ServerError::MalformedMessage {
                user_key: *user_key,
                source,
            })?;
        // a client only speaks for the replica it announced
        let announced = self.users.get(user_key).and_then(|user| user.replica_id());
        if announced != Some(&envelope.sender) {
            return Err(ServerError::SenderMismatch {
                user_key: *user_key,
                announced: announced.cloned(),
                sender: envelope.sender,
            });
        }

        // the relay's own pending ops were applied here first, so they go
        // out first
        self.runtime.commit_batch();
        self.flush_broadcasts();

        let summary = match self.runtime.try_receive(&message) {
            Ok(summary) => summary,
            Err(RuntimeError::MalformedMessage(source)) => {
                return Err(ServerError::MalformedMessage {
                    user_key: *user_key,
                    source,
                })
            }
            Err(error) => return Err(error.into()),
        };
        if summary.rejected > 0 {
            warn!(
                "{} op(s) from {:?} were rejected by the relay replica",
                summary.rejected, user_key
            );
        }

        self.broadcast(&message);
        // ops made by relay-side listeners while applying the message
        self.flush_broadcasts();
        self.incoming_events.push_message(user_key, summary);
        Ok(())
    }

    fn flush_broadcasts(&mut self) {
        let messages = mem::take(&mut *self.pending_broadcasts.borrow_mut());
        for message in messages {
            self.broadcast(&message);
        }
    }

    fn broadcast(&mut self, message: &[u8]) {
        let bytes = SessionMessage::Msg {
            message: message.to_vec(),
        }
        .to_bytes();
        for user_key in self.users.keys() {
            self.outgoing.push_back((*user_key, bytes.clone()));
        }
    }
}
