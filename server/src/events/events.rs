use std::{mem, vec::IntoIter};

use canopy_shared::{ReceiveSummary, ReplicaId};

use crate::{error::ServerError, user::UserKey};

pub struct ServerEvents {
    connections: Vec<UserKey>,
    identifications: Vec<(UserKey, ReplicaId)>,
    messages: Vec<(UserKey, ReceiveSummary)>,
    disconnections: Vec<(UserKey, Option<ReplicaId>)>,
    errors: Vec<ServerError>,

    empty: bool,
}

impl ServerEvents {
    pub(crate) fn new() -> Self {
        Self {
            connections: Vec::new(),
            identifications: Vec::new(),
            messages: Vec::new(),
            disconnections: Vec::new(),
            errors: Vec::new(),

            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: ServerEvent>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: ServerEvent>(&self) -> bool {
        V::has(self)
    }

    // Crate-public

    pub(crate) fn push_connection(&mut self, user_key: &UserKey) {
        self.connections.push(*user_key);
        self.empty = false;
    }

    pub(crate) fn push_identification(&mut self, user_key: &UserKey, replica_id: ReplicaId) {
        self.identifications.push((*user_key, replica_id));
        self.empty = false;
    }

    pub(crate) fn push_message(&mut self, user_key: &UserKey, summary: ReceiveSummary) {
        self.messages.push((*user_key, summary));
        self.empty = false;
    }

    pub(crate) fn push_disconnection(&mut self, user_key: &UserKey, replica_id: Option<ReplicaId>) {
        self.disconnections.push((*user_key, replica_id));
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: ServerError) {
        self.errors.push(error);
        self.empty = false;
    }
}

// Event Trait
pub trait ServerEvent {
    type Iter;

    fn iter(events: &mut ServerEvents) -> Self::Iter;

    fn has(events: &ServerEvents) -> bool;
}

// ConnectEvent
pub struct ConnectEvent;
impl ServerEvent for ConnectEvent {
    type Iter = IntoIter<UserKey>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.connections))
    }

    fn has(events: &ServerEvents) -> bool {
        !events.connections.is_empty()
    }
}

// IdentifyEvent
/// A client announced the replica id it sends ops under
pub struct IdentifyEvent;
impl ServerEvent for IdentifyEvent {
    type Iter = IntoIter<(UserKey, ReplicaId)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.identifications))
    }

    fn has(events: &ServerEvents) -> bool {
        !events.identifications.is_empty()
    }
}

// MessageEvent
/// A client message was applied to the relay's replica and rebroadcast
pub struct MessageEvent;
impl ServerEvent for MessageEvent {
    type Iter = IntoIter<(UserKey, ReceiveSummary)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.messages))
    }

    fn has(events: &ServerEvents) -> bool {
        !events.messages.is_empty()
    }
}

// DisconnectEvent
/// Carries the replica id the user announced, if any, so the application can
/// clean up what that replica created
pub struct DisconnectEvent;
impl ServerEvent for DisconnectEvent {
    type Iter = IntoIter<(UserKey, Option<ReplicaId>)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.disconnections))
    }

    fn has(events: &ServerEvents) -> bool {
        !events.disconnections.is_empty()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl ServerEvent for ErrorEvent {
    type Iter = IntoIter<ServerError>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        IntoIterator::into_iter(mem::take(&mut events.errors))
    }

    fn has(events: &ServerEvents) -> bool {
        !events.errors.is_empty()
    }
}
