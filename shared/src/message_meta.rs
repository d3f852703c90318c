use crate::replica_id::ReplicaId;

/// How a received op relates to the receiving replica
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EchoOrigin {
    /// Delivered synchronously from this replica's own send
    LocalEcho,
    /// This replica's own op coming back through the transport
    RemoteEcho,
    /// Sent by a different replica
    Foreign,
}

/// Delivery metadata attached to every op as it is routed down the tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageMeta {
    sender: ReplicaId,
    is_local_echo: bool,
    origin: EchoOrigin,
}

impl MessageMeta {
    pub fn new(sender: ReplicaId, is_local_echo: bool, own_replica: &ReplicaId) -> Self {
        let origin = if is_local_echo {
            EchoOrigin::LocalEcho
        } else if &sender == own_replica {
            EchoOrigin::RemoteEcho
        } else {
            EchoOrigin::Foreign
        };
        Self {
            sender,
            is_local_echo,
            origin,
        }
    }

    pub fn sender(&self) -> &ReplicaId {
        &self.sender
    }

    pub fn is_local_echo(&self) -> bool {
        self.is_local_echo
    }

    pub fn origin(&self) -> EchoOrigin {
        self.origin
    }
}
