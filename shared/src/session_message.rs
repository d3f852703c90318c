use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::replica_id::ReplicaId;

/// Framing used between the relay server and its clients. Wraps runtime
/// messages together with the session control messages around them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionMessage {
    /// Server → client, once per connection: the relay replica's saved state
    Load { snapshot: Vec<u8> },
    /// Either direction: a runtime `SendEvent` message, relayed verbatim
    Msg { message: Vec<u8> },
    /// Client → server, on connect: the client's replica identity
    Id { replica_id: ReplicaId },
    /// Client → server keepalive
    Ping,
}

impl SessionMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionMessage::Load { .. } => "load",
            SessionMessage::Msg { .. } => "msg",
            SessionMessage::Id { .. } => "id",
            SessionMessage::Ping => "ping",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        canopy_serde::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        canopy_serde::decode(bytes)
    }
}

impl Serde for SessionMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let tag: u8 = match self {
            SessionMessage::Load { .. } => 0,
            SessionMessage::Msg { .. } => 1,
            SessionMessage::Id { .. } => 2,
            SessionMessage::Ping => 3,
        };
        UnsignedInteger::<2>::new(tag).ser(writer);
        match self {
            SessionMessage::Load { snapshot } => snapshot.ser(writer),
            SessionMessage::Msg { message } => message.ser(writer),
            SessionMessage::Id { replica_id } => replica_id.ser(writer),
            SessionMessage::Ping => {}
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag = UnsignedInteger::<2>::de(reader)?.get();
        match tag {
            0 => Ok(SessionMessage::Load {
                snapshot: Vec::<u8>::de(reader)?,
            }),
            1 => Ok(SessionMessage::Msg {
                message: Vec::<u8>::de(reader)?,
            }),
            2 => Ok(SessionMessage::Id {
                replica_id: ReplicaId::de(reader)?,
            }),
            3 => Ok(SessionMessage::Ping),
            _ => Err(SerdeErr::InvalidTag {
                type_name: "SessionMessage",
                tag: tag as u64,
            }),
        }
    }
}
