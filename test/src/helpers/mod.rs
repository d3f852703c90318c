use canopy_client::ClientConfig;
use canopy_server::ServerConfig;
use canopy_shared::{BatchingStrategy, RuntimeConfig};

use crate::test_world::{Room, Vector3};

/// Relay that commits its own ops as soon as they are made
pub fn relay_config() -> ServerConfig {
    ServerConfig {
        batching: BatchingStrategy::Immediate,
        ..ServerConfig::default()
    }
}

/// Client with a fixed replica id, so tests can look players up by peer
pub fn client_config(replica_id: &str) -> ClientConfig {
    ClientConfig {
        runtime: RuntimeConfig {
            replica_id: Some(replica_id.to_string()),
            ..RuntimeConfig::default()
        },
        ..ClientConfig::default()
    }
}

/// Everything observable about a room, in a comparable form
#[derive(Debug, PartialEq)]
pub struct RoomDigest {
    pub players: Vec<(String, String, Vector3, u16)>,
    pub furniture: Vec<(String, String, Vector3, Vec<(String, String)>)>,
}

pub fn room_digest(room: &Room) -> RoomDigest {
    let players = room
        .players
        .values()
        .into_iter()
        .map(|player| {
            (
                player.peer_id().to_string(),
                player.display_name.get(),
                player.position.get(),
                player.hue.get(),
            )
        })
        .collect();
    let furniture = room
        .furniture
        .values()
        .into_iter()
        .map(|item| {
            let name = room.furniture.name_of(&item).unwrap_or_default();
            let mut notes = item.notes.entries();
            notes.sort();
            (name, item.kind().to_string(), item.position.get(), notes)
        })
        .collect();
    RoomDigest { players, furniture }
}

/// Asserts that every room holds the same state as the first
#[macro_export]
macro_rules! assert_rooms_converged {
    ($first:expr $(, $other:expr)+ $(,)?) => {
        let expected = $crate::helpers::room_digest(&$first);
        $(
            assert_eq!(
                $crate::helpers::room_digest(&$other),
                expected,
                "{} diverged from {}",
                stringify!($other),
                stringify!($first)
            );
        )+
    };
}
