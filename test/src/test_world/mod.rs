/// Application objects used by the end-to-end tests: a room holding players
/// and furniture, shaped the way a small multiplayer scene would use the tree

use canopy_shared::{
    BitReader, BitWrite, Container, EchoPolicy, Map, MessageMeta, MessagePath, MutSet, Node,
    NodeContext, ReceiveError, Register, Runtime, Serde, SerdeErr, Snapshot, SnapshotError,
};

macro_rules! delegate_node {
    ($name:ident) => {
        impl Node for $name {
            fn context(&self) -> &NodeContext {
                self.container.context()
            }

            fn receive(
                &self,
                path: &mut MessagePath,
                meta: &MessageMeta,
            ) -> Result<(), ReceiveError> {
                self.container.receive(path, meta)
            }

            fn save(&self) -> Snapshot {
                self.container.save()
            }

            fn load(&self, snapshot: Option<Snapshot>) -> Result<(), SnapshotError> {
                self.container.load(snapshot)
            }
        }
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Serde for Vector3 {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.x.ser(writer);
        self.y.ser(writer);
        self.z.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            x: f32::de(reader)?,
            y: f32::de(reader)?,
            z: f32::de(reader)?,
        })
    }
}

// PlayerState

/// position, rotation, peer id, display name, hue
pub type PlayerArgs = (Vector3, Vector3, String, String, u16);

/// Each player only writes its own state, so every register applies local
/// echoes and skips the relayed copy
#[derive(Clone)]
pub struct PlayerState {
    container: Container,
    peer_id: String,
    pub position: Register<Vector3>,
    pub rotation: Register<Vector3>,
    pub display_name: Register<String>,
    pub hue: Register<u16>,
    pub call_ready: Register<bool>,
}

impl PlayerState {
    pub fn new(context: NodeContext, args: PlayerArgs) -> Self {
        let (position, rotation, peer_id, display_name, hue) = args;
        let container = Container::new(context);
        Self {
            position: container.add_child("p", |ctx| Register::new(ctx, position, EchoPolicy::Local)),
            rotation: container.add_child("r", |ctx| Register::new(ctx, rotation, EchoPolicy::Local)),
            display_name: container.add_child("displayName", |ctx| {
                Register::new(ctx, display_name, EchoPolicy::Local)
            }),
            hue: container.add_child("hue", |ctx| Register::new(ctx, hue, EchoPolicy::Local)),
            call_ready: container
                .add_child("callReady", |ctx| Register::new(ctx, false, EchoPolicy::Local)),
            peer_id,
            container,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }
}

delegate_node!(PlayerState);

// Furniture

/// kind, position
pub type FurnitureArgs = (String, Vector3);

/// Shared by everyone, so every write waits for the relay's order
#[derive(Clone)]
pub struct Furniture {
    container: Container,
    kind: String,
    pub position: Register<Vector3>,
    pub notes: Map<String, String>,
}

impl Furniture {
    pub fn new(context: NodeContext, args: FurnitureArgs) -> Self {
        let (kind, position) = args;
        let container = Container::new(context);
        Self {
            position: container
                .add_child("p", |ctx| Register::new(ctx, position, EchoPolicy::Remote)),
            notes: container.add_child("notes", |ctx| Map::new(ctx, EchoPolicy::Remote)),
            kind,
            container,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

delegate_node!(Furniture);

// Room

#[derive(Clone)]
pub struct Room {
    container: Container,
    pub players: MutSet<PlayerState, PlayerArgs>,
    pub furniture: MutSet<Furniture, FurnitureArgs>,
}

impl Room {
    pub fn new(context: NodeContext) -> Self {
        let container = Container::new(context);
        Self {
            players: container
                .add_child("players", |ctx| MutSet::new(ctx, EchoPolicy::Local, PlayerState::new)),
            furniture: container.add_child("furniture", |ctx| {
                MutSet::new(ctx, EchoPolicy::Remote, Furniture::new)
            }),
            container,
        }
    }

    /// Live player whose peer id is `peer_id`
    pub fn player_by_peer(&self, peer_id: &str) -> Option<PlayerState> {
        self.players
            .values()
            .into_iter()
            .find(|player| player.peer_id() == peer_id)
    }
}

delegate_node!(Room);

/// Registers the room at the top level of `runtime`
pub fn register_room(runtime: &Runtime) -> Room {
    runtime.register("room", Room::new)
}

/// Arguments for a player with default placement
pub fn player_args(peer_id: &str, display_name: &str) -> PlayerArgs {
    (
        Vector3::default(),
        Vector3::default(),
        peer_id.to_string(),
        display_name.to_string(),
        180,
    )
}
