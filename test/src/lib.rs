pub mod helpers;
pub mod local_relay;
pub mod test_world;

pub use helpers::*;
pub use local_relay::LocalRelay;
pub use test_world::{
    player_args, register_room, Furniture, FurnitureArgs, PlayerArgs, PlayerState, Room, Vector3,
};

/// Initializes logging once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
