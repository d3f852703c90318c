/// End-to-end sessions: a relay and several clients sharing one room through
/// real session messages, exchanged in memory.
use canopy_server::{ConnectEvent, DisconnectEvent, IdentifyEvent, MessageEvent};
use canopy_shared::{ReplicaId, SessionMessage};
use canopy_test::{
    assert_rooms_converged, client_config, init_logging, player_args, register_room,
    relay_config, LocalRelay, Room, Vector3,
};

fn relay_with_room() -> (LocalRelay, Room) {
    init_logging();
    let mut relay = LocalRelay::new(relay_config());
    let room = register_room(relay.server().runtime());
    relay.load(None);
    (relay, room)
}

fn join(relay: &mut LocalRelay, replica_id: &str) -> (usize, Room) {
    let joined = relay.connect_client(client_config(replica_id), |client| {
        register_room(client.runtime())
    });
    relay.pump();
    joined
}

#[test]
fn client_loads_the_relay_snapshot_on_connect() {
    let (mut relay, _server_room) = relay_with_room();
    let (alice, _room) = join(&mut relay, "alice");

    assert!(relay.client(alice).is_loaded());

    let (mut server_events, _) = relay.tick();
    let connected: Vec<_> = server_events.read::<ConnectEvent>().collect();
    assert_eq!(connected, vec![relay.user_key(alice)]);
    let identified: Vec<_> = server_events.read::<IdentifyEvent>().collect();
    assert_eq!(
        identified,
        vec![(relay.user_key(alice), ReplicaId::from("alice"))]
    );
    assert_eq!(
        relay.server().user_replica_id(&relay.user_key(alice)),
        Some(&ReplicaId::from("alice"))
    );
}

#[test]
fn late_joiner_receives_everything_made_before_it() {
    let (mut relay, server_room) = relay_with_room();
    let (_, room_a) = join(&mut relay, "alice");

    let alice = room_a
        .players
        .add(player_args("alice", "Alice"))
        .expect("players apply their local echo");
    alice.position.set(Vector3::new(1.0, 2.0, 3.0));

    // furniture waits for the relay's order
    assert!(room_a
        .furniture
        .add(("chair".to_string(), Vector3::default()))
        .is_none());
    assert!(room_a.furniture.is_empty());
    relay.pump();

    let chair = room_a.furniture.values().pop().expect("chair arrived");
    assert_eq!(chair.kind(), "chair");
    assert_eq!(chair.notes.set("color".to_string(), "red".to_string()), None);
    relay.pump();
    assert_eq!(
        chair.notes.get(&"color".to_string()),
        Some("red".to_string())
    );

    let (bob, room_b) = join(&mut relay, "bob");
    assert!(relay.client(bob).is_loaded());

    let alice_on_b = room_b.player_by_peer("alice").expect("snapshot has alice");
    assert_eq!(alice_on_b.display_name.get(), "Alice");
    assert_eq!(alice_on_b.position.get(), Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(room_b.furniture.size(), 1);

    assert_rooms_converged!(server_room, room_a, room_b);
}

#[test]
fn concurrent_writes_to_shared_furniture_converge_in_relay_order() {
    let (mut relay, server_room) = relay_with_room();
    let (_, room_a) = join(&mut relay, "alice");
    let (_, room_b) = join(&mut relay, "bob");

    room_a
        .furniture
        .add(("table".to_string(), Vector3::default()));
    relay.pump();
    let table_a = room_a.furniture.values().pop().expect("table on alice");
    let table_b = room_b.furniture.values().pop().expect("table on bob");

    assert_eq!(table_a.position.set(Vector3::new(1.0, 0.0, 0.0)), None);
    assert_eq!(table_b.position.set(Vector3::new(2.0, 0.0, 0.0)), None);
    // nothing applies until the relay answers
    assert_eq!(table_a.position.get(), Vector3::default());
    assert_eq!(table_b.position.get(), Vector3::default());

    // alice is drained first, so bob's write lands last everywhere
    relay.pump();
    assert_eq!(table_a.position.get(), Vector3::new(2.0, 0.0, 0.0));
    assert_eq!(table_b.position.get(), Vector3::new(2.0, 0.0, 0.0));
    assert_rooms_converged!(server_room, room_a, room_b);
}

#[test]
fn players_see_each_other_move() {
    let (mut relay, server_room) = relay_with_room();
    let (_, room_a) = join(&mut relay, "alice");
    let (_, room_b) = join(&mut relay, "bob");

    let alice = room_a.players.add(player_args("alice", "Alice")).unwrap();
    let bob = room_b.players.add(player_args("bob", "Bob")).unwrap();
    relay.pump();

    alice.position.set(Vector3::new(5.0, 0.0, 1.0));
    bob.hue.set(42);
    // local echoes apply right away
    assert_eq!(alice.position.get(), Vector3::new(5.0, 0.0, 1.0));
    assert_eq!(bob.hue.get(), 42);
    relay.pump();

    let alice_on_b = room_b.player_by_peer("alice").unwrap();
    assert_eq!(alice_on_b.position.get(), Vector3::new(5.0, 0.0, 1.0));
    let bob_on_a = room_a.player_by_peer("bob").unwrap();
    assert_eq!(bob_on_a.hue.get(), 42);

    assert_rooms_converged!(server_room, room_a, room_b);
}

#[test]
fn relay_reports_what_each_message_applied() {
    let (mut relay, _server_room) = relay_with_room();
    let (alice, room_a) = join(&mut relay, "alice");
    relay.tick();

    room_a.players.add(player_args("alice", "Alice"));
    relay.pump();

    let (mut server_events, mut client_events) = relay.tick();
    let messages: Vec<_> = server_events.read::<MessageEvent>().collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, relay.user_key(alice));
    assert_eq!(messages[0].1.delivered, 1);
    assert_eq!(messages[0].1.rejected, 0);

    // the relayed copy reached alice too
    let applied: Vec<_> = client_events[0]
        .read::<canopy_client::MessageEvent>()
        .collect();
    assert_eq!(applied.len(), 1);
}

#[test]
fn relay_removes_a_departed_player() {
    let (mut relay, server_room) = relay_with_room();
    let (_, room_a) = join(&mut relay, "alice");
    let (bob, room_b) = join(&mut relay, "bob");

    room_a.players.add(player_args("alice", "Alice"));
    room_b.players.add(player_args("bob", "Bob"));
    relay.pump();
    assert_eq!(room_a.players.size(), 2);
    relay.tick();

    relay.disconnect_client(bob);
    assert!(!relay.is_connected(bob));

    let (mut server_events, _) = relay.tick();
    for (_, replica_id) in server_events.read::<DisconnectEvent>() {
        let replica_id = replica_id.expect("bob identified before leaving");
        if let Some(player) = server_room.player_by_peer(replica_id.as_str()) {
            server_room.players.delete(&player);
        }
    }
    relay.pump();

    assert_eq!(relay.server().users_count(), 1);
    assert!(server_room.player_by_peer("bob").is_none());
    assert!(room_a.player_by_peer("bob").is_none());
    assert!(room_a.player_by_peer("alice").is_some());
    assert_rooms_converged!(server_room, room_a);
}

#[test]
fn relay_side_changes_reach_every_client() {
    let (mut relay, server_room) = relay_with_room();
    let (_, room_a) = join(&mut relay, "alice");
    let (_, room_b) = join(&mut relay, "bob");

    let lamp = server_room
        .furniture
        .add(("lamp".to_string(), Vector3::new(0.0, 3.0, 0.0)))
        .expect("the relay builds members from its own local echo");
    lamp.notes.set("on".to_string(), "yes".to_string());
    relay.pump();

    assert_eq!(room_a.furniture.size(), 1);
    assert_eq!(
        room_b.furniture.values()[0].notes.get(&"on".to_string()),
        Some("yes".to_string())
    );
    assert_rooms_converged!(server_room, room_a, room_b);
}

#[test]
fn connected_client_sends_keepalive_pings() {
    init_logging();
    let mut config = client_config("alice");
    config.ping_interval = std::time::Duration::ZERO;
    let mut client = canopy_client::Client::new(config);

    // nothing before connecting
    client.receive();
    assert!(client.take_outgoing().is_empty());

    client.connect();
    client.receive();
    let sent: Vec<_> = client
        .take_outgoing()
        .iter()
        .map(|bytes| SessionMessage::from_bytes(bytes).unwrap())
        .collect();
    assert_eq!(
        sent,
        vec![
            SessionMessage::Id {
                replica_id: ReplicaId::from("alice")
            },
            SessionMessage::Ping,
        ]
    );

    client.disconnect();
    client.receive();
    assert!(client.take_outgoing().is_empty());
}
