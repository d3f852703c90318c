/// Bad input at either end of a session is reported and dropped without
/// disturbing anyone else's state.
use canopy_client::{ClientError, ErrorEvent as ClientErrorEvent, LoadEvent};
use canopy_server::{ErrorEvent, MessageEvent, ServerError};
use canopy_shared::{OpBatch, ReplicaId, RuntimeError, Segment, SessionMessage, WireMessage};
use canopy_test::{
    assert_rooms_converged, client_config, init_logging, player_args, register_room,
    relay_config, LocalRelay, Room,
};

fn session() -> (LocalRelay, Room, Room) {
    init_logging();
    let mut relay = LocalRelay::new(relay_config());
    let server_room = register_room(relay.server().runtime());
    relay.load(None);
    let (_, room_a) = relay.connect_client(client_config("alice"), |client| {
        register_room(client.runtime())
    });
    relay.pump();
    relay.tick();
    (relay, server_room, room_a)
}

#[test]
fn garbage_from_a_client_is_reported_and_not_relayed() {
    let (mut relay, server_room, room_a) = session();

    relay.inject_to_server(0, &[0xff, 0xff, 0xff, 0xff]);
    assert!(relay.server_mut().take_outgoing().is_empty());

    let (mut server_events, _) = relay.tick();
    let errors: Vec<_> = server_events.read::<ErrorEvent>().collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ServerError::MalformedMessage { .. }));
    assert!(!server_events.has::<MessageEvent>());

    assert_rooms_converged!(server_room, room_a);
}

#[test]
fn client_cannot_send_a_snapshot() {
    let (mut relay, _server_room, _room_a) = session();

    let load = SessionMessage::Load {
        snapshot: Vec::new(),
    };
    relay.inject_to_server(0, &load.to_bytes());

    let (mut server_events, _) = relay.tick();
    let errors: Vec<_> = server_events.read::<ErrorEvent>().collect();
    assert_eq!(
        errors,
        vec![ServerError::UnexpectedMessage {
            user_key: relay.user_key(0),
            kind: "load",
        }]
    );
}

#[test]
fn malformed_envelope_inside_a_session_message_is_reported() {
    let (mut relay, _server_room, _room_a) = session();

    let msg = SessionMessage::Msg {
        message: vec![0xff; 3],
    };
    relay.inject_to_server(0, &msg.to_bytes());
    assert!(relay.server_mut().take_outgoing().is_empty());

    let (mut server_events, _) = relay.tick();
    let errors: Vec<_> = server_events.read::<ErrorEvent>().collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], ServerError::MalformedMessage { .. }));
}

#[test]
fn rejected_ops_do_not_block_the_rest_of_a_message() {
    let (mut relay, server_room, room_a) = session();

    // a payload addressed to the root, then an op with no bytes at all
    let mut batch = OpBatch::new();
    batch.push(vec![Segment::Payload(vec![1])]);
    batch.push_raw(Vec::new());
    let message = WireMessage {
        sender: ReplicaId::from("alice"),
        payload: batch.to_bytes(),
    };
    let msg = SessionMessage::Msg {
        message: message.to_bytes(),
    };
    relay.inject_to_server(0, &msg.to_bytes());

    // a well-formed op still goes through afterwards
    room_a.players.add(player_args("alice", "Alice"));
    relay.pump();

    let (mut server_events, _) = relay.tick();
    let summaries: Vec<_> = server_events
        .read::<MessageEvent>()
        .map(|(_, summary)| summary)
        .collect();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].delivered, 0);
    assert_eq!(summaries[0].rejected, 2);
    assert_eq!(summaries[1].delivered, 1);

    assert_eq!(server_room.players.size(), 1);
    assert_rooms_converged!(server_room, room_a);
}

#[test]
fn client_cannot_speak_for_another_replica() {
    let (mut relay, server_room, room_a) = session();

    let mut batch = OpBatch::new();
    batch.push(vec![Segment::Name("players".into()), Segment::Payload(vec![0])]);
    let message = WireMessage {
        sender: ReplicaId::from("mallory"),
        payload: batch.to_bytes(),
    };
    relay.inject_to_server(0, &SessionMessage::Msg { message: message.to_bytes() }.to_bytes());
    assert!(relay.server_mut().take_outgoing().is_empty());

    let (mut server_events, _) = relay.tick();
    let errors: Vec<_> = server_events.read::<ErrorEvent>().collect();
    assert_eq!(
        errors,
        vec![ServerError::SenderMismatch {
            user_key: relay.user_key(0),
            announced: Some(ReplicaId::from("alice")),
            sender: ReplicaId::from("mallory"),
        }]
    );
    assert!(!server_events.has::<MessageEvent>());
    assert_rooms_converged!(server_room, room_a);
}

#[test]
fn relay_cannot_send_client_messages() {
    let (mut relay, _server_room, _room_a) = session();

    relay.inject_to_client(0, &SessionMessage::Ping.to_bytes());
    let id = SessionMessage::Id {
        replica_id: ReplicaId::from("mallory"),
    };
    relay.inject_to_client(0, &id.to_bytes());

    let (_, mut client_events) = relay.tick();
    let errors: Vec<_> = client_events[0].read::<ClientErrorEvent>().collect();
    assert_eq!(
        errors,
        vec![
            ClientError::UnexpectedMessage { kind: "ping" },
            ClientError::UnexpectedMessage { kind: "id" },
        ]
    );
}

#[test]
fn second_snapshot_is_ignored() {
    let (mut relay, server_room, room_a) = session();

    room_a.players.add(player_args("alice", "Alice"));
    relay.pump();

    // an empty room, which would wipe alice if it were applied
    let current = relay.server().runtime().save();
    let empty_room = {
        let runtime = canopy_shared::Runtime::default();
        register_room(&runtime);
        runtime.load(None);
        runtime.save()
    };
    assert_ne!(current, empty_room);
    relay.inject_to_client(
        0,
        &SessionMessage::Load {
            snapshot: empty_room,
        }
        .to_bytes(),
    );

    let (_, mut client_events) = relay.tick();
    assert!(!client_events[0].has::<LoadEvent>());
    assert!(!client_events[0].has::<ClientErrorEvent>());
    assert_eq!(room_a.players.size(), 1);
    assert_rooms_converged!(server_room, room_a);
}

#[test]
fn message_from_an_unknown_user_is_rejected() {
    let (mut relay, _server_room, _room_a) = session();

    let user_key = relay.user_key(0);
    relay.disconnect_client(0);
    let result = relay
        .server_mut()
        .try_receive_message(&user_key, &SessionMessage::Ping.to_bytes());
    assert_eq!(result, Err(ServerError::UnknownUser { user_key }));
}

#[test]
fn client_ops_before_the_snapshot_fail_locally() {
    init_logging();
    let client = canopy_client::Client::new(client_config("early"));
    let room = register_room(client.runtime());

    assert_eq!(
        room.players.try_add(player_args("early", "Early")).err(),
        Some(RuntimeError::NotLoaded)
    );
}
