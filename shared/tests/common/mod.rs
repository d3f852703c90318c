#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use canopy_shared::{
    Container, EchoPolicy, MessagePath, MessageMeta, Node, NodeContext, ReceiveError, Register,
    Runtime, RuntimeConfig, Snapshot, SnapshotError,
};

/// A runtime plus everything it has sent, standing in for one end of a
/// transport
pub struct Peer {
    pub runtime: Runtime,
    outbox: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Peer {
    pub fn new(replica_id: &str) -> Self {
        Self::with_config(RuntimeConfig {
            replica_id: Some(replica_id.to_string()),
            ..Default::default()
        })
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let runtime = Runtime::new(config);
        let outbox = Rc::new(RefCell::new(Vec::new()));
        let sink = outbox.clone();
        runtime.on_send(move |event| sink.borrow_mut().push(event.message.clone()));
        Self { runtime, outbox }
    }

    pub fn take_outbox(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }
}

/// Delivers each message to every peer, in order, the way a relay would
pub fn deliver(messages: &[Vec<u8>], peers: &[&Peer]) {
    for message in messages {
        for peer in peers {
            peer.runtime.receive(message);
        }
    }
}

/// Relays outboxes, in peer order, until nobody has anything left to send
pub fn flush(peers: &[&Peer]) {
    loop {
        let messages: Vec<Vec<u8>> = peers.iter().flat_map(|peer| peer.take_outbox()).collect();
        if messages.is_empty() {
            return;
        }
        deliver(&messages, peers);
    }
}

/// Minimal application object: a container holding one register
#[derive(Clone)]
pub struct Block {
    container: Container,
    pub value: Register<i64>,
}

impl Block {
    pub fn new(context: NodeContext, value: i64) -> Self {
        let container = Container::new(context);
        let value = container.add_child("value", |ctx| Register::new(ctx, value, EchoPolicy::Both));
        Self { container, value }
    }
}

impl Node for Block {
    fn context(&self) -> &NodeContext {
        self.container.context()
    }

    fn receive(&self, path: &mut MessagePath, meta: &MessageMeta) -> Result<(), ReceiveError> {
        self.container.receive(path, meta)
    }

    fn save(&self) -> Snapshot {
        self.container.save()
    }

    fn load(&self, snapshot: Option<Snapshot>) -> Result<(), SnapshotError> {
        self.container.load(snapshot)
    }
}
