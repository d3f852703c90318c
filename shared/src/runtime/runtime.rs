use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use log::{debug, info, warn};

use canopy_serde::{decode, encode};

use crate::{
    backends::Timer,
    events::{EventEmitter, ListenerKey},
    message_meta::MessageMeta,
    replica_id::ReplicaId,
    runtime::{batching::BatchingStrategy, error::RuntimeError, runtime_config::RuntimeConfig},
    tree::{
        address::{Address, MessagePath},
        container::Container,
        node::{Node, NodeContext},
        snapshot::SavedState,
    },
    wire::{decode_op, OpBatch, WireMessage},
};

/// Emitted when a batch is committed. `message` is an encoded
/// [`WireMessage`] to hand to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendEvent {
    pub message: Vec<u8>,
}

/// Emitted once, when the runtime finishes loading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadEvent {
    /// No saved state was supplied, so every node kept its defaults
    pub skipped: bool,
}

/// Outcome of receiving one message
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Ops routed to their target, including ops the target chose to ignore
    pub delivered: usize,
    /// Ops that failed to decode or route
    pub rejected: usize,
}

/// Root of a replicated tree. Owns the registry of top-level nodes, the
/// replica identity and the pending op batch.
///
/// Lifecycle: register every top-level node, `load` once, then exchange
/// messages. Nodes hold a weak handle to the runtime, so a `Runtime` must
/// outlive the nodes that send through it.
pub struct Runtime {
    shared: Rc<RuntimeShared>,
}

pub(crate) struct RuntimeShared {
    replica_id: ReplicaId,
    is_server: bool,
    loaded: Cell<bool>,
    counter: Cell<u64>,
    registry: Container,
    batch: RefCell<OpBatch>,
    batching: Cell<BatchingStrategy>,
    batch_timer: RefCell<Option<Timer>>,
    send_events: EventEmitter<SendEvent>,
    load_events: EventEmitter<LoadEvent>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        let replica_id = config
            .replica_id
            .map(ReplicaId::new)
            .unwrap_or_else(ReplicaId::random);
        let shared = Rc::new_cyclic(|weak| RuntimeShared {
            replica_id,
            is_server: config.is_server,
            loaded: Cell::new(false),
            counter: Cell::new(0),
            registry: Container::new(NodeContext::root(weak.clone())),
            batch: RefCell::new(OpBatch::new()),
            batching: Cell::new(config.batching),
            batch_timer: RefCell::new(batch_timer(config.batching)),
            send_events: EventEmitter::new(),
            load_events: EventEmitter::new(),
        });
        Self { shared }
    }

    pub fn replica_id(&self) -> &ReplicaId {
        &self.shared.replica_id
    }

    pub fn is_server(&self) -> bool {
        self.shared.is_server
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.loaded.get()
    }

    /// Adds a top-level node under `name`
    ///
    /// # Panics
    ///
    /// Panics if the runtime is already loaded, or the name is taken or
    /// contains the set member delimiter.
    /// Consider using `try_register` for non-panicking error handling.
    pub fn register<N, F>(&self, name: &str, constructor: F) -> N
    where
        N: Node + Clone + 'static,
        F: FnOnce(NodeContext) -> N,
    {
        self.try_register(name, constructor)
            .expect("Runtime::register failed")
    }

    pub fn try_register<N, F>(&self, name: &str, constructor: F) -> Result<N, RuntimeError>
    where
        N: Node + Clone + 'static,
        F: FnOnce(NodeContext) -> N,
    {
        if self.is_loaded() {
            return Err(RuntimeError::AlreadyLoaded);
        }
        Ok(self.shared.registry.try_add_child(name, constructor)?)
    }

    /// Restores saved state, or keeps every node's defaults for `None`
    ///
    /// # Panics
    ///
    /// Panics if the runtime is already loaded or the snapshot doesn't match
    /// the registered tree.
    /// Consider using `try_load` for non-panicking error handling.
    pub fn load(&self, saved: Option<&[u8]>) {
        self.try_load(saved).expect("Runtime::load failed")
    }

    pub fn try_load(&self, saved: Option<&[u8]>) -> Result<(), RuntimeError> {
        if self.is_loaded() {
            return Err(RuntimeError::AlreadyLoaded);
        }
        let saved = saved
            .map(decode::<SavedState>)
            .transpose()
            .map_err(RuntimeError::MalformedSnapshot)?;
        let skipped = saved.is_none();

        let (counter, snapshot) = match saved {
            Some(saved) => (saved.counter, Some(saved.tree)),
            None => (0, None),
        };
        self.shared.registry.load(snapshot)?;
        self.shared.counter.set(self.shared.counter.get().max(counter));
        self.shared.loaded.set(true);
        info!(
            "Replica {} loaded ({})",
            self.shared.replica_id,
            if skipped { "fresh" } else { "from snapshot" }
        );

        self.shared.load_events.emit(&LoadEvent { skipped });
        Ok(())
    }

    /// Applies a message produced by some replica's `SendEvent`
    ///
    /// # Panics
    ///
    /// Panics if the runtime isn't loaded or the envelope is malformed.
    /// Consider using `try_receive` for non-panicking error handling.
    pub fn receive(&self, message: &[u8]) -> ReceiveSummary {
        self.try_receive(message).expect("Runtime::receive failed")
    }

    /// Decodes the envelope and routes each op in order. An op that fails
    /// to decode or route is logged and counted as rejected; the rest of the
    /// batch is still applied.
    pub fn try_receive(&self, message: &[u8]) -> Result<ReceiveSummary, RuntimeError> {
        if !self.is_loaded() {
            return Err(RuntimeError::NotLoaded);
        }
        let message = WireMessage::from_bytes(message).map_err(RuntimeError::MalformedMessage)?;
        let batch = OpBatch::from_bytes(&message.payload).map_err(RuntimeError::MalformedMessage)?;

        let mut summary = ReceiveSummary::default();
        for op in batch.into_ops() {
            let segments = match decode_op(&op) {
                Ok(segments) => segments,
                Err(err) => {
                    warn!("Rejecting undecodable op from {}: {}", message.sender, err);
                    summary.rejected += 1;
                    continue;
                }
            };
            let meta = MessageMeta::new(message.sender.clone(), false, &self.shared.replica_id);
            let mut path = MessagePath::from_segments(segments);
            match self.shared.registry.receive(&mut path, &meta) {
                Ok(()) => summary.delivered += 1,
                Err(err) => {
                    warn!("Rejecting op from {}: {}", message.sender, err);
                    summary.rejected += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Saves the whole tree. Commits the pending batch first, so the saved
    /// state never runs ahead of what has been sent.
    ///
    /// # Panics
    ///
    /// Panics if the runtime isn't loaded.
    /// Consider using `try_save` for non-panicking error handling.
    pub fn save(&self) -> Vec<u8> {
        self.try_save().expect("Runtime::save failed")
    }

    pub fn try_save(&self) -> Result<Vec<u8>, RuntimeError> {
        if !self.is_loaded() {
            return Err(RuntimeError::NotLoaded);
        }
        self.shared.commit_batch();
        Ok(encode(&SavedState {
            counter: self.shared.counter.get(),
            tree: self.shared.registry.save(),
        }))
    }

    /// Emits the pending batch now, if there is one
    pub fn commit_batch(&self) {
        self.shared.commit_batch();
    }

    /// Commits the pending batch if the rate limit interval has elapsed.
    /// Call once per frame when using [`BatchingStrategy::RateLimited`].
    pub fn update(&self) {
        let ringing = self
            .shared
            .batch_timer
            .borrow()
            .as_ref()
            .is_some_and(|timer| timer.ringing());
        if ringing && !self.shared.batch.borrow().is_empty() {
            self.shared.commit_batch();
        }
    }

    /// Switches strategy. Ops pending under the old strategy are committed.
    pub fn set_batching_strategy(&self, batching: BatchingStrategy) {
        self.shared.commit_batch();
        self.shared.batching.set(batching);
        *self.shared.batch_timer.borrow_mut() = batch_timer(batching);
    }

    pub fn batching_strategy(&self) -> BatchingStrategy {
        self.shared.batching.get()
    }

    /// Number of ops waiting to be committed
    pub fn pending_ops(&self) -> usize {
        self.shared.batch.borrow().len()
    }

    /// Takes the next value of the per-replica id counter
    pub fn next_counter(&self) -> u64 {
        self.shared.next_counter()
    }

    pub fn on_send(&self, listener: impl FnMut(&SendEvent) + 'static) -> ListenerKey {
        self.shared.send_events.on(listener)
    }

    pub fn off_send(&self, key: ListenerKey) -> bool {
        self.shared.send_events.off(key)
    }

    pub fn on_load(&self, listener: impl FnMut(&LoadEvent) + 'static) -> ListenerKey {
        self.shared.load_events.on(listener)
    }

    pub fn off_load(&self, key: ListenerKey) -> bool {
        self.shared.load_events.off(key)
    }

    /// Names of the registered top-level nodes
    pub fn registered_names(&self) -> Vec<String> {
        self.shared.registry.child_names()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl RuntimeShared {
    pub(crate) fn replica_id(&self) -> &ReplicaId {
        &self.replica_id
    }

    pub(crate) fn is_server(&self) -> bool {
        self.is_server
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.loaded.get()
    }

    pub(crate) fn next_counter(&self) -> u64 {
        let counter = self.counter.get();
        self.counter.set(counter.saturating_add(1));
        counter
    }

    /// Moves the counter past one another add has already used. Every
    /// replica hears every add, so the counter saved by any of them is past
    /// everything it has seen.
    pub(crate) fn observe_counter(&self, used: u64) {
        let next = used.saturating_add(1);
        if next > self.counter.get() {
            self.counter.set(next);
        }
    }

    /// Queues an op for the node at `address` and delivers its local echo.
    /// The op is queued first, so ops sent by listeners of the echo follow it
    /// in the batch.
    pub(crate) fn send(&self, address: &Address, payload: Vec<u8>) -> Result<(), RuntimeError> {
        if !self.is_loaded() {
            return Err(RuntimeError::NotLoaded);
        }
        let mut path = MessagePath::new(address, payload);
        self.batch.borrow_mut().push(path.clone().into_segments());

        let meta = MessageMeta::new(self.replica_id.clone(), true, &self.replica_id);
        if let Err(err) = self.registry.receive(&mut path, &meta) {
            warn!("Local echo for {} was rejected: {}", address, err);
        }

        if self.batching.get() == BatchingStrategy::Immediate {
            self.commit_batch();
        }
        Ok(())
    }

    fn commit_batch(&self) {
        let batch = std::mem::take(&mut *self.batch.borrow_mut());
        if let Some(timer) = self.batch_timer.borrow_mut().as_mut() {
            timer.reset();
        }
        if batch.is_empty() {
            return;
        }

        debug!("Committing batch of {} op(s)", batch.len());
        let message = WireMessage {
            sender: self.replica_id.clone(),
            payload: batch.to_bytes(),
        };
        self.send_events.emit(&SendEvent {
            message: message.to_bytes(),
        });
    }
}

fn batch_timer(batching: BatchingStrategy) -> Option<Timer> {
    match batching {
        BatchingStrategy::Immediate => None,
        BatchingStrategy::RateLimited(interval) => Some(Timer::new(interval)),
    }
}
