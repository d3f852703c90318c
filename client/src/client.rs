use std::{cell::RefCell, collections::VecDeque, mem, rc::Rc};

use log::{debug, info, warn};

use canopy_shared::{LoadEvent, Runtime, SessionMessage, Timer};

use crate::{client_config::ClientConfig, error::ClientError, events::ClientEvents};

/// One replica's session with the relay. Forwards every batch the replica
/// commits, and applies the snapshot and messages the relay sends back.
///
/// Transport-agnostic: call [`Client::connect`] once the transport is open,
/// feed it bytes with [`Client::receive_message`], and ship whatever
/// [`Client::take_outgoing`] returns.
pub struct Client {
    runtime: Runtime,
    outgoing: Rc<RefCell<VecDeque<Vec<u8>>>>,
    ping_timer: Timer,
    connected: bool,
    incoming_events: ClientEvents,
}

impl Client {
    /// Create a new Client
    pub fn new(config: ClientConfig) -> Self {
        let runtime = Runtime::new(config.runtime);

        let outgoing = Rc::new(RefCell::new(VecDeque::new()));
        let sink = outgoing.clone();
        runtime.on_send(move |event| {
            let message = SessionMessage::Msg {
                message: event.message.clone(),
            };
            sink.borrow_mut().push_back(message.to_bytes());
        });

        Self {
            runtime,
            outgoing,
            ping_timer: Timer::new(config.ping_interval),
            connected: false,
            incoming_events: ClientEvents::new(),
        }
    }

    /// The Client's replica. Register the shared tree on it before
    /// connecting; the relay's snapshot loads it.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Announces this replica to the relay. Call when the transport opens.
    pub fn connect(&mut self) {
        self.connected = true;
        self.ping_timer.reset();
        let announce = SessionMessage::Id {
            replica_id: self.runtime.replica_id().clone(),
        };
        self.outgoing.borrow_mut().push_back(announce.to_bytes());
        info!("Replica {} connecting", self.runtime.replica_id());
    }

    /// Call when the transport closes. Queued messages are kept, in case the
    /// transport buffers them for a reconnect.
    pub fn disconnect(&mut self) {
        self.connected = false;
        info!("Replica {} disconnected", self.runtime.replica_id());
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns whether the relay's snapshot has been applied
    pub fn is_loaded(&self) -> bool {
        self.runtime.is_loaded()
    }

    /// Must be called regularly. Commits the rate-limited batch when it is
    /// due, sends keepalive pings and returns every event since the last call.
    pub fn receive(&mut self) -> ClientEvents {
        self.runtime.update();
        if self.connected && self.ping_timer.ringing() {
            self.ping_timer.reset();
            self.outgoing
                .borrow_mut()
                .push_back(SessionMessage::Ping.to_bytes());
        }
        mem::replace(&mut self.incoming_events, ClientEvents::new())
    }

    /// Handles bytes the relay sent. Failures are logged and reported as
    /// [`crate::ErrorEvent`]s.
    pub fn receive_message(&mut self, bytes: &[u8]) {
        if let Err(error) = self.try_receive_message(bytes) {
            warn!("Dropping message from the relay: {}", error);
            self.incoming_events.push_error(error);
        }
    }

    pub fn try_receive_message(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        let message = SessionMessage::from_bytes(bytes).map_err(ClientError::MalformedMessage)?;
        match message {
            SessionMessage::Load { snapshot } => {
                if self.runtime.is_loaded() {
                    // a reconnect; ops missed while disconnected are not
                    // recovered
                    warn!("Ignoring snapshot, replica is already loaded");
                    return Ok(());
                }
                self.runtime.try_load(Some(&snapshot))?;
                self.incoming_events
                    .push_load(LoadEvent { skipped: false });
                Ok(())
            }
            SessionMessage::Msg { message } => {
                let summary = self.runtime.try_receive(&message)?;
                debug!(
                    "Applied relayed message: {} delivered, {} rejected",
                    summary.delivered, summary.rejected
                );
                self.incoming_events.push_message(summary);
                Ok(())
            }
            other => Err(ClientError::UnexpectedMessage { kind: other.kind() }),
        }
    }

    /// Queued messages for the relay, in the order they must be delivered
    pub fn take_outgoing(&mut self) -> Vec<Vec<u8>> {
        self.outgoing.borrow_mut().drain(..).collect()
    }
}
