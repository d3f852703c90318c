use log::trace;

use canopy_client::{Client, ClientConfig, ClientEvents};
use canopy_server::{Server, ServerConfig, ServerEvents, UserKey};

/// A relay and its clients wired together in memory. Messages only move when
/// [`LocalRelay::pump`] is called, so tests control exactly when each side
/// sees what the other sent.
pub struct LocalRelay {
    server: Server,
    clients: Vec<Option<(UserKey, Client)>>,
}

impl LocalRelay {
    /// Creates the relay. Register the tree on [`LocalRelay::server_mut`]'s
    /// runtime, then call [`LocalRelay::load`].
    pub fn new(config: ServerConfig) -> Self {
        Self {
            server: Server::new(config),
            clients: Vec::new(),
        }
    }

    pub fn load(&mut self, saved: Option<&[u8]>) {
        self.server.load(saved);
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut Server {
        &mut self.server
    }

    /// Adds a client and opens its connection. `setup` runs before anything
    /// is exchanged, which is where the client registers its tree. Returns
    /// the client's index and whatever `setup` returned.
    pub fn connect_client<T>(
        &mut self,
        config: ClientConfig,
        setup: impl FnOnce(&Client) -> T,
    ) -> (usize, T) {
        let mut client = Client::new(config);
        let output = setup(&client);
        let user_key = self.server.connect_user();
        client.connect();
        self.clients.push(Some((user_key, client)));
        (self.clients.len() - 1, output)
    }

    /// Closes a client's connection on both ends. Anything still queued
    /// between the two is lost.
    pub fn disconnect_client(&mut self, index: usize) {
        if let Some((user_key, mut client)) = self.clients.get_mut(index).and_then(Option::take) {
            client.disconnect();
            self.server.disconnect_user(&user_key);
        }
    }

    /// # Panics
    ///
    /// Panics if the client was disconnected
    pub fn client(&self, index: usize) -> &Client {
        &self.entry(index).1
    }

    pub fn user_key(&self, index: usize) -> UserKey {
        self.entry(index).0
    }

    pub fn is_connected(&self, index: usize) -> bool {
        matches!(self.clients.get(index), Some(Some(_)))
    }

    /// Sends raw bytes to the relay as if `index` had sent them
    pub fn inject_to_server(&mut self, index: usize, bytes: &[u8]) {
        let user_key = self.user_key(index);
        self.server.receive_message(&user_key, bytes);
    }

    /// Delivers raw bytes to a client as if the relay had sent them
    pub fn inject_to_client(&mut self, index: usize, bytes: &[u8]) {
        self.entry_mut(index).1.receive_message(bytes);
    }

    /// Moves messages in both directions until nothing is left in flight.
    /// Clients are drained in index order, which fixes the relay's order.
    pub fn pump(&mut self) {
        loop {
            let mut moved = 0;

            for entry in self.clients.iter_mut().flatten() {
                let (user_key, client) = entry;
                for bytes in client.take_outgoing() {
                    trace!("client {:?} -> relay: {} bytes", user_key, bytes.len());
                    self.server.receive_message(user_key, &bytes);
                    moved += 1;
                }
            }

            for (user_key, bytes) in self.server.take_outgoing() {
                let Some((_, client)) = self
                    .clients
                    .iter_mut()
                    .flatten()
                    .find(|(key, _)| *key == user_key)
                else {
                    continue;
                };
                trace!("relay -> client {:?}: {} bytes", user_key, bytes.len());
                client.receive_message(&bytes);
                moved += 1;
            }

            if moved == 0 {
                break;
            }
        }
    }

    /// Runs every side's periodic update, then pumps. Returns the events the
    /// relay and each connected client produced.
    pub fn tick(&mut self) -> (ServerEvents, Vec<ClientEvents>) {
        let mut client_events = Vec::new();
        for (_, client) in self.clients.iter_mut().flatten() {
            client_events.push(client.receive());
        }
        let server_events = self.server.receive();
        self.pump();
        (server_events, client_events)
    }

    fn entry(&self, index: usize) -> &(UserKey, Client) {
        self.clients
            .get(index)
            .and_then(Option::as_ref)
            .expect("no connected client at this index")
    }

    fn entry_mut(&mut self, index: usize) -> &mut (UserKey, Client) {
        self.clients
            .get_mut(index)
            .and_then(Option::as_mut)
            .expect("no connected client at this index")
    }
}
