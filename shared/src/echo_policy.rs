use crate::message_meta::{EchoOrigin, MessageMeta};

/// Chooses which deliveries of a replica's own ops a primitive applies.
/// Ops from other replicas are always applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum EchoPolicy {
    /// Apply the synchronous local echo, ignore the relayed copy
    Local,
    /// Ignore the local echo, apply the relayed copy
    #[default]
    Remote,
    /// Apply both deliveries
    Both,
}

impl EchoPolicy {
    pub fn processes_local_echo(&self) -> bool {
        matches!(self, EchoPolicy::Local | EchoPolicy::Both)
    }

    pub fn processes_remote_echo(&self) -> bool {
        matches!(self, EchoPolicy::Remote | EchoPolicy::Both)
    }

    pub fn should_process(&self, meta: &MessageMeta) -> bool {
        match meta.origin() {
            EchoOrigin::LocalEcho => self.processes_local_echo(),
            EchoOrigin::RemoteEcho => self.processes_remote_echo(),
            EchoOrigin::Foreign => true,
        }
    }
}
