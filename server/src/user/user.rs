use canopy_shared::ReplicaId;

// UserKey
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct UserKey(u64);

impl UserKey {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

// User
pub(crate) struct User {
    replica_id: Option<ReplicaId>,
}

impl User {
    pub fn new() -> Self {
        Self { replica_id: None }
    }

    pub fn replica_id(&self) -> Option<&ReplicaId> {
        self.replica_id.as_ref()
    }

    pub fn set_replica_id(&mut self, replica_id: ReplicaId) {
        self.replica_id = Some(replica_id);
    }

    pub fn take_replica_id(self) -> Option<ReplicaId> {
        self.replica_id
    }
}
