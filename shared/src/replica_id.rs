use std::fmt;

use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr};

const RANDOM_ID_LENGTH: usize = 10;

/// Identity of one participant in the synchronized tree. Used for echo
/// detection and as the suffix of every set member name it creates.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplicaId(String);

impl ReplicaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random alphanumeric identity
    pub fn random() -> Self {
        let id: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(RANDOM_ID_LENGTH)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ReplicaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Serde for ReplicaId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(String::de(reader)?))
    }
}
