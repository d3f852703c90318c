use canopy_serde::{decode, encode, BitReader, BitWrite, Serde, SerdeErr};

use crate::{replica_id::ReplicaId, tree::address::Segment};

/// The envelope every replica sends: who sent it, and an encoded [`OpBatch`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireMessage {
    pub sender: ReplicaId,
    pub payload: Vec<u8>,
}

impl WireMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        decode(bytes)
    }
}

impl Serde for WireMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.sender.ser(writer);
        self.payload.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            sender: ReplicaId::de(reader)?,
            payload: Vec::<u8>::de(reader)?,
        })
    }
}

/// Ops committed together. Each op is framed separately, so one op that
/// fails to decode doesn't take the rest of the batch down with it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpBatch {
    ops: Vec<Vec<u8>>,
}

impl OpBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn push(&mut self, segments: Vec<Segment>) {
        self.ops.push(encode(&segments));
    }

    /// Appends an op that is already framed
    pub fn push_raw(&mut self, op: Vec<u8>) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.ops)
    }

    /// Decodes the framing only. Individual ops are decoded by [`decode_op`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        Ok(Self { ops: decode(bytes)? })
    }

    pub fn into_ops(self) -> Vec<Vec<u8>> {
        self.ops
    }
}

/// Decodes one op into its path, root first, ending at the payload
pub fn decode_op(op: &[u8]) -> Result<Vec<Segment>, SerdeErr> {
    decode(op)
}
