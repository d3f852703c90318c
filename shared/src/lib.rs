//! # Canopy Shared
//! The replicated object-tree runtime shared between canopy-server &
//! canopy-client: registers, maps and mutable sets whose changes travel as
//! serialized ops through a relay.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use canopy_serde::{
    decode, encode, BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr,
    SerdeIntegerConversion, SignedInteger, SignedVariableInteger, UnsignedInteger,
    UnsignedVariableInteger,
};

mod backends;
mod echo_policy;
mod events;
mod message_meta;
mod primitives;
mod replica_id;
mod runtime;
mod session_message;
mod tree;
mod wire;

pub use backends::Timer;
pub use echo_policy::EchoPolicy;
pub use events::{EventEmitter, ListenerKey};
pub use message_meta::{EchoOrigin, MessageMeta};
pub use primitives::{
    map::{Map, MapEvent},
    mut_set::{member_name, MutSet, SetEvent, SetOp},
    register::{Register, RegisterEvent},
    serializer::{DefaultSerializer, OptionalSerializer, Serializer},
};
pub use replica_id::ReplicaId;
pub use runtime::{
    batching::BatchingStrategy,
    error::RuntimeError,
    runtime::{LoadEvent, ReceiveSummary, Runtime, SendEvent},
    runtime_config::RuntimeConfig,
};
pub use session_message::SessionMessage;
pub use tree::{
    address::{Address, MessagePath, Segment},
    container::{Container, NAME_DELIMITER},
    error::{ContainerError, ReceiveError, SnapshotError},
    node::{Node, NodeContext},
    snapshot::{ChildSnapshot, SavedState, Snapshot},
};
pub use wire::{decode_op, OpBatch, WireMessage};
