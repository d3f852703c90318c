//! # Canopy Serde
//! Bit-level binary serialization for ops, wire envelopes and snapshots.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_reader;
mod bit_writer;
mod error;
mod impls;
mod integer;
mod serde;

pub use bit_reader::BitReader;
pub use bit_writer::{BitCounter, BitWrite, BitWriter};
pub use error::SerdeErr;
pub use integer::{
    SerdeInteger, SerdeIntegerConversion, SignedInteger, SignedVariableInteger, UnsignedInteger,
    UnsignedVariableInteger,
};
pub use serde::{ConstBitLength, Serde};

/// Encodes a value into a standalone byte buffer
pub fn encode<T: Serde>(value: &T) -> Vec<u8> {
    let mut writer = BitWriter::new();
    value.ser(&mut writer);
    writer.to_bytes()
}

/// Decodes a value that was produced by [`encode`]
///
/// Fails if the buffer is truncated, malformed, or carries whole bytes
/// beyond the encoded value.
pub fn decode<T: Serde>(bytes: &[u8]) -> Result<T, SerdeErr> {
    let mut reader = BitReader::new(bytes);
    let value = T::de(&mut reader)?;
    let remaining = reader.bytes_remaining();
    if remaining > 0 {
        return Err(SerdeErr::TrailingBytes { remaining });
    }
    Ok(value)
}
