mod collections;
mod scalars;
mod string;
mod tuples;

use crate::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

pub(crate) fn write_length(writer: &mut dyn BitWrite, length: usize) {
    UnsignedVariableInteger::<7>::new(length as u64).ser(writer);
}

/// Reads a length prefix, rejecting lengths that could not fit in the rest of
/// the stream given the minimum encoded size of one element
pub(crate) fn read_length(reader: &mut BitReader, min_element_bits: usize) -> Result<usize, SerdeErr> {
    let length = UnsignedVariableInteger::<7>::de(reader)?;
    let Some(length) = length.try_to::<u64>() else {
        return Err(SerdeErr::IntegerOverflow {
            type_name: "length prefix",
        });
    };
    let bits_remaining = reader.bits_remaining();
    let too_long = usize::try_from(length)
        .ok()
        .and_then(|l| l.checked_mul(min_element_bits))
        .map_or(true, |needed| needed > bits_remaining);
    if too_long {
        return Err(SerdeErr::LengthOverflow {
            length,
            bits_remaining,
        });
    }
    Ok(length as usize)
}
