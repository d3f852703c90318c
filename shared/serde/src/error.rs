use thiserror::Error;

/// Errors that can occur while decoding a value from a bit stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The stream ended before the value was complete
    #[error("Unexpected end of stream while reading bit {bit_index}")]
    UnexpectedEnd { bit_index: usize },

    /// A discriminant did not match any known variant
    #[error("Invalid tag {tag} while decoding {type_name}")]
    InvalidTag { type_name: &'static str, tag: u64 },

    /// String bytes were not valid UTF-8
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    /// A u32 did not encode a valid Unicode scalar value
    #[error("Value {value:#x} is not a valid char")]
    InvalidChar { value: u32 },

    /// A length prefix claims more elements than the stream could possibly hold
    #[error("Length prefix {length} exceeds the {bits_remaining} bits remaining in the stream")]
    LengthOverflow { length: u64, bits_remaining: usize },

    /// A variable-length integer ran past 128 bits or out of its target range
    #[error("Integer out of range while decoding {type_name}")]
    IntegerOverflow { type_name: &'static str },

    /// Whole bytes remained after the top-level value was decoded
    #[error("{remaining} trailing byte(s) after decoded value")]
    TrailingBytes { remaining: usize },
}
