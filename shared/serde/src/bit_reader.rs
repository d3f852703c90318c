use crate::error::SerdeErr;

/// Reads bits out of a byte slice in the order [`crate::BitWriter`] packs them
pub struct BitReader<'b> {
    buffer: &'b [u8],
    bit_index: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bit_index: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let byte_index = self.bit_index / 8;
        let Some(byte) = self.buffer.get(byte_index) else {
            return Err(SerdeErr::UnexpectedEnd {
                bit_index: self.bit_index,
            });
        };
        let bit = (byte >> (self.bit_index % 8)) & 1 != 0;
        self.bit_index += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        if self.bit_index % 8 == 0 {
            let Some(byte) = self.buffer.get(self.bit_index / 8) else {
                return Err(SerdeErr::UnexpectedEnd {
                    bit_index: self.bit_index,
                });
            };
            self.bit_index += 8;
            return Ok(*byte);
        }

        let mut output: u8 = 0;
        for shift in 0..8 {
            if self.read_bit()? {
                output |= 1 << shift;
            }
        }
        Ok(output)
    }

    pub fn bits_remaining(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.bit_index)
    }

    /// Whole bytes not yet touched by the reader. Padding bits of a
    /// partially consumed final byte don't count.
    pub fn bytes_remaining(&self) -> usize {
        self.bits_remaining() / 8
    }
}
