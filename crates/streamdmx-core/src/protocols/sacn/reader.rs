use std::ops::Range;

use super::error::PacketError;
use super::layout;

/// Bounds-checked big-endian reads over a received or built packet.
pub struct SacnReader<'a> {
    payload: &'a [u8],
}

impl<'a> SacnReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), PacketError> {
        if self.payload.len() < needed {
            return Err(PacketError::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, PacketError> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(PacketError::TooShort {
                needed: offset + 1,
                actual: self.payload.len(),
            })
    }

    pub fn read_u16_be(&self, range: Range<usize>) -> Result<u16, PacketError> {
        let bytes: [u8; 2] = self.read_array(range)?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u32_be(&self, range: Range<usize>) -> Result<u32, PacketError> {
        let bytes: [u8; 4] = self.read_array(range)?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], PacketError> {
        self.payload.get(range.clone()).ok_or(PacketError::TooShort {
            needed: range.end,
            actual: self.payload.len(),
        })
    }

    pub fn read_array<const N: usize>(&self, range: Range<usize>) -> Result<[u8; N], PacketError> {
        let bytes = self.read_slice(range)?;
        bytes.try_into().map_err(|_| PacketError::TooShort {
            needed: N,
            actual: bytes.len(),
        })
    }

    /// Splits a flags+length field into its 4-bit flags and 12-bit length.
    pub fn read_flags_length(&self, range: Range<usize>) -> Result<(u16, usize), PacketError> {
        let raw = self.read_u16_be(range)?;
        Ok((raw >> 12, usize::from(raw & layout::LENGTH_MASK)))
    }

    /// Reads a NUL-terminated UTF-8 field, replacing invalid sequences.
    pub fn read_nul_terminated(&self, range: Range<usize>) -> Result<String, PacketError> {
        let bytes = self.read_slice(range)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::SacnReader;
    use crate::protocols::sacn::error::PacketError;

    #[test]
    fn reads_big_endian_regardless_of_host_order() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        let reader = SacnReader::new(&bytes);
        assert_eq!(reader.read_u16_be(0..2).unwrap(), 0x1234);
        assert_eq!(reader.read_u32_be(0..4).unwrap(), 0x1234_5678);
    }

    #[test]
    fn out_of_bounds_reads_report_too_short() {
        let bytes = [0u8; 3];
        let reader = SacnReader::new(&bytes);
        assert_eq!(
            reader.read_u32_be(0..4),
            Err(PacketError::TooShort {
                needed: 4,
                actual: 3
            })
        );
        assert!(reader.read_u8(3).is_err());
    }

    #[test]
    fn flags_length_splits_nibble() {
        let bytes = [0x72, 0x6e];
        let reader = SacnReader::new(&bytes);
        assert_eq!(reader.read_flags_length(0..2).unwrap(), (0x7, 0x26e));
    }

    #[test]
    fn nul_terminated_stops_at_first_nul() {
        let bytes = *b"Desk\0garbage";
        let reader = SacnReader::new(&bytes);
        assert_eq!(reader.read_nul_terminated(0..12).unwrap(), "Desk");
    }
}
