use std::ops::Range;

/// Big-endian writes into a packet buffer at fixed layout offsets.
///
/// Offsets come from `layout` and always lie inside the fixed-size scratch
/// buffer, so writes are infallible.
pub struct SacnWriter<'a> {
    buf: &'a mut [u8],
}

impl<'a> SacnWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) {
        self.buf[offset] = value;
    }

    pub fn write_u16_be(&mut self, range: Range<usize>, value: u16) {
        self.buf[range].copy_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32_be(&mut self, range: Range<usize>, value: u32) {
        self.buf[range].copy_from_slice(&value.to_be_bytes());
    }

    pub fn write_slice(&mut self, range: Range<usize>, bytes: &[u8]) {
        self.buf[range].copy_from_slice(bytes);
    }

    pub fn write_flags_length(&mut self, range: Range<usize>, flags: u16, length: usize) {
        let length = length as u16 & super::layout::LENGTH_MASK;
        self.write_u16_be(range, (flags << 12) | length);
    }

    /// Writes `text` into a fixed-width field, NUL padding the remainder.
    pub fn write_padded(&mut self, range: Range<usize>, text: &[u8]) {
        let field = &mut self.buf[range];
        field.fill(0);
        field[..text.len()].copy_from_slice(text);
    }
}
