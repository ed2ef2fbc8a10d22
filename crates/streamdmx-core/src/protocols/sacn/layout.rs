//! Byte offsets of an E1.31 data packet (source of truth for the codec).

use std::ops::Range;

pub const PREAMBLE_SIZE_RANGE: Range<usize> = 0..2;
pub const POSTAMBLE_SIZE_RANGE: Range<usize> = 2..4;
pub const ACN_PID_RANGE: Range<usize> = 4..16;

pub const ROOT_FLAGS_LENGTH_RANGE: Range<usize> = 16..18;
pub const ROOT_VECTOR_RANGE: Range<usize> = 18..22;
pub const CID_RANGE: Range<usize> = 22..38;

pub const FRAMING_FLAGS_LENGTH_RANGE: Range<usize> = 38..40;
pub const FRAMING_VECTOR_RANGE: Range<usize> = 40..44;
pub const SOURCE_NAME_RANGE: Range<usize> = 44..108;
pub const PRIORITY_OFFSET: usize = 108;
pub const RESERVED_RANGE: Range<usize> = 109..111;
pub const SEQUENCE_OFFSET: usize = 111;
pub const OPTIONS_OFFSET: usize = 112;
pub const UNIVERSE_RANGE: Range<usize> = 113..115;

pub const DMP_FLAGS_LENGTH_RANGE: Range<usize> = 115..117;
pub const DMP_VECTOR_OFFSET: usize = 117;
pub const DMP_TYPE_OFFSET: usize = 118;
pub const DMP_FIRST_ADDRESS_RANGE: Range<usize> = 119..121;
pub const DMP_ADDRESS_INCREMENT_RANGE: Range<usize> = 121..123;
pub const DMP_PROPERTY_VALUE_COUNT_RANGE: Range<usize> = 123..125;
pub const START_CODE_OFFSET: usize = 125;
pub const DMX_DATA_OFFSET: usize = 126;
pub const DMX_MAX_SLOTS: usize = 512;

/// Bytes preceding each layer's flags+length field; a layer's length is
/// the packet length minus this.
pub const ROOT_LAYER_START: usize = ROOT_FLAGS_LENGTH_RANGE.start;
pub const FRAMING_LAYER_START: usize = FRAMING_FLAGS_LENGTH_RANGE.start;
pub const DMP_LAYER_START: usize = DMP_FLAGS_LENGTH_RANGE.start;

pub const ACN_PID: &[u8; 12] = b"ASC-E1.17\0\0\0";
pub const PREAMBLE_SIZE: u16 = 0x0010;
pub const POSTAMBLE_SIZE: u16 = 0x0000;
pub const ROOT_VECTOR_DATA: u32 = 0x0000_0004;
pub const FRAMING_VECTOR_DMX: u32 = 0x0000_0002;
pub const DMP_VECTOR_SET_PROPERTY: u8 = 0x02;
pub const DMP_ADDRESS_DATA_TYPE: u8 = 0xa1;
pub const DMP_FIRST_ADDRESS: u16 = 0x0000;
pub const DMP_ADDRESS_INCREMENT: u16 = 0x0001;

/// High nibble of every flags+length field.
pub const FLAGS: u16 = 0x7;
pub const LENGTH_MASK: u16 = 0x0fff;

pub const OPTION_PREVIEW_DATA: u8 = 0x80;
pub const OPTION_STREAM_TERMINATED: u8 = 0x40;

pub const START_CODE_DMX: u8 = 0x00;
pub const DEFAULT_PRIORITY: u8 = 100;
pub const MAX_PRIORITY: u8 = 200;
/// Source names must leave room for the NUL terminator.
pub const MAX_SOURCE_NAME_LEN: usize = 63;

pub const MIN_UNIVERSE: u16 = 1;
pub const MAX_UNIVERSE: u16 = 63999;

/// Smallest packet: headers and a start code without slots.
pub const MIN_LEN: usize = DMX_DATA_OFFSET;
pub const MAX_LEN: usize = DMX_DATA_OFFSET + DMX_MAX_SLOTS;

pub const fn packet_len(slots: usize) -> usize {
    DMX_DATA_OFFSET + slots
}
