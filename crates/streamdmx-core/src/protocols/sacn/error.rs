use thiserror::Error;

/// Errors returned by sACN packet construction, access and validation.
///
/// # Examples
/// ```
/// use streamdmx_core::{PacketError, SacnPacket};
///
/// let err = SacnPacket::new(64000).unwrap_err();
/// assert!(matches!(err, PacketError::InvalidUniverse { universe: 64000 }));
/// assert!(err.to_string().contains("invalid universe"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("payload too long: at most {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("invalid universe {universe} (must be 1..=63999)")]
    InvalidUniverse { universe: u16 },
    #[error("source name of {length} bytes is too long (at most 62)")]
    SourceNameTooLong { length: usize },
    #[error("invalid priority {priority} (must be 0..=200)")]
    InvalidPriority { priority: u8 },
    #[error("invalid slot count {slots} (must be 1..=512)")]
    InvalidSlotCount { slots: usize },
    #[error("channel {channel} outside the {slots} slots of this packet")]
    ChannelOutOfRange { channel: usize, slots: usize },
    #[error("invalid preamble size: {value:#06x}")]
    InvalidPreambleSize { value: u16 },
    #[error("invalid postamble size: {value:#06x}")]
    InvalidPostambleSize { value: u16 },
    #[error("invalid ACN PID")]
    InvalidAcnPid,
    #[error("invalid flags {flags:#x} in {layer} layer")]
    InvalidFlags { layer: &'static str, flags: u16 },
    #[error("{layer} layer length {actual} does not match expected {expected}")]
    LengthMismatch {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid root vector: {value:#010x}")]
    InvalidRootVector { value: u32 },
    #[error("invalid framing vector: {value:#010x}")]
    InvalidFramingVector { value: u32 },
    #[error("invalid DMP vector: {value:#04x}")]
    InvalidDmpVector { value: u8 },
    #[error("invalid DMP address/data type: {value:#04x}")]
    InvalidDmpType { value: u8 },
    #[error("invalid DMP first property address: {value:#06x}")]
    InvalidFirstAddress { value: u16 },
    #[error("invalid DMP address increment: {value:#06x}")]
    InvalidAddressIncrement { value: u16 },
    #[error("invalid property value count: {count}")]
    InvalidPropertyValueCount { count: u16 },
}
