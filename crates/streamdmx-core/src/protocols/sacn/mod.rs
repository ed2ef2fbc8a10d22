//! sACN (E1.31) data packet codec.
//!
//! Packets are built and validated in place in a fixed-size buffer. Every
//! fixed constant (preamble, ACN PID, the three vectors, DMP type, first
//! address and increment) and every layer length is checked by
//! `SacnPacket::validate`.
//!
//! Wire-format details are defined in `layout`; bounds-checked reads live in
//! `reader` and infallible stamping in `writer`.
//!
pub mod error;
pub mod layout;
pub mod packet;
pub mod reader;
pub mod writer;

pub use error::PacketError;
pub use packet::SacnPacket;
