//! Transport adapter: the only place bytes meet sockets.
//!
//! The engines depend on the two traits below and never on a socket type.
//! `udp` implements them over `std::net::UdpSocket`; `loopback` implements
//! them in memory for tests and single-process setups.

mod error;
pub mod loopback;
mod udp;

use std::net::{Ipv4Addr, SocketAddr};

pub use error::TransportError;
pub use udp::{UdpReceiver, UdpSender};

/// UDP port used for all sACN traffic.
pub const SACN_PORT: u16 = 5568;

/// Multicast group carrying `universe`: `239.255.<hi>.<lo>`.
///
/// # Examples
/// ```
/// use std::net::Ipv4Addr;
///
/// use streamdmx_core::transport::multicast_group;
///
/// assert_eq!(multicast_group(1), Ipv4Addr::new(239, 255, 0, 1));
/// assert_eq!(multicast_group(0x1234), Ipv4Addr::new(239, 255, 0x12, 0x34));
/// ```
pub fn multicast_group(universe: u16) -> Ipv4Addr {
    Ipv4Addr::from(0xefff_0000 | u32::from(universe))
}

/// Receiving half of the transport.
///
/// Implementations must not block: the receive loop polls
/// `packet_available` and only then calls `receive`.
pub trait ReceiverTransport: Send + Sync {
    /// Subscribes to the multicast group of `universe`.
    fn join_universe(&self, universe: u16) -> Result<(), TransportError>;

    fn packet_available(&self) -> bool;

    /// Copies one datagram into `buf` and returns its length.
    fn receive(&self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// Sending half of the transport.
pub trait SenderTransport: Send + Sync {
    fn send_multicast(&self, bytes: &[u8], universe: u16) -> Result<(), TransportError>;

    fn send_unicast(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError>;
}

impl<T: ReceiverTransport + ?Sized> ReceiverTransport for std::sync::Arc<T> {
    fn join_universe(&self, universe: u16) -> Result<(), TransportError> {
        (**self).join_universe(universe)
    }

    fn packet_available(&self) -> bool {
        (**self).packet_available()
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).receive(buf)
    }
}

impl<T: SenderTransport + ?Sized> SenderTransport for std::sync::Arc<T> {
    fn send_multicast(&self, bytes: &[u8], universe: u16) -> Result<(), TransportError> {
        (**self).send_multicast(bytes, universe)
    }

    fn send_unicast(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        (**self).send_unicast(bytes, target)
    }
}

#[cfg(test)]
mod tests {
    use super::multicast_group;
    use std::net::Ipv4Addr;

    #[test]
    fn multicast_group_uses_universe_bytes() {
        assert_eq!(multicast_group(63999), Ipv4Addr::new(239, 255, 249, 255));
        assert_eq!(multicast_group(256), Ipv4Addr::new(239, 255, 1, 0));
    }
}
