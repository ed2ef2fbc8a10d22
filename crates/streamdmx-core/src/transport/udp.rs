use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

use crate::protocols::sacn::layout;

use super::{ReceiverTransport, SACN_PORT, SenderTransport, TransportError, multicast_group};

/// Non-blocking UDP socket bound to the sACN port.
#[derive(Debug)]
pub struct UdpReceiver {
    socket: UdpSocket,
    interface: Ipv4Addr,
}

impl UdpReceiver {
    /// Binds port 5568 on all addresses; `interface` selects the NIC used for
    /// multicast group membership.
    pub fn bind(interface: Option<Ipv4Addr>) -> Result<Self, TransportError> {
        Self::bind_port(interface, SACN_PORT)
    }

    pub fn bind_port(interface: Option<Ipv4Addr>, port: u16) -> Result<Self, TransportError> {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::Configure)?;
        Ok(Self {
            socket,
            interface: interface.unwrap_or(Ipv4Addr::UNSPECIFIED),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::Configure)
    }
}

impl ReceiverTransport for UdpReceiver {
    fn join_universe(&self, universe: u16) -> Result<(), TransportError> {
        self.socket
            .join_multicast_v4(&multicast_group(universe), &self.interface)
            .map_err(|source| TransportError::JoinGroup { universe, source })
    }

    fn packet_available(&self) -> bool {
        let mut peek = [0u8; layout::MAX_LEN];
        match self.socket.peek_from(&mut peek) {
            Ok(_) => true,
            // Anything but WouldBlock is pending and surfaces from `receive`.
            Err(err) => err.kind() != ErrorKind::WouldBlock,
        }
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let (len, _src) = self
            .socket
            .recv_from(buf)
            .map_err(TransportError::Receive)?;
        Ok(len)
    }
}

/// UDP socket for multicast and unicast sACN output.
#[derive(Debug)]
pub struct UdpSender {
    socket: UdpSocket,
}

impl UdpSender {
    /// Opens an ephemeral-port socket, bound to `interface` when given so
    /// multicast leaves through that NIC.
    pub fn open(interface: Option<Ipv4Addr>) -> Result<Self, TransportError> {
        let local = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let addr = SocketAddr::V4(SocketAddrV4::new(local, 0));
        let socket = UdpSocket::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::Configure)?;
        socket
            .set_multicast_loop_v4(true)
            .map_err(TransportError::Configure)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::Configure)
    }

    /// Sends to `host` on `port` (5568 when `None`), resolving names.
    pub fn send_unicast_host(
        &self,
        bytes: &[u8],
        host: &str,
        port: Option<u16>,
    ) -> Result<(), TransportError> {
        let port = port.unwrap_or(SACN_PORT);
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|err| TransportError::Resolve {
                host: host.to_string(),
                reason: err.to_string(),
            })?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| TransportError::Resolve {
                host: host.to_string(),
                reason: "no IPv4 address".to_string(),
            })?;
        self.send_unicast(bytes, target)
    }

    fn send_to(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        self.socket
            .send_to(bytes, target)
            .map(|_| ())
            .map_err(|source| TransportError::Send { target, source })
    }
}

impl SenderTransport for UdpSender {
    fn send_multicast(&self, bytes: &[u8], universe: u16) -> Result<(), TransportError> {
        let target = SocketAddr::V4(SocketAddrV4::new(multicast_group(universe), SACN_PORT));
        self.send_to(bytes, target)
    }

    fn send_unicast(&self, bytes: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        self.send_to(bytes, target)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, UdpSocket};
    use std::time::Duration;

    use super::{UdpReceiver, UdpSender};
    use crate::protocols::sacn::SacnPacket;
    use crate::transport::{ReceiverTransport, SenderTransport};

    #[test]
    fn unicast_send_reaches_local_socket() {
        let listener = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = listener.local_addr().unwrap();

        let sender = UdpSender::open(None).unwrap();
        let packet = SacnPacket::new(9).unwrap();
        sender.send_unicast(packet.raw_bytes(), target).unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], packet.raw_bytes());
    }

    #[test]
    fn unicast_by_host_name_resolves_localhost() {
        let listener = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = listener.local_addr().unwrap().port();

        let sender = UdpSender::open(None).unwrap();
        sender
            .send_unicast_host(b"ping", "localhost", Some(port))
            .unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping");
    }

    #[test]
    fn receiver_on_ephemeral_port_reads_unicast() {
        let receiver = UdpReceiver::bind_port(Some(Ipv4Addr::LOCALHOST), 0).unwrap();
        let port = receiver.local_addr().unwrap().port();
        assert_ne!(port, 0);
        assert!(!receiver.packet_available());

        let sender = UdpSender::open(None).unwrap();
        let packet = SacnPacket::new(2).unwrap();
        sender
            .send_unicast(packet.raw_bytes(), (Ipv4Addr::LOCALHOST, port).into())
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !receiver.packet_available() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let mut buf = [0u8; 1024];
        let len = receiver.receive(&mut buf).unwrap();
        assert_eq!(&buf[..len], packet.raw_bytes());
    }
}
