//! In-memory transport.
//!
//! A [`LoopbackNetwork`] is a hub: every datagram sent by a
//! [`LoopbackSender`] is queued on each [`LoopbackReceiver`] that joined the
//! destination universe (unicast datagrams reach every receiver). Nothing
//! touches the operating system, so tests can run engines end to end without
//! multicast routing.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{ReceiverTransport, SenderTransport, TransportError};

/// Datagrams queued per receiver before the oldest are dropped.
const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Endpoint {
    joined: BTreeSet<u16>,
    queue: VecDeque<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Hub {
    next_id: usize,
    endpoints: HashMap<usize, Endpoint>,
}

impl Hub {
    fn deliver(&mut self, bytes: &[u8], universe: Option<u16>) {
        for endpoint in self.endpoints.values_mut() {
            let wanted = universe.is_none_or(|u| endpoint.joined.contains(&u));
            if !wanted {
                continue;
            }
            if endpoint.queue.len() == QUEUE_CAPACITY {
                endpoint.queue.pop_front();
            }
            endpoint.queue.push_back(bytes.to_vec());
        }
    }
}

/// Shared in-memory network.
///
/// # Examples
/// ```
/// use streamdmx_core::transport::loopback::LoopbackNetwork;
/// use streamdmx_core::transport::{ReceiverTransport, SenderTransport};
///
/// let network = LoopbackNetwork::new();
/// let rx = network.receiver();
/// rx.join_universe(3)?;
/// network.sender().send_multicast(b"hello", 3)?;
///
/// let mut buf = [0u8; 16];
/// assert!(rx.packet_available());
/// assert_eq!(rx.receive(&mut buf)?, 5);
/// # Ok::<(), streamdmx_core::transport::TransportError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoopbackNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> LoopbackSender {
        LoopbackSender {
            hub: Arc::clone(&self.hub),
            failing: AtomicBool::new(false),
            sent: AtomicU64::new(0),
        }
    }

    pub fn receiver(&self) -> LoopbackReceiver {
        let mut hub = self.hub.lock();
        let id = hub.next_id;
        hub.next_id += 1;
        hub.endpoints.insert(id, Endpoint::default());
        LoopbackReceiver {
            hub: Arc::clone(&self.hub),
            id,
        }
    }

    /// Queues raw bytes as if a remote source had multicast them.
    pub fn inject(&self, bytes: &[u8], universe: u16) {
        self.hub.lock().deliver(bytes, Some(universe));
    }
}

#[derive(Debug)]
pub struct LoopbackSender {
    hub: Arc<Mutex<Hub>>,
    failing: AtomicBool,
    sent: AtomicU64,
}

impl LoopbackSender {
    /// While set, every send fails with [`TransportError::Closed`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of datagrams successfully sent.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    fn send(&self, bytes: &[u8], universe: Option<u16>) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.hub.lock().deliver(bytes, universe);
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl SenderTransport for LoopbackSender {
    fn send_multicast(&self, bytes: &[u8], universe: u16) -> Result<(), TransportError> {
        self.send(bytes, Some(universe))
    }

    fn send_unicast(&self, bytes: &[u8], _target: SocketAddr) -> Result<(), TransportError> {
        self.send(bytes, None)
    }
}

#[derive(Debug)]
pub struct LoopbackReceiver {
    hub: Arc<Mutex<Hub>>,
    id: usize,
}

impl LoopbackReceiver {
    pub fn pending(&self) -> usize {
        self.hub
            .lock()
            .endpoints
            .get(&self.id)
            .map_or(0, |endpoint| endpoint.queue.len())
    }
}

impl Drop for LoopbackReceiver {
    fn drop(&mut self) {
        self.hub.lock().endpoints.remove(&self.id);
    }
}

impl ReceiverTransport for LoopbackReceiver {
    fn join_universe(&self, universe: u16) -> Result<(), TransportError> {
        let mut hub = self.hub.lock();
        let endpoint = hub.endpoints.get_mut(&self.id).ok_or(TransportError::Closed)?;
        endpoint.joined.insert(universe);
        Ok(())
    }

    fn packet_available(&self) -> bool {
        self.pending() > 0
    }

    fn receive(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut hub = self.hub.lock();
        let endpoint = hub.endpoints.get_mut(&self.id).ok_or(TransportError::Closed)?;
        let datagram = endpoint.queue.pop_front().ok_or_else(|| {
            TransportError::Receive(std::io::Error::from(std::io::ErrorKind::WouldBlock))
        })?;
        // Truncate like a UDP socket would.
        let len = datagram.len().min(buf.len());
        buf[..len].copy_from_slice(&datagram[..len]);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::LoopbackNetwork;
    use crate::transport::{ReceiverTransport, SenderTransport};

    #[test]
    fn only_joined_universes_are_delivered() {
        let network = LoopbackNetwork::new();
        let rx = network.receiver();
        rx.join_universe(1).unwrap();
        let tx = network.sender();

        tx.send_multicast(b"one", 1).unwrap();
        tx.send_multicast(b"two", 2).unwrap();

        assert_eq!(rx.pending(), 1);
        let mut buf = [0u8; 8];
        let len = rx.receive(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"one");
        assert!(!rx.packet_available());
        assert!(rx.receive(&mut buf).is_err());
        assert_eq!(tx.sent(), 2);
    }

    #[test]
    fn failing_sender_reports_error() {
        let network = LoopbackNetwork::new();
        let tx = network.sender();
        tx.set_failing(true);
        assert!(tx.send_multicast(b"x", 1).is_err());
        assert_eq!(tx.sent(), 0);
    }

    #[test]
    fn unicast_reaches_every_receiver() {
        let network = LoopbackNetwork::new();
        let a = network.receiver();
        let b = network.receiver();
        network
            .sender()
            .send_unicast(b"hi", "127.0.0.1:5568".parse().unwrap())
            .unwrap();
        assert_eq!(a.pending(), 1);
        assert_eq!(b.pending(), 1);
    }
}
