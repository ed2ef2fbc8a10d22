//! Input side: universes received from the network.
//!
//! Both receivers run [`drain`] every poll interval: pull every pending
//! datagram, validate it, then hand it to the matching [`UniverseInput`].

mod receiver;
mod universe;

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::config::ReceiverConfig;
use crate::error::EngineError;
use crate::logging::{LogLevel, SharedLogger};
use crate::protocols::sacn::{SacnPacket, layout};
use crate::transport::{ReceiverTransport, UdpReceiver};
use crate::worker::{Tick, Worker};

pub use receiver::SacnUniverseReceiver;
pub use universe::{PacketOutcome, SourceInfo, UniverseInput, UniverseStatus};

/// Caller-side handle to a registered input universe.
pub type InputHandle = Arc<UniverseInput>;

type Registry = Arc<RwLock<BTreeMap<u16, InputHandle>>>;

/// Upper bound on datagrams handled per tick so one flood cannot starve
/// `stop()`.
const MAX_PACKETS_PER_TICK: usize = 256;

/// Receives every pending datagram, validates it and passes valid packets to
/// `dispatch`. Returns the number of valid packets.
///
/// Invalid packets are logged at Warning and dropped. A receive error is
/// logged and ends the drain for this tick.
pub(crate) fn drain<T, F>(
    transport: &T,
    packet: &mut SacnPacket,
    logger: &SharedLogger,
    mut dispatch: F,
) -> usize
where
    T: ReceiverTransport + ?Sized,
    F: FnMut(&SacnPacket),
{
    let mut buf = [0u8; layout::MAX_LEN];
    let mut valid = 0;
    for _ in 0..MAX_PACKETS_PER_TICK {
        if !transport.packet_available() {
            break;
        }
        let len = match transport.receive(&mut buf) {
            Ok(len) => len,
            Err(err) => {
                logger.log(LogLevel::Warning, &format!("receive failed: {err}"));
                break;
            }
        };
        if let Err(err) = packet.load(&buf[..len]).and_then(|()| packet.validate()) {
            logger.log(LogLevel::Warning, &format!("dropped invalid sACN packet: {err}"));
            continue;
        }
        dispatch(packet);
        valid += 1;
    }
    valid
}

fn report(
    logger: &SharedLogger,
    input: &UniverseInput,
    outcome: PacketOutcome,
    packet: &SacnPacket,
) {
    match outcome {
        PacketOutcome::Applied => {}
        PacketOutcome::Terminated => logger.log(
            LogLevel::Info,
            &format!(
                "universe {}: source \"{}\" terminated its stream",
                input.universe(),
                packet.source_name()
            ),
        ),
        PacketOutcome::IgnoredStartCode(code) => logger.log(
            LogLevel::Debug,
            &format!(
                "universe {}: ignored packet with start code {code:#04x}",
                input.universe()
            ),
        ),
        PacketOutcome::WrongUniverse(other) => logger.log(
            LogLevel::Warning,
            &format!(
                "universe {}: skipped packet for universe {other}",
                input.universe()
            ),
        ),
    }
}

enum Sources {
    Single(InputHandle),
    Registry(Registry),
}

/// Loop body shared by both receivers. Owns the scratch packet.
struct ReceiveLoop<T: ?Sized> {
    sources: Sources,
    packet: SacnPacket,
    logger: SharedLogger,
    transport: Arc<T>,
}

impl<T: ReceiverTransport + ?Sized + 'static> Tick for ReceiveLoop<T> {
    fn tick(&mut self, now: Instant) {
        let logger = &self.logger;
        match &self.sources {
            Sources::Single(input) => {
                drain(&*self.transport, &mut self.packet, logger, |packet| {
                    report(logger, input, input.handle_packet(packet, now), packet);
                });
            }
            Sources::Registry(registry) => {
                drain(&*self.transport, &mut self.packet, logger, |packet| {
                    let input = registry.read().get(&packet.universe()).cloned();
                    // Unregistered universes are discarded.
                    if let Some(input) = input {
                        report(logger, &input, input.handle_packet(packet, now), packet);
                    }
                });
            }
        }
    }
}

/// Many input universes sharing one socket and one receive thread.
///
/// Universes registered before [`SacnInput::start`] are joined when it
/// starts; universes added while running are joined immediately.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use streamdmx_core::logging::NoopLogger;
/// use streamdmx_core::transport::loopback::LoopbackNetwork;
/// use streamdmx_core::{ReceiverConfig, SacnInput};
///
/// let network = LoopbackNetwork::new();
/// let mut input = SacnInput::new(ReceiverConfig::default(), Arc::new(NoopLogger))?;
/// input.start_with(network.receiver())?;
/// let universe = input.add_universe(1)?;
/// assert!(!universe.is_receiving());
/// input.stop();
/// # Ok::<(), streamdmx_core::EngineError>(())
/// ```
pub struct SacnInput {
    config: ReceiverConfig,
    logger: SharedLogger,
    registry: Registry,
    transport: Option<Arc<dyn ReceiverTransport>>,
    worker: Option<Worker>,
}

impl SacnInput {
    pub fn new(config: ReceiverConfig, logger: SharedLogger) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            logger,
            registry: Arc::default(),
            transport: None,
            worker: None,
        })
    }

    /// Binds the sACN port and starts receiving. A no-op when already
    /// running; on failure the input stays idle.
    pub fn start(&mut self, interface: Option<Ipv4Addr>) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        let transport = UdpReceiver::bind(interface)?;
        self.start_with(transport)
    }

    pub fn start_with<T: ReceiverTransport + 'static>(
        &mut self,
        transport: T,
    ) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        let transport: Arc<dyn ReceiverTransport> = Arc::new(transport);
        for &universe in self.registry.read().keys() {
            transport.join_universe(universe)?;
        }
        let body = ReceiveLoop {
            sources: Sources::Registry(Arc::clone(&self.registry)),
            packet: SacnPacket::default(),
            logger: Arc::clone(&self.logger),
            transport: Arc::clone(&transport),
        };
        self.worker = Some(Worker::spawn(
            "streamdmx-input".to_string(),
            self.config.poll_interval(),
            body,
        )?);
        self.transport = Some(transport);
        self.logger.log(LogLevel::Info, "sACN input started");
        Ok(())
    }

    /// Stops the receive thread and releases the socket.
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            if !worker.stop() {
                self.logger.log(LogLevel::Critical, "sACN input thread panicked");
            }
            self.logger.log(LogLevel::Info, "sACN input stopped");
        }
        self.transport = None;
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Registers `universe`, joining its multicast group when running.
    pub fn add_universe(&self, universe: u16) -> Result<InputHandle, EngineError> {
        let input = Arc::new(UniverseInput::new(universe, &self.config)?);
        let mut registry = self.registry.write();
        if registry.contains_key(&universe) {
            return Err(EngineError::UniverseAlreadyRegistered { universe });
        }
        if let Some(transport) = &self.transport {
            transport.join_universe(universe)?;
        }
        registry.insert(universe, Arc::clone(&input));
        drop(registry);
        self.logger
            .log(LogLevel::Debug, &format!("input universe {universe} registered"));
        Ok(input)
    }

    pub fn has_universe(&self, universe: u16) -> bool {
        self.registry.read().contains_key(&universe)
    }

    pub fn universe(&self, universe: u16) -> Result<InputHandle, EngineError> {
        self.registry
            .read()
            .get(&universe)
            .cloned()
            .ok_or(EngineError::UnknownUniverse { universe })
    }

    /// Registered universe numbers, ascending.
    pub fn universes(&self) -> Vec<u16> {
        self.registry.read().keys().copied().collect()
    }
}

impl Drop for SacnInput {
    fn drop(&mut self) {
        self.stop();
    }
}
