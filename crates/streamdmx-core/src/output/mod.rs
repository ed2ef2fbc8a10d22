//! Output side: universes streamed to the network.
//!
//! [`SacnUniverseSender`] drives one universe on its own thread;
//! [`SacnOutput`] shares one socket and one thread between any number of
//! universes. Both run the same poll step, [`UniverseOutput::poll`], every
//! few milliseconds.

mod sender;
mod universe;

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::SenderConfig;
use crate::error::EngineError;
use crate::logging::{LogLevel, SharedLogger};
use crate::protocols::sacn::SacnPacket;
use crate::transport::{SenderTransport, UdpSender};
use crate::worker::{Tick, Worker};

pub use sender::SacnUniverseSender;
pub use universe::UniverseOutput;

/// Caller-side handle to a registered output universe.
pub type OutputHandle = Arc<UniverseOutput>;

type Registry = Arc<RwLock<BTreeMap<u16, OutputHandle>>>;

enum Targets {
    Single(OutputHandle),
    Registry(Registry),
}

impl Targets {
    /// Universes to poll this tick, in ascending order.
    fn current(&self) -> Vec<OutputHandle> {
        match self {
            Targets::Single(output) => vec![Arc::clone(output)],
            Targets::Registry(registry) => registry.read().values().cloned().collect(),
        }
    }
}

/// Loop body shared by both senders. Owns the scratch packet.
struct SendLoop<T> {
    targets: Targets,
    transport: T,
    packet: SacnPacket,
    logger: SharedLogger,
    terminate_on_stop: bool,
    failing: BTreeSet<u16>,
}

impl<T: SenderTransport + 'static> SendLoop<T> {
    fn new(
        targets: Targets,
        transport: T,
        cid: Uuid,
        config: &SenderConfig,
        logger: SharedLogger,
    ) -> Self {
        let mut packet = SacnPacket::default();
        packet.set_cid(cid.into_bytes());
        Self {
            targets,
            transport,
            packet,
            logger,
            terminate_on_stop: config.terminate_on_stop,
            failing: BTreeSet::new(),
        }
    }
}

impl<T: SenderTransport + 'static> Tick for SendLoop<T> {
    fn tick(&mut self, now: Instant) {
        for output in self.targets.current() {
            let universe = output.universe();
            match output.poll(&mut self.packet, &self.transport, now) {
                Ok(true) => {
                    if self.failing.remove(&universe) {
                        self.logger
                            .log(LogLevel::Info, &format!("universe {universe}: sending again"));
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    // Log once per outage, not once per tick.
                    if self.failing.insert(universe) {
                        self.logger.log(
                            LogLevel::Warning,
                            &format!("universe {universe}: send failed: {err}"),
                        );
                    }
                }
            }
        }
    }

    fn finish(&mut self) {
        if !self.terminate_on_stop {
            return;
        }
        for output in self.targets.current() {
            if let Err(err) = output.send_termination(&mut self.packet, &self.transport) {
                self.logger.log(
                    LogLevel::Warning,
                    &format!(
                        "universe {}: stream termination failed: {err}",
                        output.universe()
                    ),
                );
            }
        }
    }
}

/// Many output universes sharing one socket and one sender thread.
///
/// Universes can be registered before or after [`SacnOutput::start`]; each
/// tick polls every registered universe in ascending order.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use streamdmx_core::logging::NoopLogger;
/// use streamdmx_core::transport::loopback::LoopbackNetwork;
/// use streamdmx_core::{SacnOutput, SenderConfig};
///
/// let network = LoopbackNetwork::new();
/// let mut output = SacnOutput::new(SenderConfig::default(), Arc::new(NoopLogger))?;
/// output.add_universe(1)?;
/// output.universe(1)?.dmx().set(0, 255)?;
/// output.start_with(network.sender())?;
/// assert!(output.is_running());
/// output.stop();
/// # Ok::<(), streamdmx_core::EngineError>(())
/// ```
pub struct SacnOutput {
    config: SenderConfig,
    logger: SharedLogger,
    cid: Uuid,
    registry: Registry,
    worker: Option<Worker>,
}

impl SacnOutput {
    pub fn new(config: SenderConfig, logger: SharedLogger) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            logger,
            cid: Uuid::new_v4(),
            registry: Arc::default(),
            worker: None,
        })
    }

    /// Component identifier stamped on every packet.
    pub fn cid(&self) -> Uuid {
        self.cid
    }

    /// Opens a UDP socket (bound to `interface` when given) and starts
    /// sending. A no-op when already running.
    pub fn start(&mut self, interface: Option<Ipv4Addr>) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        let transport = UdpSender::open(interface)?;
        self.start_with(transport)
    }

    pub fn start_with<T: SenderTransport + 'static>(
        &mut self,
        transport: T,
    ) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        let body = SendLoop::new(
            Targets::Registry(Arc::clone(&self.registry)),
            transport,
            self.cid,
            &self.config,
            Arc::clone(&self.logger),
        );
        self.worker = Some(Worker::spawn(
            "streamdmx-output".to_string(),
            self.config.poll_interval(),
            body,
        )?);
        self.logger.log(
            LogLevel::Info,
            &format!("sACN output started ({} universes)", self.registry.read().len()),
        );
        Ok(())
    }

    /// Stops the sender thread. No packet is sent after this returns.
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            if !worker.stop() {
                self.logger
                    .log(LogLevel::Critical, "sACN output thread panicked");
            }
            self.logger.log(LogLevel::Info, "sACN output stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Registers `universe` for output, starting with all channels at zero.
    pub fn add_universe(&self, universe: u16) -> Result<OutputHandle, EngineError> {
        let output = Arc::new(UniverseOutput::new(universe, &self.config)?);
        let mut registry = self.registry.write();
        if registry.contains_key(&universe) {
            return Err(EngineError::UniverseAlreadyRegistered { universe });
        }
        registry.insert(universe, Arc::clone(&output));
        drop(registry);
        self.logger
            .log(LogLevel::Debug, &format!("output universe {universe} registered"));
        Ok(output)
    }

    pub fn has_universe(&self, universe: u16) -> bool {
        self.registry.read().contains_key(&universe)
    }

    pub fn universe(&self, universe: u16) -> Result<OutputHandle, EngineError> {
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

impl Drop for SacnOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
