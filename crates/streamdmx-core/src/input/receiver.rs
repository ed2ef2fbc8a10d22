use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::config::ReceiverConfig;
use crate::error::EngineError;
use crate::logging::{LogLevel, SharedLogger};
use crate::protocols::sacn::SacnPacket;
use crate::transport::{ReceiverTransport, UdpReceiver};
use crate::universe::UniverseData;
use crate::worker::Worker;

use super::{InputHandle, ReceiveLoop, SourceInfo, Sources, UniverseInput};

/// Receives a single universe on its own thread.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use streamdmx_core::{ConsoleLogger, ReceiverConfig, SacnUniverseReceiver};
///
/// let mut receiver =
///     SacnUniverseReceiver::new(1, ReceiverConfig::default(), Arc::new(ConsoleLogger::new()))?;
/// receiver.start(None)?;
/// if receiver.is_receiving() {
///     println!("{}: {}", receiver.current_source(), receiver.dmx().get(0)?);
/// }
/// # Ok::<(), streamdmx_core::EngineError>(())
/// ```
pub struct SacnUniverseReceiver {
    input: InputHandle,
    config: ReceiverConfig,
    logger: SharedLogger,
    worker: Option<Worker>,
}

impl SacnUniverseReceiver {
    pub fn new(
        universe: u16,
        config: ReceiverConfig,
        logger: SharedLogger,
    ) -> Result<Self, EngineError> {
        let input = Arc::new(UniverseInput::new(universe, &config)?);
        Ok(Self {
            input,
            config,
            logger,
            worker: None,
        })
    }

    pub fn universe(&self) -> u16 {
        self.input.universe()
    }

    pub fn dmx(&self) -> &UniverseData {
        self.input.dmx()
    }

    pub fn input(&self) -> InputHandle {
        Arc::clone(&self.input)
    }

    pub fn is_receiving(&self) -> bool {
        self.input.is_receiving()
    }

    pub fn current_source(&self) -> String {
        self.input.current_source()
    }

    pub fn source(&self) -> Option<SourceInfo> {
        self.input.source()
    }

    /// Binds the sACN port and joins the universe group. A no-op when
    /// already running; on failure the receiver stays idle.
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
        let universe = self.universe();
        transport.join_universe(universe)?;
        let body = ReceiveLoop {
            sources: Sources::Single(Arc::clone(&self.input)),
            packet: SacnPacket::default(),
            logger: Arc::clone(&self.logger),
            transport: Arc::new(transport),
        };
        self.worker = Some(Worker::spawn(
            format!("streamdmx-recv-{universe}"),
            self.config.poll_interval(),
            body,
        )?);
        self.logger.log(
            LogLevel::Info,
            &format!("sACN receiver started for universe {universe}"),
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            let universe = self.universe();
            if !worker.stop() {
                self.logger.log(
                    LogLevel::Critical,
                    &format!("receiver thread for universe {universe} panicked"),
                );
            }
            self.logger.log(
                LogLevel::Info,
                &format!("sACN receiver stopped for universe {universe}"),
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SacnUniverseReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, ErrorKind};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use super::SacnUniverseReceiver;
    use crate::config::ReceiverConfig;
    use crate::logging::{LogLevel, Logger, NoopLogger};
    use crate::protocols::sacn::SacnPacket;
    use crate::transport::loopback::LoopbackNetwork;
    use crate::transport::{ReceiverTransport, TransportError};
    use crate::EngineError;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(LogLevel, String)>>);

    impl Logger for Collect {
        fn log(&self, level: LogLevel, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    /// Refuses every group membership.
    struct NoGroups;

    impl ReceiverTransport for NoGroups {
        fn join_universe(&self, universe: u16) -> Result<(), TransportError> {
            Err(TransportError::JoinGroup {
                universe,
                source: io::Error::from(ErrorKind::AddrNotAvailable),
            })
        }

        fn packet_available(&self) -> bool {
            false
        }

        fn receive(&self, _buf: &mut [u8]) -> Result<usize, TransportError> {
            Err(TransportError::Closed)
        }
    }

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        done()
    }

    #[test]
    fn receives_only_its_universe() {
        let network = LoopbackNetwork::new();
        let mut receiver =
            SacnUniverseReceiver::new(6, ReceiverConfig::default(), Arc::new(NoopLogger)).unwrap();
        receiver.start_with(network.receiver()).unwrap();

        let mut other = SacnPacket::new(7).unwrap();
        other.set_dmx(0, 1).unwrap();
        // Arrives on the group of universe 6 but carries universe 7.
        network.inject(other.raw_bytes(), 6);

        let mut mine = SacnPacket::new(6).unwrap();
        mine.set_source_name("Desk").unwrap();
        mine.set_dmx(1, 33).unwrap();
        network.inject(mine.raw_bytes(), 6);

        assert!(wait_for(|| receiver.is_receiving()));
        receiver.stop();

        assert_eq!(receiver.dmx().get(1).unwrap(), 33);
        assert_eq!(receiver.dmx().get(0).unwrap(), 0);
        assert_eq!(receiver.current_source(), "Desk");
        assert_eq!(receiver.input().packets_received(), 1);
    }

    #[test]
    fn foreign_universe_is_logged_as_warning() {
        let network = LoopbackNetwork::new();
        let logs = Arc::new(Collect::default());
        let mut receiver =
            SacnUniverseReceiver::new(6, ReceiverConfig::default(), logs.clone()).unwrap();
        receiver.start_with(network.receiver()).unwrap();

        network.inject(SacnPacket::new(7).unwrap().raw_bytes(), 6);

        assert!(wait_for(|| {
            logs.0
                .lock()
                .unwrap()
                .iter()
                .any(|(level, message)| *level == LogLevel::Warning && message.contains("universe 7"))
        }));
        receiver.stop();
        assert!(receiver.source().is_none());
    }

    #[test]
    fn failed_join_leaves_receiver_idle() {
        let mut receiver =
            SacnUniverseReceiver::new(3, ReceiverConfig::default(), Arc::new(NoopLogger)).unwrap();
        let err = receiver.start_with(NoGroups).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Transport(TransportError::JoinGroup { universe: 3, .. })
        ));
        assert!(!receiver.is_running());

        let network = LoopbackNetwork::new();
        receiver.start_with(network.receiver()).unwrap();
        assert!(receiver.is_running());
        receiver.stop();
    }
}
