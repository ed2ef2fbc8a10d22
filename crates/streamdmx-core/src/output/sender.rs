use std::net::Ipv4Addr;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::SenderConfig;
use crate::error::EngineError;
use crate::logging::{LogLevel, SharedLogger};
use crate::transport::{SenderTransport, UdpSender};
use crate::universe::UniverseData;
use crate::worker::Worker;

use super::{OutputHandle, SendLoop, Targets, UniverseOutput};

/// Streams a single universe on its own thread.
///
/// Writes to [`SacnUniverseSender::dmx`] are picked up by the next poll
/// (every 5 ms by default); an unchanged universe is re-sent at the
/// configured keep-alive rate.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use streamdmx_core::{ConsoleLogger, SacnUniverseSender, SenderConfig};
///
/// let mut sender = SacnUniverseSender::new(1, SenderConfig::default(), Arc::new(ConsoleLogger::new()))?;
/// sender.start(None)?;
/// sender.dmx().set(0, 255)?;
/// sender.stop();
/// # Ok::<(), streamdmx_core::EngineError>(())
/// ```
pub struct SacnUniverseSender {
    output: OutputHandle,
    config: SenderConfig,
    logger: SharedLogger,
    cid: Uuid,
    worker: Option<Worker>,
}

impl SacnUniverseSender {
    pub fn new(
        universe: u16,
        config: SenderConfig,
        logger: SharedLogger,
    ) -> Result<Self, EngineError> {
        let output = Arc::new(UniverseOutput::new(universe, &config)?);
        Ok(Self {
            output,
            config,
            logger,
            cid: Uuid::new_v4(),
            worker: None,
        })
    }

    pub fn universe(&self) -> u16 {
        self.output.universe()
    }

    pub fn cid(&self) -> Uuid {
        self.cid
    }

    pub fn dmx(&self) -> &UniverseData {
        self.output.dmx()
    }

    pub fn output(&self) -> OutputHandle {
        Arc::clone(&self.output)
    }

    pub fn set_source_name(&self, name: &str) -> Result<(), EngineError> {
        Ok(self.output.set_source_name(name)?)
    }

    pub fn set_priority(&self, priority: u8) -> Result<(), EngineError> {
        Ok(self.output.set_priority(priority)?)
    }

    /// Opens a UDP socket and starts the sender thread. A no-op when
    /// already running.
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
        let universe = self.universe();
        let body = SendLoop::new(
            Targets::Single(Arc::clone(&self.output)),
            transport,
            self.cid,
            &self.config,
            Arc::clone(&self.logger),
        );
        self.worker = Some(Worker::spawn(
            format!("streamdmx-send-{universe}"),
            self.config.poll_interval(),
            body,
        )?);
        self.logger.log(
            LogLevel::Info,
            &format!("sACN sender started for universe {universe}"),
        );
        Ok(())
    }

    /// Signals the thread and joins it. No packet is sent after this returns.
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            let universe = self.universe();
            if !worker.stop() {
                self.logger.log(
                    LogLevel::Critical,
                    &format!("sender thread for universe {universe} panicked"),
                );
            }
            self.logger.log(
                LogLevel::Info,
                &format!("sACN sender stopped for universe {universe}"),
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SacnUniverseSender {
    fn drop(&mut self) {
        self.stop();
    }
}
