//! streamdmx core library: send and receive DMX512 over sACN (ANSI E1.31).
//!
//! The crate is layered the same way on both sides of the wire: a
//! thread-safe [`UniverseData`] buffer per universe, the [`SacnPacket`] codec
//! (layout/reader/writer), the [`transport`] adapter, and the engines that
//! poll them from a background thread ([`SacnUniverseSender`],
//! [`SacnOutput`], [`SacnUniverseReceiver`], [`SacnInput`]).
//!
//! Invariants:
//! - Channels are 0-indexed; slot `k` is property value `k + 1` on the wire.
//! - A sender copies a buffer and clears its dirty flag in one critical
//!   section, so no write is ever marked as sent without being sent.
//! - A stopped engine never touches the network again.
//! - Components log through an injected [`Logger`]; there is no global state.
//!
//! Version française (résumé):
//! Cette crate envoie et reçoit du DMX512 via sACN (E1.31) : tampons par
//! univers, codec de paquets, adaptateur de transport, puis moteurs d'envoi et
//! de réception sur un thread dédié. Canaux indexés à partir de 0.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! use streamdmx_core::logging::NoopLogger;
//! use streamdmx_core::transport::loopback::LoopbackNetwork;
//! use streamdmx_core::{ReceiverConfig, SacnInput, SacnOutput, SenderConfig};
//!
//! let network = LoopbackNetwork::new();
//! let mut input = SacnInput::new(ReceiverConfig::default(), Arc::new(NoopLogger))?;
//! let received = input.add_universe(5)?;
//! input.start_with(network.receiver())?;
//!
//! let mut output = SacnOutput::new(SenderConfig::default(), Arc::new(NoopLogger))?;
//! output.add_universe(5)?.dmx().set(0, 255)?;
//! output.start_with(network.sender())?;
//!
//! let deadline = Instant::now() + Duration::from_secs(2);
//! while received.dmx().get(0)? != 255 && Instant::now() < deadline {
//!     std::thread::sleep(Duration::from_millis(5));
//! }
//! assert_eq!(received.dmx().get(0)?, 255);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod input;
pub mod logging;
mod output;
pub mod protocols;
pub mod transport;
mod universe;
mod worker;

pub use config::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SOURCE_NAME, DEFAULT_STALE_AFTER_MS,
    DEFAULT_UNCHANGED_REFRESH_RATE, ReceiverConfig, SenderConfig,
};
pub use error::EngineError;
pub use input::{
    InputHandle, PacketOutcome, SacnInput, SacnUniverseReceiver, SourceInfo, UniverseInput,
    UniverseStatus,
};
pub use logging::{
    ConsoleLogger, LogLevel, Logger, NoopLogger, SharedLogger, TracingLogger, default_logger,
};
pub use output::{OutputHandle, SacnOutput, SacnUniverseSender, UniverseOutput};
pub use protocols::sacn::{PacketError, SacnPacket};
pub use transport::TransportError;
pub use universe::{DMX_CHANNELS, DmxError, MAX_FINE_RESOLUTION, UniverseData};
