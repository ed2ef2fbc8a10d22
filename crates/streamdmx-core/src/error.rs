use thiserror::Error;

use crate::protocols::sacn::PacketError;
use crate::transport::TransportError;
use crate::universe::DmxError;

/// Errors returned by senders, receivers and the multi-universe managers.
///
/// # Examples
/// ```
/// use streamdmx_core::{EngineError, SacnOutput, SenderConfig};
/// use streamdmx_core::logging::NoopLogger;
/// use std::sync::Arc;
///
/// let mut output = SacnOutput::new(SenderConfig::default(), Arc::new(NoopLogger))?;
/// output.add_universe(1)?;
/// let err = output.add_universe(1).unwrap_err();
/// assert!(matches!(err, EngineError::UniverseAlreadyRegistered { universe: 1 }));
/// # Ok::<(), EngineError>(())
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("DMX error: {0}")]
    Dmx(#[from] DmxError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("universe {universe} is already registered")]
    UniverseAlreadyRegistered { universe: u16 },
    #[error("universe {universe} is not registered")]
    UnknownUniverse { universe: u16 },
    #[error("invalid unchanged refresh rate {rate} Hz (must be at least 1)")]
    InvalidRefreshRate { rate: u16 },
    #[error("invalid poll interval: must be at least 1 ms")]
    InvalidPollInterval,
    #[error("failed to spawn background thread: {0}")]
    Spawn(std::io::Error),
}
