//! Sender and receiver settings.
//!
//! Both structs deserialize with `#[serde(default)]`, so a partial document
//! only overrides the fields it names. Values are validated when a sender or
//! receiver is built, never silently clamped.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::protocols::sacn::{PacketError, layout};

pub const DEFAULT_SOURCE_NAME: &str = "streamdmx";
pub const DEFAULT_UNCHANGED_REFRESH_RATE: u16 = 5;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5;
/// A receiver reports its universe as stale after this long without data.
pub const DEFAULT_STALE_AFTER_MS: u64 = 2000;

/// Settings shared by [`crate::SacnUniverseSender`] and [`crate::SacnOutput`].
///
/// # Examples
/// ```
/// use streamdmx_core::SenderConfig;
///
/// let config = SenderConfig {
///     source_name: "Desk".to_string(),
///     unchanged_refresh_rate: 10,
///     ..SenderConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.keep_alive_interval().as_millis(), 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Name advertised in the framing layer (at most 62 bytes).
    pub source_name: String,
    /// Packet priority, 0..=200.
    pub priority: u8,
    /// Keep-alive rate in Hz used while the universe is unchanged.
    pub unchanged_refresh_rate: u16,
    pub poll_interval_ms: u64,
    /// Send stream-terminated packets when the sender stops.
    pub terminate_on_stop: bool,
    /// Multicast to the universe group (disable for unicast-only output).
    pub multicast: bool,
    /// Extra unicast destinations receiving every packet.
    pub unicast_targets: Vec<SocketAddr>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            priority: layout::DEFAULT_PRIORITY,
            unchanged_refresh_rate: DEFAULT_UNCHANGED_REFRESH_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            terminate_on_stop: true,
            multicast: true,
            unicast_targets: Vec::new(),
        }
    }
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.source_name.len() >= layout::MAX_SOURCE_NAME_LEN {
            return Err(PacketError::SourceNameTooLong {
                length: self.source_name.len(),
            }
            .into());
        }
        if self.priority > layout::MAX_PRIORITY {
            return Err(PacketError::InvalidPriority {
                priority: self.priority,
            }
            .into());
        }
        if self.unchanged_refresh_rate == 0 {
            return Err(EngineError::InvalidRefreshRate {
                rate: self.unchanged_refresh_rate,
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(EngineError::InvalidPollInterval);
        }
        Ok(())
    }

    /// Longest gap between two packets of an unchanged universe.
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.unchanged_refresh_rate.max(1)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Settings shared by [`crate::SacnUniverseReceiver`] and [`crate::SacnInput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub poll_interval_ms: u64,
    pub stale_after_ms: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
        }
    }
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.poll_interval_ms == 0 {
            return Err(EngineError::InvalidPollInterval);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}
