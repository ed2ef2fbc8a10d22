//! Injectable logging capability.
//!
//! Every engine component receives a [`SharedLogger`] at construction instead
//! of reaching for process-wide state. Three implementations ship with the
//! crate:
//! - [`ConsoleLogger`]: timestamped lines on stderr (the default),
//! - [`TracingLogger`]: forwards to the `tracing` ecosystem,
//! - [`NoopLogger`]: discards everything.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Critical,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for engine log entries.
///
/// Implementations must be callable from the background send/receive
/// threads.
///
/// # Examples
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use streamdmx_core::{LogLevel, Logger};
///
/// #[derive(Default)]
/// struct Collect(Mutex<Vec<String>>);
///
/// impl Logger for Collect {
///     fn log(&self, level: LogLevel, message: &str) {
///         self.0.lock().unwrap().push(format!("{level}: {message}"));
///     }
/// }
///
/// let logger = Arc::new(Collect::default());
/// logger.log(LogLevel::Info, "hello");
/// assert_eq!(logger.0.lock().unwrap()[0], "Info: hello");
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Logger handle shared between a component and its background thread.
pub type SharedLogger = Arc<dyn Logger>;

/// Writes `[timestamp][Level] message` lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLogger {
    min_level: Option<LogLevel>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops entries below `level`.
    pub fn with_min_level(level: LogLevel) -> Self {
        Self {
            min_level: Some(level),
        }
    }

    /// Whether entries at `level` are written.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.min_level.is_none_or(|min| level >= min)
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let line = format_line(OffsetDateTime::now_utc(), level, message);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }
}

fn format_line(at: OffsetDateTime, level: LogLevel, message: &str) -> String {
    let stamp = at
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());
    format!("[{stamp}][{level}] {message}")
}

/// Forwards entries to `tracing` under the `streamdmx` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "streamdmx", "{message}"),
            LogLevel::Info => tracing::info!(target: "streamdmx", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "streamdmx", "{message}"),
            LogLevel::Critical => tracing::error!(target: "streamdmx", "{message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// The logger used when a caller does not inject one.
pub fn default_logger() -> SharedLogger {
    Arc::new(ConsoleLogger::new())
}
