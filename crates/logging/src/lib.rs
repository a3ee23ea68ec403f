//! CraftDrop Logging
//!
//! Shared `tracing` subscriber setup for tools and tests built on the
//! CraftDrop crates. `RUST_LOG` always wins over the level passed in.
//!
//! ## Usage
//!
//! ```no_run
//! use craftdrop_logging::{init, LogLevel};
//!
//! init(LogLevel::Info);
//!
//! // From a `-v` count
//! init(LogLevel::from_verbosity(2));
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors (default)
    #[default]
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    /// `false` → `Info`, `true` → `Debug`
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::Debug
        } else {
            Self::Info
        }
    }

    /// `0` → `Info`, `1` → `Debug`, `2+` → `Trace`
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Info,
            1 => Self::Debug,
            _ => Self::Trace,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(LoggingError::UnknownLevel(other.to_string())),
        }
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Initialize logging with the specified level.
///
/// # Panics
///
/// Panics if a global subscriber is already set. Use [`try_init`] to
/// handle that case.
pub fn init(level: LogLevel) {
    try_init(level).expect("Failed to initialize logging");
}

/// Try to initialize logging, returning an error if already initialized
pub fn try_init(level: LogLevel) -> Result<(), LoggingError> {
    init_with_target(level, false)
}

/// Initialize logging, optionally printing the emitting module path
pub fn init_with_target(level: LogLevel, show_target: bool) -> Result<(), LoggingError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_target(show_target)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}

/// Debug-level logging routed through the test harness's capture.
/// Safe to call from every test; only the first call installs.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
