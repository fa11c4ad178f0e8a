// src/logger.rs
//! Process-wide log verbosity
//!
//! Log records are emitted through `tracing`. On first use the logger
//! installs a `fmt` subscriber behind a reloadable level filter, unless the
//! host application already installed its own global subscriber, in which
//! case the level is only recorded.

use crate::error::{BoardError, BoardResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, Registry};

/// Verbosity levels, numbered as the binding exposes them
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
    Off = 6,
}

impl LogLevel {
    const ALL: [LogLevel; 7] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Off,
    ];

    /// `tracing` has no critical level; it shares the error filter
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

impl TryFrom<i32> for LogLevel {
    type Error = BoardError;

    fn try_from(value: i32) -> Result<Self, BoardError> {
        LogLevel::ALL
            .iter()
            .copied()
            .find(|level| *level as i32 == value)
            .ok_or_else(|| BoardError::InvalidArguments(format!("log level {value} is not in 0..=6")))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

type FilterHandle = reload::Handle<LevelFilter, Registry>;

/// Global verbosity setting
pub struct Logger {
    level: AtomicU8,
    filter: Option<FilterHandle>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

impl Logger {
    /// The process-wide logger, installing the subscriber on first use
    pub fn global() -> &'static Logger {
        LOGGER.get_or_init(Logger::install)
    }

    fn install() -> Self {
        let initial = LogLevel::Info;
        let (filter, handle) = reload::Layer::new(initial.as_filter());
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
            .is_ok();

        Self {
            level: AtomicU8::new(initial as u8),
            filter: installed.then_some(handle),
        }
    }

    /// Whether this logger owns the global subscriber
    pub fn owns_subscriber(&self) -> bool {
        self.filter.is_some()
    }

    pub fn level(&self) -> LogLevel {
        let raw = self.level.load(Ordering::Relaxed);
        LogLevel::try_from(raw as i32).unwrap_or(LogLevel::Info)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
        if let Some(handle) = &self.filter {
            if let Err(err) = handle.reload(level.as_filter()) {
                tracing::warn!(error = %err, "unable to apply log level");
            }
        }
    }

    /// Set the level from its numeric code
    pub fn set_level_code(&self, code: i32) -> BoardResult<()> {
        self.set_level(LogLevel::try_from(code)?);
        Ok(())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("owns_subscriber", &self.owns_subscriber())
            .finish()
    }
}
