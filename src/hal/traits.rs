// src/hal/traits.rs
//! Core HAL traits for board abstraction

use crate::hal::types::{BoardDescriptor, RawFrame};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Connection to one physical or simulated board
///
/// Implementations are driven from a single acquisition thread at a time, so
/// they only need to be `Send`.
pub trait DeviceTransport: Send {
    /// Open the connection described by `connection` (port name, address, ...)
    fn open(&mut self, connection: &str) -> Result<(), TransportError>;

    /// Ask the board to begin emitting frames
    fn start(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Ask the board to stop emitting frames
    fn stop(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Read the next raw frame, waiting at most `timeout`
    fn read_frame(&mut self, timeout: Duration) -> Result<RawFrame, TransportError>;

    /// Close the connection; a closed transport may be opened again
    fn close(&mut self) -> Result<(), TransportError>;

    /// Board served by this transport
    fn descriptor(&self) -> &'static BoardDescriptor;
}

/// Transport level failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to open '{connection}': {reason}")]
    Connection { connection: String, reason: String },

    #[error("no frame received within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("transport is not open")]
    NotOpen,
}

impl TransportError {
    /// Failures the acquisition loop absorbs and retries
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout { .. } | TransportError::Io(_))
    }

    pub(crate) fn timeout(timeout: Duration) -> Self {
        TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}
