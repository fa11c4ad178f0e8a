// src/error.rs
//! Unified error handling for biostream-core
//!
//! Every public operation either succeeds or fails with exactly one
//! [`BoardError`] kind. Each kind maps onto a stable [`StatusCode`] so that a
//! binding layer can branch on the numeric value without parsing messages.
//! Component-local errors ([`TransportError`], [`DecodeError`],
//! [`ConfigError`]) convert into `BoardError` at the session boundary.

use crate::config::ConfigError;
use crate::hal::{DecodeError, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Numeric status returned across the binding boundary.
///
/// Zero means success; every other value identifies one error kind.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Ok = 0,
    UnsupportedBoard = 1,
    InvalidState = 2,
    Connection = 3,
    Timeout = 4,
    Io = 5,
    Decode = 6,
    Allocation = 7,
    InvalidArguments = 8,
    Config = 9,
}

impl StatusCode {
    const ALL: [StatusCode; 10] = [
        StatusCode::Ok,
        StatusCode::UnsupportedBoard,
        StatusCode::InvalidState,
        StatusCode::Connection,
        StatusCode::Timeout,
        StatusCode::Io,
        StatusCode::Decode,
        StatusCode::Allocation,
        StatusCode::InvalidArguments,
        StatusCode::Config,
    ];

    /// Raw value handed to callers
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Look up a status code by its raw value
    pub fn from_i32(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.as_i32() == value)
    }

    /// Symbolic name, as a binding would print it next to the numeric code
    pub const fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "STATUS_OK",
            StatusCode::UnsupportedBoard => "UNSUPPORTED_BOARD_ERROR",
            StatusCode::InvalidState => "INVALID_STATE_ERROR",
            StatusCode::Connection => "CONNECTION_ERROR",
            StatusCode::Timeout => "TIMEOUT_ERROR",
            StatusCode::Io => "IO_ERROR",
            StatusCode::Decode => "DECODE_ERROR",
            StatusCode::Allocation => "ALLOCATION_ERROR",
            StatusCode::InvalidArguments => "INVALID_ARGUMENTS_ERROR",
            StatusCode::Config => "CONFIG_ERROR",
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name(), self.as_i32())
    }
}

/// Unified error type for the acquisition engine
#[derive(Debug, Error)]
pub enum BoardError {
    /// The board id is not in the descriptor table
    #[error("unsupported board id {board_id}")]
    UnsupportedBoard { board_id: i32 },

    /// The operation is not valid for the current lifecycle state
    #[error("{operation} rejected: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },

    /// The transport could not be opened
    #[error("unable to open connection '{connection}': {reason}")]
    Connection { connection: String, reason: String },

    /// A bounded wait expired
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Transport level i/o failure
    #[error("transport i/o error: {0}")]
    Io(#[source] std::io::Error),

    /// A raw frame could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The sample buffer could not be sized or reserved
    #[error("unable to allocate a buffer for {requested} samples: {reason}")]
    Allocation { requested: usize, reason: String },

    /// A caller supplied argument is out of range
    #[error("invalid argument: {0}")]
    InvalidArguments(String),

    /// Configuration could not be loaded or failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BoardError {
    /// Status code reported across the binding boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            BoardError::UnsupportedBoard { .. } => StatusCode::UnsupportedBoard,
            BoardError::InvalidState { .. } => StatusCode::InvalidState,
            BoardError::Connection { .. } => StatusCode::Connection,
            BoardError::Timeout { .. } => StatusCode::Timeout,
            BoardError::Io(_) => StatusCode::Io,
            BoardError::Decode(_) => StatusCode::Decode,
            BoardError::Allocation { .. } => StatusCode::Allocation,
            BoardError::InvalidArguments(_) => StatusCode::InvalidArguments,
            BoardError::Config(_) => StatusCode::Config,
        }
    }

    pub(crate) fn invalid_state(operation: &'static str, reason: impl Into<String>) -> Self {
        BoardError::InvalidState {
            operation,
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for BoardError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection { connection, reason } => {
                BoardError::Connection { connection, reason }
            }
            TransportError::Timeout { timeout_ms } => BoardError::Timeout {
                operation: "read_frame",
                timeout_ms,
            },
            TransportError::Io(err) => BoardError::Io(err),
            TransportError::NotOpen => {
                BoardError::invalid_state("transport operation", "transport is not open")
            }
        }
    }
}

/// Result type alias for engine operations
pub type BoardResult<T> = Result<T, BoardError>;
