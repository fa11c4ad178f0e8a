//! biostream-core: streaming acquisition engine for biosignal boards
//!
//! The engine manages the lifecycle of one board connection, runs a
//! background acquisition loop that reads, decodes and buffers frames, and
//! offers non-blocking reads of the most recent samples or of the whole
//! backlog. It provides:
//!
//! - Board transports for a synthetic signal source and UART boards
//! - A bounded sample buffer shared between the loop and readers
//! - Layered configuration from defaults, TOML files and the environment
//! - A status-code boundary ([`board_controller`]) for language bindings
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use biostream_core::acquisition::AcquisitionSession;
//! use biostream_core::config::EngineConfig;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), biostream_core::BoardError> {
//!     // Synthetic board, no hardware required
//!     let mut session = AcquisitionSession::new(-1, "", EngineConfig::default())?;
//!     session.prepare()?;
//!     session.start_stream(None)?;
//!
//!     std::thread::sleep(Duration::from_secs(1));
//!     let latest = session.get_current_data(250)?;
//!     println!("{} samples, table shape {:?}", latest.count(), latest.to_table().shape());
//!
//!     session.stop_stream()?;
//!     session.release_session()?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod board_controller;
pub mod config;
pub mod error;
pub mod hal;
pub mod logger;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{AcquisitionSession, BoardData, SampleBuffer, SessionRegistry, SessionState};
pub use config::{ConfigLoader, EngineConfig};
pub use error::{BoardError, BoardResult, StatusCode};
pub use hal::{BoardDescriptor, BoardId, DeviceTransport, FrameDecoder, RawFrame, Sample};
pub use logger::{LogLevel, Logger};
pub use utils::time::{current_timestamp_secs, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Streaming acquisition engine for biosignal boards".to_string(),
        boards: BoardId::ALL
            .iter()
            .map(|board| board.descriptor().name.to_string())
            .collect(),
        serial_support: cfg!(feature = "serial"),
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// Names of the supported boards
    pub boards: Vec<String>,
    /// Whether real serial ports can be opened
    pub serial_support: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert_eq!(info.boards, vec!["synthetic", "cyton"]);
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }
}
