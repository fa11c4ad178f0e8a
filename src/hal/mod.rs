// src/hal/mod.rs
//! Hardware Abstraction Layer for acquisition boards

pub mod decoder;
pub mod serial_driver;
pub mod synthetic;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use decoder::{decoder_for, CytonDecoder, DecodeError, FrameDecoder, SyntheticDecoder};
pub use serial_driver::{ConnectionStats, LinkOpener, SerialConfig, SerialLink, SerialTransport};
pub use synthetic::{encode_frame, SyntheticConfig, SyntheticTransport};
pub use traits::*;
pub use types::*;

use crate::config::EngineConfig;

/// Builds the transport serving a board
pub trait TransportFactory: Send + Sync {
    fn create(&self, board: BoardId, config: &EngineConfig) -> Box<dyn DeviceTransport>;
}

/// Synthetic boards get a [`SyntheticTransport`], UART boards a [`SerialTransport`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, board: BoardId, config: &EngineConfig) -> Box<dyn DeviceTransport> {
        match board {
            BoardId::Synthetic => Box::new(SyntheticTransport::new(config.synthetic.clone())),
            BoardId::Cyton => Box::new(SerialTransport::new(config.serial.clone())),
        }
    }
}

impl<F> TransportFactory for F
where
    F: Fn(BoardId, &EngineConfig) -> Box<dyn DeviceTransport> + Send + Sync,
{
    fn create(&self, board: BoardId, config: &EngineConfig) -> Box<dyn DeviceTransport> {
        self(board, config)
    }
}
