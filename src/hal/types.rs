// src/hal/types.rs
//! Core types for board abstraction

use crate::config::constants::{cyton, synthetic};
use crate::error::BoardError;
use serde::{Deserialize, Serialize};

/// Supported board families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardId {
    /// Generated signal, no hardware required
    Synthetic,
    /// 8-channel UART EEG board
    Cyton,
}

impl BoardId {
    /// Every board in the descriptor table
    pub const ALL: [BoardId; 2] = [BoardId::Synthetic, BoardId::Cyton];

    /// Numeric id used across the binding boundary
    pub const fn id(self) -> i32 {
        match self {
            BoardId::Synthetic => synthetic::BOARD_ID,
            BoardId::Cyton => cyton::BOARD_ID,
        }
    }

    /// Resolve a numeric id, failing with `UnsupportedBoard` for unknown ids
    pub fn from_id(board_id: i32) -> Result<Self, BoardError> {
        Self::ALL
            .iter()
            .copied()
            .find(|board| board.id() == board_id)
            .ok_or(BoardError::UnsupportedBoard { board_id })
    }

    /// Static descriptor for this board
    pub fn descriptor(self) -> &'static BoardDescriptor {
        match self {
            BoardId::Synthetic => &SYNTHETIC_BOARD,
            BoardId::Cyton => &CYTON_BOARD,
        }
    }
}

impl TryFrom<i32> for BoardId {
    type Error = BoardError;

    fn try_from(board_id: i32) -> Result<Self, Self::Error> {
        BoardId::from_id(board_id)
    }
}

/// Static per-board constants
///
/// `num_channels` is the width of one decoded data row; `package_length` is
/// the size of one raw frame on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardDescriptor {
    pub board: BoardId,
    pub board_id: i32,
    pub name: &'static str,
    pub sample_rate_hz: u32,
    pub num_channels: usize,
    pub package_length: usize,
}

impl BoardDescriptor {
    /// Number of samples covering `seconds` of acquisition
    pub fn samples_for(&self, seconds: u32) -> usize {
        self.sample_rate_hz as usize * seconds as usize
    }
}

pub static SYNTHETIC_BOARD: BoardDescriptor = BoardDescriptor {
    board: BoardId::Synthetic,
    board_id: synthetic::BOARD_ID,
    name: "synthetic",
    sample_rate_hz: synthetic::SAMPLE_RATE_HZ,
    num_channels: synthetic::NUM_CHANNELS,
    package_length: synthetic::PACKAGE_LENGTH,
};

pub static CYTON_BOARD: BoardDescriptor = BoardDescriptor {
    board: BoardId::Cyton,
    board_id: cyton::BOARD_ID,
    name: "cyton",
    sample_rate_hz: cyton::SAMPLE_RATE_HZ,
    num_channels: cyton::ROW_WIDTH,
    package_length: cyton::PACKAGE_LENGTH,
};

/// One decoded, timestamped set of per-channel readings
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    channels: Vec<f32>,
    timestamp: f64,
}

impl Sample {
    pub fn new(channels: Vec<f32>, timestamp: f64) -> Self {
        Self { channels, timestamp }
    }

    pub fn channels(&self) -> &[f32] {
        &self.channels
    }

    /// Seconds since the Unix epoch
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn width(&self) -> usize {
        self.channels.len()
    }
}

/// Raw unit of data as received from a transport
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    bytes: Vec<u8>,
    captured_at: f64,
}

impl RawFrame {
    pub fn new(bytes: Vec<u8>, captured_at: f64) -> Self {
        Self { bytes, captured_at }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Capture time in seconds since the Unix epoch
    pub fn captured_at(&self) -> f64 {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
