// src/config/constants.rs
//! System-wide configuration constants

/// Sample buffer sizing
pub mod buffer {
    /// Default retention window: one hour at the board rate
    pub const DEFAULT_RETENTION_SECS: u32 = 3600;
    /// Upper bound on a single session buffer, in samples
    pub const DEFAULT_MAX_BUFFER_SAMPLES: usize = 50_000_000;
}

/// Acquisition loop and lifecycle timing
pub mod session {
    pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 50;
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
    pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5000;
    pub const MAX_READ_TIMEOUT_MS: u64 = 60_000;
    pub const THREAD_NAME_PREFIX: &str = "acquisition";
}

/// Serial transport defaults
pub mod serial {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    pub const MAX_BAUD_RATE: u32 = 4_000_000;
    pub const DEFAULT_PORT_TIMEOUT_MS: u64 = 1000;
    pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
    pub const MAX_RETRY_ATTEMPTS: u32 = 10;
    pub const RETRY_BASE_DELAY_MS: u64 = 100;
    /// Bytes skipped while hunting for a frame header before giving up
    pub const DEFAULT_MAX_RESYNC_BYTES: usize = 1024;
}

/// Cyton board wire format
pub mod cyton {
    pub const BOARD_ID: i32 = 0;
    pub const SAMPLE_RATE_HZ: u32 = 250;
    pub const NUM_EEG_CHANNELS: usize = 8;
    pub const NUM_ACCEL_CHANNELS: usize = 3;
    /// Package number, EEG channels and accelerometer axes
    pub const ROW_WIDTH: usize = 1 + NUM_EEG_CHANNELS + NUM_ACCEL_CHANNELS;
    pub const PACKAGE_LENGTH: usize = 33;

    pub const HEADER: u8 = 0xA0;
    pub const FOOTER_MIN: u8 = 0xC0;
    pub const FOOTER_MAX: u8 = 0xCF;
    /// Footer carrying accelerometer data in the aux bytes
    pub const FOOTER_ACCEL: u8 = 0xC0;

    pub const EEG_OFFSET: usize = 2;
    pub const EEG_BYTES: usize = 3;
    pub const ACCEL_OFFSET: usize = EEG_OFFSET + NUM_EEG_CHANNELS * EEG_BYTES;
    pub const ACCEL_BYTES: usize = 2;

    /// Microvolts per ADC count at gain 24
    pub const EEG_SCALE_UV: f32 = 4.5 / 24.0 / 8_388_607.0 * 1_000_000.0;
    /// g per accelerometer count
    pub const ACCEL_SCALE_G: f32 = 0.002 / 16.0;

    pub const START_STREAM_COMMAND: &[u8] = b"b";
    pub const STOP_STREAM_COMMAND: &[u8] = b"s";
}

/// Synthetic board wire format and signal defaults
pub mod synthetic {
    pub const BOARD_ID: i32 = -1;
    pub const SAMPLE_RATE_HZ: u32 = 250;
    pub const NUM_CHANNELS: usize = 8;
    pub const HEADER: u8 = 0xA0;
    pub const FOOTER: u8 = 0xC0;
    /// Header, u32 sequence, f32 per channel, footer
    pub const PACKAGE_LENGTH: usize = 1 + 4 + NUM_CHANNELS * 4 + 1;

    pub const DEFAULT_SEED: u64 = 0x5EED_B0A2;
    pub const DEFAULT_AMPLITUDE_UV: f32 = 50.0;
    pub const DEFAULT_BASE_FREQUENCY_HZ: f32 = 5.0;
    pub const DEFAULT_NOISE_LEVEL: f32 = 0.1;
}

/// Configuration discovery
pub mod paths {
    pub const CONFIG_FILE_NAME: &str = "biostream.toml";
    pub const CONFIG_PATH_ENV: &str = "BIOSTREAM_CONFIG";
    pub const ENV_PREFIX: &str = "BIOSTREAM";
    pub const ENV_SEPARATOR: &str = "__";
}
