// src/hal/synthetic.rs
//! Synthetic board transport
//!
//! Generates deterministic pseudo-signal frames at the board sample rate
//! without any hardware. Every channel carries a sine at its own frequency
//! plus seeded uniform noise, so two transports built from the same
//! [`SyntheticConfig`] emit identical channel values.

use crate::config::constants::synthetic;
use crate::hal::traits::{DeviceTransport, TransportError};
use crate::hal::types::{BoardDescriptor, RawFrame, SYNTHETIC_BOARD};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::thread;
use std::time::{Duration, Instant};

/// Synthetic signal configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub amplitude_uv: f32,
    pub base_frequency_hz: f32,
    /// Noise as a fraction of the amplitude, 0.0 to 1.0
    pub noise_level: f32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: synthetic::DEFAULT_SEED,
            amplitude_uv: synthetic::DEFAULT_AMPLITUDE_UV,
            base_frequency_hz: synthetic::DEFAULT_BASE_FREQUENCY_HZ,
            noise_level: synthetic::DEFAULT_NOISE_LEVEL,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.amplitude_uv.is_finite() || self.amplitude_uv < 0.0 {
            return Err(format!("amplitude_uv must be a non-negative number, got {}", self.amplitude_uv));
        }
        if !self.base_frequency_hz.is_finite() || self.base_frequency_hz <= 0.0 {
            return Err(format!("base_frequency_hz must be positive, got {}", self.base_frequency_hz));
        }
        if !(0.0..=1.0).contains(&self.noise_level) {
            return Err(format!("noise_level must be between 0.0 and 1.0, got {}", self.noise_level));
        }
        Ok(())
    }
}

/// Encode one synthetic frame: header, LE u32 sequence, LE f32 values, footer
pub fn encode_frame(sequence: u32, values: &[f32]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + 4 + values.len() * 4 + 1);
    frame.push(synthetic::HEADER);
    frame.extend_from_slice(&sequence.to_le_bytes());
    for value in values {
        frame.extend_from_slice(&value.to_le_bytes());
    }
    frame.push(synthetic::FOOTER);
    frame
}

/// Hardware-free transport pacing frames at the board sample rate
pub struct SyntheticTransport {
    descriptor: &'static BoardDescriptor,
    config: SyntheticConfig,
    rng: StdRng,
    period: Duration,
    frames_emitted: u64,
    epoch: Option<Instant>,
    clock: Box<dyn TimeProvider>,
    is_open: bool,
}

impl SyntheticTransport {
    pub fn new(config: SyntheticConfig) -> Self {
        Self::with_clock(config, Box::new(MonotonicTimeProvider::new()))
    }

    /// Create a transport stamping frames from a custom clock
    pub fn with_clock(config: SyntheticConfig, clock: Box<dyn TimeProvider>) -> Self {
        let descriptor = &SYNTHETIC_BOARD;
        Self {
            descriptor,
            rng: StdRng::seed_from_u64(config.seed),
            period: Duration::from_secs_f64(1.0 / descriptor.sample_rate_hz as f64),
            config,
            frames_emitted: 0,
            epoch: None,
            clock,
            is_open: false,
        }
    }

    /// Frames produced since the last `start`
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    fn next_values(&mut self) -> Vec<f32> {
        let t = self.frames_emitted as f32 / self.descriptor.sample_rate_hz as f32;
        let amplitude = self.config.amplitude_uv;
        let noise = self.config.noise_level;

        (0..self.descriptor.num_channels)
            .map(|channel| {
                let frequency = self.config.base_frequency_hz * (channel + 1) as f32;
                let signal = amplitude * (2.0 * PI * frequency * t).sin();
                let jitter = if noise > 0.0 {
                    self.rng.gen_range(-1.0f32..1.0) * noise * amplitude
                } else {
                    0.0
                };
                signal + jitter
            })
            .collect()
    }
}

impl DeviceTransport for SyntheticTransport {
    fn open(&mut self, connection: &str) -> Result<(), TransportError> {
        tracing::debug!(connection, "opening synthetic board, connection descriptor ignored");
        self.is_open = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::NotOpen);
        }
        self.frames_emitted = 0;
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.epoch = Some(Instant::now());
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<RawFrame, TransportError> {
        if !self.is_open {
            return Err(TransportError::NotOpen);
        }

        let epoch = *self.epoch.get_or_insert_with(Instant::now);
        let due = epoch + self.period.mul_f64(self.frames_emitted as f64);
        let now = Instant::now();
        if due > now {
            let wait = due - now;
            if wait > timeout {
                thread::sleep(timeout);
                return Err(TransportError::timeout(timeout));
            }
            thread::sleep(wait);
        }

        let values = self.next_values();
        let frame = encode_frame(self.frames_emitted as u32, &values);
        self.frames_emitted += 1;
        tracing::trace!(sequence = self.frames_emitted - 1, "synthetic frame");

        Ok(RawFrame::new(frame, self.clock.now_secs()))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.is_open = false;
        self.epoch = None;
        Ok(())
    }

    fn descriptor(&self) -> &'static BoardDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::decoder::{FrameDecoder, SyntheticDecoder};
    use crate::utils::time::MockTimeProvider;

    fn open_transport(config: SyntheticConfig) -> SyntheticTransport {
        let mut transport = SyntheticTransport::new(config);
        transport.open("ignored").unwrap();
        transport.start().unwrap();
        transport
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyntheticConfig::default();
        assert!(config.validate().is_ok());

        config.noise_level = 1.5;
        assert!(config.validate().is_err());

        config.noise_level = 0.0;
        config.base_frequency_hz = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_before_open_fails() {
        let mut transport = SyntheticTransport::new(SyntheticConfig::default());
        let result = transport.read_frame(Duration::from_millis(10));
        assert!(matches!(result, Err(TransportError::NotOpen)));
        assert!(matches!(transport.start(), Err(TransportError::NotOpen)));
    }

    #[test]
    fn test_frames_decode_with_descriptor_width() {
        let mut transport = open_transport(SyntheticConfig::default());
        let decoder = SyntheticDecoder::new(transport.descriptor().num_channels);

        for _ in 0..5 {
            let frame = transport.read_frame(Duration::from_secs(1)).unwrap();
            assert_eq!(frame.len(), transport.descriptor().package_length);
            let sample = decoder.decode(&frame).unwrap();
            assert_eq!(sample.width(), 8);
            assert!(sample.channels().iter().all(|value| value.is_finite()));
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let config = SyntheticConfig { seed: 7, ..Default::default() };
        let mut first = open_transport(config.clone());
        let mut second = open_transport(config);

        for _ in 0..10 {
            let a = first.read_frame(Duration::from_secs(1)).unwrap();
            let b = second.read_frame(Duration::from_secs(1)).unwrap();
            assert_eq!(a.bytes(), b.bytes());
        }
    }

    #[test]
    fn test_paced_at_sample_rate() {
        let mut transport = open_transport(SyntheticConfig::default());
        let started = Instant::now();
        for _ in 0..26 {
            transport.read_frame(Duration::from_secs(1)).unwrap();
        }
        // 25 periods of 4 ms after the first immediate frame
        assert!(started.elapsed() >= Duration::from_millis(95));
    }

    #[test]
    fn test_short_timeout_reports_timeout() {
        let mut transport = open_transport(SyntheticConfig::default());
        // once caught up with the schedule the next frame is ~4 ms away
        let timed_out = (0..50).any(|_| {
            matches!(
                transport.read_frame(Duration::from_micros(10)),
                Err(TransportError::Timeout { .. })
            )
        });
        assert!(timed_out);
    }

    #[test]
    fn test_frames_stamped_from_clock() {
        let clock = MockTimeProvider::new(1_000.0);
        let mut transport = SyntheticTransport::with_clock(SyntheticConfig::default(), Box::new(clock));
        transport.open("").unwrap();
        transport.start().unwrap();

        let frame = transport.read_frame(Duration::from_secs(1)).unwrap();
        assert_eq!(frame.captured_at(), 1_000.0);
    }

    #[test]
    fn test_restart_rewinds_sequence() {
        let mut transport = open_transport(SyntheticConfig::default());
        let first = transport.read_frame(Duration::from_secs(1)).unwrap();
        for _ in 0..3 {
            transport.read_frame(Duration::from_secs(1)).unwrap();
        }
        assert_eq!(transport.frames_emitted(), 4);

        transport.start().unwrap();
        assert_eq!(transport.frames_emitted(), 0);
        let replayed = transport.read_frame(Duration::from_secs(1)).unwrap();
        assert_eq!(replayed.bytes(), first.bytes());
    }

    #[test]
    fn test_noise_free_signal_is_pure_sine() {
        let config = SyntheticConfig { noise_level: 0.0, ..Default::default() };
        let mut transport = open_transport(config);
        let decoder = SyntheticDecoder::new(8);

        let first = decoder.decode(&transport.read_frame(Duration::from_secs(1)).unwrap()).unwrap();
        assert!(first.channels().iter().all(|value| value.abs() < 1e-6));
    }
}
