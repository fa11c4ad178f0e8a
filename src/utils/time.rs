// src/utils/time.rs
//! Timestamp sources for frame capture times

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    /// Seconds since the Unix epoch
    fn now_secs(&self) -> f64;
}

/// Wall-clock anchored monotonic clock
///
/// Reads the system clock once and advances it with `Instant`, so successive
/// timestamps never decrease.
pub struct MonotonicTimeProvider {
    anchor_secs: f64,
    anchor: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self {
            anchor_secs: current_timestamp_secs(),
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_secs(&self) -> f64 {
        self.anchor_secs + self.anchor.elapsed().as_secs_f64()
    }
}

/// Mock time provider for deterministic testing
pub struct MockTimeProvider {
    current_nanos: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_secs: f64) -> Self {
        Self {
            current_nanos: AtomicU64::new((initial_secs * 1e9) as u64),
        }
    }

    pub fn advance_by_secs(&self, secs: f64) {
        self.current_nanos
            .fetch_add((secs * 1e9) as u64, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_secs(&self) -> f64 {
        self.current_nanos.load(Ordering::Relaxed) as f64 / 1e9
    }
}

/// Current wall-clock time in seconds since the Unix epoch
pub fn current_timestamp_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monotonic_provider_never_decreases() {
        let clock = MonotonicTimeProvider::new();
        let mut last = clock.now_secs();
        for _ in 0..1000 {
            let now = clock.now_secs();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_monotonic_provider_tracks_wall_clock() {
        let clock = MonotonicTimeProvider::new();
        std::thread::sleep(Duration::from_millis(5));
        let drift = (clock.now_secs() - current_timestamp_secs()).abs();
        assert!(drift < 1.0, "drift {drift} s");
    }

    #[test]
    fn test_mock_provider() {
        let clock = MockTimeProvider::new(100.0);
        assert!((clock.now_secs() - 100.0).abs() < 1e-9);
        clock.advance_by_secs(0.004);
        assert!((clock.now_secs() - 100.004).abs() < 1e-6);
    }
}
