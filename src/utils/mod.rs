//! Common utility functions for biostream-core

pub mod time;

pub use time::{
    current_timestamp_secs,
    MockTimeProvider,
    MonotonicTimeProvider,
    TimeProvider,
};
