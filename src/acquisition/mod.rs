// src/acquisition/mod.rs
//! Session lifecycle, acquisition loop and sample buffering

pub mod registry;
pub mod sample_buffer;
pub mod session;

pub use registry::SessionRegistry;
pub use sample_buffer::{BoardData, SampleBuffer};
pub use session::{AcquisitionSession, SessionState, SessionStats};
