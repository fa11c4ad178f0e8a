// src/hal/serial_driver.rs
//! Serial board transport
//!
//! Opens a UART link with bounded retries, sends the board start/stop
//! commands and reads fixed-length frames, resynchronising on the frame header
//! byte whenever the stream is entered mid-frame.

use crate::config::constants::{cyton, serial::*};
use crate::hal::traits::{DeviceTransport, TransportError};
use crate::hal::types::{BoardDescriptor, RawFrame, CYTON_BOARD};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub connection_retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub max_resync_bytes: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_PORT_TIMEOUT_MS,
            connection_retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            max_resync_bytes: DEFAULT_MAX_RESYNC_BYTES,
        }
    }
}

impl SerialConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.baud_rate == 0 || self.baud_rate > MAX_BAUD_RATE {
            return Err(format!("Invalid baud rate: {}", self.baud_rate));
        }
        if self.timeout_ms == 0 || self.timeout_ms > 60_000 {
            return Err(format!("Invalid timeout: {} ms", self.timeout_ms));
        }
        if self.connection_retry_attempts == 0 || self.connection_retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(format!(
                "Invalid retry attempts: {} (1..={})",
                self.connection_retry_attempts, MAX_RETRY_ATTEMPTS
            ));
        }
        if self.max_resync_bytes == 0 {
            return Err("max_resync_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Byte stream to a board
pub trait SerialLink: Read + Write + Send {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

#[cfg(feature = "serial")]
impl SerialLink for Box<dyn serialport::SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(&mut **self, timeout).map_err(io::Error::from)
    }
}

/// Opens a link for a port name
pub type LinkOpener =
    Arc<dyn Fn(&SerialConfig, &str) -> io::Result<Box<dyn SerialLink>> + Send + Sync>;

#[cfg(feature = "serial")]
fn open_system_port(config: &SerialConfig, port_name: &str) -> io::Result<Box<dyn SerialLink>> {
    let port = serialport::new(port_name, config.baud_rate)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()?;
    Ok(Box::new(port))
}

#[cfg(not(feature = "serial"))]
fn open_system_port(_config: &SerialConfig, port_name: &str) -> io::Result<Box<dyn SerialLink>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("serial support is disabled, cannot open {port_name}"),
    ))
}

/// Connection statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    pub frames_received: u64,
    pub bytes_discarded: u64,
    pub connection_attempts: u32,
}

/// UART transport for the Cyton board
pub struct SerialTransport {
    descriptor: &'static BoardDescriptor,
    config: SerialConfig,
    opener: LinkOpener,
    link: Option<Box<dyn SerialLink>>,
    port_name: String,
    clock: Box<dyn TimeProvider>,
    stats: ConnectionStats,
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("board", &self.descriptor.name)
            .field("port_name", &self.port_name)
            .field("is_open", &self.link.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl SerialTransport {
    /// Transport using the system serial ports
    pub fn new(config: SerialConfig) -> Self {
        Self::with_opener(config, Arc::new(open_system_port))
    }

    /// Transport using a custom link opener
    pub fn with_opener(config: SerialConfig, opener: LinkOpener) -> Self {
        Self {
            descriptor: &CYTON_BOARD,
            config,
            opener,
            link: None,
            port_name: String::new(),
            clock: Box::new(MonotonicTimeProvider::new()),
            stats: ConnectionStats::default(),
        }
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    fn send_command(&mut self, command: &[u8]) -> Result<(), TransportError> {
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        link.write_all(command)?;
        link.flush()?;
        Ok(())
    }

    fn read_exact_within(
        link: &mut Box<dyn SerialLink>,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), TransportError> {
        link.read_exact(buf).map_err(|err| map_read_error(err, timeout))
    }
}

fn map_read_error(err: io::Error, timeout: Duration) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::timeout(timeout),
        _ => TransportError::Io(err),
    }
}

impl DeviceTransport for SerialTransport {
    fn open(&mut self, connection: &str) -> Result<(), TransportError> {
        if connection.trim().is_empty() {
            return Err(TransportError::Connection {
                connection: connection.to_string(),
                reason: "serial port name cannot be empty".to_string(),
            });
        }
        self.config.validate().map_err(|reason| TransportError::Connection {
            connection: connection.to_string(),
            reason,
        })?;

        let attempts = self.config.connection_retry_attempts;
        let mut last_error = None;
        for attempt in 1..=attempts {
            self.stats.connection_attempts += 1;
            match (self.opener)(&self.config, connection) {
                Ok(link) => {
                    tracing::info!(port = connection, attempt, "serial port opened");
                    self.link = Some(link);
                    self.port_name = connection.to_string();
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(port = connection, attempt, error = %err, "unable to open serial port");
                    last_error = Some(err);
                    if attempt < attempts {
                        std::thread::sleep(Duration::from_millis(
                            self.config.retry_base_delay_ms * attempt as u64,
                        ));
                    }
                }
            }
        }

        Err(TransportError::Connection {
            connection: connection.to_string(),
            reason: match last_error {
                Some(err) => format!("failed after {attempts} attempts: {err}"),
                None => format!("failed after {attempts} attempts"),
            },
        })
    }

    fn start(&mut self) -> Result<(), TransportError> {
        self.send_command(cyton::START_STREAM_COMMAND)
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        self.send_command(cyton::STOP_STREAM_COMMAND)
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<RawFrame, TransportError> {
        let package_length = self.descriptor.package_length;
        let max_resync = self.config.max_resync_bytes;
        let deadline = Instant::now() + timeout;
        let link = self.link.as_mut().ok_or(TransportError::NotOpen)?;
        link.set_timeout(timeout)?;

        let mut byte = [0u8; 1];
        let mut discarded = 0usize;
        loop {
            Self::read_exact_within(link, &mut byte, timeout)?;
            if byte[0] == cyton::HEADER {
                break;
            }
            discarded += 1;
            self.stats.bytes_discarded += 1;
            if discarded >= max_resync {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("no frame header within {discarded} bytes"),
                )));
            }
            if Instant::now() >= deadline {
                return Err(TransportError::timeout(timeout));
            }
        }

        let mut frame = vec![0u8; package_length];
        frame[0] = byte[0];
        Self::read_exact_within(link, &mut frame[1..], timeout)?;

        self.stats.frames_received += 1;
        if discarded > 0 {
            tracing::debug!(discarded, "resynchronised on frame header");
        }
        Ok(RawFrame::new(frame, self.clock.now_secs()))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut link) = self.link.take() {
            link.flush()?;
            tracing::info!(port = %self.port_name, "serial port closed");
        }
        Ok(())
    }

    fn descriptor(&self) -> &'static BoardDescriptor {
        self.descriptor
    }
}
