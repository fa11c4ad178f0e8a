// src/acquisition/session.rs
//! Acquisition session lifecycle
//!
//! A session owns one board connection. `start_stream` moves the transport
//! and decoder into a dedicated acquisition thread that feeds a shared
//! [`SampleBuffer`]; `stop_stream` hands them back. Readers only touch the
//! buffer, so reads never wait on the transport.

use crate::acquisition::sample_buffer::{BoardData, SampleBuffer};
use crate::config::constants::session::THREAD_NAME_PREFIX;
use crate::config::EngineConfig;
use crate::error::{BoardError, BoardResult};
use crate::hal::decoder::{decoder_for, FrameDecoder};
use crate::hal::traits::{DeviceTransport, TransportError};
use crate::hal::types::{BoardDescriptor, BoardId};
use crate::hal::{DefaultTransportFactory, TransportFactory};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    Prepared,
    Streaming,
    Stopped,
    Released,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::Prepared => "prepared",
            SessionState::Streaming => "streaming",
            SessionState::Stopped => "stopped",
            SessionState::Released => "released",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Acquisition loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_decoded: u64,
    /// Malformed frames and samples the buffer refused
    pub frames_dropped: u64,
    pub consecutive_failures: u32,
}

#[derive(Default)]
struct LoopCounters {
    decoded: AtomicU64,
    dropped: AtomicU64,
    consecutive_failures: AtomicU32,
    failed: AtomicBool,
}

type WorkerOutput = (Box<dyn DeviceTransport>, Box<dyn FrameDecoder>);

pub(crate) struct Worker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<WorkerOutput>,
}

pub(crate) enum StopOutcome {
    Stopped(WorkerOutput),
    /// The loop is still inside a read; it can be waited on again
    TimedOut(Worker),
    Panicked,
}

impl Worker {
    /// Ask the loop to exit; a request already queued is not repeated
    fn signal(&self) {
        if let Err(TrySendError::Disconnected(())) = self.stop_tx.try_send(()) {
            tracing::debug!("acquisition loop already exited");
        }
    }

    fn wait(self, timeout: Duration) -> StopOutcome {
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match self.handle.join() {
                Ok(output) => StopOutcome::Stopped(output),
                Err(_) => StopOutcome::Panicked,
            },
            Err(RecvTimeoutError::Timeout) => StopOutcome::TimedOut(self),
        }
    }
}

/// A stop request waiting for the acquisition loop to exit
///
/// Waiting needs no access to the session, so callers can wait without
/// holding whatever lock guards it.
pub(crate) struct PendingStop {
    worker: Worker,
    timeout: Duration,
}

impl PendingStop {
    pub(crate) fn wait(self) -> StopOutcome {
        self.worker.wait(self.timeout)
    }
}

struct LoopContext {
    board: &'static str,
    buffer: Arc<SampleBuffer>,
    counters: Arc<LoopCounters>,
    read_timeout: Duration,
    max_failures: u32,
    stop_rx: Receiver<()>,
    done_tx: Sender<()>,
}

/// One board connection and its acquisition loop
pub struct AcquisitionSession {
    descriptor: &'static BoardDescriptor,
    connection: String,
    config: EngineConfig,
    state: SessionState,
    transport: Option<Box<dyn DeviceTransport>>,
    decoder: Option<Box<dyn FrameDecoder>>,
    buffer: Option<Arc<SampleBuffer>>,
    worker: Option<Worker>,
    stopping: bool,
    counters: Arc<LoopCounters>,
}

impl fmt::Debug for AcquisitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionSession")
            .field("board", &self.descriptor.name)
            .field("connection", &self.connection)
            .field("state", &self.state())
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl AcquisitionSession {
    /// Create a session for a numeric board id using the default transports
    pub fn new(board_id: i32, connection: impl Into<String>, config: EngineConfig) -> BoardResult<Self> {
        let board = BoardId::from_id(board_id)?;
        let transport = DefaultTransportFactory.create(board, &config);
        Ok(Self::with_transport(board, connection, transport, config))
    }

    /// Create a session around an already constructed transport
    pub fn with_transport(
        board: BoardId,
        connection: impl Into<String>,
        transport: Box<dyn DeviceTransport>,
        config: EngineConfig,
    ) -> Self {
        let descriptor = board.descriptor();
        let connection = connection.into();
        tracing::debug!(board = descriptor.name, connection = %connection, "session created");
        Self {
            descriptor,
            connection,
            config,
            state: SessionState::Created,
            transport: Some(transport),
            decoder: Some(decoder_for(board)),
            buffer: None,
            worker: None,
            stopping: false,
            counters: Arc::new(LoopCounters::default()),
        }
    }

    /// Current state; a streaming session whose loop gave up reports `Failed`
    pub fn state(&self) -> SessionState {
        if self.state == SessionState::Streaming && self.counters.failed.load(Ordering::Acquire) {
            SessionState::Failed
        } else {
            self.state
        }
    }

    pub fn descriptor(&self) -> &'static BoardDescriptor {
        self.descriptor
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Capacity of the buffer allocated by `start_stream`
    pub fn buffer_capacity(&self) -> Option<usize> {
        self.buffer.as_ref().map(|buffer| buffer.capacity())
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_decoded: self.counters.decoded.load(Ordering::Relaxed),
            frames_dropped: self.counters.dropped.load(Ordering::Relaxed),
            consecutive_failures: self.counters.consecutive_failures.load(Ordering::Relaxed),
        }
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> BoardResult<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(BoardError::invalid_state(operation, format!("session is {state}")))
        }
    }

    /// Open the transport
    pub fn prepare(&mut self) -> BoardResult<()> {
        self.require("prepare", &[SessionState::Created])?;
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| BoardError::invalid_state("prepare", "transport missing"))?;

        match transport.open(&self.connection) {
            Ok(()) => {
                self.state = SessionState::Prepared;
                tracing::info!(board = self.descriptor.name, connection = %self.connection, "session prepared");
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed;
                tracing::error!(board = self.descriptor.name, connection = %self.connection, error = %err, "prepare failed");
                Err(match err {
                    TransportError::Connection { connection, reason } => {
                        BoardError::Connection { connection, reason }
                    }
                    other => BoardError::Connection {
                        connection: self.connection.clone(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Allocate the buffer and start the acquisition loop
    ///
    /// `None` sizes the buffer for `retention_secs` of data at the board
    /// sample rate.
    pub fn start_stream(&mut self, requested_samples: Option<usize>) -> BoardResult<()> {
        self.require("start_stream", &[SessionState::Prepared])?;

        let capacity = requested_samples
            .unwrap_or_else(|| self.descriptor.samples_for(self.config.retention_secs));
        if capacity == 0 || capacity > self.config.max_buffer_samples {
            return Err(BoardError::Allocation {
                requested: capacity,
                reason: format!(
                    "buffer size must be between 1 and {} samples",
                    self.config.max_buffer_samples
                ),
            });
        }
        let buffer = Arc::new(SampleBuffer::new(capacity, self.descriptor.num_channels)?);

        let (mut transport, decoder) = match (self.transport.take(), self.decoder.take()) {
            (Some(transport), Some(decoder)) => (transport, decoder),
            (transport, decoder) => {
                self.transport = transport;
                self.decoder = decoder;
                return Err(BoardError::invalid_state("start_stream", "transport missing"));
            }
        };
        if let Err(err) = transport.start() {
            tracing::error!(board = self.descriptor.name, error = %err, "board refused start command");
            self.transport = Some(transport);
            self.decoder = Some(decoder);
            return Err(err.into());
        }

        self.counters = Arc::new(LoopCounters::default());
        let (stop_tx, stop_rx) = channel::bounded(1);
        let (done_tx, done_rx) = channel::bounded(1);
        let context = LoopContext {
            board: self.descriptor.name,
            buffer: Arc::clone(&buffer),
            counters: Arc::clone(&self.counters),
            read_timeout: Duration::from_millis(self.config.read_timeout_ms),
            max_failures: self.config.max_consecutive_failures,
            stop_rx,
            done_tx,
        };

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", THREAD_NAME_PREFIX, self.descriptor.name))
            .spawn(move || acquisition_loop(transport, decoder, context));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.state = SessionState::Failed;
                tracing::error!(board = self.descriptor.name, error = %err, "unable to spawn acquisition thread");
                return Err(BoardError::Allocation {
                    requested: capacity,
                    reason: format!("unable to spawn acquisition thread: {err}"),
                });
            }
        };

        self.buffer = Some(buffer);
        self.worker = Some(Worker {
            stop_tx,
            done_rx,
            handle,
        });
        self.state = SessionState::Streaming;
        tracing::info!(board = self.descriptor.name, capacity, "stream started");
        Ok(())
    }

    /// Stop the acquisition loop; the buffer stays readable
    pub fn stop_stream(&mut self) -> BoardResult<()> {
        let pending = self.begin_stop()?;
        let outcome = pending.wait();
        self.finish_stop(outcome)
    }

    /// Signal the loop and take it out of the session
    ///
    /// The session keeps reporting `Streaming` until [`finish_stop`](Self::finish_stop).
    pub(crate) fn begin_stop(&mut self) -> BoardResult<PendingStop> {
        self.require("stop_stream", &[SessionState::Streaming])?;
        if self.stopping {
            return Err(BoardError::invalid_state("stop_stream", "stop already in progress"));
        }
        let worker = self
            .worker
            .take()
            .ok_or_else(|| BoardError::invalid_state("stop_stream", "acquisition loop missing"))?;
        worker.signal();
        self.stopping = true;
        Ok(PendingStop {
            worker,
            timeout: Duration::from_millis(self.config.stop_timeout_ms),
        })
    }

    pub(crate) fn finish_stop(&mut self, outcome: StopOutcome) -> BoardResult<()> {
        self.stopping = false;
        if let Some(buffer) = &self.buffer {
            buffer.seal();
        }
        let err = match outcome {
            StopOutcome::Stopped((mut transport, decoder)) => {
                if let Err(err) = transport.stop() {
                    tracing::warn!(board = self.descriptor.name, error = %err, "board refused stop command");
                }
                self.transport = Some(transport);
                self.decoder = Some(decoder);
                self.state = SessionState::Stopped;
                tracing::info!(board = self.descriptor.name, stats = ?self.stats(), "stream stopped");
                return Ok(());
            }
            StopOutcome::TimedOut(worker) => {
                // kept so release can wait for it once more
                self.worker = Some(worker);
                BoardError::Timeout {
                    operation: "stop_stream",
                    timeout_ms: self.config.stop_timeout_ms,
                }
            }
            StopOutcome::Panicked => BoardError::Io(io::Error::other("acquisition thread panicked")),
        };
        self.state = SessionState::Failed;
        tracing::error!(board = self.descriptor.name, error = %err, "stream did not stop cleanly");
        Err(err)
    }

    /// Whether `release_session` would be accepted now
    pub(crate) fn ensure_releasable(&self) -> BoardResult<()> {
        if self.stopping {
            return Err(BoardError::invalid_state("release_session", "stop in progress"));
        }
        self.require(
            "release_session",
            &[
                SessionState::Created,
                SessionState::Prepared,
                SessionState::Stopped,
                SessionState::Failed,
            ],
        )
    }

    /// Close the transport and free the buffer
    pub fn release_session(&mut self) -> BoardResult<()> {
        self.ensure_releasable()?;
        self.shutdown();
        self.state = SessionState::Released;
        tracing::info!(board = self.descriptor.name, "session released");
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.signal();
            match worker.wait(Duration::from_millis(self.config.stop_timeout_ms)) {
                StopOutcome::Stopped((mut transport, decoder)) => {
                    if let Err(err) = transport.stop() {
                        tracing::debug!(error = %err, "stop command failed during shutdown");
                    }
                    self.transport = Some(transport);
                    self.decoder = Some(decoder);
                }
                StopOutcome::TimedOut(_) => {
                    tracing::warn!(
                        board = self.descriptor.name,
                        "acquisition loop abandoned, it closes the transport when its read returns"
                    );
                }
                StopOutcome::Panicked => {
                    tracing::warn!(board = self.descriptor.name, "acquisition thread panicked, transport lost");
                }
            }
        }
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close() {
                tracing::warn!(board = self.descriptor.name, error = %err, "transport close failed");
            }
        }
        self.decoder = None;
        self.buffer = None;
    }

    fn readable_buffer(&self, operation: &'static str) -> BoardResult<&SampleBuffer> {
        self.require(operation, &[SessionState::Streaming, SessionState::Stopped])?;
        self.buffer
            .as_deref()
            .ok_or_else(|| BoardError::invalid_state(operation, "no buffer allocated"))
    }

    /// Up to `n` most recent samples without removing them; `n <= 0` reads nothing
    pub fn get_current_data(&self, n: i64) -> BoardResult<BoardData> {
        let buffer = self.readable_buffer("get_current_data")?;
        if n <= 0 {
            return Ok(BoardData::empty(buffer.width()));
        }
        Ok(buffer.drain_latest(usize::try_from(n).unwrap_or(usize::MAX)))
    }

    /// Every buffered sample; the buffer is emptied
    pub fn get_all_data(&self) -> BoardResult<BoardData> {
        Ok(self.readable_buffer("get_all_data")?.drain_all())
    }

    /// Remove and return up to `max` of the oldest samples
    pub fn get_board_data(&self, max: usize) -> BoardResult<BoardData> {
        Ok(self.readable_buffer("get_board_data")?.drain_oldest(max))
    }

    pub fn get_board_data_count(&self) -> BoardResult<usize> {
        Ok(self.readable_buffer("get_board_data_count")?.count())
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        if self.state != SessionState::Released {
            self.shutdown();
        }
    }
}

fn acquisition_loop(
    mut transport: Box<dyn DeviceTransport>,
    decoder: Box<dyn FrameDecoder>,
    context: LoopContext,
) -> WorkerOutput {
    let counters = &context.counters;
    tracing::debug!(board = context.board, "acquisition loop running");

    loop {
        match context.stop_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }

        let sample = match transport.read_frame(context.read_timeout) {
            Ok(frame) => decoder.decode(&frame).map_err(|err| {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                BoardError::from(err)
            }),
            Err(err) if !err.is_transient() => {
                counters.failed.store(true, Ordering::Release);
                tracing::error!(board = context.board, error = %err, "transport unusable, acquisition stopped");
                break;
            }
            Err(err) => Err(BoardError::from(err)),
        };

        match sample {
            Ok(sample) => {
                if context.buffer.push(&sample) {
                    counters.decoded.fetch_add(1, Ordering::Relaxed);
                } else {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
                counters.consecutive_failures.store(0, Ordering::Relaxed);
            }
            Err(err) => {
                let failures = counters.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures > context.max_failures {
                    counters.failed.store(true, Ordering::Release);
                    tracing::error!(board = context.board, failures, error = %err, "too many consecutive failures, acquisition stopped");
                    break;
                }
                if failures == 1 {
                    tracing::warn!(board = context.board, error = %err, "frame lost");
                } else {
                    tracing::debug!(board = context.board, failures, error = %err, "frame lost");
                }
            }
        }
    }

    if context.done_tx.send(()).is_err() {
        tracing::debug!(board = context.board, "session gone before loop exit, closing transport");
        if let Err(err) = transport.stop() {
            tracing::debug!(board = context.board, error = %err, "stop command failed");
        }
        if let Err(err) = transport.close() {
            tracing::warn!(board = context.board, error = %err, "transport close failed");
        }
    }
    tracing::debug!(board = context.board, "acquisition loop exited");
    (transport, decoder)
}
