// src/acquisition/registry.rs
//! Process-wide session slot

use crate::acquisition::sample_buffer::BoardData;
use crate::acquisition::session::{AcquisitionSession, SessionState, SessionStats};
use crate::config::loader::ConfigLoader;
use crate::config::EngineConfig;
use crate::error::{BoardError, BoardResult};
use crate::hal::types::BoardId;
use crate::hal::{DefaultTransportFactory, TransportFactory};
use crate::logger::Logger;
use parking_lot::Mutex;
use std::sync::OnceLock;

/// Holds at most one active session
///
/// The slot lock is held only for state checks and buffer reads. Opening a
/// transport, waiting for the acquisition loop to stop and closing the
/// transport all happen outside it, so readers never wait on a lifecycle
/// transition.
pub struct SessionRegistry {
    config: EngineConfig,
    factory: Box<dyn TransportFactory>,
    slot: Mutex<Option<AcquisitionSession>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .field("slot", &*self.slot.lock())
            .finish()
    }
}

static GLOBAL: OnceLock<SessionRegistry> = OnceLock::new();

impl SessionRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_factory(config, Box::new(DefaultTransportFactory))
    }

    /// Registry building transports through a custom factory
    pub fn with_factory(config: EngineConfig, factory: Box<dyn TransportFactory>) -> Self {
        Self {
            config,
            factory,
            slot: Mutex::new(None),
        }
    }

    /// Registry used by the binding boundary
    ///
    /// Configuration is loaded on first use; a configuration that fails to
    /// load is reported and replaced by the defaults.
    pub fn global() -> &'static SessionRegistry {
        GLOBAL.get_or_init(|| {
            let config = match ConfigLoader::new().load() {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(error = %err, "using default configuration");
                    EngineConfig::default()
                }
            };
            Logger::global().set_level(config.log_level);
            SessionRegistry::new(config)
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a session for `board_id` and open its transport
    ///
    /// A session whose transport fails to open stays registered in the
    /// `Failed` state until it is released.
    pub fn prepare_session(&self, board_id: i32, connection: &str) -> BoardResult<()> {
        if let Some(active) = self.slot.lock().as_ref() {
            return Err(occupied(active));
        }

        let board = BoardId::from_id(board_id)?;
        let transport = self.factory.create(board, &self.config);
        let mut session =
            AcquisitionSession::with_transport(board, connection, transport, self.config.clone());
        let prepared = session.prepare();

        let mut slot = self.slot.lock();
        if let Some(active) = slot.as_ref() {
            let err = occupied(active);
            drop(slot);
            drop(session);
            return Err(err);
        }
        *slot = Some(session);
        prepared
    }

    pub(crate) fn with_session<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut AcquisitionSession) -> BoardResult<T>,
    ) -> BoardResult<T> {
        let mut slot = self.slot.lock();
        match slot.as_mut() {
            Some(session) => f(session),
            None => Err(no_session(operation)),
        }
    }

    /// Start streaming; `None` sizes the buffer from `retention_secs`
    pub fn start_stream(&self, requested_samples: Option<usize>) -> BoardResult<()> {
        self.with_session("start_stream", |session| session.start_stream(requested_samples))
    }

    /// Stop streaming; the wait for the acquisition loop runs unlocked
    pub fn stop_stream(&self) -> BoardResult<()> {
        let pending = self.with_session("stop_stream", AcquisitionSession::begin_stop)?;
        let outcome = pending.wait();
        self.with_session("stop_stream", |session| session.finish_stop(outcome))
    }

    /// Release the session and free the slot
    pub fn release_session(&self) -> BoardResult<()> {
        let mut slot = self.slot.lock();
        slot.as_ref()
            .ok_or_else(|| no_session("release_session"))?
            .ensure_releasable()?;
        let mut session = slot.take().ok_or_else(|| no_session("release_session"))?;
        drop(slot);
        session.release_session()
    }

    pub fn get_current_data(&self, n: i64) -> BoardResult<BoardData> {
        self.with_session("get_current_data", |session| session.get_current_data(n))
    }

    pub fn get_all_data(&self) -> BoardResult<BoardData> {
        self.with_session("get_all_data", |session| session.get_all_data())
    }

    pub fn get_board_data(&self, max: usize) -> BoardResult<BoardData> {
        self.with_session("get_board_data", |session| session.get_board_data(max))
    }

    pub fn get_board_data_count(&self) -> BoardResult<usize> {
        self.with_session("get_board_data_count", |session| session.get_board_data_count())
    }

    /// State of the registered session, if any
    pub fn state(&self) -> Option<SessionState> {
        self.slot.lock().as_ref().map(AcquisitionSession::state)
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.slot.lock().as_ref().map(AcquisitionSession::stats)
    }

    /// Board served by the registered session, if any
    pub fn active_board(&self) -> Option<BoardId> {
        self.slot.lock().as_ref().map(|session| session.descriptor().board)
    }
}

fn no_session(operation: &'static str) -> BoardError {
    BoardError::invalid_state(operation, "no session prepared")
}

fn occupied(session: &AcquisitionSession) -> BoardError {
    BoardError::invalid_state(
        "prepare_session",
        format!("a {} session is already {}", session.descriptor().name, session.state()),
    )
}
