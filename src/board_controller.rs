// src/board_controller.rs
//! Status-code boundary for language bindings
//!
//! Every function returns a [`StatusCode`] as `i32` and writes results into
//! caller-owned buffers. Data is row-major `count × num_channels` with one
//! timestamp per row. The free functions operate on
//! [`SessionRegistry::global`]; [`BoardController`] binds the same calls to
//! any registry.

use crate::acquisition::{BoardData, SessionRegistry};
use crate::error::{BoardError, BoardResult, StatusCode};
use crate::hal::types::BoardId;
use crate::logger::Logger;

fn status(result: BoardResult<()>) -> i32 {
    match result {
        Ok(()) => StatusCode::Ok.as_i32(),
        Err(err) => {
            let code = err.status_code();
            tracing::debug!(code = %code, error = %err, "board call failed");
            code.as_i32()
        }
    }
}

fn check_output(rows: usize, width: usize, data: &[f32], timestamps: &[f64]) -> BoardResult<()> {
    let needed = rows.saturating_mul(width);
    if data.len() < needed || timestamps.len() < rows {
        return Err(BoardError::InvalidArguments(format!(
            "output buffers hold {} values and {} timestamps, {} rows of {} channels need {} and {}",
            data.len(),
            timestamps.len(),
            rows,
            width,
            needed,
            rows
        )));
    }
    Ok(())
}

/// Copy a read into the caller buffers, checked against the rows actually returned
fn copy_out(board_data: &BoardData, data: &mut [f32], timestamps: &mut [f64]) -> BoardResult<usize> {
    let count = board_data.count();
    check_output(count, board_data.width(), data, timestamps)?;
    let values = board_data.data();
    data[..values.len()].copy_from_slice(values);
    timestamps[..count].copy_from_slice(board_data.timestamps());
    Ok(count)
}

/// Binding calls against one registry
#[derive(Debug, Clone, Copy)]
pub struct BoardController<'a> {
    registry: &'a SessionRegistry,
}

impl<'a> BoardController<'a> {
    pub fn new(registry: &'a SessionRegistry) -> Self {
        Self { registry }
    }

    pub fn prepare_session(&self, board_id: i32, connection: &str) -> i32 {
        status(self.registry.prepare_session(board_id, connection))
    }

    /// `buffer_size` is the buffer capacity in samples and must be positive
    pub fn start_stream(&self, buffer_size: i32) -> i32 {
        let capacity = match usize::try_from(buffer_size) {
            Ok(size) if size > 0 => size,
            _ => {
                return status(Err(BoardError::Allocation {
                    requested: 0,
                    reason: format!("buffer size {buffer_size} must be positive"),
                }))
            }
        };
        status(self.registry.start_stream(Some(capacity)))
    }

    pub fn stop_stream(&self) -> i32 {
        status(self.registry.stop_stream())
    }

    pub fn release_session(&self) -> i32 {
        status(self.registry.release_session())
    }

    /// Copy up to `num_samples` most recent samples without removing them
    pub fn get_current_board_data(
        &self,
        num_samples: i32,
        data: &mut [f32],
        timestamps: &mut [f64],
        returned: &mut i64,
    ) -> i32 {
        status(self.copy_current(num_samples, data, timestamps).map(|count| {
            *returned = count as i64;
        }))
    }

    /// Remove and copy up to `count` of the oldest samples
    pub fn get_board_data(&self, count: i32, data: &mut [f32], timestamps: &mut [f64]) -> i32 {
        status(self.copy_oldest(count, data, timestamps).map(|_| ()))
    }

    pub fn get_board_data_count(&self, out: &mut i64) -> i32 {
        status(self.registry.get_board_data_count().map(|count| {
            *out = count as i64;
        }))
    }

    // the row width and the read come from the same session
    fn copy_current(&self, num_samples: i32, data: &mut [f32], timestamps: &mut [f64]) -> BoardResult<usize> {
        let rows = usize::try_from(num_samples).unwrap_or(0);
        let latest = self.registry.with_session("get_current_board_data", |session| {
            check_output(rows, session.descriptor().num_channels, data, timestamps)?;
            session.get_current_data(num_samples as i64)
        })?;
        copy_out(&latest, data, timestamps)
    }

    fn copy_oldest(&self, count: i32, data: &mut [f32], timestamps: &mut [f64]) -> BoardResult<usize> {
        let rows = usize::try_from(count)
            .map_err(|_| BoardError::InvalidArguments(format!("sample count {count} is negative")))?;
        let oldest = self.registry.with_session("get_board_data", |session| {
            check_output(rows, session.descriptor().num_channels, data, timestamps)?;
            session.get_board_data(rows)
        })?;
        copy_out(&oldest, data, timestamps)
    }
}

fn global() -> BoardController<'static> {
    BoardController::new(SessionRegistry::global())
}

pub fn prepare_session(board_id: i32, connection: &str) -> i32 {
    global().prepare_session(board_id, connection)
}

pub fn start_stream(buffer_size: i32) -> i32 {
    global().start_stream(buffer_size)
}

pub fn stop_stream() -> i32 {
    global().stop_stream()
}

pub fn release_session() -> i32 {
    global().release_session()
}

pub fn get_current_board_data(
    num_samples: i32,
    data: &mut [f32],
    timestamps: &mut [f64],
    returned: &mut i64,
) -> i32 {
    global().get_current_board_data(num_samples, data, timestamps, returned)
}

pub fn get_board_data(count: i32, data: &mut [f32], timestamps: &mut [f64]) -> i32 {
    global().get_board_data(count, data, timestamps)
}

pub fn get_board_data_count(out: &mut i64) -> i32 {
    global().get_board_data_count(out)
}

/// Set the process-wide log level, `0` (trace) to `6` (off)
pub fn set_log_level(level: i32) -> i32 {
    status(Logger::global().set_level_code(level))
}

/// Board descriptor as JSON
pub fn get_board_descr(board_id: i32, out: &mut String) -> i32 {
    status(board_descr_json(board_id).map(|json| {
        out.clear();
        out.push_str(&json);
    }))
}

fn board_descr_json(board_id: i32) -> BoardResult<String> {
    let descriptor = BoardId::from_id(board_id)?.descriptor();
    serde_json::to_string(descriptor).map_err(|err| BoardError::Io(err.into()))
}
