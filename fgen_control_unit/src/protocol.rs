//! Command Protocol Engine.
//!
//! Line-oriented ASCII protocol, one command per line, one reply per command.
//!
//! - [`framing`] - Byte stream to lines
//! - [`command`] - Line to [`command::Command`]
//! - [`response`] - Reply formatting
//! - [`dispatch`] - Validation, state mutation and driver calls
//!
//! [`CommandTask`] ties them to the serial transport.

pub mod command;
pub mod dispatch;
pub mod framing;
pub mod response;

use crate::error::TaskError;
use crate::report::SerialOutput;
use crate::scheduler::{CancelToken, TaskExit};
use dispatch::{CommandEngine, DispatchOutcome};
use fgen_common::hal::driver::{HalError, SerialRx};
use framing::LineFramer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// The command task: read a line, dispatch it, write the reply.
pub struct CommandTask {
    engine: CommandEngine,
    framer: LineFramer,
    rx: Arc<dyn SerialRx>,
    output: SerialOutput,
    poll: Duration,
}

impl CommandTask {
    pub fn new(
        engine: CommandEngine,
        max_line_len: usize,
        rx: Arc<dyn SerialRx>,
        output: SerialOutput,
        poll: Duration,
    ) -> Self {
        Self {
            engine,
            framer: LineFramer::new(max_line_len),
            rx,
            output,
            poll,
        }
    }

    /// Serve commands until cancelled, reset, or the input closes.
    ///
    /// Cancellation is checked between commands; a command whose line is
    /// complete is always dispatched and answered.
    ///
    /// # Errors
    /// Serial or driver failures.
    pub fn run(mut self, cancel: &CancelToken) -> Result<TaskExit, TaskError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(TaskExit::Cancelled);
            }
            let line = match self.framer.poll_line(self.rx.as_ref(), self.poll) {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(HalError::Disconnected(reason)) => {
                    info!("Serial input closed: {reason}");
                    return Ok(TaskExit::InputClosed);
                }
                Err(e) => return Err(TaskError::transport("serial")(e)),
            };
            debug!(%line, "Command received");

            let reply = self.engine.handle_line(&line)?;
            self.output
                .write_lines(&reply.response.lines())
                .map_err(TaskError::transport("serial"))?;

            if reply.outcome == DispatchOutcome::Reset {
                self.engine.perform_reset()?;
                return Ok(TaskExit::Reset);
            }
        }
    }
}
