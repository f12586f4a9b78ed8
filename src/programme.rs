// Terminal-mode programme executor
//
// A programme is an ordered batch of textual commands. Each command is
// sent through the character-echo handshake, then exactly one response
// line is read and parsed as an integer status code. The first nonzero
// status aborts the run; earlier steps are not rolled back.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::transport::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ProgrammeError {
    #[error("no connection open")]
    NotConnected,

    #[error("transport error at step {step}: {source}")]
    Transport {
        step: usize,
        source: TransportError,
    },

    #[error("step {step} response {line:?} is not a status code")]
    BadResponse { step: usize, line: String },
}

/// How a run ended. `StepFailed` reports the zero-based index of the
/// failing step; later steps were never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum ProgrammeOutcome {
    Completed { steps: usize },
    StepFailed { step: usize, code: i64 },
}

impl ProgrammeOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            ProgrammeOutcome::Completed { .. } => 0,
            ProgrammeOutcome::StepFailed { .. } => 1,
        }
    }
}

/// Ordered batch of terminal commands.
#[derive(Debug, Clone, Default)]
pub struct Programme {
    commands: Vec<String>,
}

impl Programme {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    /// One command per line; blank lines are skipped.
    pub fn from_lines(text: &str) -> Self {
        Self {
            commands: text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Run every command in order, stopping at the first nonzero
    /// status. A malformed response is fatal for the run, not retried.
    pub fn run(&self, transport: &mut Transport) -> Result<ProgrammeOutcome, ProgrammeError> {
        if !transport.is_connected() {
            return Err(ProgrammeError::NotConnected);
        }

        for (step, command) in self.commands.iter().enumerate() {
            info!("step {step}: sending {command:?}");

            let mut wire = command.clone();
            wire.push('\r');
            transport
                .send_terminal_command(&wire)
                .map_err(|source| ProgrammeError::Transport { step, source })?;

            let line = transport
                .read_terminal_line()
                .map_err(|source| ProgrammeError::Transport { step, source })?
                .ok_or(ProgrammeError::NotConnected)?;

            let text = String::from_utf8_lossy(&line);
            let status: i64 = text
                .trim_matches(['\r', '\n'])
                .parse()
                .map_err(|_| ProgrammeError::BadResponse {
                    step,
                    line: text.to_string(),
                })?;

            if status == 0 {
                debug!("step {step} succeeded");
            } else {
                warn!("step {step} failed with status {status}, aborting programme");
                return Ok(ProgrammeOutcome::StepFailed { step, code: status });
            }
        }

        info!("programme completed: {} steps", self.commands.len());
        Ok(ProgrammeOutcome::Completed {
            steps: self.commands.len(),
        })
    }
}
