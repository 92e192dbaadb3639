//! Serial output sharing and operator reports.
//!
//! Command replies and supervisor reports leave through one [`SerialOutput`].
//! Each call writes whole lines under a single guard, so a report never lands
//! in the middle of a multi-line reply.

use fgen_common::hal::driver::{HalError, SerialTx};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

/// Serial transmit side shared by all tasks.
#[derive(Clone)]
pub struct SerialOutput {
    tx: Arc<dyn SerialTx>,
    lock: Arc<Mutex<()>>,
}

impl SerialOutput {
    pub fn new(tx: Arc<dyn SerialTx>) -> Self {
        Self {
            tx,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Write `lines`, each terminated by `\n`, as one unit.
    pub fn write_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), HalError> {
        let mut buf = String::new();
        for line in lines {
            buf.push_str(line.as_ref());
            buf.push('\n');
        }
        let _guard = self.lock.lock();
        self.tx.write(buf.as_bytes())
    }
}

/// Severity of an operator report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "WARNING",
            Self::Fatal => "FATAL",
        })
    }
}

/// Emits supervisor reports to the log and, optionally, the serial line.
#[derive(Clone)]
pub struct Reporter {
    output: SerialOutput,
    echo: bool,
}

impl Reporter {
    /// `echo` controls whether reports are copied onto the serial output.
    pub fn new(output: SerialOutput, echo: bool) -> Self {
        Self { output, echo }
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.emit(Severity::Warning, &message.to_string());
    }

    pub fn fatal(&self, message: impl fmt::Display) {
        self.emit(Severity::Fatal, &message.to_string());
    }

    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => warn!(report = true, "{message}"),
            Severity::Fatal => error!(report = true, "{message}"),
        }
        if self.echo {
            let line = format!("[{severity}] {message}");
            // A failing transmitter is detected and handled by the command task.
            if let Err(e) = self.output.write_lines(&[line]) {
                warn!("Report not delivered to serial: {e}");
            }
        }
    }
}
