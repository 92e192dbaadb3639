//! Line framing.
//!
//! - `\n` and `\r` terminate a line; a terminator with nothing accumulated
//!   produces no line.
//! - Spaces and tabs before the first other byte of a line are dropped.
//! - A line reaching `max_len` bytes is delivered as is; the rest of the
//!   input continues as the next line.

use fgen_common::hal::driver::{HalError, SerialRx};
use std::time::Duration;

/// Incremental line assembler.
#[derive(Debug, Clone)]
pub struct LineFramer {
    buf: Vec<u8>,
    max_len: usize,
}

impl LineFramer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len),
            max_len: max_len.max(1),
        }
    }

    /// Feed one byte; returns a line when one completes.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\n' | b'\r' => {
                if self.buf.is_empty() {
                    None
                } else {
                    Some(self.take())
                }
            }
            b' ' | b'\t' if self.buf.is_empty() => None,
            _ => {
                self.buf.push(byte);
                (self.buf.len() >= self.max_len).then(|| self.take())
            }
        }
    }

    /// Read from `rx` until a line completes or `timeout` passes without a byte.
    ///
    /// A partial line stays buffered for the next call.
    pub fn poll_line(
        &mut self,
        rx: &dyn SerialRx,
        timeout: Duration,
    ) -> Result<Option<String>, HalError> {
        while let Some(byte) = rx.read_byte(timeout)? {
            if let Some(line) = self.push(byte) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}
