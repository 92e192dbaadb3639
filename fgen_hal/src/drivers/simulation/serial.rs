//! Serial transports of the simulation board.
//!
//! - [`StdinRx`] / [`StdoutTx`] - The process console acting as the UART
//! - [`LoopbackPort`] / [`LoopbackHost`] - In-process link for tests

use fgen_common::hal::driver::{HalError, Peripheral, SerialRx, SerialTx};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

// ─── Console ────────────────────────────────────────────────────────

/// Bytes read from stdin by a single pump thread.
///
/// Stdin outlives any one board, so the pump is started once per process and
/// shared by every `StdinRx` built after a reset.
static STDIN_PUMP: OnceLock<Result<Mutex<Receiver<u8>>, String>> = OnceLock::new();

fn stdin_pump() -> Result<&'static Mutex<Receiver<u8>>, HalError> {
    STDIN_PUMP
        .get_or_init(|| {
            let (tx, rx) = mpsc::channel();
            thread::Builder::new()
                .name("fgen-stdin".to_string())
                .spawn(move || {
                    let mut stdin = std::io::stdin().lock();
                    let mut buf = [0u8; 256];
                    loop {
                        match stdin.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => {
                                if buf[..n].iter().any(|&b| tx.send(b).is_err()) {
                                    break;
                                }
                            }
                        }
                    }
                    debug!("stdin closed");
                })
                .map(|_| Mutex::new(rx))
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| HalError::InitFailed(format!("stdin reader: {e}")))
}

/// Receive half reading the process stdin.
#[derive(Default)]
pub struct StdinRx {
    _private: (),
}

impl StdinRx {
    /// Create the receiver. The pump starts on `init()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripheral for StdinRx {
    fn name(&self) -> &'static str {
        "serial-rx"
    }

    fn init(&self) -> Result<(), HalError> {
        stdin_pump().map(|_| ())
    }
}

impl SerialRx for StdinRx {
    fn read_byte(&self, timeout: Duration) -> Result<Option<u8>, HalError> {
        let rx = stdin_pump()?.lock();
        match rx.recv_timeout(timeout) {
            Ok(b) => Ok(Some(b)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(HalError::Disconnected("stdin closed".to_string()))
            }
        }
    }
}

/// Transmit half writing the process stdout.
#[derive(Default)]
pub struct StdoutTx {
    _private: (),
}

impl StdoutTx {
    /// Create the transmitter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Peripheral for StdoutTx {
    fn name(&self) -> &'static str {
        "serial-tx"
    }
}

impl SerialTx for StdoutTx {
    fn write(&self, bytes: &[u8]) -> Result<(), HalError> {
        let mut out = std::io::stdout().lock();
        out.write_all(bytes)
            .and_then(|()| out.flush())
            .map_err(|e| HalError::CommunicationError(format!("stdout: {e}")))
    }
}

// ─── Loopback ───────────────────────────────────────────────────────

#[derive(Default)]
struct Link {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    read_pos: usize,
    closed: bool,
    fault: Option<HalError>,
}

#[derive(Default)]
struct Shared {
    link: Mutex<Link>,
    inbound_ready: Condvar,
    outbound_ready: Condvar,
}

/// Device side of an in-process serial link.
pub struct LoopbackPort {
    shared: Arc<Shared>,
}

/// Host side of an in-process serial link, driven by tests.
#[derive(Clone)]
pub struct LoopbackHost {
    shared: Arc<Shared>,
}

/// Create a connected port/host pair.
pub fn loopback() -> (LoopbackPort, LoopbackHost) {
    let shared = Arc::new(Shared::default());
    (
        LoopbackPort {
            shared: Arc::clone(&shared),
        },
        LoopbackHost { shared },
    )
}

impl Peripheral for LoopbackPort {
    fn name(&self) -> &'static str {
        "serial-loopback"
    }
}

impl SerialRx for LoopbackPort {
    fn read_byte(&self, timeout: Duration) -> Result<Option<u8>, HalError> {
        let deadline = Instant::now() + timeout;
        let mut link = self.shared.link.lock();
        loop {
            if let Some(fault) = &link.fault {
                return Err(fault.clone());
            }
            if let Some(b) = link.inbound.pop_front() {
                return Ok(Some(b));
            }
            if link.closed {
                return Err(HalError::Disconnected("loopback closed".to_string()));
            }
            if self
                .shared
                .inbound_ready
                .wait_until(&mut link, deadline)
                .timed_out()
            {
                return Ok(link.inbound.pop_front());
            }
        }
    }
}

impl SerialTx for LoopbackPort {
    fn write(&self, bytes: &[u8]) -> Result<(), HalError> {
        let mut link = self.shared.link.lock();
        if let Some(fault) = &link.fault {
            return Err(fault.clone());
        }
        link.outbound.extend_from_slice(bytes);
        self.shared.outbound_ready.notify_all();
        Ok(())
    }
}

impl LoopbackHost {
    /// Queue raw bytes for the device.
    pub fn send(&self, bytes: &[u8]) {
        let mut link = self.shared.link.lock();
        link.inbound.extend(bytes.iter().copied());
        self.shared.inbound_ready.notify_all();
    }

    /// Queue `line` followed by `\n`.
    pub fn send_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.send(&bytes);
    }

    /// Close the link; the device sees `Disconnected` once input is drained.
    pub fn close(&self) {
        self.shared.link.lock().closed = true;
        self.shared.inbound_ready.notify_all();
    }

    /// Make every further device read and write fail with `error`.
    pub fn inject_fault(&self, error: HalError) {
        self.shared.link.lock().fault = Some(error);
        self.shared.inbound_ready.notify_all();
    }

    /// Wait up to `timeout` for the next complete line written by the device.
    pub fn read_line(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut link = self.shared.link.lock();
        loop {
            let start = link.read_pos;
            if let Some(off) = link.outbound[start..].iter().position(|&b| b == b'\n') {
                let line = String::from_utf8_lossy(&link.outbound[start..start + off]).into_owned();
                link.read_pos = start + off + 1;
                return Some(line);
            }
            if self
                .shared
                .outbound_ready
                .wait_until(&mut link, deadline)
                .timed_out()
            {
                return None;
            }
        }
    }

    /// Like [`read_line`](Self::read_line) but skips `[...]` report lines.
    pub fn read_reply(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let line = self.read_line(deadline.saturating_duration_since(Instant::now()))?;
            if !line.starts_with('[') {
                return Some(line);
            }
        }
    }

    /// Send `line` and collect the next `count` reply lines.
    pub fn query(&self, line: &str, count: usize, timeout: Duration) -> Vec<String> {
        self.send_line(line);
        (0..count).map_while(|_| self.read_reply(timeout)).collect()
    }

    /// Report lines (`[WARNING] ...`, `[FATAL] ...`) written so far.
    pub fn reports(&self) -> Vec<String> {
        self.transcript()
            .lines()
            .filter(|l| l.starts_with('['))
            .map(str::to_string)
            .collect()
    }

    /// Everything the device has written so far.
    pub fn transcript(&self) -> String {
        String::from_utf8_lossy(&self.shared.link.lock().outbound).into_owned()
    }
}
