//! Time-bounded line reading.
//!
//! [`NonBlockingReader`] moves the blocking `read_line` calls of a source
//! onto a dedicated reader thread and hands lines over a channel. Each
//! [`read_line`](ReadLine::read_line) call waits at most `tries` rounds of
//! `timeout`, so the shell loop can observe a stop request even while no
//! input arrives. Cancellation is cooperative: a blocking read already in
//! progress on the reader thread keeps running, and the line it yields is
//! held for the next caller. [`SharedReader`] lets successive runs share one
//! reader thread, so a stopped run never leaves a second thread competing
//! for the same input.

use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use lineshell_types::{Result, ShellConfig, ShellError};

use crate::cancel::CancelToken;

/// Consecutive I/O errors after which the reader thread gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

/// A source of input lines for the shell loop.
pub trait ReadLine: Send {
    /// Next line, or `None` if no line is available right now.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Whether the source is exhausted and will never yield again.
    fn at_eof(&self) -> bool {
        false
    }
}

/// A [`ReadLine`] whose reads return within `tries × timeout`.
pub struct NonBlockingReader {
    rx: Option<Receiver<io::Result<String>>>,
    tries: u32,
    timeout: Duration,
    cancel: Option<CancelToken>,
    /// Line received after cancellation, handed to the next read.
    pending: Option<String>,
    eof: bool,
}

impl NonBlockingReader {
    /// Start a reader thread over `source`.
    pub fn spawn<R>(source: R, tries: u32, timeout: Duration) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        if tries == 0 || timeout.is_zero() {
            return Err(ShellError::Reader(
                "tries and timeout must be non-zero".to_string(),
            ));
        }
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("lineshell-reader".to_string())
            .spawn(move || read_task(source, tx))
            .map_err(|e| ShellError::Reader(format!("cannot start reader thread: {e}")))?;
        Ok(Self {
            rx: Some(rx),
            tries,
            timeout,
            cancel: None,
            pending: None,
            eof: false,
        })
    }

    /// Start a reader over `source` with the tries and timeout of `config`.
    pub fn from_config<R>(source: R, config: &ShellConfig) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Self::spawn(source, config.read_tries, config.read_timeout())
    }

    /// Start a reader over the process's standard input.
    pub fn stdin(config: &ShellConfig) -> Result<Self> {
        Self::from_config(BufReader::new(io::stdin()), config)
    }

    /// Return `None` from every read once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.set_cancel(token);
        self
    }

    pub fn set_cancel(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    /// Drop the channel; the reader thread exits after its current read.
    pub fn close(&mut self) {
        if self.rx.take().is_some() {
            log::debug!("reader closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl ReadLine for NonBlockingReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        if self.cancelled() {
            return Ok(None);
        }
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        if self.eof {
            return Ok(None);
        }
        for round in 1..=self.tries {
            let Some(rx) = self.rx.as_ref() else {
                return Ok(None);
            };
            match rx.recv_timeout(self.timeout) {
                Ok(Ok(line)) if self.cancelled() => {
                    log::debug!("holding line read after cancellation");
                    self.pending = Some(line);
                    return Ok(None);
                },
                Ok(Ok(line)) => return Ok(Some(line)),
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    log::trace!("read round {round}/{} timed out", self.tries);
                },
                Err(RecvTimeoutError::Disconnected) => {
                    self.eof = true;
                    return Ok(None);
                },
            }
            if self.cancelled() {
                return Ok(None);
            }
        }
        Ok(None)
    }

    fn at_eof(&self) -> bool {
        self.eof && self.pending.is_none()
    }
}

/// A per-run handle on a [`NonBlockingReader`] shared across runs.
///
/// Every handle carries its own cancel token. Reads through a cancelled
/// handle return `None` and leave unread input to later handles.
pub struct SharedReader {
    inner: Arc<Mutex<NonBlockingReader>>,
    cancel: CancelToken,
}

impl SharedReader {
    pub fn new(reader: NonBlockingReader) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
            cancel: CancelToken::new(),
        }
    }

    /// Another handle on the same reader, bound to `cancel`.
    pub fn handle(&self, cancel: CancelToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, NonBlockingReader> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReadLine for SharedReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut reader = self.lock();
        reader.set_cancel(self.cancel.clone());
        reader.read_line()
    }

    fn at_eof(&self) -> bool {
        self.lock().at_eof()
    }
}

/// Body of the reader thread.
///
/// Blank lines are skipped. The thread ends at end of stream, when the
/// receiving side is gone, or after too many consecutive errors; in every
/// case dropping `tx` tells the reader the stream is over.
fn read_task<R: BufRead>(mut source: R, tx: SyncSender<io::Result<String>>) {
    let mut failures = 0;
    let mut buf = String::new();
    loop {
        buf.clear();
        match source.read_line(&mut buf) {
            Ok(0) => return,
            Ok(_) => {
                failures = 0;
                let line = buf.trim_end_matches(['\r', '\n']);
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(Ok(line.to_string())).is_err() {
                    return;
                }
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => {
                failures += 1;
                let give_up = failures >= MAX_CONSECUTIVE_FAILURES;
                if give_up {
                    log::warn!("reader giving up after {failures} consecutive errors");
                }
                if tx.send(Err(e)).is_err() || give_up {
                    return;
                }
            },
        }
    }
}

/// A [`ReadLine`] over a fixed list of lines, read without blocking.
#[derive(Debug, Default)]
pub struct ScriptedReader {
    lines: std::collections::VecDeque<String>,
}

impl ScriptedReader {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl ReadLine for ScriptedReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn at_eof(&self) -> bool {
        self.lines.is_empty()
    }
}
