//! Shared test fixtures for the terminal crate.
//!
//! [`TestShell`] wires a [`Shell`] to a [`MemoryReporter`], an in-memory
//! file tree and a captured console.

use std::collections::VecDeque;
use std::io::{self, BufReader, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use lineshell_types::ShellConfig;
use lineshell_vfs::MemoryFs;

use crate::interpreter::{CommandInterpreter, Status};
use crate::parser::LineParser;
use crate::reader::ReadLine;
use crate::reporter::MemoryReporter;
use crate::shell::Shell;
use crate::{ShellBuilder, register_builtins};

/// A clonable console sink whose contents can be inspected.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A shell plus handles on everything it writes.
pub struct TestShell {
    pub shell: Shell,
    pub reporter: Arc<MemoryReporter>,
    pub console: SharedBuffer,
}

impl TestShell {
    pub fn new() -> Self {
        Self::with_config(ShellConfig::default())
    }

    pub fn with_config(config: ShellConfig) -> Self {
        Self::build(config, MemoryFs::new())
    }

    /// A shell over `files` with the builtin commands registered.
    pub fn with_files(files: MemoryFs) -> Self {
        Self::scripted(ShellConfig::default(), files)
    }

    pub fn scripted(config: ShellConfig, files: MemoryFs) -> Self {
        let mut t = Self::build(config, files);
        register_builtins(&mut t.shell);
        t
    }

    fn build(config: ShellConfig, files: MemoryFs) -> Self {
        let reporter = Arc::new(MemoryReporter::new());
        let console = SharedBuffer::default();
        let sink = Arc::clone(&reporter);
        let shell = ShellBuilder::new(config)
            .reporter(sink)
            .files(Arc::new(files))
            .console(Box::new(console.clone()))
            .build_shell()
            .unwrap();
        Self {
            shell,
            reporter,
            console,
        }
    }
}

/// An interpreter that records its calls and returns a fixed status.
pub struct RecordingCmd {
    words: Vec<&'static str>,
    status: Status,
    panics: bool,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingCmd {
    pub fn new(words: &[&'static str], status: Status) -> Self {
        Self {
            words: words.to_vec(),
            status,
            panics: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn panicking(words: &[&'static str]) -> Self {
        Self {
            panics: true,
            ..Self::new(words, Status::Ok)
        }
    }

    /// `(command, args)` of every call so far.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandInterpreter for RecordingCmd {
    fn commands(&self) -> &[&str] {
        &self.words
    }

    fn interpret(&self, command: &str, line: &LineParser, _shell: &mut Shell) -> Status {
        assert!(!self.panics, "{command} exploded");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((command.to_string(), line.args().map(str::to_string)));
        self.status
    }
}

/// Register a shared interpreter, keeping the caller's handle.
pub fn register<C: CommandInterpreter + 'static>(shell: &mut Shell, cmd: &Arc<C>) -> bool {
    let handle = Arc::clone(cmd);
    shell.add_command_interpreter(handle)
}

/// A memory tree holding `files` as `(path, text)` pairs.
pub fn memory_fs(files: &[(&str, &str)]) -> MemoryFs {
    let mut fs = MemoryFs::new();
    for (path, text) in files {
        fs.write(path, text).unwrap();
    }
    fs
}

/// One scripted outcome of [`StepReader::read_line`].
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Line(&'static str),
    Idle,
    Fail,
}

/// A reader replaying fixed steps; idles forever after the last one
/// unless `eof_when_done` is set.
pub struct StepReader {
    steps: VecDeque<Step>,
    eof_when_done: bool,
}

impl StepReader {
    pub fn new(steps: &[Step]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
            eof_when_done: true,
        }
    }

    /// A reader that never yields and never ends.
    pub fn idle() -> Self {
        Self {
            steps: Default::default(),
            eof_when_done: false,
        }
    }
}

impl ReadLine for StepReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        match self.steps.pop_front() {
            Some(Step::Line(line)) => Ok(Some(line.to_string())),
            Some(Step::Fail) => Err(io::Error::other("read failed")),
            Some(Step::Idle) => Ok(None),
            None => {
                if !self.eof_when_done {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                Ok(None)
            },
        }
    }

    fn at_eof(&self) -> bool {
        self.eof_when_done && self.steps.is_empty()
    }
}

/// Write end of [`pipe`].
pub struct Pipe(Sender<Vec<u8>>);

impl Pipe {
    pub fn send(&self, text: &str) {
        if !text.is_empty() {
            let _ = self.0.send(text.as_bytes().to_vec());
        }
    }
}

/// Read end of [`pipe`]; reads block until bytes arrive or the pipe drops.
pub struct PipeSource {
    rx: Receiver<Vec<u8>>,
    buf: VecDeque<u8>,
}

impl Read for PipeSource {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.buf.is_empty() {
            match self.rx.recv() {
                Ok(bytes) => self.buf.extend(bytes),
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len());
        for (slot, byte) in out.iter_mut().zip(self.buf.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

/// An in-process stand-in for an interactive stdin.
pub fn pipe() -> (Pipe, BufReader<PipeSource>) {
    let (tx, rx) = mpsc::channel();
    let source = PipeSource {
        rx,
        buf: VecDeque::new(),
    };
    (Pipe(tx), BufReader::new(source))
}
