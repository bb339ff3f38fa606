//! Command interpreter contract and dispatch status.

use std::fmt;

use crate::descriptor::CommandSpec;
use crate::parser::LineParser;
use crate::shell::Shell;

/// Outcome of dispatching one line.
///
/// Each variant has a fixed integer code; see [`Status::code`]. Two
/// statuses are equal when their codes are, so `Failed(0)` equals `Failed(1)`.
#[derive(Debug, Clone, Copy)]
pub enum Status {
    /// Handled, keep running (`0`).
    Ok,
    /// Handled, but the command failed (`> 0`).
    Failed(i32),
    /// No interpreter owns the command (`-1`).
    NotFound,
    /// Handled, and the shell must terminate (`-2`).
    Exit,
    /// Blank command or unusable parser state (`-3`).
    Invalid,
}

impl Status {
    /// Generic command-level failure.
    pub const ERROR: Status = Status::Failed(1);

    /// Failure with code `n`, clamped to at least `1`.
    pub fn failed(n: i32) -> Self {
        Status::Failed(n.max(1))
    }

    /// Integer code of this status.
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Failed(n) => n.max(1),
            Status::NotFound => -1,
            Status::Exit => -2,
            Status::Invalid => -3,
        }
    }

    /// Status for an integer code. Codes below `-3` read as `Invalid`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Ok,
            n if n > 0 => Status::Failed(n),
            -1 => Status::NotFound,
            -2 => Status::Exit,
            _ => Status::Invalid,
        }
    }

    /// Whether the loop keeps running after this status.
    pub fn continues(self) -> bool {
        self != Status::Exit
    }

    /// Whether this status should be reported as a failure.
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed(_) | Status::NotFound | Status::Invalid)
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Status {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A handler owning one or more command words.
///
/// Interpreters are registered with the engine and receive the [`Shell`]
/// they run in, so they can report messages and feed lines back through
/// [`Shell::parse_line`]. No error crosses this boundary: every fault is
/// reported through the shell and mapped to a [`Status`].
pub trait CommandInterpreter: Send + Sync {
    /// Command words owned by this interpreter.
    fn commands(&self) -> &[&str];

    /// Help descriptor for one of the owned words.
    fn describe(&self, _command: &str) -> Option<CommandSpec> {
        None
    }

    /// Execute an owned command.
    fn interpret(&self, command: &str, line: &LineParser, shell: &mut Shell) -> Status;

    /// Validate the command word and forward to [`interpret`](Self::interpret).
    fn interpret_command(&self, command: &str, line: &LineParser, shell: &mut Shell) -> Status {
        if command.trim().is_empty() {
            return Status::Invalid;
        }
        if !self.commands().iter().any(|owned| *owned == command) {
            return Status::NotFound;
        }
        self.interpret(command, line, shell)
    }
}
