//! Interactive command shell engine.
//!
//! Input lines are tokenized by [`LineParser`] and routed by their first word
//! to a registered [`CommandInterpreter`]. [`ShellEngine`] runs the
//! read/evaluate loop on a background thread over a time-bounded
//! [`NonBlockingReader`], so the host can start and stop it without blocking
//! on input. Scripts and history replay feed lines back through the same
//! [`Shell::parse_line`] path as typed input.

mod builtin_commands;
mod cancel;
mod descriptor;
mod engine;
mod history_commands;
mod interpreter;
mod parser;
mod reader;
mod reporter;
mod script_commands;
mod shell;

#[cfg(test)]
pub(crate) mod test_utils;

/// Register exit, help, wait, script and history commands into a shell.
pub use builtin_commands::register_builtins;
pub use builtin_commands::{ExitCmd, HelpCmd, WaitCmd};
/// Cooperative cancellation flag shared by a run and its commands.
pub use cancel::CancelToken;
/// Help descriptors for commands and their arguments.
pub use descriptor::{ArgKind, ArgSpec, CommandSpec};
/// Builder and background loop.
pub use engine::{ShellBuilder, ShellEngine};
pub use history_commands::HistoryTracker;
/// The handler contract and its dispatch status.
pub use interpreter::{CommandInterpreter, Status};
/// Line tokenizer and argument maps.
pub use parser::{ArgMap, ArgValue, LineParser, TypedArgs};
/// Line sources for the loop.
pub use reader::{NonBlockingReader, ReadLine, ScriptedReader, SharedReader};
/// Message sinks.
pub use reporter::{ConsoleReporter, LogReporter, MemoryReporter, MessageReporter, Severity};
pub use script_commands::ScriptRunner;
/// Registry and per-session state handed to interpreters.
pub use shell::Shell;
