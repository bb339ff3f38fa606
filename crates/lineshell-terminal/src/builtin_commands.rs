//! Builtin commands: exit, help, wait.

use std::sync::Arc;
use std::time::Duration;

use lineshell_types::{Result, ShellError};

use crate::descriptor::{ArgKind, ArgSpec, CommandSpec};
use crate::history_commands::HistoryTracker;
use crate::interpreter::{CommandInterpreter, Status};
use crate::parser::LineParser;
use crate::script_commands::ScriptRunner;
use crate::shell::Shell;

/// Register the builtin, script and history commands.
pub fn register_builtins(shell: &mut Shell) {
    shell.add_command_interpreter(Arc::new(ExitCmd));
    shell.add_command_interpreter(Arc::new(HelpCmd));
    shell.add_command_interpreter(Arc::new(WaitCmd));
    shell.add_command_interpreter(Arc::new(ScriptRunner));
    shell.add_command_interpreter(Arc::new(HistoryTracker));
}

// ---------------------------------------------------------------------------
// exit / quit / bye
// ---------------------------------------------------------------------------

pub struct ExitCmd;

impl CommandInterpreter for ExitCmd {
    fn commands(&self) -> &[&str] {
        &["exit", "quit", "bye"]
    }

    fn describe(&self, command: &str) -> Option<CommandSpec> {
        Some(CommandSpec::new(command, "Terminate the shell").category("shell"))
    }

    fn interpret(&self, _command: &str, _line: &LineParser, _shell: &mut Shell) -> Status {
        Status::Exit
    }
}

// ---------------------------------------------------------------------------
// help / h / ?
// ---------------------------------------------------------------------------

pub struct HelpCmd;

impl CommandInterpreter for HelpCmd {
    fn commands(&self) -> &[&str] {
        &["help", "h", "?"]
    }

    fn describe(&self, command: &str) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(command, "List commands or show help for one")
                .category("shell")
                .arg(
                    ArgSpec::new("command", ArgKind::String, "command to describe")
                        .positional()
                        .optional(),
                ),
        )
    }

    fn interpret(&self, _command: &str, line: &LineParser, shell: &mut Shell) -> Status {
        match line.arg_list().first() {
            None => {
                let listing = shell
                    .commands()
                    .into_iter()
                    .map(|word| match shell.describe(word) {
                        Some(spec) => format!("  {word:<14} {}", spec.description),
                        None => format!("  {word}"),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                shell.info(&format!("Commands:\n{listing}"));
                Status::Ok
            },
            Some(&word) => {
                if !shell.is_registered(word) {
                    shell.error(&format!("help: unknown command: {word}"));
                    return Status::ERROR;
                }
                let text = match shell.describe(word) {
                    Some(spec) => spec.render(),
                    None => format!("{word}\n  (no help available)"),
                };
                shell.info(&text);
                Status::Ok
            },
        }
    }
}

// ---------------------------------------------------------------------------
// wait
// ---------------------------------------------------------------------------

pub struct WaitCmd;

impl CommandInterpreter for WaitCmd {
    fn commands(&self) -> &[&str] {
        &["wait"]
    }

    fn describe(&self, command: &str) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(command, "Pause before the next command")
                .category("shell")
                .arg(ArgSpec::new("milliseconds", ArgKind::Int, "time to wait").positional()),
        )
    }

    fn interpret(&self, _command: &str, line: &LineParser, shell: &mut Shell) -> Status {
        let millis = match wait_millis(line) {
            Ok(millis) => millis,
            Err(e) => {
                shell.error(&e.to_string());
                return Status::ERROR;
            },
        };
        let token = shell.cancel_token().clone();
        if token.sleep(Duration::from_millis(millis)) {
            Status::Ok
        } else {
            shell.error("wait interrupted");
            Status::ERROR
        }
    }
}

fn wait_millis(line: &LineParser) -> Result<u64> {
    let arg = line
        .arg_list()
        .first()
        .copied()
        .ok_or_else(|| ShellError::Command("usage: wait <milliseconds>".to_string()))?;
    arg.parse()
        .map_err(|_| ShellError::Command(format!("wait: invalid duration: {arg}")))
}
