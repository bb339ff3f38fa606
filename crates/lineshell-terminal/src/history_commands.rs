//! History commands: list, replay and clear accepted lines.

use crate::descriptor::{ArgKind, ArgSpec, CommandSpec};
use crate::interpreter::{CommandInterpreter, Status};
use crate::parser::LineParser;
use crate::shell::Shell;

/// `history` / `!`.
///
/// The shell records a line before dispatching it, so the tracker first
/// drops the entry for its own invocation. History commands therefore never
/// appear in the history they index.
pub struct HistoryTracker;

impl CommandInterpreter for HistoryTracker {
    fn commands(&self) -> &[&str] {
        &["history", "!"]
    }

    fn describe(&self, command: &str) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(command, "List, replay or clear command history")
                .category("shell")
                .arg(
                    ArgSpec::new("index", ArgKind::String, "entry to replay")
                        .positional()
                        .optional()
                        .help("A 0-based index replays that entry; `clear` empties the history."),
                ),
        )
    }

    fn interpret(&self, command: &str, line: &LineParser, shell: &mut Shell) -> Status {
        shell.drop_history_entry(line.line());

        let Some(arg) = line.arg_list().first().copied() else {
            let listing: Vec<String> = shell
                .history()
                .iter()
                .enumerate()
                .map(|(i, entry)| format!("{i:4}  {entry}"))
                .collect();
            for entry in listing {
                shell.info(&entry);
            }
            return Status::Ok;
        };

        if arg == "clear" {
            shell.clear_history();
            return Status::Ok;
        }
        let Ok(index) = arg.parse::<usize>() else {
            shell.error(&format!("{command}: invalid index: {arg}"));
            return Status::ERROR;
        };
        let Some(entry) = shell.history().get(index).cloned() else {
            shell.error(&format!("{command}: no entry {index}"));
            return Status::ERROR;
        };
        log::debug!("replaying history entry {index}: {entry}");
        shell.parse_line(&entry)
    }
}
