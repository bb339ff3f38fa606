//! Script commands: run-script, list-scripts, script-info.
//!
//! A script is a text file holding one command per line. Running it feeds
//! every line back through [`Shell::parse_line`], so script lines land in
//! history, can run further scripts and behave exactly like typed input.

use crate::descriptor::{ArgKind, ArgSpec, CommandSpec};
use crate::interpreter::{CommandInterpreter, Status};
use crate::parser::LineParser;
use crate::reporter::Severity;
use crate::shell::Shell;

/// Status of a script that could not be loaded or run.
const SCRIPT_FAILED: Status = Status::Failed(2);

pub struct ScriptRunner;

impl CommandInterpreter for ScriptRunner {
    fn commands(&self) -> &[&str] {
        &["run-script", "list-scripts", "script-info"]
    }

    fn describe(&self, command: &str) -> Option<CommandSpec> {
        let spec = match command {
            "run-script" => CommandSpec::new(command, "Run every line of a script file").arg(
                ArgSpec::new("file", ArgKind::String, "script to run")
                    .positional()
                    .optional()
                    .help("Defaults to the last script run. The extension is added if missing."),
            ),
            "list-scripts" => CommandSpec::new(command, "List the scripts in a directory").arg(
                ArgSpec::new("dir", ArgKind::String, "directory to scan")
                    .positional()
                    .optional(),
            ),
            "script-info" => CommandSpec::new(command, "Show the description line of a script")
                .arg(
                    ArgSpec::new("file", ArgKind::String, "script to inspect")
                        .positional()
                        .optional(),
                ),
            _ => return None,
        };
        Some(spec.category("script"))
    }

    fn interpret(&self, command: &str, line: &LineParser, shell: &mut Shell) -> Status {
        let arg = line.arg_list().first().map(|s| s.to_string());
        match command {
            "run-script" => run_script(arg, shell),
            "list-scripts" => list_scripts(arg, shell),
            "script-info" => script_info(arg, shell),
            _ => Status::NotFound,
        }
    }
}

/// Script name from the argument, else the last script run.
fn script_name(command: &str, arg: Option<String>, shell: &mut Shell) -> Option<String> {
    let name = arg.or_else(|| shell.last_script().map(str::to_string));
    if name.is_none() {
        shell.error(&format!("{command}: no script given and no previous script"));
    }
    name
}

/// Loadable path of a script: the extension is appended and relative names
/// are placed under the configured script directory.
fn script_path(shell: &Shell, name: &str) -> String {
    let config = shell.config();
    let file = config.script_file_name(name);
    let dir = config.script_dir.trim_end_matches('/');
    if file.starts_with('/') || dir.is_empty() || dir == "." {
        file
    } else {
        format!("{dir}/{file}")
    }
}

fn load_script(command: &str, shell: &mut Shell, path: &str) -> Option<String> {
    match shell.loader().load(path) {
        Ok(text) => Some(text),
        Err(e) => {
            shell.error(&format!("{command}: cannot load {path}: {e}"));
            None
        },
    }
}

fn run_script(arg: Option<String>, shell: &mut Shell) -> Status {
    let Some(name) = script_name("run-script", arg, shell) else {
        return SCRIPT_FAILED;
    };
    shell.set_last_script(&name);

    let max_depth = shell.config().max_script_depth;
    if shell.script_depth() >= max_depth {
        shell.error(&format!("run-script: {name}: scripts nested deeper than {max_depth}"));
        return SCRIPT_FAILED;
    }

    let path = script_path(shell, &name);
    let Some(text) = load_script("run-script", shell, &path) else {
        return SCRIPT_FAILED;
    };
    if text.trim().is_empty() {
        shell.error(&format!("run-script: {path} is empty"));
        return SCRIPT_FAILED;
    }

    log::info!("running script {path}");
    shell.enter_script();
    let status = run_lines(shell, &path, &text);
    shell.leave_script();
    status
}

/// Dispatch each line of `text`. Returns `Exit` if a line asked to exit,
/// otherwise a `Failed` status carrying the code of the last failing line
/// (at least `1`), or `Ok`.
fn run_lines(shell: &mut Shell, path: &str, text: &str) -> Status {
    let progress = shell.config().script_progress;
    let mut outcome = Status::Ok;
    let mut failures = 0;
    for (number, line) in text.lines().enumerate() {
        if shell.cancel_token().is_cancelled() {
            shell.error(&format!("run-script: {path} interrupted"));
            return Status::ERROR;
        }
        if progress && !line.trim().is_empty() {
            shell.write_console(&format!("[{path}:{}] {}\n", number + 1, line.trim()));
        }
        match shell.parse_line(line) {
            Status::Exit => return Status::Exit,
            status if status.is_failure() => {
                failures += 1;
                // NotFound and Invalid belong to the line, not to run-script.
                outcome = Status::failed(status.code());
            },
            _ => {},
        }
    }
    if failures > 0 {
        shell.report(
            Severity::Warning,
            &format!("run-script: {path}: {failures} line(s) failed"),
        );
    }
    outcome
}

fn list_scripts(arg: Option<String>, shell: &mut Shell) -> Status {
    let dir = arg.unwrap_or_else(|| shell.config().script_dir.clone());
    let extension = shell.config().script_extension.clone();
    let entries = match shell.lister().list(&dir, &extension) {
        Ok(entries) => entries,
        Err(e) => {
            shell.error(&format!("list-scripts: {dir}: {e}"));
            return SCRIPT_FAILED;
        },
    };
    if entries.is_empty() {
        shell.info(&format!("no .{extension} scripts in {dir}"));
    }
    for entry in entries {
        shell.info(&format!("{:<24} {:>8} bytes", entry.name, entry.size));
    }
    Status::Ok
}

fn script_info(arg: Option<String>, shell: &mut Shell) -> Status {
    let Some(name) = script_name("script-info", arg, shell) else {
        return SCRIPT_FAILED;
    };
    let path = script_path(shell, &name);
    let Some(text) = load_script("script-info", shell, &path) else {
        return SCRIPT_FAILED;
    };
    let marker = shell.config().script_info_marker.clone();
    let description = text
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(marker.as_str()));
    if let Some(description) = description {
        shell.info(&format!("{name}: {}", description.trim()));
    }
    Status::Ok
}
