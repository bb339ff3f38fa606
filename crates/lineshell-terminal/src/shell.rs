//! Shell session state and line dispatch.
//!
//! A [`Shell`] owns the command registry, the history, and the collaborators
//! interpreters use. [`Shell::parse_line`] is the single dispatch path: typed
//! input, script lines and history replays all go through it.

use std::collections::HashMap;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use lineshell_types::ShellConfig;
use lineshell_vfs::{DirectoryLister, FileTextLoader};

use crate::cancel::CancelToken;
use crate::descriptor::CommandSpec;
use crate::interpreter::{CommandInterpreter, Status};
use crate::parser::LineParser;
use crate::reporter::{MessageReporter, Severity};

/// Command registry plus per-session state.
pub struct Shell {
    config: ShellConfig,
    registry: HashMap<String, Arc<dyn CommandInterpreter>>,
    history: Vec<String>,
    last_script: Option<String>,
    /// Messages reported while dispatching the most recent line.
    messages: Vec<(Severity, String)>,
    reporter: Arc<dyn MessageReporter>,
    loader: Arc<dyn FileTextLoader>,
    lister: Arc<dyn DirectoryLister>,
    console: Box<dyn Write + Send>,
    script_depth: usize,
    cancel: CancelToken,
}

impl Shell {
    /// Assemble a shell. Use [`ShellBuilder`](crate::ShellBuilder), which
    /// validates the config first.
    pub(crate) fn new(
        config: ShellConfig,
        reporter: Arc<dyn MessageReporter>,
        loader: Arc<dyn FileTextLoader>,
        lister: Arc<dyn DirectoryLister>,
        console: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            config,
            registry: HashMap::new(),
            history: Vec::new(),
            last_script: None,
            messages: Vec::new(),
            reporter,
            loader,
            lister,
            console,
            script_depth: 0,
            cancel: CancelToken::new(),
        }
    }

    /// Register every command word of `interpreter`, replacing previous
    /// owners. Returns `false` if it declares no words.
    pub fn add_command_interpreter(&mut self, interpreter: Arc<dyn CommandInterpreter>) -> bool {
        let words = interpreter.commands();
        if words.is_empty() {
            return false;
        }
        for word in words {
            if self
                .registry
                .insert(word.to_string(), Arc::clone(&interpreter))
                .is_some()
            {
                log::debug!("command {word} re-registered");
            }
        }
        true
    }

    /// Dispatch one line.
    ///
    /// Blank and comment lines are no-ops. Otherwise the first token selects
    /// the interpreter; the line is appended to history before it runs, so a
    /// script command precedes the lines it executes.
    pub fn parse_line(&mut self, text: &str) -> Status {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.config.is_comment(trimmed) {
            return Status::Ok;
        }
        let parser = LineParser::new(trimmed);
        let Some(command) = parser.token().map(str::to_string) else {
            return Status::Invalid;
        };

        self.messages.clear();
        let Some(interpreter) = self.registry.get(&command).map(Arc::clone) else {
            self.error(&format!("command not found: {command}"));
            return Status::NotFound;
        };

        self.history.push(trimmed.to_string());
        log::debug!("dispatch {command}");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.interpret_command(&command, &parser, self)
        }));
        match outcome {
            Ok(Status::NotFound) => {
                self.error(&format!("{command}: not handled by its interpreter"));
                Status::NotFound
            },
            Ok(status) => status,
            Err(_) => {
                self.error(&format!("{command}: command panicked"));
                Status::ERROR
            },
        }
    }

    /// Send a message to the reporter and remember it as a last-run message.
    pub fn report(&mut self, severity: Severity, text: &str) {
        self.messages.push((severity, text.to_string()));
        self.reporter.report(severity, text);
    }

    pub fn error(&mut self, text: &str) {
        self.report(Severity::Error, text);
    }

    pub fn info(&mut self, text: &str) {
        self.report(Severity::Info, text);
    }

    /// Write raw text to the console if console output is enabled.
    pub fn write_console(&mut self, text: &str) {
        if !self.config.console_enabled {
            return;
        }
        if let Err(e) = self
            .console
            .write_all(text.as_bytes())
            .and_then(|()| self.console.flush())
        {
            log::warn!("console write failed: {e}");
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Accepted lines, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Remove the newest history entry if it is `line`.
    pub(crate) fn drop_history_entry(&mut self, line: &str) {
        if self.history.last().is_some_and(|last| last == line) {
            self.history.pop();
        }
    }

    pub fn last_script(&self) -> Option<&str> {
        self.last_script.as_deref()
    }

    pub(crate) fn set_last_script(&mut self, name: &str) {
        self.last_script = Some(name.to_string());
    }

    /// Messages reported while dispatching the most recent line.
    pub fn last_messages(&self) -> &[(Severity, String)] {
        &self.messages
    }

    pub fn loader(&self) -> Arc<dyn FileTextLoader> {
        Arc::clone(&self.loader)
    }

    pub fn lister(&self) -> Arc<dyn DirectoryLister> {
        Arc::clone(&self.lister)
    }

    /// Token cancelled when the current run is stopped.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub(crate) fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    pub(crate) fn script_depth(&self) -> usize {
        self.script_depth
    }

    pub(crate) fn enter_script(&mut self) {
        self.script_depth += 1;
    }

    pub(crate) fn leave_script(&mut self) {
        self.script_depth = self.script_depth.saturating_sub(1);
    }

    /// Registered command words, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut words: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        words.sort_unstable();
        words
    }

    /// Help descriptor of a registered word.
    pub fn describe(&self, command: &str) -> Option<CommandSpec> {
        self.registry.get(command)?.describe(command)
    }

    pub fn is_registered(&self, command: &str) -> bool {
        self.registry.contains_key(command)
    }
}
