//! Shell engine: builder, read/evaluate loop and background lifecycle.
//!
//! [`ShellEngine`] wraps a [`Shell`] in a mutex and drives it from a
//! [`ReadLine`] source, either on the caller's thread ([`ShellEngine::run_shell`])
//! or on a background thread ([`ShellEngine::start`]). A run ends on an
//! `Exit` status, at end of input, or when [`ShellEngine::stop`] cancels it;
//! the notify channel of the run then receives the final status code once.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};

use lineshell_types::{ReadErrorPolicy, Result, ShellConfig};
use lineshell_vfs::{DirectoryLister, DiskFs, FileTextLoader};

use crate::cancel::CancelToken;
use crate::interpreter::{CommandInterpreter, Status};
use crate::reader::{NonBlockingReader, ReadLine, SharedReader};
use crate::reporter::{ConsoleReporter, MessageReporter, Severity};
use crate::shell::Shell;

/// Assembles a [`Shell`] or [`ShellEngine`] from a config and collaborators.
///
/// Unset collaborators default to a [`ConsoleReporter`], a [`DiskFs`] over
/// the configured search paths, stdout as console and stdin as input.
pub struct ShellBuilder {
    config: ShellConfig,
    reporter: Option<Arc<dyn MessageReporter>>,
    loader: Option<Arc<dyn FileTextLoader>>,
    lister: Option<Arc<dyn DirectoryLister>>,
    console: Option<Box<dyn Write + Send>>,
    input: Option<Box<dyn BufRead + Send>>,
}

impl ShellBuilder {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            reporter: None,
            loader: None,
            lister: None,
            console: None,
            input: None,
        }
    }

    pub fn reporter(mut self, reporter: Arc<dyn MessageReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn FileTextLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn lister(mut self, lister: Arc<dyn DirectoryLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Use one value as both loader and lister.
    pub fn files<F>(mut self, files: Arc<F>) -> Self
    where
        F: FileTextLoader + DirectoryLister + 'static,
    {
        let loader: Arc<dyn FileTextLoader> = Arc::<F>::clone(&files);
        let lister: Arc<dyn DirectoryLister> = files;
        self.loader = Some(loader);
        self.lister = Some(lister);
        self
    }

    /// Where the prompt and script progress markers are written.
    pub fn console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Some(console);
        self
    }

    /// Source read by [`ShellEngine::start`] in place of standard input.
    pub fn input<R>(mut self, source: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        self.input = Some(Box::new(source));
        self
    }

    /// Validate the config and build a bare shell.
    pub fn build_shell(self) -> Result<Shell> {
        self.config.validate()?;
        let disk = Arc::new(DiskFs::with_search_paths(self.config.search_paths.clone()));
        let reporter = self.reporter.unwrap_or_else(|| {
            let console: Arc<dyn MessageReporter> = Arc::new(ConsoleReporter);
            console
        });
        let loader = self.loader.unwrap_or_else(|| {
            let loader: Arc<dyn FileTextLoader> = Arc::<DiskFs>::clone(&disk);
            loader
        });
        let lister = self.lister.unwrap_or_else(|| {
            let lister: Arc<dyn DirectoryLister> = Arc::<DiskFs>::clone(&disk);
            lister
        });
        let console = self.console.unwrap_or_else(|| {
            let stdout: Box<dyn Write + Send> = Box::new(io::stdout());
            stdout
        });
        Ok(Shell::new(self.config, reporter, loader, lister, console))
    }

    pub fn build(mut self) -> Result<ShellEngine> {
        let source = self.input.take();
        let engine = ShellEngine::new(self.build_shell()?);
        engine.lock_input().source = source;
        Ok(engine)
    }
}

/// Run bookkeeping touched only by start, stop and loop exit.
#[derive(Default)]
struct RunState {
    handle: Option<JoinHandle<i32>>,
    notify: Option<Sender<i32>>,
    cancel: CancelToken,
}

/// Input for [`ShellEngine::start`]. The reader is opened on first start
/// and reused by every later run.
#[derive(Default)]
struct Input {
    source: Option<Box<dyn BufRead + Send>>,
    reader: Option<SharedReader>,
}

struct Control {
    running: AtomicBool,
    exit_status: AtomicI32,
    run: Mutex<RunState>,
    input: Mutex<Input>,
}

/// A shell plus its read/evaluate loop.
///
/// Clones share the same shell and run state.
#[derive(Clone)]
pub struct ShellEngine {
    shell: Arc<Mutex<Shell>>,
    control: Arc<Control>,
}

impl ShellEngine {
    pub fn new(shell: Shell) -> Self {
        Self {
            shell: Arc::new(Mutex::new(shell)),
            control: Arc::new(Control {
                running: AtomicBool::new(false),
                exit_status: AtomicI32::new(0),
                run: Mutex::new(RunState::default()),
                input: Mutex::new(Input::default()),
            }),
        }
    }

    /// Start the loop on a background thread reading standard input, or the
    /// builder's input source.
    ///
    /// Returns `None` if a run is already active or the reader cannot be
    /// started; the latter is reported as an error. The reader outlives the
    /// run, so input typed after a [`stop`](Self::stop) goes to the next run.
    pub fn start(&self, notify: Option<Sender<i32>>) -> Option<Thread> {
        let token = self.begin_run(notify)?;
        match self.shared_input(&token) {
            Ok(reader) => self.spawn_loop(reader, token),
            Err(e) => {
                self.abort_run(&token);
                self.lock_shell().error(&format!("cannot start shell: {e}"));
                None
            },
        }
    }

    /// Start the loop on a background thread reading from `reader`.
    pub fn start_with<R>(&self, reader: R, notify: Option<Sender<i32>>) -> Option<Thread>
    where
        R: ReadLine + 'static,
    {
        let token = self.begin_run(notify)?;
        self.spawn_loop(reader, token)
    }

    /// Run the loop on the calling thread until it ends.
    ///
    /// Returns the last status code, or the `Invalid` code if a run is
    /// already active.
    pub fn run_shell<R: ReadLine>(&self, reader: R) -> i32 {
        match self.begin_run(None) {
            Some(token) => self.run_loop(reader, token),
            None => Status::Invalid.code(),
        }
    }

    /// Stop the current run. Its notify target is dropped unsignalled.
    pub fn stop(&self) {
        let handle = {
            let mut run = self.lock_run();
            run.notify = None;
            run.cancel.cancel();
            run.handle.take()
        };
        self.control.running.store(false, Ordering::SeqCst);
        if handle.is_some() {
            log::info!("shell stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }

    /// Code of the last status produced by the loop.
    pub fn exit_status(&self) -> i32 {
        self.control.exit_status.load(Ordering::SeqCst)
    }

    /// Dispatch one line outside the loop.
    pub fn parse_line(&self, text: &str) -> Status {
        self.lock_shell().parse_line(text)
    }

    pub fn add_command_interpreter(&self, interpreter: Arc<dyn CommandInterpreter>) -> bool {
        self.lock_shell().add_command_interpreter(interpreter)
    }

    /// Run `f` with exclusive access to the shell.
    pub fn with_shell<T>(&self, f: impl FnOnce(&mut Shell) -> T) -> T {
        f(&mut self.lock_shell())
    }

    pub fn history(&self) -> Vec<String> {
        self.lock_shell().history().to_vec()
    }

    pub fn last_script(&self) -> Option<String> {
        self.lock_shell().last_script().map(str::to_string)
    }

    pub fn last_messages(&self) -> Vec<(Severity, String)> {
        self.lock_shell().last_messages().to_vec()
    }

    pub fn commands(&self) -> Vec<String> {
        self.lock_shell()
            .commands()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// A handle on the engine's input reader bound to `token`.
    fn shared_input(&self, token: &CancelToken) -> Result<SharedReader> {
        let config = self.lock_shell().config().clone();
        let mut input = self.lock_input();
        if let Some(shared) = &input.reader {
            return Ok(shared.handle(token.clone()));
        }
        let reader = match input.source.take() {
            Some(source) => NonBlockingReader::from_config(source, &config)?,
            None => NonBlockingReader::stdin(&config)?,
        };
        let shared = SharedReader::new(reader);
        let handle = shared.handle(token.clone());
        input.reader = Some(shared);
        Ok(handle)
    }

    fn spawn_loop<R>(&self, reader: R, token: CancelToken) -> Option<Thread>
    where
        R: ReadLine + 'static,
    {
        let engine = self.clone();
        let loop_token = token.clone();
        let spawned = thread::Builder::new()
            .name("lineshell".to_string())
            .spawn(move || engine.run_loop(reader, loop_token));
        match spawned {
            Ok(handle) => {
                let thread = handle.thread().clone();
                self.lock_run().handle = Some(handle);
                log::info!("shell started");
                Some(thread)
            },
            Err(e) => {
                self.abort_run(&token);
                self.lock_shell()
                    .error(&format!("cannot start shell thread: {e}"));
                None
            },
        }
    }

    /// Release a run slot that never got a loop; its notify is dropped.
    fn abort_run(&self, token: &CancelToken) {
        self.lock_run().notify = None;
        self.finish(token);
    }

    /// Claim the run slot. `None` if another run is active.
    fn begin_run(&self, notify: Option<Sender<i32>>) -> Option<CancelToken> {
        let mut run = self.lock_run();
        let live = run.handle.as_ref().is_some_and(|h| !h.is_finished());
        if live || self.is_running() {
            log::warn!("shell already running");
            return None;
        }
        if let Some(done) = run.handle.take() {
            let _ = done.join();
        }
        let token = CancelToken::new();
        run.cancel = token.clone();
        run.notify = notify;
        self.control.exit_status.store(0, Ordering::SeqCst);
        self.control.running.store(true, Ordering::SeqCst);
        Some(token)
    }

    fn run_loop<R: ReadLine>(&self, mut reader: R, token: CancelToken) -> i32 {
        let (prompt, policy, exit_on_eof, backoff) = {
            let mut shell = self.lock_shell();
            shell.set_cancel_token(token.clone());
            let config = shell.config();
            (
                config.prompt.clone(),
                config.read_error_policy,
                config.exit_on_eof,
                config.read_timeout(),
            )
        };

        let mut prompt_pending = true;
        while !token.is_cancelled() {
            if prompt_pending {
                self.lock_shell().write_console(&prompt);
                prompt_pending = false;
            }
            match reader.read_line() {
                Ok(Some(_)) if token.is_cancelled() => {
                    log::debug!("dropping line read after stop");
                    break;
                },
                Ok(Some(line)) => {
                    prompt_pending = true;
                    let status = self.lock_shell().parse_line(&line);
                    self.control
                        .exit_status
                        .store(status.code(), Ordering::SeqCst);
                    if status == Status::Exit {
                        break;
                    }
                },
                Ok(None) if reader.at_eof() => {
                    if exit_on_eof {
                        log::info!("input closed");
                        break;
                    }
                    token.sleep(backoff);
                },
                Ok(None) => {},
                Err(e) => {
                    log::warn!("read failed: {e}");
                    if policy == ReadErrorPolicy::Stop {
                        break;
                    }
                    token.sleep(backoff);
                },
            }
        }
        self.finish(&token)
    }

    /// End the run owning `token` and signal its notify target.
    fn finish(&self, token: &CancelToken) -> i32 {
        let status = self.exit_status();
        let notify = {
            let mut run = self.lock_run();
            if !run.cancel.same_as(token) {
                // A newer run owns the state.
                return status;
            }
            self.control.running.store(false, Ordering::SeqCst);
            run.notify.take()
        };
        if let Some(tx) = notify {
            let _ = tx.send(status);
        }
        log::info!("shell finished with status {status}");
        status
    }

    fn lock_shell(&self) -> MutexGuard<'_, Shell> {
        self.shell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_run(&self) -> MutexGuard<'_, RunState> {
        self.control.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_input(&self) -> MutexGuard<'_, Input> {
        self.control.input.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ScriptedReader;
    use crate::reporter::MemoryReporter;
    use crate::test_utils::{RecordingCmd, SharedBuffer, Step, StepReader, memory_fs, pipe};
    use crate::register_builtins;
    use lineshell_vfs::MemoryFs;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    struct Fixture {
        engine: ShellEngine,
        reporter: Arc<MemoryReporter>,
        console: SharedBuffer,
    }

    fn fixture_with(config: ShellConfig, files: MemoryFs) -> Fixture {
        fixture_from(ShellBuilder::new(config).files(Arc::new(files)))
    }

    fn fixture_from(builder: ShellBuilder) -> Fixture {
        let reporter = Arc::new(MemoryReporter::new());
        let console = SharedBuffer::default();
        let sink = Arc::clone(&reporter);
        let engine = builder
            .reporter(sink)
            .console(Box::new(console.clone()))
            .build()
            .unwrap();
        engine.with_shell(register_builtins);
        Fixture {
            engine,
            reporter,
            console,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ShellConfig::default(), MemoryFs::new())
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ShellConfig {
            read_tries: 0,
            ..ShellConfig::default()
        };
        assert!(ShellBuilder::new(config).build().is_err());
    }

    #[test]
    fn run_shell_stops_on_exit() {
        let f = fixture();
        let code = f
            .engine
            .run_shell(ScriptedReader::new(["wait 1", "exit", "wait 2"]));
        assert_eq!(code, Status::Exit.code());
        assert_eq!(f.engine.history(), ["wait 1", "exit"]);
        assert!(!f.engine.is_running());
    }

    #[test]
    fn run_shell_returns_last_status_at_eof() {
        let f = fixture();
        let code = f.engine.run_shell(ScriptedReader::new(["wait 1", "nope"]));
        assert_eq!(code, Status::NotFound.code());
        assert_eq!(f.engine.exit_status(), -1);
        assert_eq!(f.reporter.count(Severity::Error), 1);
    }

    #[test]
    fn prompt_follows_consumed_lines_only() {
        let f = fixture();
        let reader = StepReader::new(&[Step::Line("wait 1"), Step::Idle, Step::Idle, Step::Line("exit")]);
        f.engine.run_shell(reader);
        assert_eq!(f.console.contents(), "> > ");
    }

    #[test]
    fn disabled_console_prints_no_prompt() {
        let config = ShellConfig {
            console_enabled: false,
            ..ShellConfig::default()
        };
        let f = fixture_with(config, MemoryFs::new());
        f.engine.run_shell(ScriptedReader::new(["exit"]));
        assert!(f.console.contents().is_empty());
    }

    #[test]
    fn read_errors_continue_by_default() {
        let f = fixture();
        let code = f
            .engine
            .run_shell(StepReader::new(&[Step::Fail, Step::Line("exit")]));
        assert_eq!(code, Status::Exit.code());
    }

    #[test]
    fn read_errors_stop_when_configured() {
        let config = ShellConfig {
            read_error_policy: ReadErrorPolicy::Stop,
            ..ShellConfig::default()
        };
        let f = fixture_with(config, MemoryFs::new());
        let code = f
            .engine
            .run_shell(StepReader::new(&[Step::Fail, Step::Line("exit")]));
        assert_eq!(code, 0);
        assert!(f.engine.history().is_empty());
    }

    #[test]
    fn start_notifies_once_with_exit_status() {
        let f = fixture();
        let (tx, rx) = mpsc::channel();
        let thread = f
            .engine
            .start_with(ScriptedReader::new(["wait 1", "bye"]), Some(tx));
        assert_eq!(thread.unwrap().name(), Some("lineshell"));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(-2));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(wait_until(|| !f.engine.is_running()));
    }

    #[test]
    fn second_start_is_refused() {
        let f = fixture();
        assert!(f.engine.start_with(StepReader::idle(), None).is_some());
        assert!(f.engine.is_running());
        assert!(f.engine.start_with(StepReader::idle(), None).is_none());
        assert_eq!(f.engine.run_shell(StepReader::idle()), Status::Invalid.code());
        f.engine.stop();
    }

    #[test]
    fn stop_is_idempotent_and_drops_notify() {
        let f = fixture();
        let (tx, rx) = mpsc::channel();
        f.engine.start_with(StepReader::idle(), Some(tx)).unwrap();
        f.engine.stop();
        assert!(!f.engine.is_running());
        f.engine.stop();
        assert!(!f.engine.is_running());
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());
    }

    #[test]
    fn restart_after_stop() {
        let f = fixture();
        f.engine.start_with(StepReader::idle(), None).unwrap();
        f.engine.stop();
        let (tx, rx) = mpsc::channel();
        assert!(f.engine.start_with(ScriptedReader::new(["quit"]), Some(tx)).is_some());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(-2));
    }

    #[test]
    fn input_typed_after_restart_reaches_the_new_run() {
        let (input, source) = pipe();
        let config = ShellConfig {
            read_timeout_ms: 20,
            ..ShellConfig::default()
        };
        let f = fixture_from(ShellBuilder::new(config).input(source));
        let probe = Arc::new(RecordingCmd::new(&["probe"], Status::Ok));
        let handle = Arc::clone(&probe);
        f.engine.add_command_interpreter(handle);

        assert!(f.engine.start(None).is_some());
        thread::sleep(Duration::from_millis(50));
        f.engine.stop();

        let (tx, rx) = mpsc::channel();
        assert!(f.engine.start(Some(tx)).is_some());
        input.send("probe x\nexit\n");
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(-2));
        assert_eq!(probe.calls(), vec![("probe".to_string(), Some("x".to_string()))]);
    }

    /// Yields one line after a delay, then idles.
    struct SlowReader {
        delay: Duration,
        line: Option<&'static str>,
    }

    impl ReadLine for SlowReader {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            thread::sleep(self.delay);
            Ok(self.line.take().map(str::to_string))
        }
    }

    #[test]
    fn line_arriving_during_stop_is_not_dispatched() {
        let f = fixture();
        let probe = Arc::new(RecordingCmd::new(&["probe"], Status::Ok));
        let handle = Arc::clone(&probe);
        f.engine.add_command_interpreter(handle);
        let reader = SlowReader {
            delay: Duration::from_millis(200),
            line: Some("probe x"),
        };
        f.engine.start_with(reader, None).unwrap();
        thread::sleep(Duration::from_millis(50));
        f.engine.stop();
        thread::sleep(Duration::from_millis(400));
        assert!(probe.calls().is_empty());
        assert!(f.engine.history().is_empty());
    }

    #[test]
    fn stop_interrupts_a_running_wait() {
        let f = fixture();
        let (tx, rx) = mpsc::channel();
        f.engine
            .start_with(StepReader::new(&[Step::Line("wait 60000")]), Some(tx))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        f.engine.stop();
        // Blocks until the loop releases the shell after the wait ends.
        let interrupted = f.engine.with_shell(|shell| shell.cancel_token().is_cancelled());
        assert!(interrupted);
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn idle_run_without_eof_exit_keeps_running() {
        let config = ShellConfig {
            exit_on_eof: false,
            read_timeout_ms: 20,
            ..ShellConfig::default()
        };
        let f = fixture_with(config, MemoryFs::new());
        f.engine.start_with(ScriptedReader::new(["wait 1"]), None).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(f.engine.is_running());
        f.engine.stop();
        assert!(!f.engine.is_running());
    }

    #[test]
    fn script_run_through_engine_records_n_plus_one() {
        let files = memory_fs(&[("three.ssc", "wait 1\nwait 1\nwait 1")]);
        let f = fixture_with(ShellConfig::default(), files);
        assert_eq!(f.engine.parse_line("run-script three"), Status::Ok);
        assert_eq!(f.engine.history().len(), 4);
        assert_eq!(f.engine.last_script().as_deref(), Some("three"));
    }

    #[test]
    fn external_registration_routes_lines() {
        let f = fixture();
        let probe = Arc::new(RecordingCmd::new(&["probe"], Status::Failed(5)));
        let handle = Arc::clone(&probe);
        assert!(f.engine.add_command_interpreter(handle));
        let code = f.engine.run_shell(ScriptedReader::new(["probe x"]));
        assert_eq!(code, 5);
        assert_eq!(probe.calls().len(), 1);
        assert!(f.engine.commands().contains(&"probe".to_string()));
    }

    #[test]
    fn last_messages_reflect_latest_dispatch() {
        let f = fixture();
        f.engine.parse_line("missing");
        let messages = f.engine.last_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, Severity::Error);
    }
}
