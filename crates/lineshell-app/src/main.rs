//! lineshell entry point.
//!
//! `lineshell [--config FILE] [SCRIPT]`
//!
//! With a script argument the script is run once and the process exits.
//! Otherwise the interactive shell reads standard input on a background
//! thread until `exit`, end of input, or a fatal read error.

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};

use lineshell_terminal::{
    LogReporter, MessageReporter, ShellBuilder, ShellEngine, Status, register_builtins,
};
use lineshell_types::ShellConfig;

/// Environment variable naming a config file when `--config` is absent.
const CONFIG_ENV: &str = "LINESHELL_CONFIG";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("Usage: lineshell [--config FILE] [SCRIPT]");
            std::process::exit(1);
        },
    };

    let config_path = args
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    let config = load_config(config_path.as_deref())?;

    let engine = builder(config).build()?;
    engine.with_shell(register_builtins);
    log::info!("{} commands registered", engine.commands().len());

    let status = match args.script {
        Some(script) => engine.parse_line(&format!("run-script {script}")),
        None => run_interactive(&engine)?,
    };
    std::process::exit(exit_code(status));
}

// ---------------------------------------------------------------------------
// CLI parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Args {
    /// TOML config file.
    config: Option<PathBuf>,
    /// Script to run instead of the interactive shell.
    script: Option<String>,
}

fn parse_args(mut iter: impl Iterator<Item = String>) -> std::result::Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => args.config = Some(PathBuf::from(path)),
                None => return Err("--config needs a file".to_string()),
            },
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}"));
            },
            _ if args.script.is_some() => {
                return Err(format!("Unexpected argument: {arg}"));
            },
            _ => args.script = Some(arg),
        }
    }
    Ok(args)
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<ShellConfig> {
    match path {
        Some(path) => {
            let config = ShellConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        },
        None => Ok(ShellConfig::default()),
    }
}

/// Builder for the host shell. With the console disabled, messages go to
/// the log instead of stdout and stderr.
fn builder(config: ShellConfig) -> ShellBuilder {
    let quiet = !config.console_enabled;
    let builder = ShellBuilder::new(config);
    if quiet {
        let reporter: Arc<dyn MessageReporter> = Arc::new(LogReporter);
        builder.reporter(reporter)
    } else {
        builder
    }
}

/// Start the shell on stdin and block until it finishes.
fn run_interactive(engine: &ShellEngine) -> Result<Status> {
    let (tx, rx) = mpsc::channel();
    if engine.start(Some(tx)).is_none() {
        anyhow::bail!("shell failed to start");
    }
    let code = rx.recv().unwrap_or_else(|_| engine.exit_status());
    engine.stop();
    Ok(Status::from_code(code))
}

/// Process exit code for the final shell status.
fn exit_code(status: Status) -> i32 {
    match status {
        Status::Ok | Status::Exit => 0,
        Status::Failed(_) | Status::NotFound | Status::Invalid => 1,
    }
}
