//! Shell configuration loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ShellError};

/// What the read loop does when the underlying reader reports an I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadErrorPolicy {
    /// Log the fault and keep reading.
    #[default]
    Continue,
    /// Log the fault and leave the read loop.
    Stop,
}

/// Shell engine configuration (`lineshell.toml`).
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Prompt printed before each interactive read.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Whether the engine may write the prompt and progress markers to the console.
    #[serde(default = "yes")]
    pub console_enabled: bool,
    /// Line prefixes that mark a comment.
    #[serde(default = "default_comment_markers")]
    pub comment_markers: Vec<String>,
    /// Read rounds per `read_line` call.
    #[serde(default = "default_read_tries")]
    pub read_tries: u32,
    /// Wait per read round, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub read_error_policy: ReadErrorPolicy,
    /// Leave the read loop once the input stream is exhausted.
    #[serde(default = "yes")]
    pub exit_on_eof: bool,
    /// Extension appended to script names that have none.
    #[serde(default = "default_script_extension")]
    pub script_extension: String,
    /// Directory listed by `list-scripts` when no argument is given.
    #[serde(default = "default_script_dir")]
    pub script_dir: String,
    /// Prefix of the one-line description inside a script file.
    #[serde(default = "default_script_info_marker")]
    pub script_info_marker: String,
    /// Print a progress marker for every executed script line.
    #[serde(default)]
    pub script_progress: bool,
    /// Maximum nesting of scripts running scripts.
    #[serde(default = "default_max_script_depth")]
    pub max_script_depth: usize,
    /// Extra directories searched when loading script files.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

fn default_prompt() -> String {
    "> ".to_string()
}
fn yes() -> bool {
    true
}
fn default_comment_markers() -> Vec<String> {
    vec!["//".to_string(), "#".to_string()]
}
fn default_read_tries() -> u32 {
    1
}
fn default_read_timeout_ms() -> u64 {
    200
}
fn default_script_extension() -> String {
    "ssc".to_string()
}
fn default_script_dir() -> String {
    ".".to_string()
}
fn default_script_info_marker() -> String {
    "//**".to_string()
}
fn default_max_script_depth() -> usize {
    16
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            console_enabled: true,
            comment_markers: default_comment_markers(),
            read_tries: default_read_tries(),
            read_timeout_ms: default_read_timeout_ms(),
            read_error_policy: ReadErrorPolicy::default(),
            exit_on_eof: true,
            script_extension: default_script_extension(),
            script_dir: default_script_dir(),
            script_info_marker: default_script_info_marker(),
            script_progress: false,
            max_script_depth: default_max_script_depth(),
            search_paths: Vec::new(),
        }
    }
}

impl ShellConfig {
    /// Parse and validate a config from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ShellConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ShellError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        log::debug!("Loaded shell config from {}", path.display());
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.read_tries == 0 {
            return Err(ShellError::Config("read_tries must be at least 1".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ShellError::Config(
                "read_timeout_ms must be at least 1".into(),
            ));
        }
        if self.script_extension.is_empty() || self.script_extension.starts_with('.') {
            return Err(ShellError::Config(format!(
                "invalid script_extension: {:?}",
                self.script_extension
            )));
        }
        if self.comment_markers.iter().any(|m| m.is_empty()) {
            return Err(ShellError::Config("empty comment marker".into()));
        }
        if self.max_script_depth == 0 {
            return Err(ShellError::Config(
                "max_script_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Wait per read round.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Whether `line` (already trimmed) starts with a comment marker.
    pub fn is_comment(&self, line: &str) -> bool {
        self.comment_markers.iter().any(|m| line.starts_with(m.as_str()))
    }

    /// Append the script extension to `name` unless it already carries it.
    pub fn script_file_name(&self, name: &str) -> String {
        let suffix = format!(".{}", self.script_extension);
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{name}{suffix}")
        }
    }
}
