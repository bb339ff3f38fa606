//! Message sinks for error, warning and info text.
//!
//! The engine and interpreters never format presentation; they hand plain
//! text to a [`MessageReporter`].

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(name)
    }
}

/// Sink for user-visible messages.
pub trait MessageReporter: Send + Sync {
    fn report(&self, severity: Severity, text: &str);
}

/// Writes info to stdout and errors/warnings to stderr.
///
/// Errors and warnings are also logged.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl MessageReporter for ConsoleReporter {
    fn report(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Info => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{text}");
            },
            Severity::Warning | Severity::Error => {
                log::debug!("{severity}: {text}");
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{severity}: {text}");
            },
        }
    }
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Default)]
pub struct LogReporter;

impl MessageReporter for LogReporter {
    fn report(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Error => log::error!("{text}"),
            Severity::Warning => log::warn!("{text}"),
            Severity::Info => log::info!("{text}"),
        }
    }
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages received so far.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.lock().clone()
    }

    /// Texts of the messages with `severity`.
    pub fn texts(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Number of messages with `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|(s, _)| *s == severity).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Severity, String)>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageReporter for MemoryReporter {
    fn report(&self, severity: Severity, text: &str) {
        self.lock().push((severity, text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_collects_in_order() {
        let reporter = MemoryReporter::new();
        reporter.report(Severity::Info, "one");
        reporter.report(Severity::Error, "two");
        reporter.report(Severity::Info, "three");
        assert_eq!(reporter.messages().len(), 3);
        assert_eq!(reporter.texts(Severity::Info), vec!["one", "three"]);
        assert_eq!(reporter.count(Severity::Error), 1);
        assert_eq!(reporter.count(Severity::Warning), 0);
    }

    #[test]
    fn memory_reporter_clear() {
        let reporter = MemoryReporter::new();
        reporter.report(Severity::Warning, "w");
        reporter.clear();
        assert!(reporter.messages().is_empty());
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    /// Records every log record for the lifetime of the test binary.
    struct Capture(Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    #[test]
    fn log_reporter_maps_severity_to_level() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let reporter = LogReporter;
        reporter.report(Severity::Error, "log-reporter: broken");
        reporter.report(Severity::Warning, "log-reporter: careful");
        reporter.report(Severity::Info, "log-reporter: fine");

        let seen: Vec<(log::Level, String)> = CAPTURE
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, text)| text.starts_with("log-reporter: "))
            .cloned()
            .collect();
        assert_eq!(
            seen,
            vec![
                (log::Level::Error, "log-reporter: broken".to_string()),
                (log::Level::Warn, "log-reporter: careful".to_string()),
                (log::Level::Info, "log-reporter: fine".to_string()),
            ]
        );
    }
}
