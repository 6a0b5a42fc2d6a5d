//! Logging side effects: severity parsing, the injected sink capability,
//! and the process-wide sink built on the `log` facade.
//!
//! The resolution engine never reaches into global logging state directly;
//! it talks to a [`LogSink`], which tests can replace with a recording fake.

mod pattern;
mod rolling;

use crate::ConfigError;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::{Mutex, RwLock};
use pattern::PatternLayout;
use rolling::RollingFileWriter;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Severities accepted by the `loglevel` configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Disables all logging.
    Off,
}

impl LogLevel {
    /// The `log` facade filter corresponding to this severity.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::Trace,
            Self::Debug => LevelFilter::Debug,
            Self::Info => LevelFilter::Info,
            Self::Warn => LevelFilter::Warn,
            Self::Error => LevelFilter::Error,
            Self::Off => LevelFilter::Off,
        }
    }
}

/// A severity name was not recognized.
#[derive(Debug, Error)]
#[error("unknown log level {0:?}")]
pub struct UnknownLogLevel(String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    /// Case-insensitive; `all` is accepted as an alias of `trace`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "all" | "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            _ => Err(UnknownLogLevel(value.to_string())),
        }
    }
}

/// Capability for mutating process-wide logging, injected into the
/// resolution engine so tests can substitute a fake that records calls.
pub trait LogSink: Send + Sync {
    /// Set the global root log level.
    fn set_level(&self, level: LogLevel) -> Result<(), ConfigError>;

    /// Detach every currently attached log destination and attach a single
    /// append-mode, daily-rolling file destination formatted with `pattern`.
    fn replace_file_output(&self, path: &Path, pattern: &str) -> Result<(), ConfigError>;
}

/// Process-wide [`LogSink`] backed by the `log` facade.
///
/// Installs a dispatcher as the global logger on first use. Until a file
/// output is attached the dispatcher writes to stderr in a plain format;
/// [`replace_file_output`](LogSink::replace_file_output) swaps in a single
/// pattern-formatted, daily-rolling file destination, replacing whatever
/// wrote before — total replacement, never addition.
#[derive(Debug)]
pub struct GlobalLogSink;

impl GlobalLogSink {
    /// Create the sink, installing the global dispatcher if none is set yet.
    pub fn new() -> Self {
        install();
        Self
    }
}

impl Default for GlobalLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for GlobalLogSink {
    fn set_level(&self, level: LogLevel) -> Result<(), ConfigError> {
        log::set_max_level(level.to_level_filter());
        Ok(())
    }

    fn replace_file_output(&self, path: &Path, pattern: &str) -> Result<(), ConfigError> {
        if !INSTALLED.load(Ordering::Acquire) {
            return Err(ConfigError::Logging(
                "another global logger is already installed".to_string(),
            ));
        }
        let writer = RollingFileWriter::open(path).map_err(|err| {
            ConfigError::Logging(format!("cannot open log file {}: {err}", path.display()))
        })?;
        let output = FileOutput {
            layout: PatternLayout::parse(pattern),
            writer: Mutex::new(writer),
        };
        *DISPATCHER.output.write() = Some(output);
        Ok(())
    }
}

/// The single attached file destination, when one exists.
struct FileOutput {
    layout: PatternLayout,
    writer: Mutex<RollingFileWriter>,
}

/// Global logger dispatching to the attached file output, or stderr.
struct Dispatcher {
    output: RwLock<Option<FileOutput>>,
}

static DISPATCHER: Dispatcher = Dispatcher {
    output: RwLock::new(None),
};
static INSTALL: Once = Once::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);

fn install() {
    INSTALL.call_once(|| {
        if log::set_logger(&DISPATCHER).is_ok() {
            log::set_max_level(LevelFilter::Info);
            INSTALLED.store(true, Ordering::Release);
        }
    });
}

impl Log for Dispatcher {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level().to_level_filter() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let output = self.output.read();
        match &*output {
            Some(output) => {
                let line = output.layout.render(
                    Local::now(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                // Logging must never fail the caller; write errors are dropped.
                let _ = output.writer.lock().write_line(&line);
            }
            None => {
                let _ = writeln!(
                    std::io::stderr(),
                    "{} {:<5} {} - {}",
                    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {
        if let Some(output) = &*self.output.read() {
            let _ = output.writer.lock().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WaRn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("OFF".parse::<LogLevel>().unwrap(), LogLevel::Off);
    }

    #[test]
    fn all_is_an_alias_of_trace() {
        assert_eq!("all".parse::<LogLevel>().unwrap(), LogLevel::Trace);
    }

    #[test]
    fn rejects_unknown_levels() {
        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unknown log level \"verbose\"");
    }

    #[test]
    fn maps_onto_facade_filters() {
        assert_eq!(LogLevel::Off.to_level_filter(), LevelFilter::Off);
        assert_eq!(LogLevel::Trace.to_level_filter(), LevelFilter::Trace);
        assert_eq!(LogLevel::Error.to_level_filter(), LevelFilter::Error);
    }
}
