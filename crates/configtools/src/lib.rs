//! Prioritized configuration resolution with typed accessors.
//!
//! Values resolve through an explicit runtime override layer first, then a
//! single active source chosen once at construction: a property file
//! supplied by the caller, the process environment (with `key.name` →
//! `KEY_NAME` transformation), or the always-required bundled defaults.
//! The reserved keys `loglevel`, `logfile`, and `logpattern` reconfigure
//! process-wide logging as a side effect; `version` is always read from the
//! default bundle and can never be overridden.

mod error;
mod logging;
mod properties;
mod service;
mod source;

/// Public error type returned by resolution and override APIs.
pub use error::ConfigError;
/// Logging severities and the injected sink capability.
pub use logging::{GlobalLogSink, LogLevel, LogSink, UnknownLogLevel};
/// Flat property bundles.
pub use properties::PropertyBundle;
/// The resolution engine and its reserved keys.
pub use service::{
    ConfigService, ENV_USE_DEFAULT, KEY_LOGFILE, KEY_LOGLEVEL, KEY_LOGPATTERN, KEY_VERSION,
};
/// Input interface supplying the configuration file and default resource.
pub use source::ConfigFileSource;
