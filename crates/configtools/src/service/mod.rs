//! Configuration resolution: active-source selection, the lookup engine,
//! type coercion, the override layer, and logging side effects.
//!
//! One backing source is chosen once at construction — a property file, the
//! process environment, or the bundled defaults — and never changes
//! afterward. Every accessor consults the override layer first, then the
//! active source. The reserved keys `loglevel`, `logfile`, `logpattern`,
//! and `version` carry special semantics; see the method docs.

#[cfg(test)]
mod tests;

use crate::ConfigError;
use crate::logging::{GlobalLogSink, LogLevel, LogSink};
use crate::properties::PropertyBundle;
use crate::source::ConfigFileSource;
use log::{debug, error, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Reserved key: resets the global root log level when set.
pub const KEY_LOGLEVEL: &str = "loglevel";
/// Reserved key: path of the daily-rolling log file.
pub const KEY_LOGFILE: &str = "logfile";
/// Reserved key: line pattern for the log file; takes effect only together
/// with [`KEY_LOGFILE`].
pub const KEY_LOGPATTERN: &str = "logpattern";
/// Reserved key: application version. Always read from the default bundle
/// and never overridable.
pub const KEY_VERSION: &str = "version";

/// Environment variable forcing default-bundle fallback when no
/// configuration file is available. Presence is the flag; the content is
/// irrelevant.
pub const ENV_USE_DEFAULT: &str = "CONFIG_USE_DEFAULT";

/// Canonical extension of property files.
const PROPERTIES_EXTENSION: &str = "properties";

/// The single backing store selected at construction for ordinary lookups.
#[derive(Debug)]
enum ActiveSource {
    /// A property file supplied by the caller.
    File(PropertyBundle),
    /// The process environment, with key transformation.
    Environment,
    /// The default bundle doubling as the active source.
    DefaultFallback,
}

/// Resolves configuration values from a prioritized set of sources and
/// exposes typed accessors over them.
///
/// Accessors take `&self` and are safe to call concurrently. Overrides are
/// guarded internally, but the logging replacement they can trigger is not
/// atomic to an external observer, so callers that care about ordering
/// should serialize [`override_parameter`](Self::override_parameter) calls.
pub struct ConfigService {
    defaults: PropertyBundle,
    active: ActiveSource,
    overrides: RwLock<HashMap<String, String>>,
    log_sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("defaults", &self.defaults)
            .field("active", &self.active)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

impl ConfigService {
    /// Build a service wired to the process-wide log sink.
    pub fn new(source: &dyn ConfigFileSource) -> Result<Self, ConfigError> {
        Self::with_log_sink(source, Arc::new(GlobalLogSink::new()))
    }

    /// Build a service with an injected log sink.
    ///
    /// Resolution runs once, synchronously: the default bundle loads (fatal
    /// if unavailable), the active source is selected, and the logging
    /// procedures run against the resolved `loglevel`/`logfile`/`logpattern`
    /// values. Fatal errors are logged at error severity before returning.
    pub fn with_log_sink(
        source: &dyn ConfigFileSource,
        log_sink: Arc<dyn LogSink>,
    ) -> Result<Self, ConfigError> {
        let defaults = load_default_bundle(source).inspect_err(|err| error!("{err}"))?;
        let active = resolve_active_source(source).inspect_err(|err| error!("{err}"))?;
        let service = Self {
            defaults,
            active,
            overrides: RwLock::new(HashMap::new()),
            log_sink,
        };

        // A version entry outside the default bundle is never observed.
        if !matches!(service.active, ActiveSource::DefaultFallback)
            && service
                .resolve_active(KEY_VERSION)
                .is_some_and(|value| !value.trim().is_empty())
        {
            warn!("'{KEY_VERSION}' is defined in the active configuration source; its value will be ignored");
        }

        service.apply_log_level().inspect_err(|err| error!("{err}"))?;
        service.apply_log_file().inspect_err(|err| error!("{err}"))?;
        Ok(service)
    }

    /// Resolve a key, or `None` when it is absent or blank.
    ///
    /// The override layer wins; otherwise the active source is consulted
    /// (verbatim key for file and default sources, transformed key against
    /// the process environment). Lookup failures collapse to `None`.
    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        let raw = self
            .overrides
            .read()
            .get(key)
            .cloned()
            .or_else(|| self.resolve_active(key))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Resolve a required key; absence is an error.
    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional_string(key).ok_or_else(|| {
            let err = ConfigError::RequiredKeyMissing(key.to_string());
            error!("{err}");
            err
        })
    }

    /// Resolve a required key as a base-10 `i64`.
    pub fn get_long(&self, key: &str) -> Result<i64, ConfigError> {
        parse_value(key, self.get_string(key)?)
    }

    /// Resolve a required key as a base-10 `i32`.
    pub fn get_int(&self, key: &str) -> Result<i32, ConfigError> {
        parse_value(key, self.get_string(key)?)
    }

    /// Resolve a required key as an `f64`.
    pub fn get_double(&self, key: &str) -> Result<f64, ConfigError> {
        parse_value(key, self.get_string(key)?)
    }

    /// Resolve a required key as a boolean: `true` iff the value equals
    /// `"true"` case-insensitively. Boolean coercion never fails to parse.
    pub fn get_boolean(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.get_string(key)?.eq_ignore_ascii_case("true"))
    }

    /// Optional variant of [`get_long`](Self::get_long). Absence is
    /// `Ok(None)`; a present but malformed value is still an error.
    pub fn get_optional_long(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.get_optional_string(key)
            .map(|raw| parse_value(key, raw))
            .transpose()
    }

    /// Optional variant of [`get_int`](Self::get_int).
    pub fn get_optional_int(&self, key: &str) -> Result<Option<i32>, ConfigError> {
        self.get_optional_string(key)
            .map(|raw| parse_value(key, raw))
            .transpose()
    }

    /// Optional variant of [`get_double`](Self::get_double).
    pub fn get_optional_double(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get_optional_string(key)
            .map(|raw| parse_value(key, raw))
            .transpose()
    }

    /// Optional variant of [`get_boolean`](Self::get_boolean).
    pub fn get_optional_boolean(&self, key: &str) -> Option<bool> {
        self.get_optional_string(key)
            .map(|raw| raw.eq_ignore_ascii_case("true"))
    }

    /// The application version, always read from the default bundle. The
    /// override layer and the active source are bypassed entirely.
    pub fn get_version(&self) -> Result<String, ConfigError> {
        match self
            .defaults
            .get(KEY_VERSION)
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            Some(value) => Ok(value.to_string()),
            None => {
                let err = ConfigError::RequiredKeyMissing(KEY_VERSION.to_string());
                error!("{err}");
                Err(err)
            }
        }
    }

    /// Insert or replace a key in the override layer. Use with care: an
    /// override shadows the active source for every later lookup.
    ///
    /// The `version` key can never be overridden (checked case-
    /// insensitively). Overriding `loglevel` re-runs log-level
    /// configuration; `logfile` or `logpattern` re-run log-file
    /// configuration. Errors from those procedures propagate to the caller.
    pub fn override_parameter(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        if key.eq_ignore_ascii_case(KEY_VERSION) {
            return Err(ConfigError::InvalidOverride(KEY_VERSION.to_string()));
        }
        self.overrides
            .write()
            .insert(key.to_string(), value.to_string());
        if key == KEY_LOGLEVEL {
            self.apply_log_level()?;
        } else if key == KEY_LOGFILE || key == KEY_LOGPATTERN {
            self.apply_log_file()?;
        }
        Ok(())
    }

    /// Resolve a key against the active source only.
    fn resolve_active(&self, key: &str) -> Option<String> {
        match &self.active {
            ActiveSource::File(bundle) => bundle.get(key).map(str::to_string),
            ActiveSource::DefaultFallback => self.defaults.get(key).map(str::to_string),
            // Non-Unicode values collapse to absent, per the permissive
            // optional-lookup contract.
            ActiveSource::Environment => env::var(environment_key(key)).ok(),
        }
    }

    /// Apply the resolved `loglevel`, if any. Absence keeps the current
    /// global level untouched.
    fn apply_log_level(&self) -> Result<(), ConfigError> {
        let Some(raw) = self.get_optional_string(KEY_LOGLEVEL) else {
            return Ok(());
        };
        let level = LogLevel::from_str(&raw).map_err(|err| ConfigError::Parse {
            key: KEY_LOGLEVEL.to_string(),
            value: raw.clone(),
            message: err.to_string(),
        })?;
        debug!("setting root log level to {raw}");
        self.log_sink.set_level(level)
    }

    /// Replace the file log destination when both `logfile` and
    /// `logpattern` resolve. A lone half of the pair is a no-op, not an
    /// error. Safe to re-run with the same or different values.
    fn apply_log_file(&self) -> Result<(), ConfigError> {
        let (Some(logfile), Some(logpattern)) = (
            self.get_optional_string(KEY_LOGFILE),
            self.get_optional_string(KEY_LOGPATTERN),
        ) else {
            return Ok(());
        };
        debug!("replacing log destination with daily-rolling file {logfile}");
        self.log_sink
            .replace_file_output(Path::new(&logfile), &logpattern)
    }
}

/// Load the always-required default bundle; unavailable is fatal.
fn load_default_bundle(source: &dyn ConfigFileSource) -> Result<PropertyBundle, ConfigError> {
    let contents = source.default_resource().ok_or_else(|| {
        ConfigError::MissingDefaultConfiguration("no default resource supplied".to_string())
    })?;
    Ok(PropertyBundle::parse(&contents))
}

/// Select the active source: file if a usable one exists, otherwise the
/// default bundle when [`ENV_USE_DEFAULT`] is set, otherwise the process
/// environment.
fn resolve_active_source(source: &dyn ConfigFileSource) -> Result<ActiveSource, ConfigError> {
    match source.config_file() {
        Some(path) if path.exists() => {
            debug!("loading configuration from {}", path.display());
            return Ok(ActiveSource::File(load_file_bundle(&path)?));
        }
        Some(path) => warn!("{} not found", path.display()),
        None => debug!("no configuration file supplied"),
    }
    if env::var_os(ENV_USE_DEFAULT).is_some() {
        warn!("no configuration file available: using default configuration");
        Ok(ActiveSource::DefaultFallback)
    } else {
        debug!("no configuration file available: reading the process environment");
        Ok(ActiveSource::Environment)
    }
}

/// Parse a property file, materializing a temporary `.properties` copy
/// first when the extension is not the canonical one. The original file is
/// left untouched and the copy is removed on drop.
fn load_file_bundle(path: &Path) -> Result<PropertyBundle, ConfigError> {
    let file_load = |source: std::io::Error| ConfigError::FileLoad {
        path: path.to_path_buf(),
        source,
    };
    if path.extension().and_then(|ext| ext.to_str()) == Some(PROPERTIES_EXTENSION) {
        return PropertyBundle::from_file(path).map_err(file_load);
    }
    let temp = tempfile::Builder::new()
        .prefix("configtools")
        .suffix(".properties")
        .tempfile()
        .map_err(file_load)?;
    std::fs::copy(path, temp.path()).map_err(file_load)?;
    PropertyBundle::from_file(temp.path()).map_err(file_load)
}

/// Transform a key for environment lookup: uppercase, `.` becomes `_`.
fn environment_key(key: &str) -> String {
    key.to_ascii_uppercase().replace('.', "_")
}

/// Base-10 coercion of a resolved value; the error carries key and value.
fn parse_value<T>(key: &str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|err: T::Err| ConfigError::Parse {
        key: key.to_string(),
        message: err.to_string(),
        value: raw,
    })
}
