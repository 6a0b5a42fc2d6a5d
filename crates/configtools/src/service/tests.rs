//! Tests for the resolution engine.

use super::*;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Serializes tests that read or mutate the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Default resource contents used by most fixtures.
const DEFAULTS: &str = "version=1.2.3\ndefault.only=from defaults\n";

/// Property file contents matching the typed-accessor scenario.
const FILE_CONTENTS: &str = "\
value.string=This is a test
value.long=123456
value.int=123
value.double=1.235894
value.boolean=true
version=9.9.9
";

/// Test double supplying a fixed file path and default resource.
struct StaticSource {
    config_file: Option<PathBuf>,
    default_resource: Option<String>,
}

impl ConfigFileSource for StaticSource {
    fn config_file(&self) -> Option<PathBuf> {
        self.config_file.clone()
    }

    fn default_resource(&self) -> Option<String> {
        self.default_resource.clone()
    }
}

/// Log sink that records calls instead of mutating process state.
#[derive(Default)]
struct RecordingSink {
    levels: Mutex<Vec<LogLevel>>,
    replacements: Mutex<Vec<(PathBuf, String)>>,
}

impl LogSink for RecordingSink {
    fn set_level(&self, level: LogLevel) -> Result<(), ConfigError> {
        self.levels.lock().push(level);
        Ok(())
    }

    fn replace_file_output(&self, path: &Path, pattern: &str) -> Result<(), ConfigError> {
        self.replacements
            .lock()
            .push((path.to_path_buf(), pattern.to_string()));
        Ok(())
    }
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write");
    path
}

/// Build a service over a `.properties` file with the given contents.
fn file_service(contents: &str) -> (TempDir, ConfigService, Arc<RecordingSink>) {
    let dir = TempDir::new().expect("tmp");
    let path = write_file(&dir, "app.properties", contents);
    let sink = Arc::new(RecordingSink::default());
    let service = ConfigService::with_log_sink(
        &StaticSource {
            config_file: Some(path),
            default_resource: Some(DEFAULTS.to_string()),
        },
        sink.clone(),
    )
    .expect("service");
    (dir, service, sink)
}

#[test]
fn typed_accessors_resolve_file_values() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    assert_eq!(service.get_string("value.string").unwrap(), "This is a test");
    assert_eq!(service.get_long("value.long").unwrap(), 123456);
    assert_eq!(service.get_int("value.int").unwrap(), 123);
    assert_eq!(service.get_double("value.double").unwrap(), 1.235894);
    assert!(service.get_boolean("value.boolean").unwrap());
}

#[test]
fn optional_accessors_distinguish_absence_from_malformation() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    assert_eq!(service.get_optional_long("value.long").unwrap(), Some(123456));
    assert_eq!(service.get_optional_long("not.in.file").unwrap(), None);
    assert!(matches!(
        service.get_optional_long("value.string"),
        Err(ConfigError::Parse { .. })
    ));
    assert_eq!(service.get_optional_int("not.in.file").unwrap(), None);
    assert_eq!(service.get_optional_double("not.in.file").unwrap(), None);
}

#[test]
fn missing_required_key_carries_exact_message() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    let err = service.get_string("not.in.file").unwrap_err();
    assert!(matches!(err, ConfigError::RequiredKeyMissing(_)));
    assert_eq!(
        err.to_string(),
        "required configuration parameter not.in.file not found"
    );
}

#[test]
fn malformed_numeric_is_a_parse_error() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    let err = service.get_long("value.string").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    let err = service.get_int("value.double").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn boolean_coercion_never_fails() {
    let (_dir, service, _sink) =
        file_service("flag.false=false\nflag.numeric=1\nflag.garbage=whatever\nflag.caps=TRUE\n");

    assert!(!service.get_boolean("flag.false").unwrap());
    assert!(!service.get_boolean("flag.numeric").unwrap());
    assert!(!service.get_boolean("flag.garbage").unwrap());
    assert!(service.get_boolean("flag.caps").unwrap());
    assert_eq!(service.get_optional_boolean("flag.false"), Some(false));
    assert_eq!(service.get_optional_boolean("not.in.file"), None);
}

#[test]
fn override_wins_over_the_active_source() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    service
        .override_parameter("value.string", "overridden")
        .expect("override");
    assert_eq!(service.get_string("value.string").unwrap(), "overridden");

    // Last write wins.
    service
        .override_parameter("value.string", "overridden again")
        .expect("override");
    assert_eq!(
        service.get_string("value.string").unwrap(),
        "overridden again"
    );
}

#[test]
fn blank_override_behaves_as_absent() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    service
        .override_parameter("value.string", "   ")
        .expect("override");
    assert_eq!(service.get_optional_string("value.string"), None);
    assert!(matches!(
        service.get_string("value.string"),
        Err(ConfigError::RequiredKeyMissing(_))
    ));
}

#[test]
fn override_roundtrip_trims_the_value() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    service
        .override_parameter("some.key", "  padded value  ")
        .expect("override");
    assert_eq!(service.get_string("some.key").unwrap(), "padded value");
}

#[test]
fn version_always_comes_from_the_default_bundle() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    // The file defines its own version; get_version ignores it.
    assert_eq!(service.get_version().unwrap(), "1.2.3");
    assert_eq!(service.get_string("version").unwrap(), "9.9.9");
}

#[test]
fn version_override_is_rejected_case_insensitively() {
    let (_dir, service, _sink) = file_service(FILE_CONTENTS);

    for key in ["version", "VERSION", "Version"] {
        let err = service.override_parameter(key, "0.0.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride(_)));
        assert_eq!(err.to_string(), "cannot override version parameter");
    }
    assert_eq!(service.get_version().unwrap(), "1.2.3");
}

#[test]
fn version_missing_from_defaults_is_required_key_missing() {
    let (_dir, service, _sink) = {
        let dir = TempDir::new().expect("tmp");
        let path = write_file(&dir, "app.properties", FILE_CONTENTS);
        let sink = Arc::new(RecordingSink::default());
        let service = ConfigService::with_log_sink(
            &StaticSource {
                config_file: Some(path),
                default_resource: Some("no.version.here=true\n".to_string()),
            },
            sink.clone(),
        )
        .expect("service");
        (dir, service, sink)
    };

    assert!(matches!(
        service.get_version(),
        Err(ConfigError::RequiredKeyMissing(_))
    ));
}

#[test]
fn non_canonical_extension_is_copied_before_parsing() {
    let dir = TempDir::new().expect("tmp");
    let path = write_file(&dir, "configurationfile.cfg", FILE_CONTENTS);
    let service = ConfigService::with_log_sink(
        &StaticSource {
            config_file: Some(path.clone()),
            default_resource: Some(DEFAULTS.to_string()),
        },
        Arc::new(RecordingSink::default()),
    )
    .expect("service");

    assert_eq!(service.get_string("value.string").unwrap(), "This is a test");
    // The original file is left untouched.
    assert_eq!(fs::read_to_string(&path).expect("original"), FILE_CONTENTS);
}

#[test]
fn missing_default_resource_is_fatal() {
    let err = ConfigService::with_log_sink(
        &StaticSource {
            config_file: None,
            default_resource: None,
        },
        Arc::new(RecordingSink::default()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::MissingDefaultConfiguration(_)));
}

#[test]
fn environment_source_transforms_keys() {
    let _guard = ENV_LOCK.lock();
    unsafe {
        env::remove_var(ENV_USE_DEFAULT);
        env::set_var("AN_EXAMPLE", "bar");
    }

    let service = ConfigService::with_log_sink(
        &StaticSource {
            config_file: None,
            default_resource: Some(DEFAULTS.to_string()),
        },
        Arc::new(RecordingSink::default()),
    )
    .expect("service");

    assert_eq!(service.get_string("an.example").unwrap(), "bar");
    assert_eq!(service.get_optional_string("no.such.variable.anywhere"), None);

    unsafe {
        env::remove_var("AN_EXAMPLE");
    }
}

#[test]
fn nonexistent_file_path_falls_through_to_the_environment() {
    let _guard = ENV_LOCK.lock();
    unsafe {
        env::remove_var(ENV_USE_DEFAULT);
        env::set_var("FALLTHROUGH_KEY", "reached");
    }

    let service = ConfigService::with_log_sink(
        &StaticSource {
            config_file: Some(PathBuf::from("/definitely/not/here.properties")),
            default_resource: Some(DEFAULTS.to_string()),
        },
        Arc::new(RecordingSink::default()),
    )
    .expect("service");

    assert_eq!(service.get_string("fallthrough.key").unwrap(), "reached");

    unsafe {
        env::remove_var("FALLTHROUGH_KEY");
    }
}

#[test]
fn use_default_flag_falls_back_to_the_default_bundle() {
    let _guard = ENV_LOCK.lock();
    unsafe {
        env::set_var(ENV_USE_DEFAULT, "1");
    }

    let service = ConfigService::with_log_sink(
        &StaticSource {
            config_file: None,
            default_resource: Some(DEFAULTS.to_string()),
        },
        Arc::new(RecordingSink::default()),
    )
    .expect("service");

    assert_eq!(service.get_string("default.only").unwrap(), "from defaults");
    assert_eq!(service.get_version().unwrap(), "1.2.3");

    unsafe {
        env::remove_var(ENV_USE_DEFAULT);
    }
}

#[test]
fn construction_applies_loglevel_and_logfile_together() {
    let (_dir, _service, sink) = file_service(
        "loglevel=warn\nlogfile=/var/log/app.log\nlogpattern=%level %msg%n\n",
    );

    assert_eq!(*sink.levels.lock(), vec![LogLevel::Warn]);
    assert_eq!(
        *sink.replacements.lock(),
        vec![(
            PathBuf::from("/var/log/app.log"),
            "%level %msg%n".to_string()
        )]
    );
}

#[test]
fn lone_logfile_half_is_a_noop_until_completed() {
    let (_dir, service, sink) = file_service(FILE_CONTENTS);

    service
        .override_parameter(KEY_LOGFILE, "/var/log/app.log")
        .expect("logfile");
    assert!(sink.replacements.lock().is_empty());

    service
        .override_parameter(KEY_LOGPATTERN, "%msg%n")
        .expect("logpattern");
    assert_eq!(
        *sink.replacements.lock(),
        vec![(PathBuf::from("/var/log/app.log"), "%msg%n".to_string())]
    );
}

#[test]
fn loglevel_override_reconfigures_the_sink() {
    let (_dir, service, sink) = file_service(FILE_CONTENTS);

    service.override_parameter(KEY_LOGLEVEL, "off").expect("off");
    service
        .override_parameter(KEY_LOGLEVEL, "debug")
        .expect("debug");
    assert_eq!(*sink.levels.lock(), vec![LogLevel::Off, LogLevel::Debug]);
}

#[test]
fn unrecognized_loglevel_fails_the_override() {
    let (_dir, service, sink) = file_service(FILE_CONTENTS);

    let err = service
        .override_parameter(KEY_LOGLEVEL, "verbose")
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(sink.levels.lock().is_empty());
}

#[test]
fn unrecognized_loglevel_in_the_file_fails_construction() {
    let dir = TempDir::new().expect("tmp");
    let path = write_file(&dir, "app.properties", "loglevel=shouting\n");
    let err = ConfigService::with_log_sink(
        &StaticSource {
            config_file: Some(path),
            default_resource: Some(DEFAULTS.to_string()),
        },
        Arc::new(RecordingSink::default()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn environment_key_transformation() {
    assert_eq!(environment_key("an.example"), "AN_EXAMPLE");
    assert_eq!(environment_key("key.name"), "KEY_NAME");
    assert_eq!(environment_key("simple"), "SIMPLE");
}
