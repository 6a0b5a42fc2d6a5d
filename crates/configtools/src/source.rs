//! The interface supplying a configuration file path and the default
//! resource to the resolution engine.

use std::path::PathBuf;

/// Supplies the two inputs of source resolution: an optional configuration
/// file path and the bundled default resource contents.
///
/// The default resource is the always-required fallback property set shipped
/// with the application, typically embedded with `include_str!`. Returning
/// `None` makes construction fail with
/// [`ConfigError::MissingDefaultConfiguration`](crate::ConfigError::MissingDefaultConfiguration).
pub trait ConfigFileSource {
    /// Path of the runtime configuration file, if any.
    ///
    /// The file should carry the `.properties` extension; other extensions
    /// are transparently copied to a temporary `.properties` file before
    /// parsing, leaving the original untouched.
    fn config_file(&self) -> Option<PathBuf>;

    /// Raw contents of the bundled default properties resource.
    fn default_resource(&self) -> Option<String>;
}
