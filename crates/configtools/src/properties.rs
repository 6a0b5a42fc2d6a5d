//! Flat `key=value` property bundles.
//!
//! The on-disk format is deliberately simple: one `key=value` (or
//! `key: value`) pair per line, `#` or `!` comment lines, blank lines
//! ignored. Keys and values are trimmed. There is no nesting and no escape
//! processing; parsing never fails, only I/O can.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// An immutable, flat key-to-value mapping parsed from property text.
#[derive(Debug, Clone, Default)]
pub struct PropertyBundle {
    entries: HashMap<String, String>,
}

impl PropertyBundle {
    /// Parse property text into a bundle. Later duplicate keys win.
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.split_once(['=', ':']) {
                Some((key, value)) => (key.trim(), value.trim()),
                // A separator-less line is a key with an empty value, which
                // every lookup treats as absent anyway.
                None => (line, ""),
            };
            if key.is_empty() {
                continue;
            }
            entries.insert(key.to_string(), value.to_string());
        }
        Self { entries }
    }

    /// Read and parse a property file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    /// Look up a key verbatim (case-sensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries in the bundle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
