//! External settings sources consulted when resolving options.
//!
//! A [`SettingsSource`] is a flat string-keyed lookup. Keys are dotted option
//! properties such as `loom.debug.verbose`. Sources are only read while an
//! environment is being constructed.

use std::collections::BTreeMap;
use std::sync::Arc;

/// A flat, string-keyed source of raw setting values.
pub trait SettingsSource: Send + Sync {
    /// Raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// Interpret a raw setting as a flag.
///
/// Only `true` (any ASCII case) is truthy. Absent, `false`, and anything
/// unparsable all read as `false`.
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

// ---------------------------------------------------------------------------
// MapSettings
// ---------------------------------------------------------------------------

/// In-memory settings, typically loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapSettings {
    values: BTreeMap<String, String>,
}

impl MapSettings {
    /// Create an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, String>> for MapSettings {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl SettingsSource for MapSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

// ---------------------------------------------------------------------------
// EnvSettings
// ---------------------------------------------------------------------------

/// Settings read from process environment variables.
///
/// `loom.debug.verbose` is looked up as `LOOM_DEBUG_VERBOSE`: dots become
/// underscores and the key is upper-cased.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl EnvSettings {
    /// Environment variable name for a settings key.
    pub fn variable_for(key: &str) -> String {
        key.chars()
            .map(|c| if c == '.' { '_' } else { c.to_ascii_uppercase() })
            .collect()
    }
}

impl SettingsSource for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_for(key)).ok()
    }
}

// ---------------------------------------------------------------------------
// LayeredSettings
// ---------------------------------------------------------------------------

/// Several sources consulted in priority order; the first hit wins.
#[derive(Clone, Default)]
pub struct LayeredSettings {
    layers: Vec<Arc<dyn SettingsSource>>,
}

impl LayeredSettings {
    /// Create a source with no layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower priority than every existing one.
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn SettingsSource>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl core::fmt::Debug for LayeredSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayeredSettings")
            .field("depth", &self.layers.len())
            .finish()
    }
}

impl SettingsSource for LayeredSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}
