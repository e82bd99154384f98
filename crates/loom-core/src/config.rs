//! Launch configuration loaded from YAML.
//!
//! The configuration tells a bootstrap which isolation domain it runs in,
//! which phase to initialise the registry to, which option settings to
//! apply, and which configuration names to register per phase.
//!
//! ```yaml
//! isolation_domain: main
//! initial_phase: preinit
//! settings:
//!   loom.debug.verbose: true
//! configs:
//!   preinit: [core.loom.json]
//!   default: [late.loom.json]
//! side: client
//! ```
//!
//! Environment variables override the YAML values:
//! - `LOOM_ISOLATION_DOMAIN` overrides `isolation_domain`
//! - `LOOM_INITIAL_PHASE` overrides `initial_phase`
//! - `LOOM_SIDE` overrides `side`
//!
//! Option settings are additionally read from the process environment at
//! resolution time (see [`EnvSettings`]), taking priority over `settings`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use loom_types::{Phase, Side};
use serde::Deserialize;

use crate::bootstrap::IsolationDomain;
use crate::settings::{EnvSettings, LayeredSettings, MapSettings};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A phase name does not denote a real phase.
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    /// A side name does not denote a side.
    #[error("unknown side: {0}")]
    UnknownSide(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// A raw option setting: YAML booleans and strings are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawSetting {
    /// A YAML boolean.
    Flag(bool),
    /// Any other scalar, kept verbatim.
    Text(String),
}

impl core::fmt::Display for RawSetting {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Flag(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Top-level launch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoomConfig {
    /// Isolation domain bootstrap records and environments must match.
    #[serde(default = "default_isolation_domain")]
    pub isolation_domain: String,

    /// Phase the registry is initialised to.
    #[serde(default = "default_initial_phase")]
    pub initial_phase: String,

    /// Option settings keyed by property (e.g. `loom.debug`).
    #[serde(default)]
    pub settings: BTreeMap<String, RawSetting>,

    /// Configuration names to register, keyed by phase name.
    #[serde(default)]
    pub configs: BTreeMap<String, Vec<String>>,

    /// Side to assume when no probe can tell.
    #[serde(default)]
    pub side: Option<String>,
}

fn default_isolation_domain() -> String {
    "main".to_owned()
}

fn default_initial_phase() -> String {
    Phase::Preinit.name().to_owned()
}

impl Default for LoomConfig {
    fn default() -> Self {
        Self {
            isolation_domain: default_isolation_domain(),
            initial_phase: default_initial_phase(),
            settings: BTreeMap::new(),
            configs: BTreeMap::new(),
            side: None,
        }
    }
}

impl LoomConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("LOOM_ISOLATION_DOMAIN") {
            self.isolation_domain = val;
        }
        if let Some(val) = lookup("LOOM_INITIAL_PHASE") {
            self.initial_phase = val;
        }
        if let Some(val) = lookup("LOOM_SIDE") {
            self.side = Some(val);
        }
    }

    /// The configured isolation domain.
    pub fn domain(&self) -> IsolationDomain {
        IsolationDomain::new(self.isolation_domain.as_str())
    }

    /// The configured initial phase.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPhase`] if the name is not a real phase.
    pub fn initial_phase(&self) -> Result<Phase, ConfigError> {
        Phase::from_name(&self.initial_phase)
            .ok_or_else(|| ConfigError::UnknownPhase(self.initial_phase.clone()))
    }

    /// The configured fallback side, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSide`] if the name is not a side.
    pub fn side_override(&self) -> Result<Option<Side>, ConfigError> {
        self.side
            .as_deref()
            .map(|name| Side::from_name(name).ok_or_else(|| ConfigError::UnknownSide(name.to_owned())))
            .transpose()
    }

    /// Configuration names per phase, in phase order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPhase`] for a key that is not a phase.
    pub fn phase_configs(&self) -> Result<Vec<(Phase, Vec<String>)>, ConfigError> {
        let mut resolved = self
            .configs
            .iter()
            .map(|(name, names)| {
                Phase::from_name(name)
                    .map(|phase| (phase, names.clone()))
                    .ok_or_else(|| ConfigError::UnknownPhase(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        resolved.sort_by_key(|(phase, _)| *phase);
        Ok(resolved)
    }

    /// Option settings from this file.
    pub fn file_settings(&self) -> MapSettings {
        self.settings
            .iter()
            .fold(MapSettings::new(), |settings, (key, value)| {
                settings.with(key.as_str(), value.to_string())
            })
    }

    /// Option settings with the process environment layered over the file.
    pub fn settings(&self) -> LayeredSettings {
        LayeredSettings::new()
            .with_layer(Arc::new(EnvSettings))
            .with_layer(Arc::new(self.file_settings()))
    }
}
