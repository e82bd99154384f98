//! Per-phase environment snapshots.
//!
//! An [`Environment`] is bound to one [`Phase`]. It is created at most once
//! per phase by the [`PhaseRegistry`](crate::registry::PhaseRegistry) and
//! lives as long as the registry does.
//!
//! # Construction
//!
//! Construction either yields a complete environment or fails without
//! leaving anything behind:
//!
//! 1. The blackboard init marker must equal [`VERSION`].
//! 2. The caller's isolation domain must equal the one bootstrap recorded.
//! 3. Every [`EnvOption`] is resolved into an [`OptionSnapshot`].
//! 4. With `loom.debug.verbose` enabled, the first phase's environment
//!    emits a [`VerboseReport`].
//!
//! # Options
//!
//! The option snapshot is resolved once. [`Environment::set_option`]
//! overwrites a single slot and does not re-derive the hierarchy, so a
//! child may read `true` while its parent reads `false`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loom_types::{EnvOption, Phase, Side};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::blackboard::Blackboard;
use crate::bootstrap::{DOMAIN_KEY, INIT_KEY, IsolationDomain, VERSION};
use crate::error::{EnvironmentError, Result};
use crate::options::OptionSnapshot;
use crate::report::VerboseReport;
use crate::settings::SettingsSource;
use crate::side::SideDetector;
use crate::transformer::{TRANSFORMER_KEY, Transformer, TransformerHandle};

/// Prefix of the per-phase configuration list keys.
pub const CONFIGS_KEY: &str = "loom.configs";

/// Shared, append-only list of configuration names stored on the blackboard.
pub type ConfigList = RwLock<Vec<String>>;

/// Minimum width of the verbose start-up report.
const REPORT_WIDTH: usize = 32;

/// Blackboard key of the configuration list for `phase`.
pub fn configs_key(phase: Phase) -> String {
    format!("{CONFIGS_KEY}.{}", phase.key_segment())
}

/// Collaborators an environment is constructed against.
#[derive(Clone)]
pub struct EnvironmentContext {
    /// Shared blackboard.
    pub blackboard: Arc<Blackboard>,
    /// Source of option settings.
    pub settings: Arc<dyn SettingsSource>,
    /// Side detection probes.
    pub detector: Arc<SideDetector>,
    /// Isolation domain of the code constructing environments.
    pub domain: IsolationDomain,
}

impl core::fmt::Debug for EnvironmentContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnvironmentContext")
            .field("blackboard", &self.blackboard)
            .field("detector", &self.detector)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Serializable view of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSummary {
    /// Phase the environment is bound to.
    pub phase: Phase,
    /// Init marker version, if still published.
    pub version: Option<String>,
    /// Current side.
    pub side: Side,
    /// Option values keyed by property.
    pub options: BTreeMap<String, bool>,
    /// Registered configuration names, in insertion order.
    pub configs: Vec<String>,
    /// When the environment was constructed.
    pub constructed_at: DateTime<Utc>,
}

/// Resolved state for a single phase.
#[derive(Debug)]
pub struct Environment {
    phase: Phase,
    configs_key: String,
    options: RwLock<OptionSnapshot>,
    side: RwLock<Option<Side>>,
    blackboard: Arc<Blackboard>,
    detector: Arc<SideDetector>,
    domain: IsolationDomain,
    constructed_at: DateTime<Utc>,
}

impl Environment {
    /// Construct the environment for `phase`.
    ///
    /// # Errors
    ///
    /// - [`EnvironmentError::InvalidPhase`] for [`Phase::NotInitialized`].
    /// - [`EnvironmentError::VersionConflict`] if the init marker is missing
    ///   or carries another version.
    /// - [`EnvironmentError::WrongIsolationDomain`] if `context.domain` is
    ///   not the domain bootstrap recorded.
    pub(crate) fn new(phase: Phase, context: &EnvironmentContext) -> Result<Self> {
        if !phase.is_initialized() {
            return Err(EnvironmentError::InvalidPhase {
                operation: "construct environment",
                phase,
            });
        }

        let marker = context.blackboard.get::<String>(INIT_KEY);
        if marker.as_deref().map(String::as_str) != Some(VERSION) {
            return Err(EnvironmentError::VersionConflict {
                expected: VERSION.to_owned(),
                found: marker.map(|version| version.as_str().to_owned()),
            });
        }

        let recorded = context.blackboard.get::<IsolationDomain>(DOMAIN_KEY);
        if recorded.as_deref() != Some(&context.domain) {
            return Err(EnvironmentError::WrongIsolationDomain {
                expected: recorded.map(|domain| domain.as_str().to_owned()),
                actual: context.domain.as_str().to_owned(),
            });
        }

        let environment = Self {
            phase,
            configs_key: configs_key(phase),
            options: RwLock::new(OptionSnapshot::resolve(context.settings.as_ref())),
            side: RwLock::new(None),
            blackboard: Arc::clone(&context.blackboard),
            detector: Arc::clone(&context.detector),
            domain: context.domain.clone(),
            constructed_at: Utc::now(),
        };
        info!(%phase, domain = %environment.domain, "environment constructed");

        if environment.reports_on_construction() {
            environment.verbose_report().emit();
        }

        Ok(environment)
    }

    /// Whether construction emits the verbose report: only for the first
    /// phase, and only with [`EnvOption::DebugVerbose`] set.
    fn reports_on_construction(&self) -> bool {
        self.option(EnvOption::DebugVerbose) && Phase::ALL.first() == Some(&self.phase)
    }

    /// Phase this environment is bound to.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Blackboard key holding this environment's configuration list.
    pub fn configs_key(&self) -> &str {
        &self.configs_key
    }

    // -----------------------------------------------------------------------
    // Configurations
    // -----------------------------------------------------------------------

    fn config_list(&self) -> Arc<ConfigList> {
        self.blackboard
            .get_or_insert_with(&self.configs_key, || RwLock::new(Vec::new()))
    }

    /// Registered configuration names, in insertion order.
    ///
    /// Creates the (empty) list on the blackboard if it does not exist yet.
    pub fn configs(&self) -> Vec<String> {
        self.config_list().read().clone()
    }

    /// Register a configuration name. Names already present are ignored.
    pub fn add_configuration(&self, name: impl Into<String>) -> &Self {
        let name = name.into();
        let list = self.config_list();
        let mut names = list.write();
        if names.contains(&name) {
            debug!(phase = %self.phase, config = name, "configuration already registered");
        } else {
            debug!(phase = %self.phase, config = name, "configuration registered");
            names.push(name);
        }
        self
    }

    // -----------------------------------------------------------------------
    // Transformer
    // -----------------------------------------------------------------------

    /// The transformer currently published on the blackboard.
    pub fn active_transformer(&self) -> Option<Arc<dyn Transformer>> {
        self.blackboard
            .get::<TransformerHandle>(TRANSFORMER_KEY)
            .map(|handle| Arc::clone(&handle.0))
    }

    /// Publish `transformer` as the active transformer. `None` is ignored.
    pub fn set_active_transformer(&self, transformer: Option<Arc<dyn Transformer>>) {
        if let Some(transformer) = transformer {
            debug!(transformer = transformer.name(), "active transformer set");
            self.blackboard
                .put(TRANSFORMER_KEY, TransformerHandle(transformer));
        }
    }

    /// Run the active transformer's audit, if it has one.
    ///
    /// Returns whether an audit ran.
    pub fn audit(&self) -> bool {
        let Some(transformer) = self.active_transformer() else {
            debug!(phase = %self.phase, "audit skipped, no active transformer");
            return false;
        };
        match transformer.as_audit() {
            Some(audit) => {
                info!(phase = %self.phase, transformer = transformer.name(), "running audit");
                audit.audit();
                true
            }
            None => {
                debug!(transformer = transformer.name(), "active transformer cannot audit");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Side
    // -----------------------------------------------------------------------

    /// Current side, running detection if no concrete side is known yet.
    ///
    /// Only a concrete result is cached; while the side is unknown every
    /// call probes again.
    pub fn side(&self) -> Side {
        if let Some(side) = *self.side.read() {
            return side;
        }
        let detected = self.detector.detect();
        if detected == Side::Unknown {
            return Side::Unknown;
        }
        *self.side.write().get_or_insert(detected)
    }

    /// Override the side while it is still unknown.
    ///
    /// Ignored when `side` is [`Side::Unknown`] or a concrete side is
    /// already known.
    pub fn set_side(&self, side: Side) -> &Self {
        if side == Side::Unknown || self.side() != Side::Unknown {
            return self;
        }
        let mut slot = self.side.write();
        if slot.is_none() {
            info!(phase = %self.phase, %side, "side set explicitly");
            *slot = Some(side);
        }
        self
    }

    // -----------------------------------------------------------------------
    // Options
    // -----------------------------------------------------------------------

    /// Resolved value of `option`.
    pub fn option(&self, option: EnvOption) -> bool {
        self.options.read().get(option)
    }

    /// Overwrite the value of `option` without touching its relatives.
    pub fn set_option(&self, option: EnvOption, value: bool) {
        debug!(phase = %self.phase, %option, value, "option overridden");
        self.options.write().set(option, value);
    }

    /// Copy of the current option values.
    pub fn options(&self) -> OptionSnapshot {
        *self.options.read()
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    /// Version carried by the blackboard init marker.
    pub fn version(&self) -> Option<String> {
        self.blackboard
            .get::<String>(INIT_KEY)
            .map(|version| version.as_str().to_owned())
    }

    /// Serializable view of this environment.
    pub fn summary(&self) -> EnvironmentSummary {
        EnvironmentSummary {
            phase: self.phase,
            version: self.version(),
            side: self.side(),
            options: self
                .options()
                .iter()
                .map(|(option, value)| (option.property().to_owned(), value))
                .collect(),
            configs: self.configs(),
            constructed_at: self.constructed_at,
        }
    }

    /// The verbose start-up report for this environment.
    pub fn verbose_report(&self) -> VerboseReport {
        let mut report = VerboseReport::new(REPORT_WIDTH)
            .title("Loom (verbose debugging enabled)")
            .rule()
            .row("Code source", concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")))
            .row("Internal Version", self.version().unwrap_or_default())
            .row("Isolation Domain", &self.domain)
            .rule();
        for (option, value) in self.options().iter() {
            let marker = if option.parent().is_some() { " - " } else { "" };
            report = report.row(option.property(), format!("{marker}{value}"));
        }
        report.rule().row("Detected Side", self.side())
    }
}

impl core::fmt::Display for Environment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Environment[{}]", self.phase)
    }
}
