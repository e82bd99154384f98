//! Phase and environment registry for the Loom weaving subsystem.
//!
//! This crate owns process-wide environment state: which lifecycle phase
//! the process is in, one memoized [`Environment`] per phase, the resolved
//! boolean options of each environment, and the lazily detected execution
//! side. The transformation engine, the host's side APIs and the bootstrap
//! sequence are collaborators reached through small traits.
//!
//! # Modules
//!
//! - [`blackboard`] -- Shared key-value store for cross-component state.
//! - [`bootstrap`] -- Init marker, isolation domain, and the phase-advance
//!   hook.
//! - [`config`] -- YAML launch configuration.
//! - [`environment`] -- Per-phase [`Environment`] snapshots.
//! - [`error`] -- [`EnvironmentError`] and the [`Result`] alias.
//! - [`lifecycle`] -- Host callback that leaves the initial phase.
//! - [`options`] -- Hierarchical option resolution.
//! - [`registry`] -- The [`PhaseRegistry`] state machine.
//! - [`report`] -- Framed verbose start-up report.
//! - [`settings`] -- Settings sources consulted for options.
//! - [`side`] -- Probe-based side detection.
//! - [`transformer`] -- Handle to the external transformer.

pub mod blackboard;
pub mod bootstrap;
pub mod config;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod registry;
pub mod report;
pub mod settings;
pub mod side;
pub mod transformer;

pub use blackboard::Blackboard;
pub use bootstrap::{AdvanceHook, IsolationDomain, ProxyRegistration, VERSION};
pub use config::{ConfigError, LoomConfig};
pub use environment::{Environment, EnvironmentContext, EnvironmentSummary};
pub use error::{EnvironmentError, Result};
pub use lifecycle::EnvironmentStateListener;
pub use loom_types::{EnvOption, Phase, Side};
pub use options::OptionSnapshot;
pub use registry::PhaseRegistry;
pub use settings::{EnvSettings, LayeredSettings, MapSettings, SettingsSource};
pub use side::{ProbeError, SideDetector, SideProbe};
pub use transformer::{Audit, Transformer};
