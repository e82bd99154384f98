//! Bootstrap launcher for the Loom environment registry.
//!
//! Reads the launch configuration, publishes the bootstrap marker, builds
//! and initialises the phase registry, registers the configured names, and
//! moves the process into the default phase. The resulting environment
//! summaries are printed as JSON on stdout.
//!
//! # Configuration
//!
//! - `LOOM_CONFIG` -- path to the YAML configuration (default `loom.yaml`;
//!   a missing file means built-in defaults)
//! - `LOOM_HOST_SIDE` -- side name reported by the host, if any
//! - `RUST_LOG` -- log filter (default `info`)

mod launch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use loom_core::{LoomConfig, PhaseRegistry};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default configuration path when `LOOM_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "loom.yaml";

/// Load the configuration at `path`, falling back to defaults if absent.
fn load_config(path: &Path) -> anyhow::Result<LoomConfig> {
    if path.exists() {
        let config = LoomConfig::from_file(path)?;
        info!(path = %path.display(), "configuration loaded");
        return Ok(config);
    }
    warn!(path = %path.display(), "configuration file not found, using defaults");
    let mut config = LoomConfig::default();
    config.apply_env_overrides();
    Ok(config)
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or any environment
/// fails to construct.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = loom_core::VERSION, "loom-launch starting");

    let path = std::env::var("LOOM_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = load_config(&path)?;
    info!(
        isolation_domain = config.isolation_domain,
        initial_phase = config.initial_phase,
        settings = config.settings.len(),
        "configuration resolved"
    );

    let registry = launch::prepare(&config)?;
    PhaseRegistry::install_global(Arc::clone(&registry))
        .map_err(|_installed| anyhow!("a global phase registry is already installed"))?;

    let (registry, summaries) = launch::finish(registry)?;
    info!(phase = %registry.peek_phase(), "launch complete");

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
