//! Bootstrap sequence driven by a [`LoomConfig`].
//!
//! The sequence mirrors what a host launcher does at start-up: publish the
//! init marker, build the registry against the configured settings and
//! domain, initialise it, register configuration names, and finally fire
//! the lifecycle callback that leaves the initial phase.

use std::sync::Arc;

use anyhow::Context;
use loom_core::bootstrap;
use loom_core::{
    Blackboard, EnvironmentStateListener, EnvironmentSummary, LoomConfig, Phase, PhaseRegistry,
    ProbeError, SideDetector, SideProbe,
};
use tracing::info;

/// Environment variable a host can use to report its side.
pub const HOST_SIDE_VAR: &str = "LOOM_HOST_SIDE";

/// Side probe backed by [`HOST_SIDE_VAR`].
fn host_side_probe() -> SideProbe {
    SideProbe::new("launch-environment", || match std::env::var(HOST_SIDE_VAR) {
        Ok(name) => Ok(Some(name)),
        Err(std::env::VarError::NotPresent) => Err(ProbeError::HostAbsent),
        Err(err) => Err(ProbeError::Accessor(err.to_string())),
    })
}

/// Build and initialise a registry from `config`.
///
/// Returns the registry in its configured initial phase with every
/// configured name registered and the configured side applied.
///
/// # Errors
///
/// Returns an error for unknown phase or side names, or if any
/// environment fails to construct.
pub fn prepare(config: &LoomConfig) -> anyhow::Result<Arc<PhaseRegistry>> {
    let detector = Arc::new(SideDetector::new().with_probe(host_side_probe()));
    prepare_with_detector(config, detector)
}

/// [`prepare`] with a caller-supplied side detector.
///
/// # Errors
///
/// Same as [`prepare`].
pub fn prepare_with_detector(
    config: &LoomConfig,
    detector: Arc<SideDetector>,
) -> anyhow::Result<Arc<PhaseRegistry>> {
    let blackboard = Arc::new(Blackboard::new());
    let domain = config.domain();
    bootstrap::init(&blackboard, &domain);

    info!(
        %domain,
        probes = ?detector.probe_names(),
        "preparing registry"
    );
    let registry = Arc::new(
        PhaseRegistry::new(blackboard, domain)
            .with_settings(Arc::new(config.settings()))
            .with_detector(detector),
    );

    let initial = config.initial_phase()?;
    registry
        .init(initial)
        .with_context(|| format!("initialising registry in {initial}"))?;

    let side = config.side_override()?;
    let phase_configs = config.phase_configs()?;
    for phase in Phase::ALL {
        let environment = registry.environment(phase)?;
        if let Some(side) = side {
            environment.set_side(side);
        }
        let names = phase_configs
            .iter()
            .filter(|(configured, _)| *configured == phase)
            .flat_map(|(_, names)| names);
        for name in names {
            environment.add_configuration(name.as_str());
        }
        info!(
            %phase,
            configs = environment.configs().len(),
            side = %environment.side(),
            "environment prepared"
        );
    }

    Ok(registry)
}

/// Leave the initial phase and summarise every environment.
///
/// # Errors
///
/// Returns an error if the phase transition fails.
pub fn finish(
    registry: Arc<PhaseRegistry>,
) -> anyhow::Result<(Arc<PhaseRegistry>, Vec<EnvironmentSummary>)> {
    EnvironmentStateListener::new(Arc::clone(&registry))
        .on_launch_ready()
        .context("entering the default phase")?;

    let summaries = Phase::ALL
        .into_iter()
        .map(|phase| registry.environment(phase).map(|env| env.summary()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((registry, summaries))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use loom_core::{EnvOption, Side, VERSION};

    use super::*;

    fn config(yaml: &str) -> LoomConfig {
        LoomConfig::parse(yaml).unwrap()
    }

    #[test]
    fn run_registers_configs_and_reaches_default() {
        let config = config(
            "configs:\n  preinit: [core.json, core.json, extra.json]\n  default: [late.json]\nside: client\n",
        );
        let (registry, summaries) = finish(prepare(&config).unwrap()).unwrap();

        assert_eq!(registry.peek_phase(), Phase::Default);
        assert_eq!(
            bootstrap::registered_proxies(registry.blackboard()),
            vec![Phase::Default]
        );

        assert_eq!(summaries.len(), Phase::COUNT);
        let preinit = summaries.first().unwrap();
        let default = summaries.last().unwrap();
        assert_eq!(preinit.configs, vec!["core.json", "extra.json"]);
        assert_eq!(default.configs, vec!["late.json"]);
        assert_eq!(preinit.version.as_deref(), Some(VERSION));
        assert_eq!(default.phase, Phase::Default);
    }

    #[test]
    fn file_settings_reach_the_environment() {
        let config = config("settings:\n  loom.checks: true\n");
        let registry = prepare(&config).unwrap();
        let env = registry.current_environment().unwrap();
        assert!(env.option(EnvOption::CheckImplements));
        assert!(!env.option(EnvOption::DebugAll));
    }

    #[test]
    fn configured_initial_phase_is_honoured() {
        let registry = prepare(&config("initial_phase: default\n")).unwrap();
        assert_eq!(registry.peek_phase(), Phase::Default);
    }

    #[test]
    fn configured_side_fills_in_an_unknown_side() {
        let detector = Arc::new(SideDetector::new());
        let registry = prepare_with_detector(&config("side: server\n"), detector).unwrap();
        for phase in Phase::ALL {
            assert_eq!(registry.environment(phase).unwrap().side(), Side::Server);
        }
    }

    #[test]
    fn detected_side_wins_over_configured_side() {
        let probe = SideProbe::new("host", || Ok(Some("CLIENT".to_owned())));
        let detector = Arc::new(SideDetector::new().with_probe(probe));
        let registry = prepare_with_detector(&config("side: server\n"), detector).unwrap();
        let side = registry.current_environment().unwrap().side();
        assert_eq!(side, Side::Client);
    }

    #[test]
    fn unknown_phase_name_fails() {
        assert!(prepare(&config("initial_phase: later\n")).is_err());
    }
}
