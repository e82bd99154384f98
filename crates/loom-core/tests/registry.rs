//! End-to-end tests for the phase registry through the public API.
//!
//! Each test builds its own blackboard and registry, runs bootstrap, and
//! drives the registry the way a host would.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use loom_core::bootstrap;
use loom_core::{
    AdvanceHook, Blackboard, EnvOption, EnvironmentError, EnvironmentStateListener,
    IsolationDomain, MapSettings, Phase, PhaseRegistry, ProbeError, Side, SideDetector,
    SideProbe,
};

// =============================================================================
// Helpers
// =============================================================================

/// Counts forward transitions.
#[derive(Default)]
struct CountingHook {
    advances: AtomicUsize,
}

impl CountingHook {
    fn count(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }
}

impl AdvanceHook for CountingHook {
    fn on_advance(&self, from: Phase, to: Phase) {
        assert!(to > from, "hook fired for {from} -> {to}");
        self.advances.fetch_add(1, Ordering::SeqCst);
    }
}

fn bootstrapped_registry(settings: MapSettings) -> PhaseRegistry {
    let blackboard = Arc::new(Blackboard::new());
    let domain = IsolationDomain::from("main");
    assert!(bootstrap::init(&blackboard, &domain));
    PhaseRegistry::new(blackboard, domain).with_settings(Arc::new(settings))
}

fn registry_with_hook() -> (PhaseRegistry, Arc<CountingHook>) {
    let hook = Arc::new(CountingHook::default());
    let registry = bootstrapped_registry(MapSettings::new())
        .with_advance_hook(Arc::clone(&hook) as Arc<dyn AdvanceHook>);
    (registry, hook)
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn current_phase_bootstraps_lazily_to_preinit() {
    let registry = bootstrapped_registry(MapSettings::new());

    assert_eq!(registry.current_phase().unwrap(), Phase::Preinit);
    assert_eq!(registry.constructed_phases(), vec![Phase::Preinit]);

    registry.init(Phase::Default).unwrap();
    assert_eq!(registry.current_phase().unwrap(), Phase::Preinit);
    assert_eq!(registry.constructed_phases(), vec![Phase::Preinit]);
}

#[test]
fn environments_are_memoized_per_phase() {
    let registry = bootstrapped_registry(MapSettings::new());

    let first = registry.environment(Phase::Default).unwrap();
    let second = registry.environment(Phase::Default).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let preinit = registry.environment(Phase::Preinit).unwrap();
    assert!(!Arc::ptr_eq(&first, &preinit));
}

#[test]
fn racing_callers_share_one_environment() {
    let registry = Arc::new(bootstrapped_registry(MapSettings::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.environment(Phase::Default).unwrap())
        })
        .collect();
    let environments: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let first = &environments[0];
    assert!(environments.iter().all(|env| Arc::ptr_eq(env, first)));
}

#[test]
fn uninitialised_phase_is_rejected_without_side_effects() {
    let registry = bootstrapped_registry(MapSettings::new());

    let err = registry.environment(Phase::NotInitialized).unwrap_err();
    assert!(matches!(err, EnvironmentError::InvalidPhase { .. }));
    assert!(!err.is_fatal());
    assert!(registry.constructed_phases().is_empty());

    let err = registry.goto_phase(Phase::NotInitialized).unwrap_err();
    assert!(matches!(err, EnvironmentError::InvalidPhase { .. }));
    assert_eq!(registry.peek_phase(), Phase::NotInitialized);
    assert!(registry.constructed_phases().is_empty());
}

// =============================================================================
// Transitions
// =============================================================================

#[test]
fn forward_transition_fires_hook_once_per_call() {
    let (registry, hook) = registry_with_hook();
    registry.init(Phase::Preinit).unwrap();

    registry.goto_phase(Phase::Default).unwrap();
    assert_eq!(hook.count(), 1);
    assert_eq!(registry.current_phase().unwrap(), Phase::Default);
    assert_eq!(registry.current_environment().unwrap().phase(), Phase::Default);
}

#[test]
fn same_or_backward_transition_never_fires_hook() {
    let (registry, hook) = registry_with_hook();
    registry.init(Phase::Default).unwrap();

    registry.goto_phase(Phase::Default).unwrap();
    assert_eq!(hook.count(), 0);

    registry.goto_phase(Phase::Preinit).unwrap();
    assert_eq!(hook.count(), 0);
    assert_eq!(registry.current_phase().unwrap(), Phase::Preinit);
    assert_eq!(registry.current_environment().unwrap().phase(), Phase::Preinit);

    registry.goto_phase(Phase::Default).unwrap();
    assert_eq!(hook.count(), 1);
}

#[test]
fn transition_from_uninitialised_bootstraps_first() {
    let (registry, hook) = registry_with_hook();

    registry.goto_phase(Phase::Default).unwrap();
    assert_eq!(hook.count(), 1);
    assert_eq!(
        registry.constructed_phases(),
        vec![Phase::Preinit, Phase::Default]
    );
}

#[test]
fn failed_transition_fires_no_hook_and_keeps_phase() {
    let (registry, hook) = registry_with_hook();
    registry.init(Phase::Preinit).unwrap();
    registry
        .blackboard()
        .put(bootstrap::INIT_KEY, "other".to_owned());

    for _ in 0..2 {
        let err = registry.goto_phase(Phase::Default).unwrap_err();
        assert!(matches!(err, EnvironmentError::VersionConflict { .. }));
    }

    assert_eq!(hook.count(), 0);
    assert_eq!(registry.peek_phase(), Phase::Preinit);
    assert_eq!(registry.constructed_phases(), vec![Phase::Preinit]);
}

#[test]
fn failed_transition_registers_no_proxy() {
    let registry = bootstrapped_registry(MapSettings::new());
    registry.init(Phase::Preinit).unwrap();
    registry
        .blackboard()
        .put(bootstrap::INIT_KEY, "other".to_owned());

    registry.goto_phase(Phase::Default).unwrap_err();
    registry.goto_phase(Phase::Default).unwrap_err();
    assert!(bootstrap::registered_proxies(registry.blackboard()).is_empty());
    assert_eq!(registry.peek_phase(), Phase::Preinit);
}

#[test]
fn lifecycle_listener_enters_default_phase() {
    let (registry, hook) = registry_with_hook();
    let registry = Arc::new(registry);
    let listener = EnvironmentStateListener::new(Arc::clone(&registry));

    listener.on_launch_ready().unwrap();
    assert_eq!(registry.peek_phase(), Phase::Default);
    assert_eq!(hook.count(), 1);
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn verbose_inherits_from_enabled_debug() {
    let registry = bootstrapped_registry(MapSettings::new().with("loom.debug", "true"));
    let env = registry.current_environment().unwrap();
    assert!(env.option(EnvOption::DebugVerbose));
}

#[test]
fn verbose_child_setting_wins_over_disabled_debug() {
    let registry = bootstrapped_registry(
        MapSettings::new()
            .with("loom.debug", "false")
            .with("loom.debug.verbose", "true"),
    );
    let env = registry.current_environment().unwrap();
    assert!(env.option(EnvOption::DebugVerbose));
    assert!(!env.option(EnvOption::DebugAll));
}

#[test]
fn verbose_is_off_when_nothing_is_set() {
    let registry = bootstrapped_registry(MapSettings::new());
    let env = registry.current_environment().unwrap();
    assert!(!env.option(EnvOption::DebugVerbose));
}

// =============================================================================
// Environment operations
// =============================================================================

#[test]
fn configuration_names_form_an_ordered_set() {
    let registry = bootstrapped_registry(MapSettings::new());
    let env = registry.default_environment().unwrap();

    env.add_configuration("a");
    env.add_configuration("a");
    assert_eq!(env.configs(), vec!["a"]);
    env.add_configuration("b");
    assert_eq!(env.configs(), vec!["a", "b"]);
}

#[test]
fn side_override_only_while_unknown() {
    let registry = bootstrapped_registry(MapSettings::new());
    registry
        .detector()
        .register(SideProbe::new("absent-host", || Err(ProbeError::HostAbsent)));
    let env = registry.current_environment().unwrap();

    assert_eq!(env.side(), Side::Unknown);
    env.set_side(Side::Server);
    assert_eq!(env.side(), Side::Server);
    env.set_side(Side::Client);
    assert_eq!(env.side(), Side::Server);
}

#[test]
fn registered_probe_classifies_side() {
    let detector = Arc::new(
        SideDetector::new()
            .with_probe(SideProbe::new("silent", || Ok(None)))
            .with_probe(SideProbe::new("host", || Ok(Some("DEDICATEDSERVER".to_owned())))),
    );
    let registry = bootstrapped_registry(MapSettings::new()).with_detector(detector);
    assert_eq!(registry.current_environment().unwrap().side(), Side::Server);
}

// =============================================================================
// Fatal configuration errors
// =============================================================================

#[test]
fn missing_bootstrap_is_fatal() {
    let registry = PhaseRegistry::new(Arc::new(Blackboard::new()), IsolationDomain::from("main"));
    let err = registry.current_environment().unwrap_err();
    assert!(matches!(err, EnvironmentError::VersionConflict { found: None, .. }));
    assert!(err.is_fatal());
    assert!(registry.constructed_phases().is_empty());
}

#[test]
fn wrong_domain_is_fatal() {
    let blackboard = Arc::new(Blackboard::new());
    bootstrap::init(&blackboard, &IsolationDomain::from("main"));
    let registry = PhaseRegistry::new(blackboard, IsolationDomain::from("sandbox"));

    let err = registry.environment(Phase::Default).unwrap_err();
    assert!(matches!(err, EnvironmentError::WrongIsolationDomain { .. }));
    assert!(registry.constructed_phases().is_empty());
}

// =============================================================================
// Process-wide handle
// =============================================================================

#[test]
fn global_registry_installs_once() {
    let first = Arc::new(bootstrapped_registry(MapSettings::new()));
    let second = Arc::new(bootstrapped_registry(MapSettings::new()));

    PhaseRegistry::install_global(Arc::clone(&first)).unwrap();
    let rejected = PhaseRegistry::install_global(Arc::clone(&second)).unwrap_err();
    assert!(Arc::ptr_eq(&rejected, &second));

    let global = PhaseRegistry::global().expect("registry installed");
    assert!(Arc::ptr_eq(global, &first));
}
