//! The phase state machine and its memoized environments.
//!
//! A [`PhaseRegistry`] owns the current phase, one lazily constructed
//! [`Environment`] slot per real phase, and a cached pointer to the current
//! environment. Phases move forward only in practice, but any sequence of
//! declared phases is accepted; only strict forward movement fires the
//! [`AdvanceHook`].
//!
//! # Locking
//!
//! The current phase and current-environment pointer share one mutex, and
//! the slot array has another. When both are needed the state lock is taken
//! first. Environments are constructed while the slot lock is held, so two
//! racing callers always observe the same instance. Neither lock is
//! re-entrant: side probes and advance hooks must not call back into the
//! registry.

use std::sync::{Arc, OnceLock};

use loom_types::Phase;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::blackboard::Blackboard;
use crate::bootstrap::{AdvanceHook, IsolationDomain, ProxyRegistration};
use crate::environment::{Environment, EnvironmentContext};
use crate::error::{EnvironmentError, Result};
use crate::settings::{EnvSettings, SettingsSource};
use crate::side::SideDetector;

/// Process-wide registry, if one has been installed.
static GLOBAL_REGISTRY: OnceLock<Arc<PhaseRegistry>> = OnceLock::new();

#[derive(Debug)]
struct RegistryState {
    current: Phase,
    current_env: Option<Arc<Environment>>,
}

/// Owner of the current phase and the per-phase environments.
pub struct PhaseRegistry {
    context: EnvironmentContext,
    advance_hook: Arc<dyn AdvanceHook>,
    state: Mutex<RegistryState>,
    slots: Mutex<[Option<Arc<Environment>>; Phase::COUNT]>,
}

impl PhaseRegistry {
    /// Create an uninitialised registry.
    ///
    /// Defaults: settings come from process environment variables, no side
    /// probes are registered, and forward transitions register a transformer
    /// proxy on `blackboard`.
    pub fn new(blackboard: Arc<Blackboard>, domain: IsolationDomain) -> Self {
        let advance_hook = Arc::new(ProxyRegistration::new(Arc::clone(&blackboard)));
        Self {
            context: EnvironmentContext {
                blackboard,
                settings: Arc::new(EnvSettings),
                detector: Arc::new(SideDetector::new()),
                domain,
            },
            advance_hook,
            state: Mutex::new(RegistryState {
                current: Phase::NotInitialized,
                current_env: None,
            }),
            slots: Mutex::new([const { None }; Phase::COUNT]),
        }
    }

    /// Use `settings` to resolve options.
    #[must_use]
    pub fn with_settings(mut self, settings: Arc<dyn SettingsSource>) -> Self {
        self.context.settings = settings;
        self
    }

    /// Use `detector` for side detection.
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<SideDetector>) -> Self {
        self.context.detector = detector;
        self
    }

    /// Fire `hook` on forward transitions instead of the default.
    #[must_use]
    pub fn with_advance_hook(mut self, hook: Arc<dyn AdvanceHook>) -> Self {
        self.advance_hook = hook;
        self
    }

    /// The shared blackboard.
    pub const fn blackboard(&self) -> &Arc<Blackboard> {
        &self.context.blackboard
    }

    /// The side detector, for registering probes.
    pub const fn detector(&self) -> &Arc<SideDetector> {
        &self.context.detector
    }

    // -----------------------------------------------------------------------
    // Phase state
    // -----------------------------------------------------------------------

    /// Initialise the registry in `phase`. First caller wins.
    ///
    /// If the registry is still uninitialised, constructs the environment
    /// for `phase` and makes it current. Otherwise does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidPhase`] for
    /// [`Phase::NotInitialized`] or any construction error; the registry
    /// stays uninitialised in both cases.
    pub fn init(&self, phase: Phase) -> Result<()> {
        let mut state = self.state.lock();
        self.init_locked(&mut state, phase)
    }

    fn init_locked(&self, state: &mut RegistryState, phase: Phase) -> Result<()> {
        if state.current.is_initialized() {
            debug!(current = %state.current, requested = %phase, "registry already initialised");
            return Ok(());
        }
        self.environment(phase)?;
        state.current = phase;
        info!(%phase, "registry initialised");
        Ok(())
    }

    /// The current phase, initialising to [`Phase::Preinit`] if needed.
    ///
    /// # Errors
    ///
    /// Returns a construction error if the implicit initialisation fails.
    pub fn current_phase(&self) -> Result<Phase> {
        let mut state = self.state.lock();
        self.current_phase_locked(&mut state)
    }

    fn current_phase_locked(&self, state: &mut RegistryState) -> Result<Phase> {
        if !state.current.is_initialized() {
            self.init_locked(state, Phase::Preinit)?;
        }
        Ok(state.current)
    }

    /// The current phase without triggering initialisation.
    pub fn peek_phase(&self) -> Phase {
        self.state.lock().current
    }

    /// Move to `phase`.
    ///
    /// Constructs the target environment, fires the advance hook once if
    /// `phase` is strictly later than the current phase, then makes `phase`
    /// and its environment current. A failed construction fires nothing.
    /// Moving to the same or an earlier phase never fires the hook.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidPhase`] for
    /// [`Phase::NotInitialized`] without touching any state, or a
    /// construction error for the target environment.
    pub fn goto_phase(&self, phase: Phase) -> Result<()> {
        if !phase.is_initialized() {
            return Err(EnvironmentError::InvalidPhase {
                operation: "go to phase",
                phase,
            });
        }

        let mut state = self.state.lock();
        let from = self.current_phase_locked(&mut state)?;
        let environment = self.environment(phase)?;
        if phase > from {
            self.advance_hook.on_advance(from, phase);
        }

        state.current = phase;
        state.current_env = Some(environment);
        info!(%from, to = %phase, "phase changed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Environments
    // -----------------------------------------------------------------------

    /// The environment for `phase`, constructing it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidPhase`] for
    /// [`Phase::NotInitialized`], or a fatal construction error. Nothing is
    /// stored when construction fails.
    pub fn environment(&self, phase: Phase) -> Result<Arc<Environment>> {
        let invalid = || EnvironmentError::InvalidPhase {
            operation: "access environment",
            phase,
        };
        let index = phase.index().ok_or_else(invalid)?;

        let mut slots = self.slots.lock();
        let slot = slots.get_mut(index).ok_or_else(invalid)?;
        if let Some(environment) = slot.as_ref() {
            return Ok(Arc::clone(environment));
        }

        let environment = Arc::new(Environment::new(phase, &self.context)?);
        *slot = Some(Arc::clone(&environment));
        Ok(environment)
    }

    /// The environment for [`Phase::Default`].
    ///
    /// # Errors
    ///
    /// Returns a construction error if it has to be built and fails.
    pub fn default_environment(&self) -> Result<Arc<Environment>> {
        self.environment(Phase::Default)
    }

    /// The environment for the current phase.
    ///
    /// # Errors
    ///
    /// Returns a construction error if initialisation or construction fails.
    pub fn current_environment(&self) -> Result<Arc<Environment>> {
        let mut state = self.state.lock();
        if let Some(environment) = state.current_env.as_ref() {
            return Ok(Arc::clone(environment));
        }
        let phase = self.current_phase_locked(&mut state)?;
        let environment = self.environment(phase)?;
        state.current_env = Some(Arc::clone(&environment));
        Ok(environment)
    }

    /// Phases whose environment has been constructed, in phase order.
    pub fn constructed_phases(&self) -> Vec<Phase> {
        let slots = self.slots.lock();
        Phase::ALL
            .into_iter()
            .zip(slots.iter())
            .filter_map(|(phase, slot)| slot.as_ref().map(|_| phase))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Process-wide handle
    // -----------------------------------------------------------------------

    /// Install `registry` as the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns `registry` back if one is already installed.
    pub fn install_global(registry: Arc<Self>) -> core::result::Result<(), Arc<Self>> {
        GLOBAL_REGISTRY.set(registry)?;
        info!("global phase registry installed");
        Ok(())
    }

    /// The process-wide registry, if installed.
    pub fn global() -> Option<&'static Arc<Self>> {
        GLOBAL_REGISTRY.get()
    }
}

impl core::fmt::Debug for PhaseRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhaseRegistry")
            .field("context", &self.context)
            .field("state", &*self.state.lock())
            .field("constructed", &self.constructed_phases())
            .finish_non_exhaustive()
    }
}
