//! Host lifecycle callback that leaves the initial phase.
//!
//! The host calls [`EnvironmentStateListener::on_launch_ready`] once it
//! judges the process ready to start running the application. That is the
//! single place the registry moves from [`Phase::Preinit`] to
//! [`Phase::Default`].

use std::sync::Arc;

use loom_types::Phase;
use tracing::info;

use crate::error::Result;
use crate::registry::PhaseRegistry;

/// Lifecycle listener bound to one registry.
#[derive(Debug, Clone)]
pub struct EnvironmentStateListener {
    registry: Arc<PhaseRegistry>,
}

impl EnvironmentStateListener {
    /// Create a listener driving `registry`.
    pub const fn new(registry: Arc<PhaseRegistry>) -> Self {
        Self { registry }
    }

    /// The host is ready to launch: enter [`Phase::Default`].
    ///
    /// # Errors
    ///
    /// Propagates any error from [`PhaseRegistry::goto_phase`].
    pub fn on_launch_ready(&self) -> Result<()> {
        info!("launch ready, leaving initial phase");
        self.registry.goto_phase(Phase::Default)
    }
}
