//! Bootstrap marker and the phase-advance hook.
//!
//! Bootstrap publishes an init marker carrying [`VERSION`] and the isolation
//! domain it ran in. Environments refuse to construct unless both match,
//! which catches a second, mismatched copy of the subsystem being loaded
//! alongside the first.
//!
//! On every forward phase transition the registry fires an [`AdvanceHook`].
//! The stock hook, [`ProxyRegistration`], records a secondary transformer
//! proxy for the phase being entered.

use std::sync::Arc;

use loom_types::Phase;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::blackboard::Blackboard;

/// Blackboard key of the init marker.
pub const INIT_KEY: &str = "loom.initialised";

/// Blackboard key of the isolation domain recorded by bootstrap.
pub const DOMAIN_KEY: &str = "loom.initialised.domain";

/// Blackboard key of the list of phases a transformer proxy was added for.
pub const PROXIES_KEY: &str = "loom.transformer.proxies";

/// Version string the init marker must carry.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier of the loading context that performed bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IsolationDomain(String);

impl IsolationDomain {
    /// Create a domain identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IsolationDomain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IsolationDomain {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Publish the init marker and isolation domain.
///
/// Returns `true` if the marker was published by this call. An existing
/// marker is left untouched; a different existing version is logged since
/// environment construction will reject it.
pub fn init(blackboard: &Blackboard, domain: &IsolationDomain) -> bool {
    if let Some(existing) = blackboard.get::<String>(INIT_KEY) {
        if existing.as_str() == VERSION {
            info!(version = VERSION, "bootstrap already ran");
        } else {
            warn!(
                expected = VERSION,
                found = existing.as_str(),
                "init marker already published by another version"
            );
        }
        return false;
    }

    blackboard.put(INIT_KEY, VERSION.to_owned());
    blackboard.put(DOMAIN_KEY, domain.clone());
    info!(version = VERSION, domain = %domain, "bootstrap marker published");
    true
}

/// Phases a transformer proxy has been registered for, in order.
pub fn registered_proxies(blackboard: &Blackboard) -> Vec<Phase> {
    blackboard
        .get::<RwLock<Vec<Phase>>>(PROXIES_KEY)
        .map(|proxies| proxies.read().clone())
        .unwrap_or_default()
}

/// Side effect fired on strict forward phase movement.
pub trait AdvanceHook: Send + Sync {
    /// Called once per forward transition, after the target environment
    /// is constructed and before the phase changes.
    fn on_advance(&self, from: Phase, to: Phase);
}

/// Stock hook: registers a secondary transformer proxy on the blackboard.
#[derive(Debug, Clone)]
pub struct ProxyRegistration {
    blackboard: Arc<Blackboard>,
}

impl ProxyRegistration {
    /// Create a hook writing to `blackboard`.
    pub const fn new(blackboard: Arc<Blackboard>) -> Self {
        Self { blackboard }
    }
}

impl AdvanceHook for ProxyRegistration {
    fn on_advance(&self, from: Phase, to: Phase) {
        let proxies = self
            .blackboard
            .get_or_insert_with(PROXIES_KEY, || RwLock::new(Vec::<Phase>::new()));
        proxies.write().push(to);
        info!(%from, %to, "transformer proxy registered");
    }
}
