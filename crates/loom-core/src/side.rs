//! Execution side detection through registered host probes.
//!
//! Each optional host integration registers a probe at startup. A probe asks
//! its host which side the process runs on and answers with the host's
//! symbolic side name, with `None` when it has no opinion, or with a
//! [`ProbeError`] when the host is absent or its accessor fails. Errors are
//! never fatal; they are logged and treated like `None`.
//!
//! Probes run in registration order and the first one to report a name
//! decides. That name is then classified with [`Side::classify`], so a host
//! reporting a name no variant claims yields [`Side::Unknown`] even if a
//! later probe would have answered.

use loom_types::Side;
use parking_lot::RwLock;
use tracing::debug;

/// Why a probe could not answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The host integration is not loaded in this process.
    #[error("host integration is not present")]
    HostAbsent,

    /// The host is present but its side accessor failed.
    #[error("side accessor failed: {0}")]
    Accessor(String),
}

/// A detection function supplied by a host integration.
pub type ProbeFn = dyn Fn() -> Result<Option<String>, ProbeError> + Send + Sync;

/// A named, registered detection function.
pub struct SideProbe {
    name: String,
    probe: Box<ProbeFn>,
}

impl SideProbe {
    /// Wrap a detection function under a diagnostic name.
    pub fn new<F>(name: impl Into<String>, probe: F) -> Self
    where
        F: Fn() -> Result<Option<String>, ProbeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            probe: Box::new(probe),
        }
    }

    /// Diagnostic name of the probe.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the probe, folding failures into "no opinion".
    pub fn reported_name(&self) -> Option<String> {
        match (self.probe)() {
            Ok(Some(name)) => {
                debug!(probe = self.name, reported = name, "side probe answered");
                Some(name)
            }
            Ok(None) => {
                debug!(probe = self.name, "side probe has no opinion");
                None
            }
            Err(err) => {
                debug!(probe = self.name, error = %err, "side probe failed");
                None
            }
        }
    }
}

impl core::fmt::Debug for SideProbe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SideProbe").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Ordered set of side probes.
///
/// Probes are run while the registration list is read-locked, so a probe
/// must not register further probes.
#[derive(Debug, Default)]
pub struct SideDetector {
    probes: RwLock<Vec<SideProbe>>,
}

impl SideDetector {
    /// Create a detector with no probes. It always reports [`Side::Unknown`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a probe with lower priority than all existing ones.
    pub fn register(&self, probe: SideProbe) {
        debug!(probe = probe.name(), "side probe registered");
        self.probes.write().push(probe);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_probe(self, probe: SideProbe) -> Self {
        self.register(probe);
        self
    }

    /// Names of the registered probes, in priority order.
    pub fn probe_names(&self) -> Vec<String> {
        self.probes
            .read()
            .iter()
            .map(|probe| probe.name().to_owned())
            .collect()
    }

    /// The first side name any probe reports.
    pub fn reported_name(&self) -> Option<String> {
        self.probes.read().iter().find_map(SideProbe::reported_name)
    }

    /// Classify the current process.
    pub fn detect(&self) -> Side {
        self.reported_name()
            .map_or(Side::Unknown, |name| Side::classify(&name))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn answering(name: &'static str) -> SideProbe {
        SideProbe::new(format!("host-{name}"), move || Ok(Some(name.to_owned())))
    }

    #[test]
    fn no_probes_means_unknown() {
        assert_eq!(SideDetector::new().detect(), Side::Unknown);
    }

    #[test]
    fn failures_and_silence_fall_through() {
        let detector = SideDetector::new()
            .with_probe(SideProbe::new("absent", || Err(ProbeError::HostAbsent)))
            .with_probe(SideProbe::new("broken", || {
                Err(ProbeError::Accessor("static init failed".to_owned()))
            }))
            .with_probe(SideProbe::new("silent", || Ok(None)))
            .with_probe(answering("DEDICATEDSERVER"));
        assert_eq!(detector.detect(), Side::Server);
    }

    #[test]
    fn first_reported_name_decides() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_calls);
        let detector = SideDetector::new()
            .with_probe(answering("CLIENT"))
            .with_probe(SideProbe::new("later", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some("SERVER".to_owned()))
            }));

        assert_eq!(detector.detect(), Side::Client);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unrecognised_first_answer_is_unknown() {
        let detector = SideDetector::new()
            .with_probe(answering("UNIVERSAL"))
            .with_probe(answering("CLIENT"));
        assert_eq!(detector.detect(), Side::Unknown);
    }

    #[test]
    fn probe_names_keep_registration_order() {
        let detector = SideDetector::new()
            .with_probe(answering("CLIENT"))
            .with_probe(answering("SERVER"));
        assert_eq!(detector.probe_names(), vec!["host-CLIENT", "host-SERVER"]);
    }
}
