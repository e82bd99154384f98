//! Lifecycle phase and execution side enumerations.
//!
//! Both types are closed, ordered sets fixed at compile time. Declaration
//! order is meaningful: for [`Phase`] it is the lifecycle order (and the
//! environment slot index), for [`Side`] it is the priority in which the
//! variants are tried when classifying a host-reported side name.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A stage of the process lifecycle.
///
/// Phases only ever move forward. [`Phase::NotInitialized`] is the state
/// before anything has bootstrapped the registry; it is never backed by an
/// environment and has no slot [`index`](Self::index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Nothing has initialised the registry yet.
    NotInitialized,
    /// Everything before the host begins loading the application.
    Preinit,
    /// Normal runtime.
    Default,
}

impl Phase {
    /// Every real phase, in lifecycle order.
    pub const ALL: [Self; 2] = [Self::Preinit, Self::Default];

    /// Number of real phases (the size of the environment slot array).
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index of this phase, or `None` for [`Phase::NotInitialized`].
    ///
    /// Indices are contiguous and follow declaration order.
    pub const fn index(self) -> Option<usize> {
        match self {
            Self::NotInitialized => None,
            Self::Preinit => Some(0),
            Self::Default => Some(1),
        }
    }

    /// Whether this is a real phase rather than the uninitialised state.
    pub const fn is_initialized(self) -> bool {
        self.index().is_some()
    }

    /// Upper-case symbolic name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Preinit => "PREINIT",
            Self::Default => "DEFAULT",
        }
    }

    /// Lower-case name, used to namespace per-phase blackboard keys.
    pub const fn key_segment(self) -> &'static str {
        match self {
            Self::NotInitialized => "not_initialized",
            Self::Preinit => "preinit",
            Self::Default => "default",
        }
    }

    /// Look up a real phase by name, ignoring ASCII case.
    ///
    /// `NOT_INITIALIZED` is deliberately not resolvable.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|phase| phase.name().eq_ignore_ascii_case(name))
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// The execution role of the process among cooperating host integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// The side could not be determined.
    Unknown,
    /// Client-side process.
    Client,
    /// (Dedicated) server process.
    Server,
}

impl Side {
    /// All sides in classification priority order.
    pub const ALL: [Self; 3] = [Self::Unknown, Self::Client, Self::Server];

    /// Upper-case symbolic name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Client => "CLIENT",
            Self::Server => "SERVER",
        }
    }

    /// Whether a host-reported side name denotes this variant.
    ///
    /// [`Side::Unknown`] never claims a name. Matching is exact.
    pub fn matches_name(self, reported: &str) -> bool {
        match self {
            Self::Unknown => false,
            Self::Client => reported == "CLIENT",
            Self::Server => reported == "SERVER" || reported == "DEDICATEDSERVER",
        }
    }

    /// Classify a host-reported side name.
    ///
    /// Variants are tried in [`Side::ALL`] order; the first one that claims
    /// the name wins, otherwise the result is [`Side::Unknown`].
    pub fn classify(reported: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|side| side.matches_name(reported))
            .unwrap_or(Self::Unknown)
    }

    /// Look up a side by its symbolic name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|side| side.name().eq_ignore_ascii_case(name))
    }
}

impl core::fmt::Display for Side {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn phase_indices_are_contiguous_in_declaration_order() {
        for (expected, phase) in Phase::ALL.into_iter().enumerate() {
            assert_eq!(phase.index(), Some(expected));
        }
        assert_eq!(Phase::NotInitialized.index(), None);
        assert_eq!(Phase::COUNT, 2);
    }

    #[test]
    fn phases_order_by_lifecycle() {
        assert!(Phase::NotInitialized < Phase::Preinit);
        assert!(Phase::Preinit < Phase::Default);
    }

    #[test]
    fn phase_lookup_ignores_case_but_not_the_sentinel() {
        assert_eq!(Phase::from_name("preinit"), Some(Phase::Preinit));
        assert_eq!(Phase::from_name(" DEFAULT "), Some(Phase::Default));
        assert_eq!(Phase::from_name("NOT_INITIALIZED"), None);
        assert_eq!(Phase::from_name("postinit"), None);
    }

    #[test]
    fn phase_display_and_serde_use_symbolic_name() {
        assert_eq!(Phase::Preinit.to_string(), "PREINIT");
        assert_eq!(serde_json::to_string(&Phase::Default).unwrap(), "\"DEFAULT\"");
        assert_eq!(Phase::Default.key_segment(), "default");
    }

    #[test]
    fn side_classification() {
        assert_eq!(Side::classify("CLIENT"), Side::Client);
        assert_eq!(Side::classify("SERVER"), Side::Server);
        assert_eq!(Side::classify("DEDICATEDSERVER"), Side::Server);
        assert_eq!(Side::classify("client"), Side::Unknown);
        assert_eq!(Side::classify("UNKNOWN"), Side::Unknown);
        assert_eq!(Side::classify(""), Side::Unknown);
    }

    #[test]
    fn side_lookup_by_name() {
        assert_eq!(Side::from_name("server"), Some(Side::Server));
        assert_eq!(Side::from_name("Unknown"), Some(Side::Unknown));
        assert_eq!(Side::from_name("both"), None);
    }
}
