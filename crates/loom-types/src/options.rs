//! Boolean feature flags and their parent hierarchy.
//!
//! Each [`EnvOption`] is read from an external settings source under its
//! [`property`](EnvOption::property) key. A child option's key is always its
//! parent's key followed by `.` and the child's own suffix, so the whole
//! hierarchy lives under [`NAMESPACE`].

use serde::{Deserialize, Serialize};

/// Root namespace for option properties.
pub const NAMESPACE: &str = "loom";

/// A named boolean flag, optionally inheriting from a parent flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnvOption {
    /// Enable all debugging options.
    DebugAll,
    /// Write every transformed class to the export directory after weaving.
    DebugExport,
    /// Run the bytecode verifier on every class after weaving.
    DebugVerify,
    /// Elevate debug-level weaving messages to info level.
    DebugVerbose,
    /// Dump the target class bytecode when weaving it fails.
    DumpTargetOnFailure,
    /// Enable all checks.
    CheckAll,
    /// Check that declared interface methods are implemented after weaving.
    CheckImplements,
}

impl EnvOption {
    /// Every declared option, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::DebugAll,
        Self::DebugExport,
        Self::DebugVerify,
        Self::DebugVerbose,
        Self::DumpTargetOnFailure,
        Self::CheckAll,
        Self::CheckImplements,
    ];

    /// Number of declared options (the size of a resolved snapshot).
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this option in [`EnvOption::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The option this one inherits from, if any.
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::DebugExport | Self::DebugVerify | Self::DebugVerbose => Some(Self::DebugAll),
            Self::CheckImplements => Some(Self::CheckAll),
            Self::DebugAll | Self::DumpTargetOnFailure | Self::CheckAll => None,
        }
    }

    /// This option's own key segment, relative to its parent.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::DebugAll => "debug",
            Self::DebugExport => "export",
            Self::DebugVerify => "verify",
            Self::DebugVerbose => "verbose",
            Self::DumpTargetOnFailure => "dumpTargetOnFailure",
            Self::CheckAll => "checks",
            Self::CheckImplements => "interfaces",
        }
    }

    /// Fully qualified settings key.
    pub const fn property(self) -> &'static str {
        match self {
            Self::DebugAll => "loom.debug",
            Self::DebugExport => "loom.debug.export",
            Self::DebugVerify => "loom.debug.verify",
            Self::DebugVerbose => "loom.debug.verbose",
            Self::DumpTargetOnFailure => "loom.dumpTargetOnFailure",
            Self::CheckAll => "loom.checks",
            Self::CheckImplements => "loom.checks.interfaces",
        }
    }

    /// Chain from this option up to its root, starting with `self`.
    pub fn ancestry(self) -> impl Iterator<Item = Self> {
        core::iter::successors(Some(self), |option| option.parent())
    }
}

impl core::fmt::Display for EnvOption {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.property())
    }
}
