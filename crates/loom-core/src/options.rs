//! Option resolution against a settings source.
//!
//! An option is enabled when its own setting is `true` or when any ancestor
//! is enabled. Resolution happens once per environment and the result is an
//! [`OptionSnapshot`]; later changes to the settings source are not seen.

use loom_types::EnvOption;

use crate::settings::{SettingsSource, parse_flag};

/// Effective value of `option` under `settings`, including inheritance.
pub fn resolve(option: EnvOption, settings: &dyn SettingsSource) -> bool {
    option
        .ancestry()
        .any(|link| parse_flag(settings.get(link.property()).as_deref()))
}

/// Resolved values for every declared option, indexed by [`EnvOption::index`].
///
/// The snapshot is independent of the hierarchy once built:
/// [`set`](Self::set) overwrites a single slot without touching parents or
/// children, so a child can be forced on while its parent reads `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionSnapshot {
    values: [bool; EnvOption::COUNT],
}

impl OptionSnapshot {
    /// Resolve every declared option against `settings`.
    pub fn resolve(settings: &dyn SettingsSource) -> Self {
        let mut snapshot = Self::default();
        for option in EnvOption::ALL {
            snapshot.set(option, resolve(option, settings));
        }
        snapshot
    }

    /// Value of `option`.
    pub fn get(&self, option: EnvOption) -> bool {
        self.values.get(option.index()).copied().unwrap_or(false)
    }

    /// Overwrite the value of `option` only.
    pub fn set(&mut self, option: EnvOption, value: bool) {
        if let Some(slot) = self.values.get_mut(option.index()) {
            *slot = value;
        }
    }

    /// Every option paired with its value, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (EnvOption, bool)> + '_ {
        EnvOption::ALL.into_iter().map(|option| (option, self.get(option)))
    }
}
