//! Mods as the cache consumes them.
//!
//! A [`Mod`] is a list of option groups plus a default option. Which options
//! contribute depends on the per-collection [`ModSettings`]:
//!
//! - groups are visited from highest to lowest priority (stable for ties),
//! - a [`GroupKind::Single`] group contributes the option its setting selects,
//! - a [`GroupKind::Multi`] group contributes every option whose bit is set,
//!   highest option priority first,
//! - the default option comes last.
//!
//! Within one mod the first option that claims a path or a metadata slot keeps
//! it; later claims are dropped silently.

use itertools::Itertools;
use modcache_core::{ModKey, Payload, VirtualPath};
use modcache_meta::{MetaIdentifier, MetaManipulation};
use std::cmp::Reverse;
use std::collections::HashSet;

/// A set of redirects and manipulations that is enabled as a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModOption {
    pub name: String,
    /// Ordering inside a multi-select group (higher first).
    pub priority: i32,
    pub files: Vec<(VirtualPath, Payload)>,
    pub manipulations: Vec<MetaManipulation>,
}

impl ModOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_file(mut self, path: VirtualPath, payload: Payload) -> Self {
        self.files.push((path, payload));
        self
    }

    pub fn with_manipulation(mut self, manipulation: MetaManipulation) -> Self {
        self.manipulations.push(manipulation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.manipulations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Exactly one option is active; the setting is its index.
    Single,
    /// Any subset is active; the setting is a bitmask over the first 64 options.
    Multi,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModGroup {
    pub name: String,
    pub kind: GroupKind,
    pub priority: i32,
    pub options: Vec<ModOption>,
}

impl ModGroup {
    pub fn new(name: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            name: name.into(),
            kind,
            priority: 0,
            options: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_option(mut self, option: ModOption) -> Self {
        self.options.push(option);
        self
    }

    /// Indices of the options a setting activates, in application order.
    pub fn active_options(&self, setting: GroupSetting) -> Vec<usize> {
        match self.kind {
            GroupKind::Single => {
                let index = setting.0 as usize;
                if index < self.options.len() {
                    vec![index]
                } else {
                    Vec::new()
                }
            }
            GroupKind::Multi => self
                .options
                .iter()
                .enumerate()
                .take(64)
                .filter(|(index, _)| setting.0 & (1 << index) != 0)
                .sorted_by_key(|(_, option)| Reverse(option.priority))
                .map(|(index, _)| index)
                .collect(),
        }
    }
}

/// Selection of one group: an option index or a bitmask, depending on the group kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GroupSetting(pub u64);

/// Per-collection settings of one mod.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModSettings {
    pub enabled: bool,
    pub priority: i32,
    /// One entry per group; missing entries select `0`.
    pub selections: Vec<GroupSetting>,
}

impl ModSettings {
    /// Enabled at `priority` with every group on its first choice.
    pub fn enabled(priority: i32) -> Self {
        Self {
            enabled: true,
            priority,
            selections: Vec::new(),
        }
    }

    pub fn with_selection(mut self, group: usize, setting: GroupSetting) -> Self {
        if self.selections.len() <= group {
            self.selections.resize(group + 1, GroupSetting::default());
        }
        self.selections[group] = setting;
        self
    }

    pub fn selection(&self, group: usize) -> GroupSetting {
        self.selections.get(group).copied().unwrap_or_default()
    }
}

/// The redirects and manipulations a mod contributes under some settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedModData {
    pub files: Vec<(VirtualPath, Payload)>,
    pub manipulations: Vec<MetaManipulation>,
}

impl AppliedModData {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.manipulations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mod {
    /// Assigned by the storage the mod is inserted into.
    pub key: ModKey,
    pub name: String,
    pub groups: Vec<ModGroup>,
    pub default_option: ModOption,
}

impl Mod {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: ModKey::Persisted(0),
            default_option: ModOption::new("Default"),
            groups: Vec::new(),
            name,
        }
    }

    pub fn with_group(mut self, group: ModGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_default_option(mut self, option: ModOption) -> Self {
        self.default_option = option;
        self
    }

    /// Whether the option is part of the applied data under `settings`.
    ///
    /// `group` is `None` for the default option.
    pub fn is_option_active(
        &self,
        settings: &ModSettings,
        group: Option<usize>,
        option: usize,
    ) -> bool {
        let Some(group) = group else {
            return true;
        };
        if self.key.is_temporary() {
            return false;
        }
        self.groups.get(group).is_some_and(|g| {
            g.active_options(settings.selection(group))
                .contains(&option)
        })
    }

    /// Collect the applied data of this mod.
    ///
    /// Temporary mods only ever contribute their default option.
    pub fn applied_data(&self, settings: &ModSettings) -> AppliedModData {
        let mut options: Vec<&ModOption> = Vec::new();
        if !self.key.is_temporary() {
            let groups = self
                .groups
                .iter()
                .enumerate()
                .filter(|(_, group)| !group.options.is_empty())
                .sorted_by_key(|(_, group)| Reverse(group.priority));
            for (index, group) in groups {
                options.extend(
                    group
                        .active_options(settings.selection(index))
                        .into_iter()
                        .map(|option| &group.options[option]),
                );
            }
        }
        options.push(&self.default_option);

        let mut data = AppliedModData::default();
        let mut seen_paths: HashSet<&VirtualPath> = HashSet::new();
        let mut seen_meta: HashSet<MetaIdentifier> = HashSet::new();
        for option in options {
            for (path, payload) in &option.files {
                if seen_paths.insert(path) {
                    data.files.push((path.clone(), payload.clone()));
                }
            }
            for manipulation in &option.manipulations {
                if seen_meta.insert(manipulation.identifier()) {
                    data.manipulations.push(manipulation.clone());
                }
            }
        }
        data
    }
}
