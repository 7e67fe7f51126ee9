//! Identities of mods and collections.

use serde::Serialize;
use std::fmt;

/// Identity of a mod for ownership and conflict bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModKey {
    /// A mod stored in the mod library, by its stable index.
    Persisted(usize),
    /// An ephemeral mod injected at runtime.
    ///
    /// Its priority is intrinsic and fixed for the lifetime of the mod.
    Temporary { id: u32, priority: i32 },
    /// Pseudo-mod owning forced files; never takes part in conflicts.
    Forced,
}

impl ModKey {
    /// Library index of a persisted mod.
    pub fn index(self) -> Option<usize> {
        match self {
            ModKey::Persisted(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_temporary(self) -> bool {
        matches!(self, ModKey::Temporary { .. })
    }
}

impl fmt::Display for ModKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModKey::Persisted(index) => write!(f, "mod#{}", index),
            ModKey::Temporary { id, priority } => write!(f, "temp#{}@{}", id, priority),
            ModKey::Forced => f.write_str("forced"),
        }
    }
}

/// Identity of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CollectionId(pub u32);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collection#{}", self.0)
    }
}
