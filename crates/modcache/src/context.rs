//! The view of mod storage a collection cache works against.

use crate::model::{Mod, ModSettings};
use modcache_core::ModKey;
use std::sync::Arc;

/// Mods and their effective settings as seen from one collection.
///
/// The cache never stores settings itself; every add and reload reads them
/// through this trait. [`Storage::view`](crate::Storage::view) is the
/// in-process implementation.
pub trait ModContext {
    /// Look up a mod visible to this collection.
    fn mod_by_key(&self, key: ModKey) -> Option<Arc<Mod>>;

    /// Effective settings of a persisted mod, inheritance already applied.
    fn settings(&self, index: usize) -> Option<ModSettings>;

    /// Every visible mod in canonical order: temporary mods first, then
    /// persisted mods by index.
    fn mods(&self) -> Vec<Arc<Mod>>;

    /// Settings a mod is applied with, or `None` if it is not enabled here.
    ///
    /// Temporary mods are always enabled at their intrinsic priority.
    fn applied_settings(&self, key: ModKey) -> Option<ModSettings> {
        match key {
            ModKey::Persisted(index) => self.settings(index).filter(|s| s.enabled),
            ModKey::Temporary { priority, .. } => Some(ModSettings::enabled(priority)),
            ModKey::Forced => None,
        }
    }

    /// Priority used when two mods claim the same resource.
    ///
    /// Unset settings count as `0`; forced files always win.
    fn priority(&self, key: ModKey) -> i32 {
        match key {
            ModKey::Persisted(index) => self.settings(index).map_or(0, |s| s.priority),
            ModKey::Temporary { priority, .. } => priority,
            ModKey::Forced => i32::MAX,
        }
    }
}
