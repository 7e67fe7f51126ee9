//! Layered mod resolution for collections of game mods.
//!
//! Each collection gets a [`CollectionCache`] mapping virtual game paths to the
//! payload of the highest-priority mod that redirects them, plus a
//! [`MetaCache`](modcache_meta::MetaCache) of patched metadata tables. Caches
//! are updated incrementally as mods are added, removed and reloaded, and
//! always agree with a full recalculation. It supports:
//!
//! - **Priority resolution**: one owner per contested path or metadata slot
//! - **Conflict bookkeeping**: pairwise records visible from both mods
//! - **Work scheduling**: lifecycle events batched into per-collection jobs
//! - **Table publication**: the default collection's tables pushed to a sink
//!
//! # Example
//!
//! ```no_run
//! use modcache::{ActiveCollections, CollectionCacheManager, CollectionSlot, Storage};
//! use modcache::model::{Mod, ModOption, ModSettings};
//! use modcache_core::{Payload, VirtualPath};
//! use modcache_meta::{BaseTables, MemoryTableSink};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut storage = Storage::new();
//! let collection = storage.collections.create("Default");
//! let helmet = VirtualPath::new("chara/equipment/e0001/model/c0101e0001_met.mdl")?;
//! let key = storage.mods.insert(
//!     Mod::new("Helmet").with_default_option(
//!         ModOption::new("Default").with_file(helmet.clone(), Payload::real("/mods/helmet.mdl")),
//!     ),
//! );
//! storage
//!     .collections
//!     .set_settings(collection, key.index().unwrap_or_default(), ModSettings::enabled(10))?;
//!
//! let mut manager = CollectionCacheManager::new(
//!     Arc::new(BaseTables::new()),
//!     Box::new(MemoryTableSink::new()),
//! );
//! manager.initialize(
//!     &storage,
//!     ActiveCollections::new().with(CollectionSlot::Default, collection),
//! )?;
//!
//! println!("{:?}", manager.resolve(collection, &helmet));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod conflict;
pub mod context;
pub mod error;
pub mod manager;
pub mod model;
pub mod notify;
pub mod queue;
pub mod storage;
pub mod utils;

// Re-export main types
pub use cache::{CacheSnapshot, CollectionCache, ConflictSummary, ModOwnership, ModPath};
pub use config::CacheConfig;
pub use conflict::{ConflictId, ConflictResource, ModConflicts};
pub use context::ModContext;
pub use error::{Error, Result};
pub use manager::{
    ActiveCollections, CollectionCacheManager, CollectionSlot, ModOptionChange, ModPathChange,
    ModSettingChange, SettingValue, TemporaryModChange,
};
pub use notify::{ChangeCallback, ChangeKind, ResolvedFileChanged};
pub use queue::{CacheJob, PendingWork};
pub use storage::{CollectionView, Storage};
