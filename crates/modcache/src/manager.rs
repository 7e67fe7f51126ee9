//! Scheduling of cache work for every active collection.
//!
//! The [`CollectionCacheManager`] keeps one [`CollectionCache`] per collection
//! that fills at least one [`CollectionSlot`]. Lifecycle events from the host
//! are translated into [`CacheJob`]s or full recalculations on the
//! [`WorkQueue`]; nothing touches a cache until the next [`tick`].
//!
//! # Tick
//!
//! 1. Important work (activations, inheritance changes) runs for all affected
//!    collections in parallel on the rayon pool and is joined.
//! 2. Delayed work runs sequentially in arrival order.
//! 3. The default collection's tables are pushed to the sink: all of them if the
//!    default collection changed, otherwise only the dirty ones.
//!
//! [`tick`]: CollectionCacheManager::tick

use crate::cache::CollectionCache;
use crate::config::CacheConfig;
use crate::context::ModContext;
use crate::error::{Error, Result};
use crate::notify::{ChangeCallback, ResolvedFileChanged};
use crate::queue::{CacheJob, PendingWork, WorkQueue};
use crate::storage::Storage;
use modcache_core::{CollectionId, ModKey, Payload, VirtualPath};
use modcache_meta::{MetaDefaults, ScopedTables, TableKey, TableSink, TableSpace};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A role a collection can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionSlot {
    /// Applies to everything not covered by another slot; owns the live tables.
    Default,
    /// Applies to the host's own interface.
    Interface,
    /// The collection currently being edited.
    Current,
    /// Assigned to one individual by host-defined id.
    Individual(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveCollections {
    slots: BTreeMap<CollectionSlot, CollectionId>,
}

impl ActiveCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: CollectionSlot, id: CollectionId) -> Self {
        self.slots.insert(slot, id);
        self
    }

    pub fn get(&self, slot: CollectionSlot) -> Option<CollectionId> {
        self.slots.get(&slot).copied()
    }

    /// Assign or clear a slot, returning the previous collection.
    pub fn set(&mut self, slot: CollectionSlot, id: Option<CollectionId>) -> Option<CollectionId> {
        match id {
            Some(id) => self.slots.insert(slot, id),
            None => self.slots.remove(&slot),
        }
    }

    pub fn default_collection(&self) -> Option<CollectionId> {
        self.get(CollectionSlot::Default)
    }

    pub fn contains(&self, id: CollectionId) -> bool {
        self.slots.values().any(|active| *active == id)
    }

    /// Every collection filling at least one slot.
    pub fn ids(&self) -> BTreeSet<CollectionId> {
        self.slots.values().copied().collect()
    }
}

/// Where a mod's files live changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModPathChange {
    Added,
    Deleted,
    Moved,
    /// The mod's contents are about to be re-read.
    StartingReload,
    Reloaded,
}

/// The structure or contents of a mod changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOptionChange {
    DisplayChange,
    GroupRenamed,
    OptionRenamed,
    OptionFilesChanged,
    OptionMetaChanged,
    GroupAdded,
    GroupDeleted,
    GroupMoved,
    GroupTypeChanged,
    PriorityChanged,
    OptionAdded,
    OptionDeleted,
    OptionMoved,
}

/// A per-collection setting of a mod changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModSettingChange {
    /// The collection started or stopped inheriting the mod's settings.
    Inheritance,
    EnableState,
    Priority,
    /// A group selection changed.
    Setting,
    MultiInheritance,
    MultiEnableState,
    TemporaryMod,
    Edited,
}

/// Previous value of the changed setting (`0`/`1` for enable states).
pub type SettingValue = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporaryModChange {
    Added,
    Removed,
    Changed,
}

pub struct CollectionCacheManager {
    config: CacheConfig,
    defaults: Arc<dyn MetaDefaults>,
    space: TableSpace,
    active: ActiveCollections,
    caches: HashMap<CollectionId, CollectionCache>,
    queue: WorkQueue,
    sink: Box<dyn TableSink + Send>,
    observer: Option<ChangeCallback>,
    install_default: bool,
}

impl CollectionCacheManager {
    /// Create a manager whose table space is still pending.
    ///
    /// # Arguments
    ///
    /// * `defaults` - Unpatched base tables shared by every collection
    /// * `sink` - Destination of the default collection's patched tables
    pub fn new(defaults: Arc<dyn MetaDefaults>, sink: Box<dyn TableSink + Send>) -> Self {
        let config = CacheConfig::default();
        Self {
            queue: WorkQueue::new(config.important_threshold),
            config,
            defaults,
            space: TableSpace::Pending,
            active: ActiveCollections::new(),
            caches: HashMap::new(),
            sink,
            observer: None,
            install_default: false,
        }
    }

    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.queue = WorkQueue::new(config.important_threshold);
        self.config = config;
        self
    }

    pub fn with_table_space(mut self, space: TableSpace) -> Self {
        self.space = space;
        self
    }

    /// Register a callback for resolved-file changes in every collection.
    pub fn with_observer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ResolvedFileChanged) + Send + Sync + 'static,
    {
        let observer: ChangeCallback = Arc::new(callback);
        for cache in self.caches.values_mut() {
            cache.set_observer(Some(observer.clone()));
        }
        self.observer = Some(observer);
        self
    }

    fn create_cache(&self, storage: &Storage, id: CollectionId) -> Result<CollectionCache> {
        let collection = storage
            .collections
            .get(id)
            .ok_or(Error::UnknownCollection(id))?;
        let mut cache = CollectionCache::new(
            id,
            collection.name.as_str(),
            self.defaults.clone(),
            self.space,
        )
        .with_config(&self.config);
        cache.set_observer(self.observer.clone());
        Ok(cache)
    }

    /// Build the caches of all active collections and wait for them.
    pub fn initialize(&mut self, storage: &Storage, active: ActiveCollections) -> Result<()> {
        self.active = active;
        self.caches.clear();
        for id in self.active.ids() {
            let cache = self.create_cache(storage, id)?;
            self.caches.insert(id, cache);
        }
        for id in self.active.ids() {
            self.queue.remove(id);
        }

        let recalculate = |cache: &mut CollectionCache| run_work(cache, storage, &PendingWork::Full);
        if self.config.parallel_startup {
            self.caches.par_iter_mut().for_each(|(_, cache)| recalculate(cache));
        } else {
            self.caches.values_mut().for_each(recalculate);
        }

        info!(collections = self.caches.len(), "Initialized collection caches");
        self.install_default = true;
        self.push_default_tables();
        Ok(())
    }

    pub fn on_mod_path_changed(&mut self, change: ModPathChange, key: ModKey) {
        let job = match change {
            ModPathChange::Added | ModPathChange::Reloaded => CacheJob::AddMod(key),
            ModPathChange::Deleted | ModPathChange::StartingReload => CacheJob::RemoveMod(key),
            ModPathChange::Moved => return,
        };
        for id in self.cache_ids() {
            self.queue.push(id, job);
        }
    }

    /// `group` is `None` when the change concerns the default option.
    pub fn on_mod_option_changed(
        &mut self,
        storage: &Storage,
        change: ModOptionChange,
        key: ModKey,
        group: Option<usize>,
        option: usize,
    ) {
        let content_only = match change {
            ModOptionChange::DisplayChange
            | ModOptionChange::GroupRenamed
            | ModOptionChange::OptionRenamed => return,
            ModOptionChange::OptionFilesChanged | ModOptionChange::OptionMetaChanged => true,
            _ => false,
        };

        for id in self.cache_ids() {
            let Ok(view) = storage.view(id) else {
                continue;
            };
            let Some(settings) = view.applied_settings(key) else {
                continue;
            };
            if content_only {
                let active = view
                    .mod_by_key(key)
                    .is_some_and(|m| m.is_option_active(&settings, group, option));
                if !active {
                    continue;
                }
            }
            self.queue.push(id, CacheJob::ReloadMod(key));
        }
    }

    pub fn on_mod_setting_changed(
        &mut self,
        storage: &Storage,
        collection: CollectionId,
        key: ModKey,
        change: ModSettingChange,
        old: SettingValue,
        _group: Option<usize>,
    ) {
        let targets = self.setting_targets(storage, collection, key, change);
        debug!(%collection, mod_key = %key, ?change, targets = targets.len(), "Mod setting changed");

        for id in targets {
            match change {
                ModSettingChange::EnableState => {
                    let job = if old == 0 {
                        CacheJob::AddMod(key)
                    } else {
                        CacheJob::RemoveMod(key)
                    };
                    self.queue.push(id, job);
                }
                ModSettingChange::Priority => {
                    let contested = self
                        .caches
                        .get(&id)
                        .is_some_and(|cache| !cache.conflicts(key).is_empty());
                    if contested {
                        self.queue.push(id, CacheJob::ReloadMod(key));
                    }
                }
                ModSettingChange::Setting | ModSettingChange::Inheritance => {
                    self.queue.push(id, CacheJob::ReloadMod(key));
                }
                ModSettingChange::MultiInheritance
                | ModSettingChange::MultiEnableState
                | ModSettingChange::TemporaryMod
                | ModSettingChange::Edited => self.queue.push_full(id, false),
            }
        }
    }

    /// Cached collections a setting change in `collection` reaches.
    ///
    /// Inheritors are included when they take the mod's settings from
    /// `collection`, or, for inheritance changes, whenever they do not define
    /// the mod's settings themselves.
    fn setting_targets(
        &self,
        storage: &Storage,
        collection: CollectionId,
        key: ModKey,
        change: ModSettingChange,
    ) -> Vec<CollectionId> {
        let mut targets = vec![collection];
        match key.index() {
            Some(index) => {
                let inheritors = storage.collections.inheritors_of(collection);
                targets.extend(inheritors.into_iter().filter(|id| {
                    if change == ModSettingChange::Inheritance {
                        storage
                            .collections
                            .get(*id)
                            .is_some_and(|c| c.own_settings(index).is_none())
                    } else {
                        storage
                            .collections
                            .actual_settings(*id, index)
                            .is_some_and(|(_, source)| source == collection)
                    }
                }));
            }
            None => targets.extend(storage.collections.inheritors_of(collection)),
        }
        targets.retain(|id| self.caches.contains_key(id));
        targets
    }

    /// `scope` is the collection a scoped temporary mod applies to.
    pub fn on_temporary_mod_changed(
        &mut self,
        change: TemporaryModChange,
        key: ModKey,
        scope: Option<CollectionId>,
    ) {
        let job = match change {
            TemporaryModChange::Added => CacheJob::AddMod(key),
            TemporaryModChange::Removed => CacheJob::RemoveMod(key),
            TemporaryModChange::Changed => CacheJob::ReloadMod(key),
        };
        let targets = match scope {
            Some(id) => vec![id],
            None => self.cache_ids(),
        };
        for id in targets {
            if self.caches.contains_key(&id) {
                self.queue.push(id, job);
            }
        }
    }

    /// A slot now points at `new` instead of `old`.
    pub fn on_active_collection_changed(
        &mut self,
        storage: &Storage,
        slot: CollectionSlot,
        old: Option<CollectionId>,
        new: Option<CollectionId>,
    ) -> Result<()> {
        if let Some(new) = new {
            if !self.caches.contains_key(&new) {
                let cache = self.create_cache(storage, new)?;
                self.caches.insert(new, cache);
                self.queue.push_full(new, true);
                info!(collection = %new, ?slot, "Activated collection");
            }
        }
        self.active.set(slot, new);

        if let Some(old) = old {
            if !self.active.contains(old) && self.caches.remove(&old).is_some() {
                self.queue.remove(old);
                info!(collection = %old, ?slot, "Dropped inactive collection cache");
            }
        }
        if slot == CollectionSlot::Default {
            self.install_default = true;
        }
        Ok(())
    }

    /// A collection's inheritance list changed.
    pub fn on_inheritance_changed(&mut self, storage: &Storage, collection: CollectionId) {
        let affected = std::iter::once(collection).chain(storage.collections.inheritors_of(collection));
        for id in affected {
            if self.caches.contains_key(&id) {
                self.queue.push_full(id, true);
            }
        }
    }

    /// The host's table space exists; replay deferred metadata everywhere.
    pub fn on_table_space_ready(&mut self, storage: &Storage) {
        if self.space == TableSpace::Ready {
            return;
        }
        self.space = TableSpace::Ready;
        for cache in self.caches.values_mut() {
            match storage.view(cache.id()) {
                Ok(view) => cache.set_meta_ready(&view),
                Err(err) => {
                    warn!(collection = %cache.id(), error = %err, "Skipped metadata replay for missing collection");
                }
            }
        }
        self.install_default = true;
        self.push_default_tables();
    }

    /// Run queued work. Returns the number of collections processed.
    pub fn tick(&mut self, storage: &Storage) -> usize {
        let important: HashMap<CollectionId, PendingWork> =
            self.queue.take_important().into_iter().collect();
        if !important.is_empty() {
            let run = |(id, cache): (&CollectionId, &mut CollectionCache)| {
                if let Some(work) = important.get(id) {
                    run_work(cache, storage, work);
                }
            };
            if self.config.parallel_startup {
                self.caches.par_iter_mut().for_each(run);
            } else {
                self.caches.iter_mut().for_each(run);
            }
        }

        let delayed = self.queue.take_delayed();
        for (id, work) in &delayed {
            if let Some(cache) = self.caches.get_mut(id) {
                run_work(cache, storage, work);
            }
        }

        self.push_default_tables();
        important.len() + delayed.len()
    }

    fn push_default_tables(&mut self) {
        if self.space != TableSpace::Ready {
            return;
        }
        let Some(default) = self.active.default_collection() else {
            return;
        };
        let Some(cache) = self.caches.get_mut(&default) else {
            return;
        };
        if std::mem::take(&mut self.install_default) {
            cache.install_tables(self.sink.as_mut());
        } else {
            cache.flush_tables(self.sink.as_mut());
        }
    }

    /// Install a non-default collection's view of every table until the guard drops.
    pub fn scoped_tables(&mut self, collection: CollectionId) -> Result<ScopedTables<'_>> {
        let cache = self
            .caches
            .get(&collection)
            .ok_or(Error::UnknownCollection(collection))?;
        let meta = cache.meta();
        let tables: Vec<_> = TableKey::all()
            .filter(|key| {
                meta.table_bytes(*key).is_some() || self.sink.current_table(*key).is_some()
            })
            .filter_map(|key| Some((key, meta.effective_table_bytes(key)?)))
            .collect();
        Ok(ScopedTables::install(self.sink.as_mut(), tables))
    }

    /// Force or clear a file in one collection; see [`CollectionCache::force_file`].
    pub fn force_file(
        &mut self,
        storage: &Storage,
        collection: CollectionId,
        path: VirtualPath,
        payload: Option<Payload>,
    ) -> Result<()> {
        let cache = self
            .caches
            .get_mut(&collection)
            .ok_or(Error::UnknownCollection(collection))?;
        let view = storage.view(collection)?;
        cache.force_file(&view, path, payload);
        Ok(())
    }

    pub fn resolve(&self, collection: CollectionId, path: &VirtualPath) -> Option<&Payload> {
        self.caches.get(&collection)?.resolve(path)
    }

    pub fn cache(&self, collection: CollectionId) -> Option<&CollectionCache> {
        self.caches.get(&collection)
    }

    pub fn active(&self) -> &ActiveCollections {
        &self.active
    }

    pub fn sink(&self) -> &dyn TableSink {
        self.sink.as_ref()
    }

    pub fn table_space(&self) -> TableSpace {
        self.space
    }

    /// Whether any work is waiting for the next tick.
    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty()
    }

    fn cache_ids(&self) -> Vec<CollectionId> {
        let mut ids: Vec<CollectionId> = self.caches.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for CollectionCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionCacheManager")
            .field("config", &self.config)
            .field("space", &self.space)
            .field("active", &self.active)
            .field("caches", &self.caches)
            .field("queue", &self.queue)
            .finish()
    }
}

fn run_work(cache: &mut CollectionCache, storage: &Storage, work: &PendingWork) {
    let view = match storage.view(cache.id()) {
        Ok(view) => view,
        Err(err) => {
            warn!(collection = %cache.id(), error = %err, "Skipped work for missing collection");
            return;
        }
    };
    match work {
        PendingWork::Full => cache.full_recalculation(&view),
        PendingWork::Incremental(jobs) => {
            for job in jobs {
                if let Err(err) = cache.apply_job(&view, *job) {
                    warn!(collection = %cache.id(), ?job, error = %err, "Cache job failed");
                }
            }
        }
    }
}
