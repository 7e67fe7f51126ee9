//! Per-collection resolution cache.
//!
//! A [`CollectionCache`] answers "which payload does this virtual path resolve
//! to in this collection" and owns the collection's [`MetaCache`]. It is kept
//! up to date incrementally:
//!
//! # Conflict Algorithm
//!
//! When a mod claims a resource another mod already holds, the two effective
//! priorities are compared (collection setting for persisted mods, intrinsic
//! priority for temporary mods, `i32::MAX` for forced files):
//!
//! 1. If the incoming mod wins, every other mod that had already lost this
//!    resource to the current holder now loses it to the incoming mod instead;
//!    those entries move to the incoming mod's records, recursively.
//! 2. The resource is appended to the record shared by the two mods, creating
//!    the record on first contact.
//! 3. Ties keep the current holder and mark the record unsolved.
//!
//! Removing a mod drops everything it still owns and reloads each mod it had
//! priority over, so the next-highest claim takes over. A full recalculation
//! rebuilds the same state from scratch.
//!
//! Forced files (external overrides first, then published per-instance files)
//! sit above every mod. Mod claims on a forced path are kept aside and compete
//! again once the forced file goes away.

use crate::conflict::{ConflictRecord, ConflictResource, ConflictTable, ModConflicts};
use crate::config::CacheConfig;
use crate::context::ModContext;
use crate::error::{Error, Result};
use crate::notify::{ChangeCallback, ChangeKind, ResolvedFileChanged};
use crate::queue::CacheJob;
use crate::utils::compute_resolved_fingerprint;
use camino::Utf8Path;
use modcache_core::{CollectionId, ModKey, Payload, VirtualPath, MAX_PATH_LENGTH};
use modcache_meta::{MetaCache, MetaDefaults, MetaIdentifier, MetaManipulation, TableSink, TableSpace};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// The winning claim on a virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModPath {
    pub owner: ModKey,
    pub payload: Payload,
}

/// Resources a mod currently wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModOwnership {
    pub paths: BTreeSet<VirtualPath>,
    #[serde(serialize_with = "serialize_identifiers")]
    pub manipulations: BTreeSet<MetaIdentifier>,
}

impl ModOwnership {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.manipulations.is_empty()
    }
}

fn serialize_identifiers<S: Serializer>(
    identifiers: &BTreeSet<MetaIdentifier>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(identifiers.iter().map(ToString::to_string))
}

/// Order-independent summary of a conflict record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    /// The two mods in ascending key order.
    pub mods: [ModKey; 2],
    /// Priority flags aligned with `mods`.
    pub has_priority: [bool; 2],
    pub solved: bool,
    pub resources: Vec<ConflictResource>,
}

/// Serializable debug view of a collection cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub collection: CollectionId,
    pub files: BTreeMap<VirtualPath, ModPath>,
    pub ownership: Vec<(ModKey, ModOwnership)>,
    pub manipulations: Vec<(String, ModKey)>,
    pub conflicts: Vec<ConflictSummary>,
}

pub struct CollectionCache {
    id: CollectionId,
    name: Arc<str>,
    resolved: HashMap<VirtualPath, ModPath>,
    ownership: HashMap<ModKey, ModOwnership>,
    conflicts: ConflictTable,
    meta: MetaCache,
    /// Externally forced files, re-applied after a full recalculation.
    forced: BTreeMap<VirtualPath, Payload>,
    /// Mod claims hidden under a forced path.
    shadowed: HashMap<VirtualPath, BTreeMap<ModKey, Payload>>,
    observer: Option<ChangeCallback>,
    notify_during_full: bool,
    suppressed: bool,
    changes: u64,
    max_path_length: usize,
}

impl CollectionCache {
    /// Create an empty cache. `name` labels synthetic files and log lines.
    pub fn new(
        id: CollectionId,
        name: impl Into<Arc<str>>,
        defaults: Arc<dyn MetaDefaults>,
        space: TableSpace,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            meta: MetaCache::new(name.clone(), defaults, space),
            name,
            resolved: HashMap::new(),
            ownership: HashMap::new(),
            conflicts: ConflictTable::new(),
            forced: BTreeMap::new(),
            shadowed: HashMap::new(),
            observer: None,
            notify_during_full: false,
            suppressed: false,
            changes: 0,
            max_path_length: MAX_PATH_LENGTH,
        }
    }

    /// Register a callback for resolved-file changes.
    pub fn with_observer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ResolvedFileChanged) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(callback));
        self
    }

    pub fn with_config(mut self, config: &CacheConfig) -> Self {
        self.max_path_length = config.max_path_length;
        self.notify_during_full = config.notify_during_full_recalculation;
        self
    }

    pub fn set_observer(&mut self, observer: Option<ChangeCallback>) {
        self.observer = observer;
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add every enabled resource of a mod.
    ///
    /// Adding a mod twice is a no-op. Disabled mods are skipped.
    pub fn add_mod(&mut self, ctx: &dyn ModContext, key: ModKey) -> Result<()> {
        if key == ModKey::Forced {
            return Ok(());
        }
        let value = ctx.mod_by_key(key).ok_or(Error::UnknownMod(key))?;
        let Some(settings) = ctx.applied_settings(key) else {
            trace!(collection = %self.name, mod_key = %key, "Skipped disabled mod");
            return Ok(());
        };

        let data = value.applied_data(&settings);
        debug!(
            collection = %self.name,
            mod_key = %key,
            name = %value.name,
            files = data.files.len(),
            manipulations = data.manipulations.len(),
            "Adding mod"
        );
        for (path, payload) in data.files {
            self.add_file(ctx, path, payload, key);
        }
        for manipulation in data.manipulations {
            self.add_manipulation(ctx, manipulation, key);
        }
        Ok(())
    }

    /// Claim one virtual path for a mod. Returns whether the mod now owns it.
    pub fn add_file(
        &mut self,
        ctx: &dyn ModContext,
        path: VirtualPath,
        payload: Payload,
        key: ModKey,
    ) -> bool {
        if !self.check_payload(&path, &payload) {
            return false;
        }

        let Some(existing) = self.resolved.get(&path) else {
            self.own_path(key, path.clone());
            self.resolved.insert(
                path.clone(),
                ModPath {
                    owner: key,
                    payload: payload.clone(),
                },
            );
            self.notify(ChangeKind::Added, path, Some(payload), None, key);
            return true;
        };

        let holder = existing.owner;
        if holder == key {
            return true;
        }
        if holder == ModKey::Forced {
            trace!(collection = %self.name, %path, mod_key = %key, "Path is held by a forced file");
            self.shadowed.entry(path).or_default().insert(key, payload);
            return false;
        }
        if !self.add_conflict(ctx, ConflictResource::Path(path.clone()), key, holder) {
            return false;
        }

        self.disown_path(holder, &path);
        self.own_path(key, path.clone());
        let old = self.resolved.insert(
            path.clone(),
            ModPath {
                owner: key,
                payload: payload.clone(),
            },
        );
        self.notify(
            ChangeKind::Replaced,
            path,
            Some(payload),
            old.map(|o| o.payload),
            key,
        );
        true
    }

    /// Claim one metadata slot for a mod. Returns whether the mod now owns it.
    ///
    /// Invalid manipulations are logged and never reach conflict bookkeeping.
    pub fn add_manipulation(
        &mut self,
        ctx: &dyn ModContext,
        manipulation: MetaManipulation,
        key: ModKey,
    ) -> bool {
        if let Err(err) = self.meta.validate(&manipulation) {
            warn!(
                collection = %self.name,
                mod_key = %key,
                identifier = %manipulation.identifier(),
                error = %err,
                "Rejected manipulation"
            );
            return false;
        }

        let identifier = manipulation.identifier();
        let owned = match self.meta.owner(&identifier) {
            None => self.apply_manipulation(key, &manipulation),
            Some(holder) if holder == key => true,
            Some(holder) => {
                if self.add_conflict(ctx, ConflictResource::Meta(identifier), key, holder) {
                    self.disown_meta(holder, &identifier);
                    self.apply_manipulation(key, &manipulation)
                } else {
                    false
                }
            }
        };
        self.publish_meta_files(ctx);
        owned
    }

    fn apply_manipulation(&mut self, key: ModKey, manipulation: &MetaManipulation) -> bool {
        match self.meta.apply_mod(key, manipulation) {
            Ok(_) => {
                self.own_meta(key, manipulation.identifier());
                true
            }
            Err(err) => {
                warn!(
                    collection = %self.name,
                    mod_key = %key,
                    identifier = %manipulation.identifier(),
                    error = %err,
                    "Failed to apply manipulation"
                );
                false
            }
        }
    }

    /// Record that `added` and `existing` both claim `resource`.
    ///
    /// Returns `true` if `added` takes the resource over.
    pub fn add_conflict(
        &mut self,
        ctx: &dyn ModContext,
        resource: ConflictResource,
        added: ModKey,
        existing: ModKey,
    ) -> bool {
        let added_priority = ctx.priority(added);
        let existing_priority = ctx.priority(existing);
        let added_wins = existing_priority < added_priority;

        if added_wins {
            for id in self.conflicts.of_mod(existing) {
                let Some(record) = self.conflicts.get_mut(id) else {
                    continue;
                };
                let Some(partner) = record.partner_of(existing) else {
                    continue;
                };
                if partner == added || !record.remove(&resource) {
                    continue;
                }
                self.add_conflict(ctx, resource.clone(), added, partner);
            }
            self.conflicts.drop_empty(existing);
        }

        match self.conflicts.find(added, existing) {
            Some(id) => {
                if let Some(record) = self.conflicts.get_mut(id) {
                    record.push(resource);
                }
            }
            None => {
                let mut record = ConflictRecord::new(
                    added,
                    existing,
                    added_wins,
                    added_priority != existing_priority,
                );
                record.push(resource);
                self.conflicts.insert(record);
            }
        }
        added_wins
    }

    /// Drop everything a mod owns and let the mods it beat take over.
    pub fn remove_mod(&mut self, ctx: &dyn ModContext, key: ModKey) {
        if key == ModKey::Forced {
            return;
        }
        let ownership = self.ownership.remove(&key).unwrap_or_default();
        self.shadowed.retain(|_, claims| {
            claims.remove(&key);
            !claims.is_empty()
        });
        debug!(
            collection = %self.name,
            mod_key = %key,
            files = ownership.paths.len(),
            manipulations = ownership.manipulations.len(),
            "Removing mod"
        );

        for path in ownership.paths {
            if self.resolved.get(&path).is_some_and(|e| e.owner == key) {
                if let Some(removed) = self.resolved.remove(&path) {
                    self.notify(ChangeKind::Removed, path, None, Some(removed.payload), key);
                }
            } else {
                warn!(collection = %self.name, mod_key = %key, %path, "Owned path is held by another mod");
            }
        }
        for identifier in ownership.manipulations {
            if self.meta.owner(&identifier) == Some(key) {
                self.meta.revert_mod(&identifier);
            } else {
                warn!(collection = %self.name, mod_key = %key, %identifier, "Owned manipulation is held by another mod");
            }
        }
        self.publish_meta_files(ctx);

        for record in self.conflicts.detach_mod(key) {
            if !record.has_priority(key) {
                continue;
            }
            let Some(partner) = record.partner_of(key) else {
                continue;
            };
            if let Err(err) = self.reload_mod(ctx, partner) {
                warn!(collection = %self.name, mod_key = %partner, error = %err, "Failed to reload conflicting mod");
            }
        }
    }

    pub fn reload_mod(&mut self, ctx: &dyn ModContext, key: ModKey) -> Result<()> {
        self.remove_mod(ctx, key);
        self.add_mod(ctx, key)
    }

    pub fn apply_job(&mut self, ctx: &dyn ModContext, job: CacheJob) -> Result<()> {
        match job {
            CacheJob::AddMod(key) => self.add_mod(ctx, key),
            CacheJob::RemoveMod(key) => {
                self.remove_mod(ctx, key);
                Ok(())
            }
            CacheJob::ReloadMod(key) => self.reload_mod(ctx, key),
        }
    }

    /// Force a path to a payload, or clear the forced file with `None`.
    ///
    /// Forced files beat every mod and published per-instance file. The
    /// override is remembered and survives full recalculations; clearing it
    /// hands the path back to whatever claims it underneath.
    pub fn force_file(
        &mut self,
        ctx: &dyn ModContext,
        path: VirtualPath,
        payload: Option<Payload>,
    ) {
        match payload {
            Some(payload) => {
                self.forced.insert(path.clone(), payload);
            }
            None => {
                self.forced.remove(&path);
            }
        }
        self.refresh_forced(ctx, path);
    }

    /// Bring a path in line with its external override or published file.
    fn refresh_forced(&mut self, ctx: &dyn ModContext, path: VirtualPath) {
        let payload = self.forced.get(&path).cloned().or_else(|| {
            self.meta
                .published_file(&path)
                .map(|synthetic| Payload::Synthetic(synthetic.clone()))
        });
        match payload {
            Some(payload) => self.install_forced(path, payload),
            None => self.release_forced(ctx, path),
        }
    }

    fn install_forced(&mut self, path: VirtualPath, payload: Payload) {
        if !self.check_payload(&path, &payload) {
            return;
        }

        let old = self.resolved.insert(
            path.clone(),
            ModPath {
                owner: ModKey::Forced,
                payload: payload.clone(),
            },
        );
        if let Some(old) = &old {
            if old.owner == ModKey::Forced && old.payload == payload {
                return;
            }
            if old.owner != ModKey::Forced {
                self.disown_path(old.owner, &path);
                self.shadowed
                    .entry(path.clone())
                    .or_default()
                    .insert(old.owner, old.payload.clone());
            }
        }
        self.own_path(ModKey::Forced, path.clone());
        let kind = match old {
            Some(_) => ChangeKind::Replaced,
            None => ChangeKind::Added,
        };
        self.notify(kind, path, Some(payload), old.map(|o| o.payload), ModKey::Forced);
    }

    fn release_forced(&mut self, ctx: &dyn ModContext, path: VirtualPath) {
        if !self
            .resolved
            .get(&path)
            .is_some_and(|e| e.owner == ModKey::Forced)
        {
            return;
        }
        if let Some(removed) = self.resolved.remove(&path) {
            self.disown_path(ModKey::Forced, &path);
            self.notify(ChangeKind::Removed, path.clone(), None, Some(removed.payload), ModKey::Forced);
        }

        let claims = self.shadowed.remove(&path).unwrap_or_default();
        if !claims.is_empty() {
            debug!(collection = %self.name, %path, claims = claims.len(), "Restoring claims under a forced file");
        }
        for (key, payload) in claims {
            self.add_file(ctx, path.clone(), payload, key);
        }
    }

    fn publish_meta_files(&mut self, ctx: &dyn ModContext) {
        for publication in self.meta.take_file_publications() {
            self.refresh_forced(ctx, publication.path);
        }
    }

    /// Rebuild the cache from scratch.
    ///
    /// Per-file notifications are suppressed unless configured otherwise; one
    /// summary line is logged instead.
    pub fn full_recalculation(&mut self, ctx: &dyn ModContext) {
        self.suppressed = !self.notify_during_full;
        self.resolved.clear();
        self.ownership.clear();
        self.shadowed.clear();
        self.conflicts.clear();
        self.meta.reset();

        let mods = ctx.mods();
        for value in &mods {
            if let Err(err) = self.add_mod(ctx, value.key) {
                warn!(collection = %self.name, mod_key = %value.key, error = %err, "Failed to add mod");
            }
        }
        self.publish_meta_files(ctx);
        let forced: Vec<VirtualPath> = self.forced.keys().cloned().collect();
        for path in forced {
            self.refresh_forced(ctx, path);
        }
        self.suppressed = false;
        self.changes += 1;

        info!(
            collection = %self.name,
            mods = mods.len(),
            files = self.resolved.len(),
            manipulations = self.meta.len(),
            conflicts = self.conflicts.len(),
            "Full recalculation finished"
        );
    }

    /// Replay deferred metadata once the host table space exists.
    pub fn set_meta_ready(&mut self, ctx: &dyn ModContext) {
        self.meta.mark_ready();
        self.publish_meta_files(ctx);
    }

    /// Push dirty tables to the sink. Returns the number of tables written.
    pub fn flush_tables(&mut self, sink: &mut dyn TableSink) -> usize {
        self.meta.flush(sink)
    }

    /// Push every patched table, used when this collection becomes the default.
    pub fn install_tables(&mut self, sink: &mut dyn TableSink) {
        self.meta.install_all(sink);
    }

    pub fn resolve(&self, path: &VirtualPath) -> Option<&Payload> {
        self.resolved.get(path).map(|e| &e.payload)
    }

    /// Normalize `raw` and resolve it.
    pub fn resolve_str(&self, raw: &str) -> Result<Option<&Payload>> {
        let path = VirtualPath::new(raw)?;
        Ok(self.resolve(&path))
    }

    pub fn resolved_entry(&self, path: &VirtualPath) -> Option<&ModPath> {
        self.resolved.get(path)
    }

    /// Virtual paths served from a real file, compared case-insensitively.
    pub fn reverse_resolve(&self, real: &Utf8Path) -> Vec<VirtualPath> {
        let mut paths: Vec<VirtualPath> = self
            .resolved
            .iter()
            .filter(|(_, e)| {
                e.payload
                    .as_real()
                    .is_some_and(|p| p.as_str().eq_ignore_ascii_case(real.as_str()))
            })
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// [`reverse_resolve`](Self::reverse_resolve) for many files at once.
    pub fn reverse_resolve_many(&self, reals: &[&Utf8Path]) -> Vec<Vec<VirtualPath>> {
        let mut index: HashMap<String, Vec<VirtualPath>> = HashMap::new();
        for (path, entry) in &self.resolved {
            if let Some(real) = entry.payload.as_real() {
                index
                    .entry(real.as_str().to_ascii_lowercase())
                    .or_default()
                    .push(path.clone());
            }
        }
        reals
            .iter()
            .map(|real| {
                let mut paths = index
                    .get(&real.as_str().to_ascii_lowercase())
                    .cloned()
                    .unwrap_or_default();
                paths.sort();
                paths
            })
            .collect()
    }

    pub fn conflicts(&self, key: ModKey) -> Vec<ModConflicts> {
        self.conflicts.views(key)
    }

    pub fn owned_by(&self, key: ModKey) -> Option<&ModOwnership> {
        self.ownership.get(&key)
    }

    pub fn meta(&self) -> &MetaCache {
        &self.meta
    }

    /// Order-independent digest of the resolved files.
    pub fn fingerprint(&self) -> u64 {
        compute_resolved_fingerprint(self.resolved.iter().map(|(path, e)| (path, &e.payload)))
    }

    /// Incremented on every resolved-file change and every full recalculation.
    pub fn change_counter(&self) -> u64 {
        self.changes
    }

    /// Number of resolved paths.
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let files = self
            .resolved
            .iter()
            .map(|(path, e)| (path.clone(), e.clone()))
            .collect();

        let mut ownership: Vec<(ModKey, ModOwnership)> = self
            .ownership
            .iter()
            .map(|(key, owned)| (*key, owned.clone()))
            .collect();
        ownership.sort_by_key(|(key, _)| *key);

        let manipulations = self
            .meta
            .ownership()
            .into_iter()
            .map(|(identifier, key)| (identifier.to_string(), key))
            .collect();

        let mut conflicts: Vec<ConflictSummary> = self
            .conflicts
            .records()
            .map(|(_, record)| {
                let [a, b] = record.mods();
                let (first, second) = if a <= b { (a, b) } else { (b, a) };
                let mut resources = record.resources().to_vec();
                resources.sort();
                ConflictSummary {
                    mods: [first, second],
                    has_priority: [record.has_priority(first), record.has_priority(second)],
                    solved: record.solved(),
                    resources,
                }
            })
            .collect();
        conflicts.sort();

        CacheSnapshot {
            collection: self.id,
            files,
            ownership,
            manipulations,
            conflicts,
        }
    }

    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    fn check_payload(&self, path: &VirtualPath, payload: &Payload) -> bool {
        let len = payload.rendered_len();
        if len <= self.max_path_length {
            return true;
        }
        let err = Error::PayloadTooLong {
            path: path.to_string(),
            payload: payload.to_string(),
            len,
            max: self.max_path_length,
        };
        error!(collection = %self.name, error = %err, "Rejected redirect");
        false
    }

    fn own_path(&mut self, key: ModKey, path: VirtualPath) {
        self.ownership.entry(key).or_default().paths.insert(path);
    }

    fn disown_path(&mut self, key: ModKey, path: &VirtualPath) {
        if let Some(owned) = self.ownership.get_mut(&key) {
            owned.paths.remove(path);
            if owned.is_empty() {
                self.ownership.remove(&key);
            }
        }
    }

    fn own_meta(&mut self, key: ModKey, identifier: MetaIdentifier) {
        self.ownership
            .entry(key)
            .or_default()
            .manipulations
            .insert(identifier);
    }

    fn disown_meta(&mut self, key: ModKey, identifier: &MetaIdentifier) {
        if let Some(owned) = self.ownership.get_mut(&key) {
            owned.manipulations.remove(identifier);
            if owned.is_empty() {
                self.ownership.remove(&key);
            }
        }
    }

    fn notify(
        &mut self,
        kind: ChangeKind,
        path: VirtualPath,
        new: Option<Payload>,
        old: Option<Payload>,
        owner: ModKey,
    ) {
        self.changes += 1;
        trace!(collection = %self.name, ?kind, %path, %owner, "Resolved file changed");
        if self.suppressed {
            return;
        }
        if let Some(observer) = &self.observer {
            observer(&ResolvedFileChanged {
                collection: self.id,
                kind,
                path,
                new,
                old,
                owner,
            });
        }
    }
}

impl std::fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionCache")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("files", &self.resolved.len())
            .field("mods", &self.ownership.len())
            .field("conflicts", &self.conflicts.len())
            .field("meta", &self.meta)
            .finish()
    }
}
