//! Per-collection metadata cache.
//!
//! [`MetaCache`] owns one sub-cache per format plus the manipulation ownership
//! map, and turns applied manipulations into patched tables and synthetic
//! per-instance files.

mod eqdp;
mod eqp;
mod est;
mod gmp;
mod imc;
mod rsp;
mod shape_attribute;

use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{
    EqdpEntry, EqpEntry, EstEntry, GmpEntry, ImcFile, MetaIdentifier, MetaManipulation, RspEntry,
    ShapeAttributeName, ShapeConnectorCondition,
};
use crate::override_table::TriState;
use crate::sink::{TableKey, TableSink};
use crate::types::{EstType, GenderRace, HumanSlot, PrimaryId, RspAttribute, SubRace};
use itertools::Itertools;
use modcache_core::{ModKey, Payload, SyntheticPath, VirtualPath};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use eqdp::EqdpCache;
use eqp::{EqpCache, GlobalEqpCache};
use est::EstCache;
use gmp::GmpCache;
use imc::ImcCache;
use rsp::RspCache;
use shape_attribute::{AtrCache, ShpCache};

/// Behaviour shared by every per-format cache.
pub(crate) trait SubCache {
    type Identifier;
    type Entry;

    /// Write an entry; returns whether the effective state changed.
    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &Self::Identifier,
        entry: &Self::Entry,
    ) -> Result<bool>;

    /// Restore the built-in default; returns whether the effective state changed.
    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &Self::Identifier) -> bool;

    /// Value a revert restores, if the format has one.
    fn default_for(&self, defaults: &dyn MetaDefaults, id: &Self::Identifier)
        -> Option<Self::Entry>;

    fn reset(&mut self);
}

/// Whether the host's table space can be written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSpace {
    /// Ownership is recorded but nothing is written.
    Pending,
    Ready,
}

/// A per-instance file to (un)publish through the collection's forced files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePublication {
    pub path: VirtualPath,
    /// `None` clears the forced file.
    pub payload: Option<Payload>,
}

pub struct MetaCache {
    collection: Arc<str>,
    defaults: Arc<dyn MetaDefaults>,
    space: TableSpace,
    owners: HashMap<MetaIdentifier, (ModKey, MetaManipulation)>,

    eqp: EqpCache,
    eqdp: EqdpCache,
    est: EstCache,
    gmp: GmpCache,
    rsp: RspCache,
    global_eqp: GlobalEqpCache,
    imc: ImcCache,
    shp: ShpCache,
    atr: AtrCache,

    dirty: BTreeSet<TableKey>,
    published: HashMap<VirtualPath, SyntheticPath>,
    publications: Vec<FilePublication>,
    counter: u64,
}

impl MetaCache {
    /// Create an empty cache; `collection` labels its synthetic files.
    pub fn new(
        collection: impl Into<Arc<str>>,
        defaults: Arc<dyn MetaDefaults>,
        space: TableSpace,
    ) -> Self {
        Self {
            collection: collection.into(),
            defaults,
            space,
            owners: HashMap::new(),
            eqp: EqpCache::default(),
            eqdp: EqdpCache::default(),
            est: EstCache::default(),
            gmp: GmpCache::default(),
            rsp: RspCache::default(),
            global_eqp: GlobalEqpCache::default(),
            imc: ImcCache::default(),
            shp: ShpCache::default(),
            atr: AtrCache::default(),
            dirty: BTreeSet::new(),
            published: HashMap::new(),
            publications: Vec::new(),
            counter: 0,
        }
    }

    pub fn table_space(&self) -> TableSpace {
        self.space
    }

    pub fn defaults(&self) -> &Arc<dyn MetaDefaults> {
        &self.defaults
    }

    /// Structural validation against this cache's base data.
    pub fn validate(&self, manipulation: &MetaManipulation) -> Result<()> {
        manipulation.validate(self.defaults.as_ref())
    }

    /// Record `mod_key` as owner of the manipulation's identifier and write it.
    ///
    /// Returns `Ok(false)` without doing anything when the same mod already
    /// applied the identical entry. While the table space is pending only the
    /// ownership is recorded.
    pub fn apply_mod(&mut self, mod_key: ModKey, manipulation: &MetaManipulation) -> Result<bool> {
        let identifier = manipulation.identifier();
        if let Some((owner, current)) = self.owners.get(&identifier) {
            if *owner == mod_key && current == manipulation {
                return Ok(false);
            }
        }

        self.validate(manipulation)?;
        let changed = match self.space {
            TableSpace::Pending => false,
            TableSpace::Ready => self.write(manipulation)?,
        };
        trace!(%identifier, owner = %mod_key, changed, "Applied manipulation");
        self.owners
            .insert(identifier, (mod_key, manipulation.clone()));
        Ok(changed)
    }

    /// Drop the owner of `identifier` and restore the format default.
    pub fn revert_mod(&mut self, identifier: &MetaIdentifier) -> Option<ModKey> {
        let (owner, manipulation) = self.owners.remove(identifier)?;
        if self.space == TableSpace::Ready {
            self.unwrite(&manipulation);
        }
        trace!(%identifier, owner = %owner, "Reverted manipulation");
        Some(owner)
    }

    /// Switch to [`TableSpace::Ready`] and replay every owned manipulation once.
    ///
    /// The reconstructed tables are left dirty for the next flush.
    pub fn mark_ready(&mut self) {
        if self.space == TableSpace::Ready {
            return;
        }
        self.space = TableSpace::Ready;

        let pending: Vec<MetaManipulation> = self
            .owners
            .iter()
            .sorted_by_key(|(identifier, _)| **identifier)
            .map(|(_, (_, manipulation))| manipulation.clone())
            .collect();
        for manipulation in &pending {
            if let Err(err) = self.write(manipulation) {
                warn!(
                    collection = %self.collection,
                    identifier = %manipulation.identifier(),
                    error = %err,
                    "Failed to replay manipulation"
                );
            }
        }
        info!(
            collection = %self.collection,
            manipulations = pending.len(),
            "Replayed metadata into ready table space"
        );
    }

    /// Forget every manipulation. Tables that were patched become dirty so the
    /// next flush resets them.
    pub fn reset(&mut self) {
        let modified = self.modified_keys();
        self.dirty.extend(modified);
        self.owners.clear();
        self.eqp.reset();
        self.eqdp.reset();
        self.est.reset();
        self.gmp.reset();
        self.rsp.reset();
        self.global_eqp.reset();
        self.imc.reset();
        self.shp.reset();
        self.atr.reset();
        self.published.clear();
        self.publications.clear();
        debug!(collection = %self.collection, "Reset metadata cache");
    }

    /// Per-instance file changes accumulated since the last call.
    pub fn take_file_publications(&mut self) -> Vec<FilePublication> {
        std::mem::take(&mut self.publications)
    }

    fn write(&mut self, manipulation: &MetaManipulation) -> Result<bool> {
        let defaults = self.defaults.as_ref();
        let changed = match manipulation {
            MetaManipulation::Eqp(id, entry) => self.eqp.apply(defaults, id, entry)?,
            MetaManipulation::Eqdp(id, entry) => self.eqdp.apply(defaults, id, entry)?,
            MetaManipulation::Est(id, entry) => self.est.apply(defaults, id, entry)?,
            MetaManipulation::Gmp(id, entry) => self.gmp.apply(defaults, id, entry)?,
            MetaManipulation::Rsp(id, entry) => self.rsp.apply(defaults, id, entry)?,
            MetaManipulation::GlobalEqp(id) => self.global_eqp.apply(defaults, id, &())?,
            MetaManipulation::Imc(id, entry) => self.imc.apply(defaults, id, entry)?,
            MetaManipulation::Shp(id, entry) => self.shp.apply(defaults, id, entry)?,
            MetaManipulation::Atr(id, entry) => self.atr.apply(defaults, id, entry)?,
        };
        if changed {
            self.touch(&manipulation.identifier());
        }
        Ok(changed)
    }

    fn unwrite(&mut self, manipulation: &MetaManipulation) -> bool {
        let defaults = self.defaults.as_ref();
        let changed = match manipulation {
            MetaManipulation::Eqp(id, _) => self.eqp.revert(defaults, id),
            MetaManipulation::Eqdp(id, _) => self.eqdp.revert(defaults, id),
            MetaManipulation::Est(id, _) => self.est.revert(defaults, id),
            MetaManipulation::Gmp(id, _) => self.gmp.revert(defaults, id),
            MetaManipulation::Rsp(id, _) => self.rsp.revert(defaults, id),
            MetaManipulation::GlobalEqp(id) => self.global_eqp.revert(defaults, id),
            MetaManipulation::Imc(id, _) => self.imc.revert(defaults, id),
            MetaManipulation::Shp(id, _) => self.shp.revert(defaults, id),
            MetaManipulation::Atr(id, _) => self.atr.revert(defaults, id),
        };
        if changed {
            self.touch(&manipulation.identifier());
        }
        changed
    }

    /// Mark the table behind `identifier` dirty, or republish its file.
    fn touch(&mut self, identifier: &MetaIdentifier) {
        let key = match identifier {
            MetaIdentifier::Eqp(_) | MetaIdentifier::GlobalEqp(_) => TableKey::Eqp,
            MetaIdentifier::Eqdp(id) => TableKey::Eqdp(id.gender_race, id.accessory()),
            MetaIdentifier::Est(id) => TableKey::Est(id.slot),
            MetaIdentifier::Gmp(_) => TableKey::Gmp,
            MetaIdentifier::Rsp(_) => TableKey::Rsp,
            MetaIdentifier::Imc(id) => {
                // Applied identifiers already produced a valid path.
                if let Ok(path) = id.game_path() {
                    self.publish(path);
                }
                return;
            }
            MetaIdentifier::Shp(_) | MetaIdentifier::Atr(_) => return,
        };
        self.dirty.insert(key);
    }

    fn publish(&mut self, path: VirtualPath) {
        let payload = match self.imc.file(&path) {
            Some(_) => {
                self.counter += 1;
                let synthetic = SyntheticPath::new(self.collection.clone(), self.counter, path.clone());
                self.published.insert(path.clone(), synthetic.clone());
                Some(Payload::Synthetic(synthetic))
            }
            None => {
                self.published.remove(&path);
                None
            }
        };
        self.publications.push(FilePublication { path, payload });
    }

    fn modified_keys(&self) -> BTreeSet<TableKey> {
        let mut keys = BTreeSet::new();
        if self.eqp.is_modified() || !self.global_eqp.is_empty() {
            keys.insert(TableKey::Eqp);
        }
        keys.extend(
            self.eqdp
                .modified_tables()
                .map(|(gender_race, accessory)| TableKey::Eqdp(gender_race, accessory)),
        );
        keys.extend(self.est.modified_tables().map(TableKey::Est));
        if self.gmp.table_bytes().is_some() {
            keys.insert(TableKey::Gmp);
        }
        if self.rsp.table_bytes().is_some() {
            keys.insert(TableKey::Rsp);
        }
        keys
    }

    /// Serialized patched table, `None` when the base table applies.
    pub fn table_bytes(&self, key: TableKey) -> Option<Arc<[u8]>> {
        let defaults = self.defaults.as_ref();
        let bytes = match key {
            TableKey::Eqp => self.eqp.table_bytes(defaults, &self.global_eqp),
            TableKey::Eqdp(gender_race, accessory) => {
                self.eqdp.table_bytes(defaults, gender_race, accessory)
            }
            TableKey::Est(kind) => self.est.table_bytes(kind),
            TableKey::Gmp => self.gmp.table_bytes(),
            TableKey::Rsp => self.rsp.table_bytes(),
        };
        bytes.map(Arc::from)
    }

    /// The table as this collection sees it, patched or base.
    ///
    /// `None` only for deformation tables the game does not have.
    pub fn effective_table_bytes(&self, key: TableKey) -> Option<Arc<[u8]>> {
        if let Some(bytes) = self.table_bytes(key) {
            return Some(bytes);
        }
        let defaults = self.defaults.as_ref();
        let bytes = match key {
            TableKey::Eqp => defaults.eqp().to_bytes(),
            TableKey::Eqdp(gender_race, accessory) => defaults.eqdp(gender_race, accessory)?.to_bytes(),
            TableKey::Est(kind) => defaults.est(kind).to_bytes(),
            TableKey::Gmp => defaults.gmp().to_bytes(),
            TableKey::Rsp => defaults.rsp().to_bytes(),
        };
        Some(bytes.into())
    }

    /// Push only the tables changed since the last flush. Returns how many
    /// tables were written.
    pub fn flush(&mut self, sink: &mut dyn TableSink) -> usize {
        let dirty = std::mem::take(&mut self.dirty);
        for &key in &dirty {
            match self.table_bytes(key) {
                Some(bytes) => sink.set_table(key, bytes),
                None => sink.reset_table(key),
            }
        }
        if !dirty.is_empty() {
            debug!(collection = %self.collection, tables = dirty.len(), "Flushed metadata tables");
        }
        dirty.len()
    }

    /// Push every table, resetting the ones this cache does not patch.
    pub fn install_all(&mut self, sink: &mut dyn TableSink) {
        self.dirty.clear();
        for key in TableKey::all() {
            match self.table_bytes(key) {
                Some(bytes) => sink.set_table(key, bytes),
                None => sink.reset_table(key),
            }
        }
        debug!(collection = %self.collection, "Installed all metadata tables");
    }

    /// Every patched table, for temporary installation.
    pub fn modified_tables(&self) -> Vec<(TableKey, Arc<[u8]>)> {
        self.modified_keys()
            .into_iter()
            .filter_map(|key| self.table_bytes(key).map(|bytes| (key, bytes)))
            .collect()
    }

    pub fn has_dirty_tables(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn eqp_entry(&self, set_id: PrimaryId) -> EqpEntry {
        let entry = self.eqp.entry(self.defaults.as_ref(), set_id);
        self.global_eqp.apply_to(set_id, entry)
    }

    pub fn eqdp_entry(&self, set_id: PrimaryId, gender_race: GenderRace, accessory: bool) -> EqdpEntry {
        self.eqdp
            .entry(self.defaults.as_ref(), set_id, gender_race, accessory)
    }

    pub fn est_entry(&self, kind: EstType, gender_race: GenderRace, set_id: PrimaryId) -> EstEntry {
        self.est
            .entry(self.defaults.as_ref(), kind, gender_race, set_id)
    }

    pub fn gmp_entry(&self, set_id: PrimaryId) -> GmpEntry {
        self.gmp.entry(self.defaults.as_ref(), set_id)
    }

    pub fn rsp_value(&self, sub_race: SubRace, attribute: RspAttribute) -> RspEntry {
        self.rsp.value(self.defaults.as_ref(), sub_race, attribute)
    }

    /// Edited per-instance file at a game path.
    pub fn imc_file(&self, path: &VirtualPath) -> Option<&ImcFile> {
        self.imc.file(path)
    }

    /// Game paths of every edited per-instance file.
    pub fn imc_paths(&self) -> impl Iterator<Item = &VirtualPath> {
        self.imc.paths()
    }

    /// Current synthetic instance published for a game path.
    pub fn published_file(&self, path: &VirtualPath) -> Option<&SyntheticPath> {
        self.published.get(path)
    }

    /// Bytes behind a synthetic path, if it is still the current instance.
    pub fn synthetic_file(&self, synthetic: &SyntheticPath) -> Option<Vec<u8>> {
        if self.published.get(&synthetic.path) != Some(synthetic) {
            return None;
        }
        self.imc.file(&synthetic.path)?.to_bytes().ok()
    }

    pub fn shape_state(
        &self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        shape: &ShapeAttributeName,
        gender_race: GenderRace,
        connector: ShapeConnectorCondition,
    ) -> TriState {
        self.shp.state(slot, id, shape, gender_race, connector)
    }

    pub fn shape_enabled(
        &self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        shape: &ShapeAttributeName,
        gender_race: GenderRace,
        connector: ShapeConnectorCondition,
    ) -> bool {
        self.shape_state(slot, id, shape, gender_race, connector) == TriState::On
    }

    pub fn attribute_state(
        &self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        attribute: &ShapeAttributeName,
        gender_race: GenderRace,
    ) -> TriState {
        self.atr.state(slot, id, attribute, gender_race)
    }

    pub fn attribute_disabled(
        &self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        attribute: &ShapeAttributeName,
        gender_race: GenderRace,
    ) -> bool {
        self.attribute_state(slot, id, attribute, gender_race) == TriState::Off
    }

    /// Stored shape definitions that enable a shape.
    pub fn shape_enabled_count(&self) -> usize {
        self.shp.enabled_count()
    }

    /// Stored attribute definitions that suppress an attribute.
    pub fn attribute_disabled_count(&self) -> usize {
        self.atr.disabled_count()
    }

    /// Manipulation a revert of `identifier` would restore, where the format
    /// stores one.
    pub fn default_manipulation(&self, identifier: &MetaIdentifier) -> Option<MetaManipulation> {
        let defaults = self.defaults.as_ref();
        Some(match identifier {
            MetaIdentifier::Eqp(id) => MetaManipulation::Eqp(*id, self.eqp.default_for(defaults, id)?),
            MetaIdentifier::Eqdp(id) => {
                MetaManipulation::Eqdp(*id, self.eqdp.default_for(defaults, id)?)
            }
            MetaIdentifier::Est(id) => MetaManipulation::Est(*id, self.est.default_for(defaults, id)?),
            MetaIdentifier::Gmp(id) => MetaManipulation::Gmp(*id, self.gmp.default_for(defaults, id)?),
            MetaIdentifier::Rsp(id) => MetaManipulation::Rsp(*id, self.rsp.default_for(defaults, id)?),
            MetaIdentifier::Imc(id) => MetaManipulation::Imc(*id, self.imc.default_for(defaults, id)?),
            MetaIdentifier::GlobalEqp(id) => {
                self.global_eqp.default_for(defaults, id)?;
                MetaManipulation::GlobalEqp(*id)
            }
            MetaIdentifier::Shp(id) => MetaManipulation::Shp(*id, self.shp.default_for(defaults, id)?),
            MetaIdentifier::Atr(id) => MetaManipulation::Atr(*id, self.atr.default_for(defaults, id)?),
        })
    }

    pub fn owner(&self, identifier: &MetaIdentifier) -> Option<ModKey> {
        self.owners.get(identifier).map(|(owner, _)| *owner)
    }

    pub fn manipulation(&self, identifier: &MetaIdentifier) -> Option<&MetaManipulation> {
        self.owners.get(identifier).map(|(_, manipulation)| manipulation)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &MetaIdentifier> {
        self.owners.keys()
    }

    /// Owned identifiers with their owners, in identifier order.
    pub fn ownership(&self) -> Vec<(MetaIdentifier, ModKey)> {
        self.owners
            .iter()
            .map(|(identifier, (owner, _))| (*identifier, *owner))
            .sorted()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl std::fmt::Debug for MetaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaCache")
            .field("collection", &self.collection)
            .field("space", &self.space)
            .field("manipulations", &self.owners.len())
            .field("dirty", &self.dirty)
            .field("imc_files", &self.imc.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::BaseTables;
    use crate::manipulation::{
        EqpIdentifier, GlobalEqpManipulation, GlobalEqpType, ImcEntry, ImcIdentifier,
    };
    use crate::sink::MemoryTableSink;
    use crate::tables::EqpTable;
    use crate::types::{EquipSlot, ObjectType, SecondaryId, Variant};

    const A: ModKey = ModKey::Persisted(0);
    const B: ModKey = ModKey::Persisted(1);

    fn defaults() -> Arc<dyn MetaDefaults> {
        let mut eqp = EqpTable::default();
        eqp.set(PrimaryId(1), EqpEntry::DEFAULT);
        let imc_path = imc_id(EquipSlot::Head).game_path().unwrap();
        Arc::new(
            BaseTables::new()
                .with_eqp(eqp)
                .with_imc_file(imc_path, ImcFile::new(0x1F, 1, ImcEntry::default())),
        )
    }

    fn visor_off() -> MetaManipulation {
        MetaManipulation::Eqp(
            EqpIdentifier {
                set_id: PrimaryId(1),
                slot: EquipSlot::Head,
            },
            EqpEntry::DEFAULT - EqpEntry::HEAD_USE_VISOR,
        )
    }

    fn imc_id(slot: EquipSlot) -> ImcIdentifier {
        ImcIdentifier {
            object_type: ObjectType::Equipment,
            primary_id: PrimaryId(1),
            secondary_id: SecondaryId(0),
            variant: Variant(1),
            slot,
        }
    }

    #[test]
    fn test_apply_is_idempotent_per_mod() {
        let mut cache = MetaCache::new("default", defaults(), TableSpace::Ready);
        assert!(cache.apply_mod(A, &visor_off()).unwrap());
        assert!(!cache.apply_mod(A, &visor_off()).unwrap());
        assert_eq!(cache.owner(&visor_off().identifier()), Some(A));
        assert!(!cache.eqp_entry(PrimaryId(1)).contains(EqpEntry::HEAD_USE_VISOR));

        // Another mod with the same value takes ownership but changes nothing.
        assert!(!cache.apply_mod(B, &visor_off()).unwrap());
        assert_eq!(cache.owner(&visor_off().identifier()), Some(B));
    }

    #[test]
    fn test_revert_restores_default_and_flushes() {
        let mut cache = MetaCache::new("default", defaults(), TableSpace::Ready);
        let mut sink = MemoryTableSink::new();

        cache.apply_mod(A, &visor_off()).unwrap();
        assert_eq!(cache.flush(&mut sink), 1);
        assert!(sink.get(TableKey::Eqp).is_some());
        assert_eq!(cache.flush(&mut sink), 0);

        assert_eq!(cache.revert_mod(&visor_off().identifier()), Some(A));
        assert!(cache.eqp_entry(PrimaryId(1)).contains(EqpEntry::HEAD_USE_VISOR));
        assert_eq!(cache.revert_mod(&visor_off().identifier()), None);

        cache.reset();
        cache.flush(&mut sink);
        assert!(sink.get(TableKey::Eqp).is_none());
    }

    #[test]
    fn test_pending_records_ownership_then_replays() {
        let mut cache = MetaCache::new("default", defaults(), TableSpace::Pending);
        assert!(!cache.apply_mod(A, &visor_off()).unwrap());
        assert_eq!(cache.owner(&visor_off().identifier()), Some(A));
        assert!(cache.eqp_entry(PrimaryId(1)).contains(EqpEntry::HEAD_USE_VISOR));
        assert!(!cache.has_dirty_tables());

        cache.mark_ready();
        assert!(!cache.eqp_entry(PrimaryId(1)).contains(EqpEntry::HEAD_USE_VISOR));
        assert!(cache.has_dirty_tables());
    }

    #[test]
    fn test_invalid_manipulation_is_not_recorded() {
        let mut cache = MetaCache::new("default", defaults(), TableSpace::Ready);
        let bad = MetaManipulation::Eqp(
            EqpIdentifier {
                set_id: PrimaryId(1),
                slot: EquipSlot::Neck,
            },
            EqpEntry::empty(),
        );
        assert!(cache.apply_mod(A, &bad).is_err());
        assert!(cache.is_empty());
        assert!(!cache.has_dirty_tables());
    }

    #[test]
    fn test_imc_publications_use_fresh_counters() {
        let mut cache = MetaCache::new("default", defaults(), TableSpace::Ready);
        let edit = |material| {
            MetaManipulation::Imc(
                imc_id(EquipSlot::Head),
                ImcEntry {
                    material_id: material,
                    ..ImcEntry::default()
                },
            )
        };

        cache.apply_mod(A, &edit(3)).unwrap();
        cache.apply_mod(A, &edit(4)).unwrap();
        let publications = cache.take_file_publications();
        assert_eq!(publications.len(), 2);
        let first = publications[0].payload.clone().unwrap();
        let second = publications[1].payload.clone().unwrap();
        assert_ne!(first, second);
        assert_eq!(second.to_string(), "|default_2|chara/equipment/e0001/e0001.imc");

        // Only the latest instance is served.
        assert!(cache.synthetic_file(first.as_synthetic().unwrap()).is_none());
        let bytes = cache.synthetic_file(second.as_synthetic().unwrap()).unwrap();
        let file = ImcFile::parse(&bytes).unwrap();
        assert_eq!(file.entry(Variant(1), 0).unwrap().material_id, 4);

        cache.revert_mod(&edit(4).identifier());
        let publications = cache.take_file_publications();
        assert_eq!(publications.len(), 1);
        assert_eq!(publications[0].payload, None);
    }

    #[test]
    fn test_global_eqp_folds_into_entries_and_table() {
        let mut cache = MetaCache::new("default", defaults(), TableSpace::Ready);
        let global = MetaManipulation::GlobalEqp(GlobalEqpManipulation {
            kind: GlobalEqpType::DoNotHideVieraHats,
            condition: PrimaryId(0),
        });
        assert!(cache.apply_mod(A, &global).unwrap());
        assert!(cache.eqp_entry(PrimaryId(1)).contains(EqpEntry::HEAD_SHOW_VIERA_HAT));
        assert!(cache.eqp_entry(PrimaryId(900)).contains(EqpEntry::HEAD_SHOW_VIERA_HAT));

        let bytes = cache.table_bytes(TableKey::Eqp).unwrap();
        let table = EqpTable::from_bytes(&bytes).unwrap();
        assert!(table.get(PrimaryId(1)).contains(EqpEntry::HEAD_SHOW_VIERA_HAT));
        assert_eq!(cache.modified_tables().len(), 1);
    }

    #[test]
    fn test_default_manipulation() {
        let cache = MetaCache::new("default", defaults(), TableSpace::Ready);
        let identifier = visor_off().identifier();
        let Some(MetaManipulation::Eqp(_, entry)) = cache.default_manipulation(&identifier) else {
            panic!("expected an Eqp default");
        };
        assert_eq!(entry, EqpEntry::DEFAULT & EqpEntry::HEAD_MASK);
    }
}
