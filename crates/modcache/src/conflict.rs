//! Pairwise conflict bookkeeping.
//!
//! Every unordered pair of mods that contest at least one resource shares a
//! single [`ConflictRecord`] stored in a [`ConflictTable`] arena. Both mods
//! index the record by its [`ConflictId`], so an edit made while walking one
//! mod's conflicts is visible from the other side.

use modcache_core::{ModKey, VirtualPath};
use modcache_meta::MetaIdentifier;
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Stable handle of a record in a [`ConflictTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConflictId(pub usize);

/// A resource two mods both claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictResource {
    Path(VirtualPath),
    Meta(MetaIdentifier),
}

impl fmt::Display for ConflictResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictResource::Path(path) => write!(f, "{}", path),
            ConflictResource::Meta(identifier) => write!(f, "{}", identifier),
        }
    }
}

impl Serialize for ConflictResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    mods: [ModKey; 2],
    resources: Vec<ConflictResource>,
    has_priority: [bool; 2],
    solved: bool,
}

impl ConflictRecord {
    /// A record for `added` contesting `existing`'s first shared resource.
    pub fn new(added: ModKey, existing: ModKey, added_wins: bool, solved: bool) -> Self {
        Self {
            mods: [added, existing],
            resources: Vec::new(),
            has_priority: [added_wins, !added_wins],
            solved,
        }
    }

    pub fn mods(&self) -> [ModKey; 2] {
        self.mods
    }

    fn side(&self, key: ModKey) -> Option<usize> {
        self.mods.iter().position(|m| *m == key)
    }

    pub fn involves(&self, key: ModKey) -> bool {
        self.side(key).is_some()
    }

    pub fn partner_of(&self, key: ModKey) -> Option<ModKey> {
        self.side(key).map(|side| self.mods[1 - side])
    }

    /// Whether `key` beats its partner in this record.
    pub fn has_priority(&self, key: ModKey) -> bool {
        self.side(key).is_some_and(|side| self.has_priority[side])
    }

    /// `false` when both mods have the same priority and the earlier claim was kept.
    pub fn solved(&self) -> bool {
        self.solved
    }

    pub fn resources(&self) -> &[ConflictResource] {
        &self.resources
    }

    pub fn contains(&self, resource: &ConflictResource) -> bool {
        self.resources.contains(resource)
    }

    /// Append a resource unless it is already listed.
    pub fn push(&mut self, resource: ConflictResource) -> bool {
        if self.contains(&resource) {
            return false;
        }
        self.resources.push(resource);
        true
    }

    pub fn remove(&mut self, resource: &ConflictResource) -> bool {
        let before = self.resources.len();
        self.resources.retain(|r| r != resource);
        self.resources.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Arena of conflict records, indexed from both mods.
#[derive(Debug, Default)]
pub struct ConflictTable {
    records: Vec<Option<ConflictRecord>>,
    free: Vec<usize>,
    by_mod: HashMap<ModKey, BTreeSet<ConflictId>>,
}

impl ConflictTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record shared by two mods, in either order.
    pub fn find(&self, a: ModKey, b: ModKey) -> Option<ConflictId> {
        self.by_mod.get(&a)?.iter().copied().find(|id| {
            self.get(*id)
                .is_some_and(|record| record.partner_of(a) == Some(b))
        })
    }

    pub fn insert(&mut self, record: ConflictRecord) -> ConflictId {
        let mods = record.mods();
        let id = match self.free.pop() {
            Some(index) => {
                self.records[index] = Some(record);
                ConflictId(index)
            }
            None => {
                self.records.push(Some(record));
                ConflictId(self.records.len() - 1)
            }
        };
        for key in mods {
            self.by_mod.entry(key).or_default().insert(id);
        }
        id
    }

    pub fn get(&self, id: ConflictId) -> Option<&ConflictRecord> {
        self.records.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: ConflictId) -> Option<&mut ConflictRecord> {
        self.records.get_mut(id.0)?.as_mut()
    }

    /// Ids of every record a mod takes part in.
    pub fn of_mod(&self, key: ModKey) -> Vec<ConflictId> {
        self.by_mod
            .get(&key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, id: ConflictId) -> Option<ConflictRecord> {
        let record = self.records.get_mut(id.0)?.take()?;
        for key in record.mods() {
            if let Some(ids) = self.by_mod.get_mut(&key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_mod.remove(&key);
                }
            }
        }
        self.free.push(id.0);
        Some(record)
    }

    /// Remove every record of a mod from both sides.
    pub fn detach_mod(&mut self, key: ModKey) -> Vec<ConflictRecord> {
        self.of_mod(key)
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// Remove the records of a mod whose resource lists became empty.
    pub fn drop_empty(&mut self, key: ModKey) {
        for id in self.of_mod(key) {
            if self.get(id).is_some_and(ConflictRecord::is_empty) {
                self.remove(id);
            }
        }
    }

    /// Conflicts of one mod, as seen from that mod.
    pub fn views(&self, key: ModKey) -> Vec<ModConflicts> {
        self.of_mod(key)
            .into_iter()
            .filter_map(|id| {
                let record = self.get(id)?;
                Some(ModConflicts {
                    id,
                    mod_key: key,
                    partner: record.partner_of(key)?,
                    has_priority: record.has_priority(key),
                    solved: record.solved(),
                    resources: record.resources().to_vec(),
                })
            })
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = (ConflictId, &ConflictRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| Some((ConflictId(index), record.as_ref()?)))
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.free.clear();
        self.by_mod.clear();
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One conflict record from the point of view of one of its mods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModConflicts {
    pub id: ConflictId,
    pub mod_key: ModKey,
    pub partner: ModKey,
    pub has_priority: bool,
    pub solved: bool,
    pub resources: Vec<ConflictResource>,
}
