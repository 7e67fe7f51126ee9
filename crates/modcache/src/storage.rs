//! In-process mod and collection storage.
//!
//! Persisted mods keep their index for their whole lifetime; removing one
//! leaves a hole so that keys held by caches never point at another mod.
//! Collection settings resolve through inheritance depth-first: a collection's
//! own settings win, then each inherited collection in list order, recursively.
//! Cycles are ignored.

use crate::context::ModContext;
use crate::error::{Error, Result};
use crate::model::{Mod, ModSettings};
use modcache_core::{CollectionId, ModKey};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct TemporaryMod {
    value: Arc<Mod>,
    /// `None` applies to every collection.
    scope: Option<CollectionId>,
}

#[derive(Debug, Default)]
pub struct ModStorage {
    persisted: Vec<Option<Arc<Mod>>>,
    temporary: BTreeMap<u32, TemporaryMod>,
    next_temporary: u32,
}

impl ModStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mod to the library and return its key.
    pub fn insert(&mut self, mut value: Mod) -> ModKey {
        let key = ModKey::Persisted(self.persisted.len());
        value.key = key;
        self.persisted.push(Some(Arc::new(value)));
        key
    }

    /// Add a temporary mod, optionally limited to one collection.
    pub fn insert_temporary(
        &mut self,
        mut value: Mod,
        priority: i32,
        scope: Option<CollectionId>,
    ) -> ModKey {
        let id = self.next_temporary;
        self.next_temporary += 1;
        let key = ModKey::Temporary { id, priority };
        value.key = key;
        self.temporary.insert(
            id,
            TemporaryMod {
                value: Arc::new(value),
                scope,
            },
        );
        key
    }

    /// Swap the contents of an existing mod, keeping its key.
    pub fn replace(&mut self, key: ModKey, mut value: Mod) -> Result<Arc<Mod>> {
        value.key = key;
        let value = Arc::new(value);
        let slot = match key {
            ModKey::Persisted(index) => self.persisted.get_mut(index).and_then(Option::as_mut),
            ModKey::Temporary { id, .. } => self.temporary.get_mut(&id).map(|t| &mut t.value),
            ModKey::Forced => None,
        };
        match slot {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(Error::UnknownMod(key)),
        }
    }

    pub fn remove(&mut self, key: ModKey) -> Option<Arc<Mod>> {
        match key {
            ModKey::Persisted(index) => self.persisted.get_mut(index)?.take(),
            ModKey::Temporary { id, .. } => self.temporary.remove(&id).map(|t| t.value),
            ModKey::Forced => None,
        }
    }

    pub fn get(&self, key: ModKey) -> Option<&Arc<Mod>> {
        match key {
            ModKey::Persisted(index) => self.persisted.get(index)?.as_ref(),
            ModKey::Temporary { id, .. } => self.temporary.get(&id).map(|t| &t.value),
            ModKey::Forced => None,
        }
    }

    /// Collection a temporary mod is limited to, `Some(None)` if it is global.
    pub fn temporary_scope(&self, key: ModKey) -> Option<Option<CollectionId>> {
        match key {
            ModKey::Temporary { id, .. } => self.temporary.get(&id).map(|t| t.scope),
            _ => None,
        }
    }

    pub fn persisted(&self) -> impl Iterator<Item = &Arc<Mod>> {
        self.persisted.iter().flatten()
    }

    pub fn temporary(&self) -> impl Iterator<Item = (&Arc<Mod>, Option<CollectionId>)> {
        self.temporary.values().map(|t| (&t.value, t.scope))
    }

    /// Number of persisted mods.
    pub fn len(&self) -> usize {
        self.persisted().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.temporary.is_empty()
    }
}

/// Settings of every mod for one named collection.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    settings: HashMap<usize, ModSettings>,
    inherits: Vec<CollectionId>,
}

impl Collection {
    /// Settings defined by this collection itself, ignoring inheritance.
    pub fn own_settings(&self, index: usize) -> Option<&ModSettings> {
        self.settings.get(&index)
    }

    pub fn inherits(&self) -> &[CollectionId] {
        &self.inherits
    }
}

#[derive(Debug, Default)]
pub struct CollectionStorage {
    collections: BTreeMap<CollectionId, Collection>,
    next_id: u32,
}

impl CollectionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, name: impl Into<String>) -> CollectionId {
        let id = CollectionId(self.next_id);
        self.next_id += 1;
        self.collections.insert(
            id,
            Collection {
                id,
                name: name.into(),
                settings: HashMap::new(),
                inherits: Vec::new(),
            },
        );
        id
    }

    pub fn get(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CollectionId> + '_ {
        self.collections.keys().copied()
    }

    fn get_mut(&mut self, id: CollectionId) -> Result<&mut Collection> {
        self.collections
            .get_mut(&id)
            .ok_or(Error::UnknownCollection(id))
    }

    /// Define a mod's settings in one collection, returning the previous ones.
    pub fn set_settings(
        &mut self,
        id: CollectionId,
        index: usize,
        settings: ModSettings,
    ) -> Result<Option<ModSettings>> {
        Ok(self.get_mut(id)?.settings.insert(index, settings))
    }

    /// Drop a collection's own settings so the mod inherits again.
    pub fn remove_settings(&mut self, id: CollectionId, index: usize) -> Result<Option<ModSettings>> {
        Ok(self.get_mut(id)?.settings.remove(&index))
    }

    pub fn set_inheritance(&mut self, id: CollectionId, inherits: Vec<CollectionId>) -> Result<()> {
        if let Some(missing) = inherits.iter().find(|i| !self.collections.contains_key(*i)) {
            return Err(Error::UnknownCollection(*missing));
        }
        self.get_mut(id)?.inherits = inherits;
        Ok(())
    }

    /// Effective settings of a mod and the collection that defines them.
    pub fn actual_settings(
        &self,
        id: CollectionId,
        index: usize,
    ) -> Option<(&ModSettings, CollectionId)> {
        let mut visited = HashSet::new();
        self.find_settings(id, index, &mut visited)
    }

    fn find_settings(
        &self,
        id: CollectionId,
        index: usize,
        visited: &mut HashSet<CollectionId>,
    ) -> Option<(&ModSettings, CollectionId)> {
        if !visited.insert(id) {
            return None;
        }
        let collection = self.collections.get(&id)?;
        if let Some(settings) = collection.settings.get(&index) {
            return Some((settings, id));
        }
        collection
            .inherits
            .iter()
            .find_map(|parent| self.find_settings(*parent, index, visited))
    }

    /// Every collection that inherits from `id`, directly or transitively.
    pub fn inheritors_of(&self, id: CollectionId) -> Vec<CollectionId> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(parent) = queue.pop_front() {
            for collection in self.collections.values() {
                if collection.inherits.contains(&parent) && seen.insert(collection.id) {
                    found.push(collection.id);
                    queue.push_back(collection.id);
                }
            }
        }
        found
    }
}

/// Mod library plus collections.
#[derive(Debug, Default)]
pub struct Storage {
    pub mods: ModStorage,
    pub collections: CollectionStorage,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The [`ModContext`] of one collection.
    pub fn view(&self, id: CollectionId) -> Result<CollectionView<'_>> {
        if self.collections.get(id).is_none() {
            return Err(Error::UnknownCollection(id));
        }
        Ok(CollectionView { storage: self, id })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionView<'a> {
    storage: &'a Storage,
    id: CollectionId,
}

impl CollectionView<'_> {
    pub fn id(&self) -> CollectionId {
        self.id
    }
}

impl ModContext for CollectionView<'_> {
    fn mod_by_key(&self, key: ModKey) -> Option<Arc<Mod>> {
        if let Some(scope) = self.storage.mods.temporary_scope(key) {
            if scope.is_some_and(|scope| scope != self.id) {
                return None;
            }
        }
        self.storage.mods.get(key).cloned()
    }

    fn settings(&self, index: usize) -> Option<ModSettings> {
        self.storage
            .collections
            .actual_settings(self.id, index)
            .map(|(settings, _)| settings.clone())
    }

    fn mods(&self) -> Vec<Arc<Mod>> {
        let temporary = self
            .storage
            .mods
            .temporary()
            .filter(|(_, scope)| scope.map_or(true, |scope| scope == self.id))
            .map(|(value, _)| value.clone());
        temporary
            .chain(self.storage.mods.persisted().cloned())
            .collect()
    }
}
