use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::{MetaError, Result};
use crate::manipulation::{ImcEntry, ImcFile, ImcIdentifier};
use modcache_core::VirtualPath;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
struct EditedFile {
    file: ImcFile,
    edits: HashSet<ImcIdentifier>,
}

/// Edited copies of per-instance files, keyed by game path.
#[derive(Debug, Default)]
pub(crate) struct ImcCache {
    files: HashMap<VirtualPath, EditedFile>,
}

impl ImcCache {
    pub fn file(&self, path: &VirtualPath) -> Option<&ImcFile> {
        self.files.get(path).map(|edited| &edited.file)
    }

    pub fn paths(&self) -> impl Iterator<Item = &VirtualPath> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl SubCache for ImcCache {
    type Identifier = ImcIdentifier;
    type Entry = ImcEntry;

    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &ImcIdentifier,
        entry: &ImcEntry,
    ) -> Result<bool> {
        let edited = match self.files.entry(id.game_path()?) {
            MapEntry::Occupied(occupied) => {
                id.validate_against(&occupied.get().file)?;
                occupied.into_mut()
            }
            MapEntry::Vacant(vacant) => {
                let default = defaults
                    .imc_file(vacant.key())
                    .ok_or_else(|| MetaError::MissingImcFile(vacant.key().clone()))?;
                id.validate_against(default)?;
                vacant.insert(EditedFile {
                    file: default.clone(),
                    edits: HashSet::new(),
                })
            }
        };

        let changed = edited.file.set_entry(id.variant, id.part_bit(), *entry);
        edited.edits.insert(*id);
        Ok(changed)
    }

    /// Drops the file once its last edit is reverted; the caller detects that
    /// through [`ImcCache::file`].
    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &ImcIdentifier) -> bool {
        let Ok(path) = id.game_path() else {
            return false;
        };
        let default = self.default_for(defaults, id);
        let Some(edited) = self.files.get_mut(&path) else {
            return false;
        };
        if !edited.edits.remove(id) {
            return false;
        }
        if edited.edits.is_empty() {
            self.files.remove(&path);
            return true;
        }
        default.is_some_and(|default| edited.file.set_entry(id.variant, id.part_bit(), default))
    }

    fn default_for(&self, defaults: &dyn MetaDefaults, id: &ImcIdentifier) -> Option<ImcEntry> {
        defaults
            .imc_file(&id.game_path().ok()?)?
            .entry(id.variant, id.part_bit())
    }

    fn reset(&mut self) {
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::BaseTables;
    use crate::types::{EquipSlot, ObjectType, PrimaryId, SecondaryId, Variant};

    fn id(slot: EquipSlot) -> ImcIdentifier {
        ImcIdentifier {
            object_type: ObjectType::Equipment,
            primary_id: PrimaryId(1),
            secondary_id: SecondaryId(0),
            variant: Variant(1),
            slot,
        }
    }

    fn entry(material: u8) -> ImcEntry {
        ImcEntry {
            material_id: material,
            ..ImcEntry::default()
        }
    }

    fn defaults() -> BaseTables {
        BaseTables::new().with_imc_file(
            id(EquipSlot::Head).game_path().unwrap(),
            ImcFile::new(0x1F, 2, entry(1)),
        )
    }

    #[test]
    fn test_file_lifecycle() {
        let defaults = defaults();
        let mut cache = ImcCache::default();
        let path = id(EquipSlot::Head).game_path().unwrap();

        assert!(cache.apply(&defaults, &id(EquipSlot::Head), &entry(5)).unwrap());
        assert!(cache.apply(&defaults, &id(EquipSlot::Feet), &entry(6)).unwrap());
        assert_eq!(cache.len(), 1);

        assert!(cache.revert(&defaults, &id(EquipSlot::Head)));
        let file = cache.file(&path).unwrap();
        assert_eq!(file.entry(Variant(1), EquipSlot::Head.position()), Some(entry(1)));
        assert_eq!(file.entry(Variant(1), EquipSlot::Feet.position()), Some(entry(6)));

        assert!(cache.revert(&defaults, &id(EquipSlot::Feet)));
        assert!(cache.file(&path).is_none());
    }

    #[test]
    fn test_missing_default_file() {
        let mut cache = ImcCache::default();
        let err = cache
            .apply(&BaseTables::new(), &id(EquipSlot::Body), &entry(2))
            .unwrap_err();
        assert!(matches!(err, MetaError::MissingImcFile(_)));
        assert_eq!(cache.len(), 0);
    }
}
