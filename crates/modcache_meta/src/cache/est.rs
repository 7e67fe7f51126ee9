use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{EstEntry, EstIdentifier};
use crate::tables::EstTable;
use crate::types::{EstType, GenderRace, PrimaryId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct EstCache {
    tables: HashMap<EstType, EstTable>,
}

impl EstCache {
    pub fn entry(
        &self,
        defaults: &dyn MetaDefaults,
        kind: EstType,
        gender_race: GenderRace,
        set_id: PrimaryId,
    ) -> EstEntry {
        self.tables
            .get(&kind)
            .unwrap_or_else(|| defaults.est(kind))
            .get(gender_race, set_id)
    }

    pub fn modified_tables(&self) -> impl Iterator<Item = EstType> + '_ {
        self.tables.keys().copied()
    }

    pub fn table_bytes(&self, kind: EstType) -> Option<Vec<u8>> {
        self.tables.get(&kind).map(EstTable::to_bytes)
    }
}

impl SubCache for EstCache {
    type Identifier = EstIdentifier;
    type Entry = EstEntry;

    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &EstIdentifier,
        entry: &EstEntry,
    ) -> Result<bool> {
        let table = self
            .tables
            .entry(id.slot)
            .or_insert_with(|| defaults.est(id.slot).clone());
        let current = table.get(id.gender_race, id.set_id);
        table.set(id.gender_race, id.set_id, *entry);
        Ok(current != *entry)
    }

    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &EstIdentifier) -> bool {
        let Some(table) = self.tables.get_mut(&id.slot) else {
            return false;
        };
        let current = table.get(id.gender_race, id.set_id);
        // An absent default removes the entry again.
        let default = defaults.est(id.slot).get(id.gender_race, id.set_id);
        table.set(id.gender_race, id.set_id, default);
        current != default
    }

    fn default_for(&self, defaults: &dyn MetaDefaults, id: &EstIdentifier) -> Option<EstEntry> {
        Some(defaults.est(id.slot).get(id.gender_race, id.set_id))
    }

    fn reset(&mut self) {
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::BaseTables;

    #[test]
    fn test_revert_removes_added_entry() {
        let mut base = EstTable::default();
        base.set(GenderRace::ElezenMale, PrimaryId(3), EstEntry(12));
        let defaults = BaseTables::new().with_est(EstType::Hair, base.clone());

        let id = EstIdentifier {
            set_id: PrimaryId(8),
            slot: EstType::Hair,
            gender_race: GenderRace::ElezenMale,
        };
        let mut cache = EstCache::default();
        assert!(cache.apply(&defaults, &id, &EstEntry(40)).unwrap());
        assert!(!cache.apply(&defaults, &id, &EstEntry(40)).unwrap());
        assert_eq!(
            cache.entry(&defaults, EstType::Hair, GenderRace::ElezenMale, PrimaryId(8)),
            EstEntry(40)
        );

        assert!(cache.revert(&defaults, &id));
        let bytes = cache.table_bytes(EstType::Hair).unwrap();
        assert_eq!(bytes, base.to_bytes());
        assert!(cache.table_bytes(EstType::Face).is_none());
    }
}
