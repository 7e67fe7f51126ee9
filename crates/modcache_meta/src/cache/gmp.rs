use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{GmpEntry, GmpIdentifier};
use crate::tables::GmpTable;
use crate::types::PrimaryId;

#[derive(Debug, Default)]
pub(crate) struct GmpCache {
    table: Option<GmpTable>,
}

impl GmpCache {
    pub fn entry(&self, defaults: &dyn MetaDefaults, set_id: PrimaryId) -> GmpEntry {
        self.table.as_ref().unwrap_or_else(|| defaults.gmp()).get(set_id)
    }

    pub fn table_bytes(&self) -> Option<Vec<u8>> {
        self.table.as_ref().map(GmpTable::to_bytes)
    }
}

impl SubCache for GmpCache {
    type Identifier = GmpIdentifier;
    type Entry = GmpEntry;

    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &GmpIdentifier,
        entry: &GmpEntry,
    ) -> Result<bool> {
        let table = self.table.get_or_insert_with(|| defaults.gmp().clone());
        let current = table.get(id.set_id);
        table.set(id.set_id, *entry);
        Ok(current != *entry)
    }

    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &GmpIdentifier) -> bool {
        let Some(table) = self.table.as_mut() else {
            return false;
        };
        let current = table.get(id.set_id);
        let default = defaults.gmp().get(id.set_id);
        table.set(id.set_id, default);
        current != default
    }

    fn default_for(&self, defaults: &dyn MetaDefaults, id: &GmpIdentifier) -> Option<GmpEntry> {
        Some(defaults.gmp().get(id.set_id))
    }

    fn reset(&mut self) {
        self.table = None;
    }
}
