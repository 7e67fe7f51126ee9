use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{RspEntry, RspIdentifier};
use crate::tables::RspTable;
use crate::types::{RspAttribute, SubRace};

#[derive(Debug, Default)]
pub(crate) struct RspCache {
    table: Option<RspTable>,
}

impl RspCache {
    pub fn value(
        &self,
        defaults: &dyn MetaDefaults,
        sub_race: SubRace,
        attribute: RspAttribute,
    ) -> RspEntry {
        self.table
            .as_ref()
            .unwrap_or_else(|| defaults.rsp())
            .get(sub_race, attribute)
    }

    pub fn table_bytes(&self) -> Option<Vec<u8>> {
        self.table.as_ref().map(RspTable::to_bytes)
    }
}

impl SubCache for RspCache {
    type Identifier = RspIdentifier;
    type Entry = RspEntry;

    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &RspIdentifier,
        entry: &RspEntry,
    ) -> Result<bool> {
        entry.validate()?;
        let table = self.table.get_or_insert_with(|| defaults.rsp().clone());
        let current = table.get(id.sub_race, id.attribute);
        table.set(id.sub_race, id.attribute, *entry);
        Ok(current != *entry)
    }

    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &RspIdentifier) -> bool {
        let Some(table) = self.table.as_mut() else {
            return false;
        };
        let current = table.get(id.sub_race, id.attribute);
        let default = defaults.rsp().get(id.sub_race, id.attribute);
        table.set(id.sub_race, id.attribute, default);
        current != default
    }

    fn default_for(&self, defaults: &dyn MetaDefaults, id: &RspIdentifier) -> Option<RspEntry> {
        Some(defaults.rsp().get(id.sub_race, id.attribute))
    }

    fn reset(&mut self) {
        self.table = None;
    }
}
