use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{EqpEntry, EqpIdentifier, GlobalEqpManipulation};
use crate::tables::EqpTable;
use crate::types::PrimaryId;
use std::collections::HashSet;

/// Private copy of the equipment parameter table.
#[derive(Debug, Default)]
pub(crate) struct EqpCache {
    table: Option<EqpTable>,
}

impl EqpCache {
    pub fn entry(&self, defaults: &dyn MetaDefaults, set_id: PrimaryId) -> EqpEntry {
        match &self.table {
            Some(table) => table.get(set_id),
            None => defaults.eqp().get(set_id),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.table.is_some()
    }

    /// Serialized table with global overrides folded in, `None` when nothing
    /// differs from the base table.
    pub fn table_bytes(
        &self,
        defaults: &dyn MetaDefaults,
        global: &GlobalEqpCache,
    ) -> Option<Vec<u8>> {
        if self.table.is_none() && global.is_empty() {
            return None;
        }
        let mut table = self
            .table
            .clone()
            .unwrap_or_else(|| defaults.eqp().clone());
        global.fold_into(&mut table);
        Some(table.to_bytes())
    }
}

impl SubCache for EqpCache {
    type Identifier = EqpIdentifier;
    type Entry = EqpEntry;

    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &EqpIdentifier,
        entry: &EqpEntry,
    ) -> Result<bool> {
        let table = self.table.get_or_insert_with(|| defaults.eqp().clone());
        let current = table.get(id.set_id);
        let merged = current.merged(*entry, id.slot);
        table.set(id.set_id, merged);
        Ok(merged != current)
    }

    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &EqpIdentifier) -> bool {
        let Some(table) = self.table.as_mut() else {
            return false;
        };
        let current = table.get(id.set_id);
        let restored = current.merged(defaults.eqp().get(id.set_id), id.slot);
        table.set(id.set_id, restored);
        restored != current
    }

    fn default_for(&self, defaults: &dyn MetaDefaults, id: &EqpIdentifier) -> Option<EqpEntry> {
        Some(defaults.eqp().get(id.set_id) & EqpEntry::mask(id.slot))
    }

    fn reset(&mut self) {
        self.table = None;
    }
}

/// Active global visibility overrides.
#[derive(Debug, Default)]
pub(crate) struct GlobalEqpCache {
    active: HashSet<GlobalEqpManipulation>,
}

impl GlobalEqpCache {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Effective record of a set with every applicable override.
    pub fn apply_to(&self, set_id: PrimaryId, entry: EqpEntry) -> EqpEntry {
        self.active
            .iter()
            .filter(|global| global.applies_to(set_id))
            .fold(entry, |entry, global| entry | global.kind.flags())
    }

    pub fn fold_into(&self, table: &mut EqpTable) {
        for global in &self.active {
            if global.condition.0 == 0 {
                for set_id in 0..table.len() {
                    let set_id = PrimaryId(set_id as u16);
                    table.set(set_id, table.get(set_id) | global.kind.flags());
                }
            } else {
                let set_id = global.condition;
                table.set(set_id, table.get(set_id) | global.kind.flags());
            }
        }
    }
}

impl SubCache for GlobalEqpCache {
    type Identifier = GlobalEqpManipulation;
    type Entry = ();

    fn apply(
        &mut self,
        _defaults: &dyn MetaDefaults,
        id: &GlobalEqpManipulation,
        _entry: &(),
    ) -> Result<bool> {
        Ok(self.active.insert(*id))
    }

    fn revert(&mut self, _defaults: &dyn MetaDefaults, id: &GlobalEqpManipulation) -> bool {
        self.active.remove(id)
    }

    fn default_for(&self, _defaults: &dyn MetaDefaults, _id: &GlobalEqpManipulation) -> Option<()> {
        None
    }

    fn reset(&mut self) {
        self.active.clear();
    }
}
