use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{
    AtrEntry, AtrIdentifier, ShapeAttributeName, ShapeConnectorCondition, ShpEntry, ShpIdentifier,
};
use crate::override_table::{OverrideTable, TriState};
use crate::types::{GenderRace, HumanSlot, PrimaryId};
use std::collections::HashMap;

/// Shape toggles, one override table per (connector, shape).
#[derive(Debug, Default)]
pub(crate) struct ShpCache {
    tables: HashMap<(ShapeConnectorCondition, ShapeAttributeName), OverrideTable>,
    enabled: usize,
}

impl ShpCache {
    pub fn state(
        &self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        shape: &ShapeAttributeName,
        gender_race: GenderRace,
        connector: ShapeConnectorCondition,
    ) -> TriState {
        self.tables
            .get(&(connector, *shape))
            .map_or(TriState::Inherit, |table| table.get(slot, id, gender_race))
    }

    /// Number of stored "enabled" definitions across all shapes.
    pub fn enabled_count(&self) -> usize {
        self.enabled
    }

    fn write(&mut self, id: &ShpIdentifier, value: TriState) -> Result<bool> {
        let table = self.tables.entry((id.connector, id.shape)).or_default();
        let before = table.on_count();
        let outcome = table.set(id.slot, id.id, id.gender_race, value)?;
        self.enabled = self.enabled + table.on_count() - before;
        if table.is_empty() {
            self.tables.remove(&(id.connector, id.shape));
        }
        Ok(outcome.effective_changed)
    }
}

impl SubCache for ShpCache {
    type Identifier = ShpIdentifier;
    type Entry = ShpEntry;

    fn apply(&mut self, _defaults: &dyn MetaDefaults, id: &ShpIdentifier, entry: &ShpEntry) -> Result<bool> {
        self.write(id, TriState::from_bool(entry.0))
    }

    fn revert(&mut self, _defaults: &dyn MetaDefaults, id: &ShpIdentifier) -> bool {
        if !self.tables.contains_key(&(id.connector, id.shape)) {
            return false;
        }
        self.write(id, TriState::Inherit).unwrap_or(false)
    }

    /// Overrides have no stored default; absence means "inherit".
    fn default_for(&self, _defaults: &dyn MetaDefaults, _id: &ShpIdentifier) -> Option<ShpEntry> {
        None
    }

    fn reset(&mut self) {
        self.tables.clear();
        self.enabled = 0;
    }
}

/// Attribute toggles, one override table per attribute.
#[derive(Debug, Default)]
pub(crate) struct AtrCache {
    tables: HashMap<ShapeAttributeName, OverrideTable>,
    disabled: usize,
}

impl AtrCache {
    pub fn state(
        &self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        attribute: &ShapeAttributeName,
        gender_race: GenderRace,
    ) -> TriState {
        self.tables
            .get(attribute)
            .map_or(TriState::Inherit, |table| table.get(slot, id, gender_race))
    }

    /// Number of stored "disabled" definitions across all attributes.
    pub fn disabled_count(&self) -> usize {
        self.disabled
    }

    fn write(&mut self, id: &AtrIdentifier, value: TriState) -> Result<bool> {
        let table = self.tables.entry(id.attribute).or_default();
        let before = table.off_count();
        let outcome = table.set(id.slot, id.id, id.gender_race, value)?;
        self.disabled = self.disabled + table.off_count() - before;
        if table.is_empty() {
            self.tables.remove(&id.attribute);
        }
        Ok(outcome.effective_changed)
    }
}

impl SubCache for AtrCache {
    type Identifier = AtrIdentifier;
    type Entry = AtrEntry;

    fn apply(&mut self, _defaults: &dyn MetaDefaults, id: &AtrIdentifier, entry: &AtrEntry) -> Result<bool> {
        self.write(id, TriState::from_bool(entry.0))
    }

    fn revert(&mut self, _defaults: &dyn MetaDefaults, id: &AtrIdentifier) -> bool {
        if !self.tables.contains_key(&id.attribute) {
            return false;
        }
        self.write(id, TriState::Inherit).unwrap_or(false)
    }

    fn default_for(&self, _defaults: &dyn MetaDefaults, _id: &AtrIdentifier) -> Option<AtrEntry> {
        None
    }

    fn reset(&mut self) {
        self.tables.clear();
        self.disabled = 0;
    }
}
