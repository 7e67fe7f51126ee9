use super::SubCache;
use crate::defaults::MetaDefaults;
use crate::error::Result;
use crate::manipulation::{EqdpEntry, EqdpIdentifier};
use crate::tables::EqdpTable;
use crate::types::{GenderRace, PrimaryId};
use std::collections::HashMap;

type EqdpKey = (PrimaryId, GenderRace, bool);

/// Partial deformation records.
///
/// Per record the cache keeps the accumulated claimed bits and an inverse
/// mask of the bits nobody claims. The effective record is
/// `(original & inverse) | accumulated`, so mods editing different slots of
/// the same record compose and each one reverts independently.
#[derive(Debug, Default)]
pub(crate) struct EqdpCache {
    entries: HashMap<EqdpKey, (EqdpEntry, EqdpEntry)>,
}

fn original(defaults: &dyn MetaDefaults, key: EqdpKey) -> EqdpEntry {
    let (set_id, gender_race, accessory) = key;
    defaults
        .eqdp(gender_race, accessory)
        .map(|table| table.get(set_id))
        .unwrap_or(EqdpEntry::empty())
}

fn key_of(id: &EqdpIdentifier) -> EqdpKey {
    (id.set_id, id.gender_race, id.accessory())
}

impl EqdpCache {
    pub fn entry(
        &self,
        defaults: &dyn MetaDefaults,
        set_id: PrimaryId,
        gender_race: GenderRace,
        accessory: bool,
    ) -> EqdpEntry {
        let key = (set_id, gender_race, accessory);
        let original = original(defaults, key);
        match self.entries.get(&key) {
            Some((acc, inv)) => (original & *inv) | *acc,
            None => original,
        }
    }

    /// Tables with at least one partial record.
    pub fn modified_tables(&self) -> impl Iterator<Item = (GenderRace, bool)> + '_ {
        self.entries.keys().map(|(_, gr, acc)| (*gr, *acc))
    }

    pub fn table_bytes(
        &self,
        defaults: &dyn MetaDefaults,
        gender_race: GenderRace,
        accessory: bool,
    ) -> Option<Vec<u8>> {
        let mut touched = self
            .entries
            .keys()
            .filter(|(_, gr, acc)| *gr == gender_race && *acc == accessory)
            .peekable();
        touched.peek()?;

        let mut table = defaults
            .eqdp(gender_race, accessory)
            .cloned()
            .unwrap_or_else(EqdpTable::default);
        for &(set_id, _, _) in touched {
            table.set(set_id, self.entry(defaults, set_id, gender_race, accessory));
        }
        Some(table.to_bytes())
    }
}

impl SubCache for EqdpCache {
    type Identifier = EqdpIdentifier;
    type Entry = EqdpEntry;

    fn apply(
        &mut self,
        defaults: &dyn MetaDefaults,
        id: &EqdpIdentifier,
        entry: &EqdpEntry,
    ) -> Result<bool> {
        let key = key_of(id);
        let before = self.entry(defaults, id.set_id, id.gender_race, id.accessory());
        let mask = EqdpEntry::mask(id.slot);

        let (acc, inv) = self
            .entries
            .entry(key)
            .or_insert((EqdpEntry::empty(), EqdpEntry::FULL_MASK));
        *acc = (*acc & !mask) | (*entry & mask);
        *inv &= !mask;

        Ok(before != self.entry(defaults, id.set_id, id.gender_race, id.accessory()))
    }

    fn revert(&mut self, defaults: &dyn MetaDefaults, id: &EqdpIdentifier) -> bool {
        let key = key_of(id);
        let before = self.entry(defaults, id.set_id, id.gender_race, id.accessory());
        let mask = EqdpEntry::mask(id.slot);

        let Some((acc, inv)) = self.entries.get_mut(&key) else {
            return false;
        };
        *inv |= mask;
        if *inv == EqdpEntry::FULL_MASK {
            self.entries.remove(&key);
        } else {
            *acc &= !mask;
        }

        before != self.entry(defaults, id.set_id, id.gender_race, id.accessory())
    }

    fn default_for(&self, defaults: &dyn MetaDefaults, id: &EqdpIdentifier) -> Option<EqdpEntry> {
        Some(original(defaults, key_of(id)) & EqdpEntry::mask(id.slot))
    }

    fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::BaseTables;
    use crate::types::EquipSlot;
    use proptest::prelude::*;

    const GR: GenderRace = GenderRace::HighlanderFemale;

    fn base() -> BaseTables {
        let mut table = EqdpTable::default();
        table.set(PrimaryId(5), EqdpEntry::from_bits_truncate(0b01_01_01_01_01));
        BaseTables::new().with_eqdp(GR, false, table)
    }

    fn id(slot: EquipSlot) -> EqdpIdentifier {
        EqdpIdentifier {
            set_id: PrimaryId(5),
            slot,
            gender_race: GR,
        }
    }

    #[test]
    fn test_disjoint_slots_compose_and_revert() {
        let defaults = base();
        let mut cache = EqdpCache::default();
        let read = |cache: &EqdpCache| cache.entry(&defaults, PrimaryId(5), GR, false).bits();

        cache
            .apply(&defaults, &id(EquipSlot::Head), &EqdpEntry::from_slot(EquipSlot::Head, false, true))
            .unwrap();
        cache
            .apply(&defaults, &id(EquipSlot::Feet), &EqdpEntry::from_slot(EquipSlot::Feet, true, true))
            .unwrap();
        assert_eq!(read(&cache), 0b11_01_01_01_10);

        assert!(cache.revert(&defaults, &id(EquipSlot::Head)));
        assert_eq!(read(&cache), 0b11_01_01_01_01);

        assert!(cache.revert(&defaults, &id(EquipSlot::Feet)));
        assert_eq!(read(&cache), 0b01_01_01_01_01);
        assert!(cache.entries.is_empty());
        assert!(cache.table_bytes(&defaults, GR, false).is_none());
    }

    #[test]
    fn test_revert_without_claim_is_noop() {
        let defaults = base();
        let mut cache = EqdpCache::default();
        assert!(!cache.revert(&defaults, &id(EquipSlot::Body)));
    }

    #[test]
    fn test_bits_outside_slot_are_ignored() {
        let defaults = base();
        let mut cache = EqdpCache::default();
        cache
            .apply(&defaults, &id(EquipSlot::Body), &EqdpEntry::FULL_MASK)
            .unwrap();
        assert_eq!(
            cache.entry(&defaults, PrimaryId(5), GR, false).bits(),
            0b01_01_01_11_01
        );
    }

    fn slot() -> impl Strategy<Value = EquipSlot> {
        (0usize..5).prop_map(|i| EquipSlot::ALL[i])
    }

    proptest! {
        #[test]
        fn prop_disjoint_applies_commute(
            a in slot(), b in slot(), va in 0u16..4, vb in 0u16..4,
        ) {
            prop_assume!(a != b);
            let defaults = base();
            let ea = EqdpEntry::from_bits_truncate(va << (2 * a.position()));
            let eb = EqdpEntry::from_bits_truncate(vb << (2 * b.position()));

            let mut ab = EqdpCache::default();
            ab.apply(&defaults, &id(a), &ea).unwrap();
            ab.apply(&defaults, &id(b), &eb).unwrap();

            let mut ba = EqdpCache::default();
            ba.apply(&defaults, &id(b), &eb).unwrap();
            ba.apply(&defaults, &id(a), &ea).unwrap();

            prop_assert_eq!(
                ab.entry(&defaults, PrimaryId(5), GR, false),
                ba.entry(&defaults, PrimaryId(5), GR, false)
            );

            ab.revert(&defaults, &id(a));
            ab.revert(&defaults, &id(b));
            prop_assert_eq!(
                ab.entry(&defaults, PrimaryId(5), GR, false),
                original(&defaults, (PrimaryId(5), GR, false))
            );
            prop_assert!(ab.entries.is_empty());
        }
    }
}
