//! Hierarchical tri-state override table.
//!
//! Values are keyed by (slot, instance id, gender/race) where the slot, the
//! instance and the gender/race may each be a wildcard. Each stored word packs
//! two bits per gender/race index: a "defined" bit and a value bit.
//!
//! A lookup walks from the most to the least specific definition:
//!
//! 1. exact (slot, id) at the gender/race
//! 2. exact (slot, id) at any gender/race
//! 3. every instance of the slot at the gender/race
//! 4. every instance of every slot at the gender/race
//! 5. every instance of the slot at any gender/race
//! 6. every instance of every slot at any gender/race

use crate::error::{MetaError, Result};
use crate::types::{GenderRace, HumanSlot, PrimaryId};
use std::collections::HashMap;

/// Stored override value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriState {
    #[default]
    Inherit,
    On,
    Off,
}

impl TriState {
    pub fn from_bool(value: bool) -> Self {
        if value {
            TriState::On
        } else {
            TriState::Off
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            TriState::Inherit => None,
            TriState::On => Some(true),
            TriState::Off => Some(false),
        }
    }

    fn read(word: u64, gender_race: GenderRace) -> Self {
        let shift = 2 * gender_race.index();
        match (word >> shift) & 0b11 {
            0b01 => TriState::Off,
            0b11 => TriState::On,
            _ => TriState::Inherit,
        }
    }

    fn write(self, word: u64, gender_race: GenderRace) -> u64 {
        let shift = 2 * gender_race.index();
        let bits = match self {
            TriState::Inherit => 0b00,
            TriState::Off => 0b01,
            TriState::On => 0b11,
        };
        (word & !(0b11 << shift)) | (bits << shift)
    }
}

/// Result of [`OverrideTable::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOutcome {
    /// Value stored at exactly the written key before the write.
    pub previous: TriState,
    /// Whether the resolved value at the written key changed.
    pub effective_changed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    exact: HashMap<(HumanSlot, PrimaryId), u64>,
    all: [u64; HumanSlot::MODEL_COUNT + 1],
    on: usize,
    off: usize,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the effective value for a lookup key.
    pub fn get(&self, slot: HumanSlot, id: Option<PrimaryId>, gender_race: GenderRace) -> TriState {
        let any = GenderRace::Unknown;

        if let Some(id) = id {
            if let Some(&word) = self.exact.get(&(slot, id)) {
                for condition in [gender_race, any] {
                    let value = TriState::read(word, condition);
                    if value != TriState::Inherit {
                        return value;
                    }
                }
            }
        }

        let slot_word = self.all[slot.index()];
        let any_word = self.all[HumanSlot::Unknown.index()];
        [
            (slot_word, gender_race),
            (any_word, gender_race),
            (slot_word, any),
            (any_word, any),
        ]
        .into_iter()
        .map(|(word, condition)| TriState::read(word, condition))
        .find(|value| *value != TriState::Inherit)
        .unwrap_or(TriState::Inherit)
    }

    /// Store `value` at exactly the given key.
    pub fn set(
        &mut self,
        slot: HumanSlot,
        id: Option<PrimaryId>,
        gender_race: GenderRace,
        value: TriState,
    ) -> Result<SetOutcome> {
        if id.is_some() && slot.is_any() {
            return Err(MetaError::InvalidOverrideKey {
                slot,
                reason: "a specific instance needs a specific slot",
            });
        }

        let before = self.get(slot, id, gender_race);
        let previous = match id {
            Some(id) => {
                let word = self.exact.entry((slot, id)).or_default();
                let previous = TriState::read(*word, gender_race);
                *word = value.write(*word, gender_race);
                if *word == 0 {
                    self.exact.remove(&(slot, id));
                }
                previous
            }
            None => {
                let word = &mut self.all[slot.index()];
                let previous = TriState::read(*word, gender_race);
                *word = value.write(*word, gender_race);
                previous
            }
        };

        self.count(previous, false);
        self.count(value, true);

        Ok(SetOutcome {
            previous,
            effective_changed: before != self.get(slot, id, gender_race),
        })
    }

    fn count(&mut self, value: TriState, add: bool) {
        let counter = match value {
            TriState::On => &mut self.on,
            TriState::Off => &mut self.off,
            TriState::Inherit => return,
        };
        if add {
            *counter += 1;
        } else {
            *counter -= 1;
        }
    }

    /// Number of stored `On` definitions.
    pub fn on_count(&self) -> usize {
        self.on
    }

    /// Number of stored `Off` definitions.
    pub fn off_count(&self) -> usize {
        self.off
    }

    pub fn is_empty(&self) -> bool {
        self.on == 0 && self.off == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const R: GenderRace = GenderRace::MiqoteFemale;

    #[test]
    fn test_exact_beats_slot_wide() {
        let mut table = OverrideTable::new();
        table
            .set(HumanSlot::Head, None, GenderRace::Unknown, TriState::Off)
            .unwrap();
        table
            .set(HumanSlot::Head, Some(PrimaryId(42)), R, TriState::On)
            .unwrap();

        assert_eq!(table.get(HumanSlot::Head, Some(PrimaryId(42)), R), TriState::On);
        assert_eq!(table.get(HumanSlot::Head, Some(PrimaryId(43)), R), TriState::Off);
        assert_eq!(
            table.get(HumanSlot::Head, Some(PrimaryId(42)), GenderRace::MidlanderMale),
            TriState::Off
        );
        assert_eq!(table.get(HumanSlot::Body, Some(PrimaryId(42)), R), TriState::Inherit);
    }

    #[test]
    fn test_condition_beats_category_wildcard() {
        let mut table = OverrideTable::new();
        // Any slot at R is more specific than this slot at any gender/race.
        table
            .set(HumanSlot::Unknown, None, R, TriState::On)
            .unwrap();
        table
            .set(HumanSlot::Legs, None, GenderRace::Unknown, TriState::Off)
            .unwrap();
        assert_eq!(table.get(HumanSlot::Legs, None, R), TriState::On);
        assert_eq!(
            table.get(HumanSlot::Legs, None, GenderRace::AuRaMale),
            TriState::Off
        );
        assert_eq!(
            table.get(HumanSlot::Hands, None, GenderRace::AuRaMale),
            TriState::Inherit
        );
    }

    #[test]
    fn test_set_outcome_reports_effective_change() {
        let mut table = OverrideTable::new();
        table
            .set(HumanSlot::Unknown, None, GenderRace::Unknown, TriState::On)
            .unwrap();

        // Same effective value, but now stored at a more specific level.
        let outcome = table
            .set(HumanSlot::Feet, None, R, TriState::On)
            .unwrap();
        assert_eq!(outcome.previous, TriState::Inherit);
        assert!(!outcome.effective_changed);

        let outcome = table
            .set(HumanSlot::Feet, None, R, TriState::Off)
            .unwrap();
        assert_eq!(outcome.previous, TriState::On);
        assert!(outcome.effective_changed);

        let outcome = table
            .set(HumanSlot::Feet, None, R, TriState::Inherit)
            .unwrap();
        assert!(outcome.effective_changed);
        assert_eq!(table.get(HumanSlot::Feet, None, R), TriState::On);
    }

    #[test]
    fn test_counts_track_stored_definitions() {
        let mut table = OverrideTable::new();
        table
            .set(HumanSlot::Head, Some(PrimaryId(1)), R, TriState::Off)
            .unwrap();
        table
            .set(HumanSlot::Head, Some(PrimaryId(2)), R, TriState::Off)
            .unwrap();
        table
            .set(HumanSlot::Head, Some(PrimaryId(1)), R, TriState::On)
            .unwrap();
        assert_eq!((table.on_count(), table.off_count()), (1, 1));

        table
            .set(HumanSlot::Head, Some(PrimaryId(1)), R, TriState::Inherit)
            .unwrap();
        table
            .set(HumanSlot::Head, Some(PrimaryId(2)), R, TriState::Inherit)
            .unwrap();
        assert!(table.is_empty());
        assert!(table.exact.is_empty());
    }

    #[test]
    fn test_instance_without_slot_rejected() {
        let mut table = OverrideTable::new();
        assert!(table
            .set(HumanSlot::Unknown, Some(PrimaryId(1)), R, TriState::On)
            .is_err());
        assert!(table.is_empty());
    }

    fn key() -> impl Strategy<Value = (HumanSlot, Option<PrimaryId>, GenderRace)> {
        (
            0usize..HumanSlot::ALL.len(),
            prop::option::of(0u16..4),
            0usize..4,
        )
            .prop_map(|(slot, id, gr)| {
                let slot = HumanSlot::ALL[slot];
                let id = if slot.is_any() { None } else { id.map(PrimaryId) };
                (slot, id, GenderRace::ALL[gr])
            })
    }

    fn state() -> impl Strategy<Value = TriState> {
        prop_oneof![
            Just(TriState::Inherit),
            Just(TriState::On),
            Just(TriState::Off)
        ]
    }

    proptest! {
        #[test]
        fn prop_counts_match_stored_values(writes in prop::collection::vec((key(), state()), 0..40)) {
            let mut table = OverrideTable::new();
            let mut stored = HashMap::new();
            for ((slot, id, gr), value) in writes {
                table.set(slot, id, gr, value).unwrap();
                stored.insert((slot, id, gr), value);
            }
            let on = stored.values().filter(|v| **v == TriState::On).count();
            let off = stored.values().filter(|v| **v == TriState::Off).count();
            prop_assert_eq!(table.on_count(), on);
            prop_assert_eq!(table.off_count(), off);
        }
    }
}
