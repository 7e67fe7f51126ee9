//! Equipment deformation parameters.
//!
//! One 16-bit record per (gender/race, family, set id), where each of the five
//! slots of a family owns two bits (material, model). Different mods routinely
//! edit different slots of the same record, which is why this format is merged
//! bit-by-bit instead of record-by-record.

use crate::error::{MetaError, Result};
use crate::types::{EquipSlot, GenderRace, PrimaryId};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EqdpEntry: u16 {
        const SLOT0_MATERIAL = 1 << 0;
        const SLOT0_MODEL = 1 << 1;
        const SLOT1_MATERIAL = 1 << 2;
        const SLOT1_MODEL = 1 << 3;
        const SLOT2_MATERIAL = 1 << 4;
        const SLOT2_MODEL = 1 << 5;
        const SLOT3_MATERIAL = 1 << 6;
        const SLOT3_MODEL = 1 << 7;
        const SLOT4_MATERIAL = 1 << 8;
        const SLOT4_MODEL = 1 << 9;
    }
}

impl EqdpEntry {
    /// Every bit that can be claimed by a slot.
    pub const FULL_MASK: EqdpEntry = EqdpEntry::all();

    /// Bits owned by `slot` within its family's record.
    pub fn mask(slot: EquipSlot) -> EqdpEntry {
        EqdpEntry::from_bits_truncate(0b11 << (2 * slot.position()))
    }

    /// Build a record for a single slot from its two flags.
    pub fn from_slot(slot: EquipSlot, material: bool, model: bool) -> EqdpEntry {
        let bits = (material as u16) | ((model as u16) << 1);
        EqdpEntry::from_bits_truncate(bits << (2 * slot.position()))
    }

    pub fn material(self, slot: EquipSlot) -> bool {
        self.bits() & (1 << (2 * slot.position())) != 0
    }

    pub fn model(self, slot: EquipSlot) -> bool {
        self.bits() & (1 << (2 * slot.position() + 1)) != 0
    }
}

/// One slot of one set for one gender/race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EqdpIdentifier {
    pub set_id: PrimaryId,
    pub slot: EquipSlot,
    pub gender_race: GenderRace,
}

impl EqdpIdentifier {
    pub fn accessory(&self) -> bool {
        self.slot.is_accessory()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gender_race.is_specified() {
            return Err(MetaError::UnspecifiedGenderRace("Eqdp"));
        }
        Ok(())
    }
}
