//! Equipment parameters: per-set visibility flags, one 64-bit record per set id.
//!
//! Each equipment slot owns a disjoint bit range of the record, so a
//! manipulation only ever writes the bits of its own slot.

use crate::error::{MetaError, Result};
use crate::types::{EquipSlot, PrimaryId};
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EqpEntry: u64 {
        const BODY_ENABLED = 1 << 0;
        const BODY_HIDE_WAIST = 1 << 1;
        const BODY_HIDE_THIGHS = 1 << 2;
        const BODY_HIDE_GLOVES_S = 1 << 3;
        const BODY_HIDE_GLOVES_M = 1 << 4;
        const BODY_HIDE_GLOVES_L = 1 << 5;
        const BODY_HIDE_GORGET = 1 << 6;
        const BODY_SHOW_LEG = 1 << 7;
        const BODY_SHOW_HAND = 1 << 8;
        const BODY_SHOW_HEAD = 1 << 9;
        const BODY_SHOW_NECKLACE = 1 << 10;
        const BODY_SHOW_BRACELET = 1 << 11;
        const BODY_SHOW_TAIL = 1 << 12;
        const BODY_TWO_PIECE = 1 << 13;

        const LEGS_ENABLED = 1 << 18;
        const LEGS_HIDE_KNEE_PADS = 1 << 19;
        const LEGS_HIDE_BOOTS_S = 1 << 20;
        const LEGS_HIDE_BOOTS_M = 1 << 21;
        const LEGS_SHOW_FOOT = 1 << 22;
        const LEGS_SHOW_TAIL = 1 << 23;

        const HANDS_ENABLED = 1 << 24;
        const HANDS_HIDE_ELBOW = 1 << 25;
        const HANDS_HIDE_FOREARM = 1 << 26;
        const HANDS_SHOW_BRACELET = 1 << 27;
        const HANDS_SHOW_RING_L = 1 << 28;
        const HANDS_SHOW_RING_R = 1 << 29;

        const FEET_ENABLED = 1 << 30;
        const FEET_HIDE_KNEE = 1 << 31;

        const HEAD_ENABLED = 1 << 32;
        const HEAD_HIDE_SCALP = 1 << 33;
        const HEAD_HIDE_HAIR = 1 << 34;
        const HEAD_SHOW_HAIR_OVERRIDE = 1 << 35;
        const HEAD_HIDE_NECK = 1 << 36;
        const HEAD_SHOW_NECKLACE = 1 << 37;
        const HEAD_SHOW_EARRINGS = 1 << 38;
        const HEAD_SHOW_EARRINGS_HUMAN = 1 << 39;
        const HEAD_SHOW_EARRINGS_AURA = 1 << 40;
        const HEAD_SHOW_EAR_HUMAN = 1 << 41;
        const HEAD_SHOW_EAR_MIQOTE = 1 << 42;
        const HEAD_SHOW_EAR_AURA = 1 << 43;
        const HEAD_SHOW_EAR_VIERA = 1 << 44;
        const HEAD_SHOW_HROTHGAR_HAT = 1 << 45;
        const HEAD_SHOW_VIERA_HAT = 1 << 46;
        const HEAD_USE_VISOR = 1 << 47;

        // Bits without a known meaning still round-trip.
        const _ = !0;
    }
}

impl EqpEntry {
    pub const BODY_MASK: EqpEntry = EqpEntry::from_bits_retain(0x0000_0000_0003_FFFF);
    pub const LEGS_MASK: EqpEntry = EqpEntry::from_bits_retain(0x0000_0000_00FC_0000);
    pub const HANDS_MASK: EqpEntry = EqpEntry::from_bits_retain(0x0000_0000_3F00_0000);
    pub const FEET_MASK: EqpEntry = EqpEntry::from_bits_retain(0x0000_0000_C000_0000);
    pub const HEAD_MASK: EqpEntry = EqpEntry::from_bits_retain(0xFFFF_FFFF_0000_0000);

    /// Record used for set ids beyond the end of the base table.
    pub const DEFAULT: EqpEntry = EqpEntry::from_bits_retain(
        EqpEntry::BODY_ENABLED.bits()
            | EqpEntry::BODY_SHOW_LEG.bits()
            | EqpEntry::BODY_SHOW_HAND.bits()
            | EqpEntry::BODY_SHOW_HEAD.bits()
            | EqpEntry::BODY_SHOW_NECKLACE.bits()
            | EqpEntry::BODY_SHOW_BRACELET.bits()
            | EqpEntry::BODY_SHOW_TAIL.bits()
            | EqpEntry::LEGS_ENABLED.bits()
            | EqpEntry::LEGS_SHOW_FOOT.bits()
            | EqpEntry::LEGS_SHOW_TAIL.bits()
            | EqpEntry::HANDS_ENABLED.bits()
            | EqpEntry::HANDS_SHOW_BRACELET.bits()
            | EqpEntry::HANDS_SHOW_RING_L.bits()
            | EqpEntry::HANDS_SHOW_RING_R.bits()
            | EqpEntry::FEET_ENABLED.bits()
            | EqpEntry::HEAD_ENABLED.bits()
            | EqpEntry::HEAD_SHOW_NECKLACE.bits()
            | EqpEntry::HEAD_SHOW_EARRINGS.bits()
            | EqpEntry::HEAD_SHOW_EARRINGS_HUMAN.bits()
            | EqpEntry::HEAD_SHOW_EARRINGS_AURA.bits()
            | EqpEntry::HEAD_SHOW_EAR_HUMAN.bits()
            | EqpEntry::HEAD_SHOW_EAR_MIQOTE.bits()
            | EqpEntry::HEAD_SHOW_EAR_AURA.bits()
            | EqpEntry::HEAD_SHOW_EAR_VIERA.bits()
            | EqpEntry::HEAD_USE_VISOR.bits(),
    );

    /// Bit range owned by an equipment slot.
    pub fn mask(slot: EquipSlot) -> EqpEntry {
        match slot {
            EquipSlot::Head => Self::HEAD_MASK,
            EquipSlot::Body => Self::BODY_MASK,
            EquipSlot::Hands => Self::HANDS_MASK,
            EquipSlot::Legs => Self::LEGS_MASK,
            EquipSlot::Feet => Self::FEET_MASK,
            _ => EqpEntry::empty(),
        }
    }

    /// Overwrite the bits of `slot` in `self` with the same bits of `other`.
    pub fn merged(self, other: EqpEntry, slot: EquipSlot) -> EqpEntry {
        let mask = Self::mask(slot);
        (self & !mask) | (other & mask)
    }
}

/// One slot of one equipment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EqpIdentifier {
    pub set_id: PrimaryId,
    pub slot: EquipSlot,
}

impl EqpIdentifier {
    pub fn validate(&self) -> Result<()> {
        if !self.slot.is_equipment() {
            return Err(MetaError::InvalidSlot {
                format: "Eqp",
                slot: self.slot,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_are_disjoint_and_cover_all_bits() {
        let masks = [
            EqpEntry::HEAD_MASK,
            EqpEntry::BODY_MASK,
            EqpEntry::HANDS_MASK,
            EqpEntry::LEGS_MASK,
            EqpEntry::FEET_MASK,
        ];
        let mut seen = 0u64;
        for mask in masks {
            assert_eq!(seen & mask.bits(), 0);
            seen |= mask.bits();
        }
        // Bits 14..18 are unused body padding and belong to the body mask.
        assert_eq!(seen, u64::MAX);
    }

    #[test]
    fn test_merged_only_touches_slot_bits() {
        let base = EqpEntry::DEFAULT;
        let edited = base.merged(EqpEntry::empty(), EquipSlot::Head);
        assert!(!edited.contains(EqpEntry::HEAD_USE_VISOR));
        assert_eq!(edited & !EqpEntry::HEAD_MASK, base & !EqpEntry::HEAD_MASK);
    }

    #[test]
    fn test_accessory_rejected() {
        let id = EqpIdentifier {
            set_id: PrimaryId(1),
            slot: EquipSlot::Ears,
        };
        assert!(matches!(id.validate(), Err(MetaError::InvalidSlot { .. })));
    }
}
