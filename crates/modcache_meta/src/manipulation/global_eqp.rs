//! Global visibility overrides folded into every equipment parameter record.

use crate::manipulation::eqp::EqpEntry;
use crate::types::PrimaryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlobalEqpType {
    DoNotHideEarrings,
    DoNotHideNecklace,
    DoNotHideBracelets,
    DoNotHideRingR,
    DoNotHideRingL,
    DoNotHideHrothgarHats,
    DoNotHideVieraHats,
}

impl GlobalEqpType {
    /// Bits forced on in the affected records.
    pub fn flags(self) -> EqpEntry {
        match self {
            GlobalEqpType::DoNotHideEarrings => {
                EqpEntry::HEAD_SHOW_EARRINGS
                    | EqpEntry::HEAD_SHOW_EARRINGS_HUMAN
                    | EqpEntry::HEAD_SHOW_EARRINGS_AURA
            }
            GlobalEqpType::DoNotHideNecklace => {
                EqpEntry::HEAD_SHOW_NECKLACE | EqpEntry::BODY_SHOW_NECKLACE
            }
            GlobalEqpType::DoNotHideBracelets => {
                EqpEntry::BODY_SHOW_BRACELET | EqpEntry::HANDS_SHOW_BRACELET
            }
            GlobalEqpType::DoNotHideRingR => EqpEntry::HANDS_SHOW_RING_R,
            GlobalEqpType::DoNotHideRingL => EqpEntry::HANDS_SHOW_RING_L,
            GlobalEqpType::DoNotHideHrothgarHats => EqpEntry::HEAD_SHOW_HROTHGAR_HAT,
            GlobalEqpType::DoNotHideVieraHats => EqpEntry::HEAD_SHOW_VIERA_HAT,
        }
    }
}

/// A global override; it is its own identifier and carries no entry.
///
/// A `condition` of `PrimaryId(0)` applies to every set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalEqpManipulation {
    pub kind: GlobalEqpType,
    pub condition: PrimaryId,
}

impl GlobalEqpManipulation {
    pub fn applies_to(&self, set_id: PrimaryId) -> bool {
        self.condition.0 == 0 || self.condition == set_id
    }
}
