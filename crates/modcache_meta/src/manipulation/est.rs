//! Extra skeleton table: which supplementary skeleton a set uses per race.

use crate::error::{MetaError, Result};
use crate::types::{EstType, GenderRace, PrimaryId};

/// Skeleton id; `0` means "no extra skeleton".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EstEntry(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EstIdentifier {
    pub set_id: PrimaryId,
    pub slot: EstType,
    pub gender_race: GenderRace,
}

impl EstIdentifier {
    pub fn validate(&self) -> Result<()> {
        if !self.gender_race.is_specified() {
            return Err(MetaError::UnspecifiedGenderRace("Est"));
        }
        Ok(())
    }
}
