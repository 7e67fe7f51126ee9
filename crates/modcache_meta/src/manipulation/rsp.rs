//! Racial scaling parameters: one float per (sub-race, attribute).

use crate::error::{MetaError, Result};
use crate::types::{RspAttribute, SubRace};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, Default)]
pub struct RspEntry(pub f32);

impl RspEntry {
    pub const MIN: f32 = 0.01;
    pub const MAX: f32 = 512.0;

    pub fn validate(self) -> Result<()> {
        if !self.0.is_finite() || self.0 < Self::MIN || self.0 > Self::MAX {
            return Err(MetaError::InvalidRspValue(self.0));
        }
        Ok(())
    }
}

// Compared bit-for-bit so that a no-op apply is detected exactly.
impl PartialEq for RspEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for RspEntry {}

impl Hash for RspEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RspIdentifier {
    pub sub_race: SubRace,
    pub attribute: RspAttribute,
}
