//! Visor parameters: one packed 64-bit record per head set id.
//!
//! Layout: bit 0 enabled, bit 1 animated, bits 2..12 / 12..22 / 22..32 the
//! three rotation angles, bits 32..36 and 36..40 two opaque nibbles.

use crate::types::PrimaryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GmpEntry(pub u64);

const ROTATION_MASK: u64 = 0x3FF;

impl GmpEntry {
    pub const DEFAULT: GmpEntry = GmpEntry(0);

    pub fn enabled(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn animated(self) -> bool {
        self.0 & 2 != 0
    }

    pub fn rotation_a(self) -> u16 {
        ((self.0 >> 2) & ROTATION_MASK) as u16
    }

    pub fn rotation_b(self) -> u16 {
        ((self.0 >> 12) & ROTATION_MASK) as u16
    }

    pub fn rotation_c(self) -> u16 {
        ((self.0 >> 22) & ROTATION_MASK) as u16
    }

    pub fn unknown_a(self) -> u8 {
        ((self.0 >> 32) & 0xF) as u8
    }

    pub fn unknown_b(self) -> u8 {
        ((self.0 >> 36) & 0xF) as u8
    }

    pub fn with_enabled(self, value: bool) -> Self {
        Self(set_bits(self.0, 0, 1, value as u64))
    }

    pub fn with_animated(self, value: bool) -> Self {
        Self(set_bits(self.0, 1, 1, value as u64))
    }

    pub fn with_rotation(self, a: u16, b: u16, c: u16) -> Self {
        let value = set_bits(self.0, 2, ROTATION_MASK, a as u64);
        let value = set_bits(value, 12, ROTATION_MASK, b as u64);
        Self(set_bits(value, 22, ROTATION_MASK, c as u64))
    }
}

fn set_bits(value: u64, shift: u32, mask: u64, bits: u64) -> u64 {
    (value & !(mask << shift)) | ((bits & mask) << shift)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GmpIdentifier {
    pub set_id: PrimaryId,
}
