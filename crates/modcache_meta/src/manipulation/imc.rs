//! Per-instance variant files.
//!
//! Every (object, primary id, secondary id) owns its own small file instead of
//! a row in a shared table. The file is a 4-byte header followed by one row of
//! 6-byte entries per variant, one entry per present part:
//!
//! ```text
//! u16 variant_count   // excluding the default row
//! u16 part_mask       // bit i set = part i present
//! (variant_count + 1) × parts × { u8 material, u8 decal, u16 attribute_and_sound, u8 vfx, u8 material_animation }
//! ```

use crate::error::{MetaError, Result};
use crate::types::{EquipSlot, ObjectType, PrimaryId, SecondaryId, Variant};
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use modcache_core::VirtualPath;
use std::io::Cursor;

/// One variant row entry for one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImcEntry {
    pub material_id: u8,
    pub decal_id: u8,
    /// Low 10 bits: attribute mask, high 6 bits: sound id.
    pub attribute_and_sound: u16,
    pub vfx_id: u8,
    pub material_animation_id: u8,
}

impl ImcEntry {
    pub const SIZE: usize = 6;

    pub fn attribute_mask(self) -> u16 {
        self.attribute_and_sound & 0x3FF
    }

    pub fn sound_id(self) -> u8 {
        (self.attribute_and_sound >> 10) as u8
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            material_id: cursor.read_u8()?,
            decal_id: cursor.read_u8()?,
            attribute_and_sound: cursor.read_u16::<LE>()?,
            vfx_id: cursor.read_u8()?,
            material_animation_id: cursor.read_u8()?,
        })
    }

    fn write(self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u8(self.material_id)?;
        out.write_u8(self.decal_id)?;
        out.write_u16::<LE>(self.attribute_and_sound)?;
        out.write_u8(self.vfx_id)?;
        out.write_u8(self.material_animation_id)
    }
}

/// One part of one variant of one per-instance file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImcIdentifier {
    pub object_type: ObjectType,
    pub primary_id: PrimaryId,
    pub secondary_id: SecondaryId,
    pub variant: Variant,
    /// Equipment/accessory slot; weapons and monsters have a single part and use `Body`.
    pub slot: EquipSlot,
}

impl ImcIdentifier {
    /// Game path of the file this identifier edits.
    pub fn game_path(&self) -> Result<VirtualPath> {
        Ok(VirtualPath::new(&self.raw_game_path())?)
    }

    /// The game path as formatted, before normalization.
    pub(crate) fn raw_game_path(&self) -> String {
        let p = self.primary_id;
        let s = self.secondary_id;
        match self.object_type {
            ObjectType::Equipment => format!("chara/equipment/e{p}/e{p}.imc"),
            ObjectType::Accessory => format!("chara/accessory/a{p}/a{p}.imc"),
            ObjectType::Weapon => format!("chara/weapon/w{p}/obj/body/b{s}/b{s}.imc"),
            ObjectType::Monster => format!("chara/monster/m{p}/obj/body/b{s}/b{s}.imc"),
            ObjectType::DemiHuman => {
                format!("chara/demihuman/d{p}/obj/equipment/e{s}/e{s}.imc")
            }
        }
    }

    /// Bit position of this identifier's part in the file's part mask.
    pub fn part_bit(&self) -> usize {
        match self.object_type {
            ObjectType::Weapon | ObjectType::Monster => 0,
            _ => self.slot.position(),
        }
    }

    /// Checks that only depend on the identifier itself.
    pub fn validate_shape(&self) -> Result<()> {
        let valid = match self.object_type {
            ObjectType::Equipment | ObjectType::DemiHuman => self.slot.is_equipment(),
            ObjectType::Accessory => self.slot.is_accessory(),
            ObjectType::Weapon | ObjectType::Monster => self.slot == EquipSlot::Body,
        };
        if !valid {
            return Err(MetaError::InvalidImcSlot {
                object_type: self.object_type,
                slot: self.slot,
            });
        }
        Ok(())
    }

    /// Full validation against the compiled default file.
    pub fn validate_against(&self, file: &ImcFile) -> Result<()> {
        self.validate_shape()?;
        let path = self.game_path()?;
        if self.variant.0 as u16 > file.variant_count() {
            return Err(MetaError::InvalidImcVariant {
                path,
                variant: self.variant,
                count: file.variant_count(),
            });
        }
        if file.part_index(self.part_bit()).is_none() {
            return Err(MetaError::InvalidImcPart {
                path,
                slot: self.slot,
            });
        }
        Ok(())
    }
}

/// Parsed per-instance file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImcFile {
    part_mask: u16,
    variant_count: u16,
    entries: Vec<ImcEntry>,
}

impl ImcFile {
    /// A file with `variant_count` variants, every entry set to `entry`.
    pub fn new(part_mask: u16, variant_count: u16, entry: ImcEntry) -> Self {
        let parts = part_mask.count_ones() as usize;
        Self {
            part_mask,
            variant_count,
            entries: vec![entry; (variant_count as usize + 1) * parts],
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let layout_error = |reason: String| MetaError::TableLayout {
            table: "Imc",
            reason,
        };

        let mut cursor = Cursor::new(bytes);
        let variant_count = cursor.read_u16::<LE>()?;
        let part_mask = cursor.read_u16::<LE>()?;
        let parts = part_mask.count_ones() as usize;
        let expected = 4 + (variant_count as usize + 1) * parts * ImcEntry::SIZE;
        if bytes.len() != expected {
            return Err(layout_error(format!(
                "expected {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }

        let mut entries = Vec::with_capacity((variant_count as usize + 1) * parts);
        for _ in 0..entries.capacity() {
            entries.push(ImcEntry::read(&mut cursor)?);
        }

        Ok(Self {
            part_mask,
            variant_count,
            entries,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_bytes()?)
    }

    fn write_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(4 + self.entries.len() * ImcEntry::SIZE);
        out.write_u16::<LE>(self.variant_count)?;
        out.write_u16::<LE>(self.part_mask)?;
        for entry in &self.entries {
            entry.write(&mut out)?;
        }
        Ok(out)
    }

    pub fn variant_count(&self) -> u16 {
        self.variant_count
    }

    pub fn part_count(&self) -> usize {
        self.part_mask.count_ones() as usize
    }

    /// Dense index of the part at `bit`, if the file has that part.
    pub fn part_index(&self, bit: usize) -> Option<usize> {
        if bit >= 16 || self.part_mask & (1 << bit) == 0 {
            return None;
        }
        Some((self.part_mask & ((1u16 << bit) - 1)).count_ones() as usize)
    }

    fn offset(&self, variant: Variant, bit: usize) -> Option<usize> {
        if variant.0 as u16 > self.variant_count {
            return None;
        }
        let part = self.part_index(bit)?;
        Some(variant.0 as usize * self.part_count() + part)
    }

    pub fn entry(&self, variant: Variant, bit: usize) -> Option<ImcEntry> {
        self.offset(variant, bit).map(|i| self.entries[i])
    }

    /// Write an entry; returns whether the stored value changed.
    pub fn set_entry(&mut self, variant: Variant, bit: usize, entry: ImcEntry) -> bool {
        match self.offset(variant, bit) {
            Some(i) if self.entries[i] != entry => {
                self.entries[i] = entry;
                true
            }
            _ => false,
        }
    }
}
