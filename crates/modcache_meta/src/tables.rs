//! Fixed-layout base tables.
//!
//! Every table parses from and serializes back to the byte layout the host
//! keeps in its table space. All values are little-endian.

use crate::error::{MetaError, Result};
use crate::manipulation::{EqdpEntry, EqpEntry, EstEntry, GmpEntry, RspEntry};
use crate::types::{GenderRace, PrimaryId, RspAttribute, SubRace};
use byteorder::{ByteOrder, ReadBytesExt, LE};
use std::collections::BTreeMap;
use std::io::Cursor;

fn layout_error(table: &'static str, reason: impl Into<String>) -> MetaError {
    MetaError::TableLayout {
        table,
        reason: reason.into(),
    }
}

fn check_stride(table: &'static str, bytes: &[u8], stride: usize) -> Result<()> {
    if bytes.len() % stride != 0 {
        return Err(layout_error(
            table,
            format!("length {} is not a multiple of {}", bytes.len(), stride),
        ));
    }
    Ok(())
}

/// Equipment parameter table: one `u64` per set id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EqpTable {
    entries: Vec<EqpEntry>,
}

impl EqpTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_stride("Eqp", bytes, 8)?;
        Ok(Self {
            entries: bytes
                .chunks_exact(8)
                .map(|chunk| EqpEntry::from_bits_retain(LE::read_u64(chunk)))
                .collect(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.entries.len() * 8];
        for (chunk, entry) in out.chunks_exact_mut(8).zip(&self.entries) {
            LE::write_u64(chunk, entry.bits());
        }
        out
    }

    /// Record of a set; sets past the end read as [`EqpEntry::DEFAULT`].
    pub fn get(&self, set_id: PrimaryId) -> EqpEntry {
        self.entries
            .get(set_id.0 as usize)
            .copied()
            .unwrap_or(EqpEntry::DEFAULT)
    }

    pub fn set(&mut self, set_id: PrimaryId, entry: EqpEntry) {
        let index = set_id.0 as usize;
        if index >= self.entries.len() {
            self.entries.resize(index + 1, EqpEntry::DEFAULT);
        }
        self.entries[index] = entry;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deformation table for one (gender/race, family): one `u16` per set id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EqdpTable {
    entries: Vec<EqdpEntry>,
}

impl EqdpTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_stride("Eqdp", bytes, 2)?;
        Ok(Self {
            entries: bytes
                .chunks_exact(2)
                .map(|chunk| EqdpEntry::from_bits_truncate(LE::read_u16(chunk)))
                .collect(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.entries.len() * 2];
        for (chunk, entry) in out.chunks_exact_mut(2).zip(&self.entries) {
            LE::write_u16(chunk, entry.bits());
        }
        out
    }

    pub fn get(&self, set_id: PrimaryId) -> EqdpEntry {
        self.entries
            .get(set_id.0 as usize)
            .copied()
            .unwrap_or(EqdpEntry::empty())
    }

    pub fn set(&mut self, set_id: PrimaryId, entry: EqdpEntry) {
        let index = set_id.0 as usize;
        if index >= self.entries.len() {
            self.entries.resize(index + 1, EqdpEntry::empty());
        }
        self.entries[index] = entry;
    }
}

/// Extra-skeleton table for one [`EstType`](crate::EstType): a sorted sparse
/// list of `(gender_race, set_id, skeleton)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EstTable {
    entries: BTreeMap<(GenderRace, PrimaryId), EstEntry>,
}

impl EstTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let count = cursor.read_u32::<LE>()? as usize;
        if bytes.len() != 4 + count * 6 {
            return Err(layout_error(
                "Est",
                format!("{} entries need {} bytes, got {}", count, 4 + count * 6, bytes.len()),
            ));
        }

        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let code = cursor.read_u16::<LE>()?;
            let set_id = PrimaryId(cursor.read_u16::<LE>()?);
            let skeleton = EstEntry(cursor.read_u16::<LE>()?);
            let gender_race = GenderRace::from_code(code)
                .ok_or_else(|| layout_error("Est", format!("unknown gender/race code {code}")))?;
            entries.insert((gender_race, set_id), skeleton);
        }
        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; 4 + self.entries.len() * 6];
        let (header, body) = out.split_at_mut(4);
        LE::write_u32(header, self.entries.len() as u32);
        for (chunk, ((gender_race, set_id), skeleton)) in body.chunks_exact_mut(6).zip(&self.entries) {
            LE::write_u16(&mut chunk[0..2], gender_race.code());
            LE::write_u16(&mut chunk[2..4], set_id.0);
            LE::write_u16(&mut chunk[4..6], skeleton.0);
        }
        out
    }

    /// Skeleton of a set; absent entries read as `0`.
    pub fn get(&self, gender_race: GenderRace, set_id: PrimaryId) -> EstEntry {
        self.entries
            .get(&(gender_race, set_id))
            .copied()
            .unwrap_or_default()
    }

    /// Write an entry; writing `0` removes it.
    pub fn set(&mut self, gender_race: GenderRace, set_id: PrimaryId, entry: EstEntry) {
        if entry.0 == 0 {
            self.entries.remove(&(gender_race, set_id));
        } else {
            self.entries.insert((gender_race, set_id), entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Visor table: one packed `u64` per head set id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GmpTable {
    entries: Vec<GmpEntry>,
}

impl GmpTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_stride("Gmp", bytes, 8)?;
        Ok(Self {
            entries: bytes
                .chunks_exact(8)
                .map(|chunk| GmpEntry(LE::read_u64(chunk)))
                .collect(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.entries.len() * 8];
        for (chunk, entry) in out.chunks_exact_mut(8).zip(&self.entries) {
            LE::write_u64(chunk, entry.0);
        }
        out
    }

    pub fn get(&self, set_id: PrimaryId) -> GmpEntry {
        self.entries
            .get(set_id.0 as usize)
            .copied()
            .unwrap_or(GmpEntry::DEFAULT)
    }

    pub fn set(&mut self, set_id: PrimaryId, entry: GmpEntry) {
        let index = set_id.0 as usize;
        if index >= self.entries.len() {
            self.entries.resize(index + 1, GmpEntry::DEFAULT);
        }
        self.entries[index] = entry;
    }
}

/// Racial scaling table: `f32` per (sub-race, attribute), row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RspTable {
    values: Vec<RspEntry>,
}

impl RspTable {
    const LEN: usize = SubRace::COUNT * RspAttribute::COUNT;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN * 4 {
            return Err(layout_error(
                "Rsp",
                format!("expected {} bytes, got {}", Self::LEN * 4, bytes.len()),
            ));
        }
        Ok(Self {
            values: bytes
                .chunks_exact(4)
                .map(|chunk| RspEntry(LE::read_f32(chunk)))
                .collect(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.values.len() * 4];
        for (chunk, value) in out.chunks_exact_mut(4).zip(&self.values) {
            LE::write_f32(chunk, value.0);
        }
        out
    }

    fn index(sub_race: SubRace, attribute: RspAttribute) -> usize {
        sub_race.index() * RspAttribute::COUNT + attribute.index()
    }

    pub fn get(&self, sub_race: SubRace, attribute: RspAttribute) -> RspEntry {
        self.values[Self::index(sub_race, attribute)]
    }

    pub fn set(&mut self, sub_race: SubRace, attribute: RspAttribute, value: RspEntry) {
        self.values[Self::index(sub_race, attribute)] = value;
    }
}

impl Default for RspTable {
    /// Every scale at `1.0`.
    fn default() -> Self {
        Self {
            values: vec![RspEntry(1.0); Self::LEN],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    #[test]
    fn test_eqp_reads_default_past_end() {
        let mut table = EqpTable::default();
        assert_eq!(table.get(PrimaryId(10)), EqpEntry::DEFAULT);
        table.set(PrimaryId(2), EqpEntry::empty());
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(PrimaryId(0)), EqpEntry::DEFAULT);

        let parsed = EqpTable::from_bytes(&table.to_bytes()).unwrap();
        assert_eq!(parsed, table);
        assert_eq!(parsed.get(PrimaryId(2)), EqpEntry::empty());
    }

    #[test]
    fn test_bad_stride_rejected() {
        assert!(matches!(
            EqpTable::from_bytes(&[0u8; 12]),
            Err(MetaError::TableLayout { table: "Eqp", .. })
        ));
        assert!(EqdpTable::from_bytes(&[0u8; 3]).is_err());
        assert!(RspTable::from_bytes(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_est_layout_is_sorted() {
        let mut table = EstTable::default();
        table.set(GenderRace::VieraFemale, PrimaryId(1), EstEntry(9));
        table.set(GenderRace::MidlanderMale, PrimaryId(5), EstEntry(3));
        table.set(GenderRace::MidlanderMale, PrimaryId(2), EstEntry(4));

        let bytes = table.to_bytes();
        assert_eq!(LE::read_u32(&bytes[0..4]), 3);
        // First record: (c0101, 2, 4).
        assert_eq!(LE::read_u16(&bytes[4..6]), 101);
        assert_eq!(LE::read_u16(&bytes[6..8]), 2);
        assert_eq!(LE::read_u16(&bytes[8..10]), 4);

        let parsed = EstTable::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.get(GenderRace::VieraFemale, PrimaryId(1)), EstEntry(9));

        table.set(GenderRace::VieraFemale, PrimaryId(1), EstEntry(0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_est_unknown_gender_race_rejected() {
        let mut bytes = vec![];
        bytes.write_u32::<LE>(1).unwrap();
        bytes.write_u16::<LE>(102).unwrap();
        bytes.write_u16::<LE>(1).unwrap();
        bytes.write_u16::<LE>(1).unwrap();
        assert!(EstTable::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_rsp_row_major() {
        let mut table = RspTable::default();
        table.set(SubRace::Highlander, RspAttribute::MaleMinSize, RspEntry(2.0));
        let bytes = table.to_bytes();
        let offset = RspAttribute::COUNT * 4;
        assert_eq!(LE::read_f32(&bytes[offset..offset + 4]), 2.0);
        assert_eq!(RspTable::from_bytes(&bytes).unwrap(), table);
    }
}
