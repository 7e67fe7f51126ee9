//! Primitive keys shared by the metadata formats.

use std::fmt;

/// Primary set id of an equipment, accessory, weapon or monster model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PrimaryId(pub u16);

/// Secondary id (weapon body, monster body, demihuman equipment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SecondaryId(pub u16);

/// Variant index inside a per-instance file. Variant `0` is the default row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Variant(pub u8);

impl fmt::Display for PrimaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl fmt::Display for SecondaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Equipment and accessory slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EquipSlot {
    Head,
    Body,
    Hands,
    Legs,
    Feet,
    Ears,
    Neck,
    Wrists,
    RFinger,
    LFinger,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 10] = [
        EquipSlot::Head,
        EquipSlot::Body,
        EquipSlot::Hands,
        EquipSlot::Legs,
        EquipSlot::Feet,
        EquipSlot::Ears,
        EquipSlot::Neck,
        EquipSlot::Wrists,
        EquipSlot::RFinger,
        EquipSlot::LFinger,
    ];

    pub fn is_equipment(self) -> bool {
        matches!(
            self,
            EquipSlot::Head | EquipSlot::Body | EquipSlot::Hands | EquipSlot::Legs | EquipSlot::Feet
        )
    }

    pub fn is_accessory(self) -> bool {
        !self.is_equipment()
    }

    /// Position of the slot within its five-slot family (equipment or accessory).
    pub fn position(self) -> usize {
        match self {
            EquipSlot::Head | EquipSlot::Ears => 0,
            EquipSlot::Body | EquipSlot::Neck => 1,
            EquipSlot::Hands | EquipSlot::Wrists => 2,
            EquipSlot::Legs | EquipSlot::RFinger => 3,
            EquipSlot::Feet | EquipSlot::LFinger => 4,
        }
    }

    /// Model file suffix used in game paths.
    pub fn suffix(self) -> &'static str {
        match self {
            EquipSlot::Head => "met",
            EquipSlot::Body => "top",
            EquipSlot::Hands => "glv",
            EquipSlot::Legs => "dwn",
            EquipSlot::Feet => "sho",
            EquipSlot::Ears => "ear",
            EquipSlot::Neck => "nek",
            EquipSlot::Wrists => "wrs",
            EquipSlot::RFinger => "rir",
            EquipSlot::LFinger => "ril",
        }
    }
}

/// Model slots addressed by shape and attribute overrides.
///
/// [`HumanSlot::Unknown`] stands for "any slot".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HumanSlot {
    Head,
    Body,
    Hands,
    Legs,
    Feet,
    Ears,
    Neck,
    Wrists,
    RFinger,
    LFinger,
    Hair,
    Face,
    Ear,
    Unknown,
}

impl HumanSlot {
    /// Number of concrete model slots (everything but `Unknown`).
    pub const MODEL_COUNT: usize = 13;

    pub const ALL: [HumanSlot; 14] = [
        HumanSlot::Head,
        HumanSlot::Body,
        HumanSlot::Hands,
        HumanSlot::Legs,
        HumanSlot::Feet,
        HumanSlot::Ears,
        HumanSlot::Neck,
        HumanSlot::Wrists,
        HumanSlot::RFinger,
        HumanSlot::LFinger,
        HumanSlot::Hair,
        HumanSlot::Face,
        HumanSlot::Ear,
        HumanSlot::Unknown,
    ];

    /// Dense index; `Unknown` maps to [`MODEL_COUNT`](Self::MODEL_COUNT).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_any(self) -> bool {
        self == HumanSlot::Unknown
    }
}

/// Combined gender and model race code, the secondary condition axis.
///
/// [`GenderRace::Unknown`] stands for "any gender/race".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum GenderRace {
    Unknown = 0,
    MidlanderMale = 101,
    MidlanderFemale = 201,
    HighlanderMale = 301,
    HighlanderFemale = 401,
    ElezenMale = 501,
    ElezenFemale = 601,
    MiqoteMale = 701,
    MiqoteFemale = 801,
    RoegadynMale = 901,
    RoegadynFemale = 1001,
    LalafellMale = 1101,
    LalafellFemale = 1201,
    AuRaMale = 1301,
    AuRaFemale = 1401,
    HrothgarMale = 1501,
    HrothgarFemale = 1601,
    VieraMale = 1701,
    VieraFemale = 1801,
}

impl GenderRace {
    /// All values in index order; index `0` is `Unknown`.
    pub const ALL: [GenderRace; 19] = [
        GenderRace::Unknown,
        GenderRace::MidlanderMale,
        GenderRace::MidlanderFemale,
        GenderRace::HighlanderMale,
        GenderRace::HighlanderFemale,
        GenderRace::ElezenMale,
        GenderRace::ElezenFemale,
        GenderRace::MiqoteMale,
        GenderRace::MiqoteFemale,
        GenderRace::RoegadynMale,
        GenderRace::RoegadynFemale,
        GenderRace::LalafellMale,
        GenderRace::LalafellFemale,
        GenderRace::AuRaMale,
        GenderRace::AuRaFemale,
        GenderRace::HrothgarMale,
        GenderRace::HrothgarFemale,
        GenderRace::VieraMale,
        GenderRace::VieraFemale,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|gr| gr.code() == code)
    }

    /// Dense index into [`ALL`](Self::ALL).
    pub fn index(self) -> usize {
        match self {
            GenderRace::Unknown => 0,
            // Codes run 101, 201, ..., 1801 in index order.
            other => {
                let code = other.code() as usize;
                (code - 1) / 100
            }
        }
    }

    pub fn is_specified(self) -> bool {
        self != GenderRace::Unknown
    }
}

impl fmt::Display for GenderRace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{:04}", self.code())
    }
}

/// Racial sub-clans addressed by racial scaling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubRace {
    Midlander,
    Highlander,
    Wildwood,
    Duskwight,
    SeekerOfTheSun,
    KeeperOfTheMoon,
    Seawolf,
    Hellsguard,
    Plainsfolk,
    Dunesfolk,
    Raen,
    Xaela,
    Helion,
    TheLost,
    Rava,
    Veena,
}

impl SubRace {
    pub const COUNT: usize = 16;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Attributes of the racial scaling table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RspAttribute {
    MaleMinSize,
    MaleMaxSize,
    MaleMinTail,
    MaleMaxTail,
    FemaleMinSize,
    FemaleMaxSize,
    FemaleMinTail,
    FemaleMaxTail,
    BustMinX,
    BustMinY,
    BustMinZ,
    BustMaxX,
    BustMaxY,
    BustMaxZ,
}

impl RspAttribute {
    pub const COUNT: usize = 14;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Extra-skeleton table kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EstType {
    Face,
    Hair,
    Head,
    Body,
}

impl EstType {
    pub const ALL: [EstType; 4] = [EstType::Face, EstType::Hair, EstType::Head, EstType::Body];
}

/// Object families owning per-instance files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Equipment,
    Accessory,
    Weapon,
    DemiHuman,
    Monster,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_race_index_is_dense() {
        for (expected, gr) in GenderRace::ALL.iter().enumerate() {
            assert_eq!(gr.index(), expected, "{:?}", gr);
        }
    }

    #[test]
    fn test_gender_race_code_round_trip() {
        assert_eq!(GenderRace::from_code(1401), Some(GenderRace::AuRaFemale));
        assert_eq!(GenderRace::from_code(1402), None);
        assert_eq!(GenderRace::MidlanderMale.to_string(), "c0101");
    }

    #[test]
    fn test_human_slot_index() {
        assert_eq!(HumanSlot::Unknown.index(), HumanSlot::MODEL_COUNT);
        assert_eq!(HumanSlot::ALL.len(), HumanSlot::MODEL_COUNT + 1);
    }

    #[test]
    fn test_equip_slot_positions() {
        assert_eq!(EquipSlot::Feet.position(), 4);
        assert_eq!(EquipSlot::LFinger.position(), 4);
        assert!(EquipSlot::Ears.is_accessory());
        assert!(EquipSlot::Legs.is_equipment());
    }
}
