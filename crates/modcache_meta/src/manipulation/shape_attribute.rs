//! Shape and attribute toggles.
//!
//! Both formats switch a named model feature on or off for a (slot, instance,
//! gender/race) combination, with wildcards on every axis. They are stored in
//! an [`OverrideTable`](crate::OverrideTable) rather than a patched game table.

use crate::error::{MetaError, Result};
use crate::types::{GenderRace, HumanSlot, PrimaryId};
use std::fmt;

/// ASCII shape or attribute name stored inline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeAttributeName {
    bytes: [u8; Self::MAX_LEN],
    len: u8,
}

impl ShapeAttributeName {
    pub const MAX_LEN: usize = 31;
    pub const SHAPE_PREFIX: &'static str = "shp_";
    pub const ATTRIBUTE_PREFIX: &'static str = "atr_";

    /// Store a name after checking its length and character set.
    ///
    /// The prefix is checked by the identifier that uses the name.
    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason| MetaError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if !name.is_ascii() {
            return Err(invalid("must be ASCII"));
        }
        if name.len() > Self::MAX_LEN {
            return Err(invalid("longer than 31 bytes"));
        }
        if name.is_empty() {
            return Err(invalid("empty"));
        }

        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self {
            bytes,
            len: name.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        // Constructed from ASCII only.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }

    fn expect_prefix(&self, prefix: &'static str) -> Result<()> {
        if self.as_str().len() <= prefix.len() || !self.as_str().starts_with(prefix) {
            return Err(MetaError::InvalidName {
                name: self.as_str().to_string(),
                reason: if prefix == Self::SHAPE_PREFIX {
                    "shape names start with shp_"
                } else {
                    "attribute names start with atr_"
                },
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ShapeAttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ShapeAttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restricts a shape to models joined at a specific connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ShapeConnectorCondition {
    #[default]
    None,
    Wrists,
    Waist,
    Ankles,
}

impl ShapeConnectorCondition {
    /// Whether `slot` sits on either side of this connector.
    pub fn connects(self, slot: HumanSlot) -> bool {
        match self {
            ShapeConnectorCondition::None => true,
            ShapeConnectorCondition::Wrists => matches!(slot, HumanSlot::Body | HumanSlot::Hands),
            ShapeConnectorCondition::Waist => matches!(slot, HumanSlot::Body | HumanSlot::Legs),
            ShapeConnectorCondition::Ankles => matches!(slot, HumanSlot::Legs | HumanSlot::Feet),
        }
    }
}

fn validate_key(slot: HumanSlot, id: Option<PrimaryId>) -> Result<()> {
    if id.is_some() && slot.is_any() {
        return Err(MetaError::InvalidOverrideKey {
            slot,
            reason: "a specific instance needs a specific slot",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShpIdentifier {
    pub slot: HumanSlot,
    pub id: Option<PrimaryId>,
    pub shape: ShapeAttributeName,
    pub gender_race: GenderRace,
    pub connector: ShapeConnectorCondition,
}

impl ShpIdentifier {
    pub fn validate(&self) -> Result<()> {
        self.shape.expect_prefix(ShapeAttributeName::SHAPE_PREFIX)?;
        validate_key(self.slot, self.id)?;
        if !self.connector.connects(self.slot) {
            return Err(MetaError::InvalidConnector {
                slot: self.slot,
                connector: self.connector,
            });
        }
        Ok(())
    }
}

/// Whether the shape is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShpEntry(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtrIdentifier {
    pub slot: HumanSlot,
    pub id: Option<PrimaryId>,
    pub attribute: ShapeAttributeName,
    pub gender_race: GenderRace,
}

impl AtrIdentifier {
    pub fn validate(&self) -> Result<()> {
        self.attribute
            .expect_prefix(ShapeAttributeName::ATTRIBUTE_PREFIX)?;
        validate_key(self.slot, self.id)
    }
}

/// Whether the attribute is kept; `false` suppresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtrEntry(pub bool);

#[cfg(test)]
mod tests {
    use super::*;

    fn shp(name: &str, slot: HumanSlot, id: Option<u16>) -> ShpIdentifier {
        ShpIdentifier {
            slot,
            id: id.map(PrimaryId),
            shape: ShapeAttributeName::new(name).unwrap(),
            gender_race: GenderRace::Unknown,
            connector: ShapeConnectorCondition::None,
        }
    }

    #[test]
    fn test_name_limits() {
        assert!(ShapeAttributeName::new("shp_ok").is_ok());
        assert!(ShapeAttributeName::new(&"a".repeat(31)).is_ok());
        assert!(ShapeAttributeName::new(&"a".repeat(32)).is_err());
        assert!(ShapeAttributeName::new("shp_ü").is_err());
        assert!(ShapeAttributeName::new("").is_err());
    }

    #[test]
    fn test_prefix_is_checked_per_format() {
        assert!(shp("shp_wa", HumanSlot::Body, None).validate().is_ok());
        assert!(matches!(
            shp("atr_wa", HumanSlot::Body, None).validate(),
            Err(MetaError::InvalidName { .. })
        ));
        assert!(matches!(
            shp("shp_", HumanSlot::Body, None).validate(),
            Err(MetaError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_instance_requires_slot() {
        assert!(shp("shp_a", HumanSlot::Head, Some(42)).validate().is_ok());
        assert!(matches!(
            shp("shp_a", HumanSlot::Unknown, Some(42)).validate(),
            Err(MetaError::InvalidOverrideKey { .. })
        ));
    }

    #[test]
    fn test_connector_slots() {
        let mut id = shp("shp_wr", HumanSlot::Hands, None);
        id.connector = ShapeConnectorCondition::Wrists;
        assert!(id.validate().is_ok());
        id.slot = HumanSlot::Feet;
        assert!(matches!(
            id.validate(),
            Err(MetaError::InvalidConnector { .. })
        ));
    }

    #[test]
    fn test_name_display() {
        let name = ShapeAttributeName::new("atr_tail").unwrap();
        assert_eq!(name.to_string(), "atr_tail");
        assert_eq!(format!("{name:?}"), "\"atr_tail\"");
    }
}
