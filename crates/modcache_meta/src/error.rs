//! Error types for metadata manipulation.
//!
//! Validation failures get their own variants so callers can tell a rejected
//! manipulation apart from an I/O or layout problem when logging.

use crate::manipulation::ShapeConnectorCondition;
use crate::types::{EquipSlot, HumanSlot, ObjectType, Variant};
use modcache_core::VirtualPath;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MetaError>;

#[derive(Error, Debug)]
pub enum MetaError {
    /// The slot does not belong to the family the format expects.
    #[error("Slot {slot:?} is not valid for {format}")]
    InvalidSlot { format: &'static str, slot: EquipSlot },

    /// The format requires a concrete gender/race.
    #[error("{0} manipulations need a specified gender/race")]
    UnspecifiedGenderRace(&'static str),

    /// Shape or attribute name is malformed.
    #[error("Invalid shape/attribute name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// An override addresses a specific instance without a specific slot.
    #[error("Invalid override key for slot {slot:?}: {reason}")]
    InvalidOverrideKey {
        slot: HumanSlot,
        reason: &'static str,
    },

    /// A connector condition was combined with a slot it cannot connect.
    #[error("Connector condition {connector:?} does not apply to slot {slot:?}")]
    InvalidConnector {
        slot: HumanSlot,
        connector: ShapeConnectorCondition,
    },

    /// No compiled default exists for the per-instance file.
    #[error("No default file for {0}")]
    MissingImcFile(VirtualPath),

    /// The variant index is outside the file's variant count.
    #[error("Variant {variant:?} out of range for {path} ({count} variants)")]
    InvalidImcVariant {
        path: VirtualPath,
        variant: Variant,
        count: u16,
    },

    /// The file does not contain a part for the requested slot.
    #[error("{path} has no part for {slot:?}")]
    InvalidImcPart { path: VirtualPath, slot: EquipSlot },

    /// Object type and slot disagree.
    #[error("Slot {slot:?} is not valid for object type {object_type:?}")]
    InvalidImcSlot {
        object_type: ObjectType,
        slot: EquipSlot,
    },

    /// Racial scaling values must be finite and within range.
    #[error("Racial scaling value {0} is out of range")]
    InvalidRspValue(f32),

    /// A base table did not match its fixed layout.
    #[error("Malformed {table} table: {reason}")]
    TableLayout {
        table: &'static str,
        reason: String,
    },

    /// A generated game path failed path validation.
    #[error(transparent)]
    Path(#[from] modcache_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetaError {
    /// Whether this error is a structural rejection of a manipulation.
    pub fn is_validation(&self) -> bool {
        !matches!(self, MetaError::TableLayout { .. } | MetaError::Io(_))
    }
}
