//! Typed metadata manipulations and their per-collection caches.
//!
//! Mods edit game metadata in three ways:
//!
//! - patching records of shared base tables ([`EqpTable`], [`EqdpTable`],
//!   [`EstTable`], [`GmpTable`], [`RspTable`]),
//! - editing small per-instance files ([`ImcFile`]) that are then served as
//!   synthetic files,
//! - toggling shapes and attributes through an [`OverrideTable`].
//!
//! [`MetaCache`] tracks which mod owns each [`MetaIdentifier`] and produces the
//! patched tables, which are pushed to the host through a [`TableSink`].

pub mod cache;
pub mod defaults;
pub mod error;
pub mod manipulation;
pub mod override_table;
pub mod sink;
pub mod tables;
pub mod types;

pub use cache::{FilePublication, MetaCache, TableSpace};
pub use defaults::{BaseTables, MetaDefaults};
pub use error::{MetaError, Result};
pub use manipulation::*;
pub use override_table::{OverrideTable, SetOutcome, TriState};
pub use sink::{MemoryTableSink, ScopedTables, TableKey, TableSink};
pub use tables::{EqdpTable, EqpTable, EstTable, GmpTable, RspTable};
pub use types::{
    EquipSlot, EstType, GenderRace, HumanSlot, ObjectType, PrimaryId, RspAttribute, SecondaryId,
    SubRace, Variant,
};
