//! Typed metadata manipulations.
//!
//! A manipulation is an identifier (which record or slot it addresses) plus an
//! entry (the value it writes). Two manipulations contend for the same
//! resource exactly when their [`MetaIdentifier`]s are equal.

pub mod eqdp;
pub mod eqp;
pub mod est;
pub mod global_eqp;
pub mod gmp;
pub mod imc;
pub mod rsp;
pub mod shape_attribute;

pub use eqdp::{EqdpEntry, EqdpIdentifier};
pub use eqp::{EqpEntry, EqpIdentifier};
pub use est::{EstEntry, EstIdentifier};
pub use global_eqp::{GlobalEqpManipulation, GlobalEqpType};
pub use gmp::{GmpEntry, GmpIdentifier};
pub use imc::{ImcEntry, ImcFile, ImcIdentifier};
pub use rsp::{RspEntry, RspIdentifier};
pub use shape_attribute::{
    AtrEntry, AtrIdentifier, ShapeAttributeName, ShapeConnectorCondition, ShpEntry,
    ShpIdentifier,
};

use crate::defaults::MetaDefaults;
use crate::error::{MetaError, Result};
use std::fmt;

/// Format tag of a manipulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaFormat {
    Eqp,
    Eqdp,
    Est,
    Gmp,
    Rsp,
    GlobalEqp,
    Imc,
    Shp,
    Atr,
}

/// A single typed metadata edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaManipulation {
    Eqp(EqpIdentifier, EqpEntry),
    Eqdp(EqdpIdentifier, EqdpEntry),
    Est(EstIdentifier, EstEntry),
    Gmp(GmpIdentifier, GmpEntry),
    Rsp(RspIdentifier, RspEntry),
    GlobalEqp(GlobalEqpManipulation),
    Imc(ImcIdentifier, ImcEntry),
    Shp(ShpIdentifier, ShpEntry),
    Atr(AtrIdentifier, AtrEntry),
}

/// Identifier-only projection of a [`MetaManipulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaIdentifier {
    Eqp(EqpIdentifier),
    Eqdp(EqdpIdentifier),
    Est(EstIdentifier),
    Gmp(GmpIdentifier),
    Rsp(RspIdentifier),
    GlobalEqp(GlobalEqpManipulation),
    Imc(ImcIdentifier),
    Shp(ShpIdentifier),
    Atr(AtrIdentifier),
}

impl MetaManipulation {
    pub fn identifier(&self) -> MetaIdentifier {
        match self {
            MetaManipulation::Eqp(id, _) => MetaIdentifier::Eqp(*id),
            MetaManipulation::Eqdp(id, _) => MetaIdentifier::Eqdp(*id),
            MetaManipulation::Est(id, _) => MetaIdentifier::Est(*id),
            MetaManipulation::Gmp(id, _) => MetaIdentifier::Gmp(*id),
            MetaManipulation::Rsp(id, _) => MetaIdentifier::Rsp(*id),
            MetaManipulation::GlobalEqp(id) => MetaIdentifier::GlobalEqp(*id),
            MetaManipulation::Imc(id, _) => MetaIdentifier::Imc(*id),
            MetaManipulation::Shp(id, _) => MetaIdentifier::Shp(*id),
            MetaManipulation::Atr(id, _) => MetaIdentifier::Atr(*id),
        }
    }

    pub fn format(&self) -> MetaFormat {
        self.identifier().format()
    }

    /// Structural validation. Nothing may be recorded for a manipulation that
    /// fails here.
    pub fn validate(&self, defaults: &dyn MetaDefaults) -> Result<()> {
        match self {
            MetaManipulation::Eqp(id, _) => id.validate(),
            MetaManipulation::Eqdp(id, _) => id.validate(),
            MetaManipulation::Est(id, _) => id.validate(),
            MetaManipulation::Gmp(_, _) | MetaManipulation::GlobalEqp(_) => Ok(()),
            MetaManipulation::Rsp(_, entry) => entry.validate(),
            MetaManipulation::Imc(id, _) => {
                id.validate_shape()?;
                let path = id.game_path()?;
                let file = defaults
                    .imc_file(&path)
                    .ok_or(MetaError::MissingImcFile(path))?;
                id.validate_against(file)
            }
            MetaManipulation::Shp(id, _) => id.validate(),
            MetaManipulation::Atr(id, _) => id.validate(),
        }
    }
}

impl MetaIdentifier {
    pub fn format(&self) -> MetaFormat {
        match self {
            MetaIdentifier::Eqp(_) => MetaFormat::Eqp,
            MetaIdentifier::Eqdp(_) => MetaFormat::Eqdp,
            MetaIdentifier::Est(_) => MetaFormat::Est,
            MetaIdentifier::Gmp(_) => MetaFormat::Gmp,
            MetaIdentifier::Rsp(_) => MetaFormat::Rsp,
            MetaIdentifier::GlobalEqp(_) => MetaFormat::GlobalEqp,
            MetaIdentifier::Imc(_) => MetaFormat::Imc,
            MetaIdentifier::Shp(_) => MetaFormat::Shp,
            MetaIdentifier::Atr(_) => MetaFormat::Atr,
        }
    }
}

impl fmt::Display for MetaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaIdentifier::Eqp(id) => write!(f, "Eqp(e{} {:?})", id.set_id, id.slot),
            MetaIdentifier::Eqdp(id) => {
                write!(f, "Eqdp(e{} {:?} {})", id.set_id, id.slot, id.gender_race)
            }
            MetaIdentifier::Est(id) => {
                write!(f, "Est({} {:?} {})", id.set_id, id.slot, id.gender_race)
            }
            MetaIdentifier::Gmp(id) => write!(f, "Gmp(e{})", id.set_id),
            MetaIdentifier::Rsp(id) => write!(f, "Rsp({:?} {:?})", id.sub_race, id.attribute),
            MetaIdentifier::GlobalEqp(id) => {
                write!(f, "GlobalEqp({:?} {})", id.kind, id.condition)
            }
            MetaIdentifier::Imc(id) => write!(
                f,
                "Imc({} v{} {:?})",
                id.raw_game_path(),
                id.variant.0,
                id.slot
            ),
            MetaIdentifier::Shp(id) => write!(
                f,
                "Shp({} {:?} {:?} {} {:?})",
                id.shape, id.slot, id.id, id.gender_race, id.connector
            ),
            MetaIdentifier::Atr(id) => write!(
                f,
                "Atr({} {:?} {:?} {})",
                id.attribute, id.slot, id.id, id.gender_race
            ),
        }
    }
}
