//! Access to the unpatched game data.

use crate::error::Result;
use crate::manipulation::ImcFile;
use crate::tables::{EqdpTable, EqpTable, EstTable, GmpTable, RspTable};
use crate::types::{EstType, GenderRace};
use modcache_core::VirtualPath;
use std::collections::HashMap;

/// Read-only view of the base tables and compiled per-instance files.
///
/// Reverting a manipulation always restores the value read from here.
pub trait MetaDefaults: Send + Sync {
    fn eqp(&self) -> &EqpTable;

    /// Deformation table of one gender/race and family, if the game has one.
    fn eqdp(&self, gender_race: GenderRace, accessory: bool) -> Option<&EqdpTable>;

    fn est(&self, kind: EstType) -> &EstTable;

    fn gmp(&self) -> &GmpTable;

    fn rsp(&self) -> &RspTable;

    /// Compiled default of a per-instance file.
    fn imc_file(&self, path: &VirtualPath) -> Option<&ImcFile>;
}

/// In-memory base tables.
#[derive(Debug, Clone, Default)]
pub struct BaseTables {
    eqp: EqpTable,
    eqdp: HashMap<(GenderRace, bool), EqdpTable>,
    est: HashMap<EstType, EstTable>,
    gmp: GmpTable,
    rsp: RspTable,
    imc: HashMap<VirtualPath, ImcFile>,
    empty_est: EstTable,
}

impl BaseTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eqp(mut self, table: EqpTable) -> Self {
        self.eqp = table;
        self
    }

    pub fn with_eqdp(mut self, gender_race: GenderRace, accessory: bool, table: EqdpTable) -> Self {
        self.eqdp.insert((gender_race, accessory), table);
        self
    }

    pub fn with_est(mut self, kind: EstType, table: EstTable) -> Self {
        self.est.insert(kind, table);
        self
    }

    pub fn with_gmp(mut self, table: GmpTable) -> Self {
        self.gmp = table;
        self
    }

    pub fn with_rsp(mut self, table: RspTable) -> Self {
        self.rsp = table;
        self
    }

    pub fn with_imc_file(mut self, path: VirtualPath, file: ImcFile) -> Self {
        self.imc.insert(path, file);
        self
    }

    /// Parse and register a per-instance file from its raw bytes.
    pub fn load_imc_file(&mut self, path: VirtualPath, bytes: &[u8]) -> Result<()> {
        self.imc.insert(path, ImcFile::parse(bytes)?);
        Ok(())
    }
}

impl MetaDefaults for BaseTables {
    fn eqp(&self) -> &EqpTable {
        &self.eqp
    }

    fn eqdp(&self, gender_race: GenderRace, accessory: bool) -> Option<&EqdpTable> {
        self.eqdp.get(&(gender_race, accessory))
    }

    fn est(&self, kind: EstType) -> &EstTable {
        self.est.get(&kind).unwrap_or(&self.empty_est)
    }

    fn gmp(&self) -> &GmpTable {
        &self.gmp
    }

    fn rsp(&self) -> &RspTable {
        &self.rsp
    }

    fn imc_file(&self, path: &VirtualPath) -> Option<&ImcFile> {
        self.imc.get(path)
    }
}
