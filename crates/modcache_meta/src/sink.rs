//! Publication of patched tables to the host.

use crate::types::{EstType, GenderRace};
use std::collections::HashMap;
use std::sync::Arc;

/// One host-side table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKey {
    Eqp,
    /// Deformation table of a gender/race, accessory family when `true`.
    Eqdp(GenderRace, bool),
    Est(EstType),
    Gmp,
    Rsp,
}

impl TableKey {
    /// Every table slot the host exposes.
    pub fn all() -> impl Iterator<Item = TableKey> {
        let eqdp = GenderRace::ALL
            .into_iter()
            .filter(|gr| gr.is_specified())
            .flat_map(|gr| [TableKey::Eqdp(gr, false), TableKey::Eqdp(gr, true)]);
        [TableKey::Eqp, TableKey::Gmp, TableKey::Rsp]
            .into_iter()
            .chain(EstType::ALL.into_iter().map(TableKey::Est))
            .chain(eqdp)
    }
}

/// Destination for patched tables, normally the host's table space.
pub trait TableSink {
    /// Replace the live contents of a table.
    fn set_table(&mut self, key: TableKey, bytes: Arc<[u8]>);

    /// Restore the unpatched base table.
    fn reset_table(&mut self, key: TableKey);

    /// Patched contents currently installed, `None` when the base table is live.
    fn current_table(&self, key: TableKey) -> Option<Arc<[u8]>>;
}

/// Sink that keeps tables in memory.
#[derive(Debug, Default)]
pub struct MemoryTableSink {
    tables: HashMap<TableKey, Arc<[u8]>>,
    writes: usize,
}

impl MemoryTableSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: TableKey) -> Option<&[u8]> {
        self.tables.get(&key).map(|bytes| &bytes[..])
    }

    /// Number of patched tables currently installed.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Total `set_table`/`reset_table` calls received.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TableSink for MemoryTableSink {
    fn set_table(&mut self, key: TableKey, bytes: Arc<[u8]>) {
        self.writes += 1;
        self.tables.insert(key, bytes);
    }

    fn reset_table(&mut self, key: TableKey) {
        self.writes += 1;
        self.tables.remove(&key);
    }

    fn current_table(&self, key: TableKey) -> Option<Arc<[u8]>> {
        self.tables.get(&key).cloned()
    }
}

/// Temporarily installed tables.
///
/// The previous sink contents come back when the guard is dropped or
/// [`release`](Self::release)d.
pub struct ScopedTables<'a> {
    sink: &'a mut dyn TableSink,
    previous: Vec<(TableKey, Option<Arc<[u8]>>)>,
}

impl<'a> ScopedTables<'a> {
    pub fn install(
        sink: &'a mut dyn TableSink,
        tables: impl IntoIterator<Item = (TableKey, Arc<[u8]>)>,
    ) -> Self {
        let mut previous = Vec::new();
        for (key, bytes) in tables {
            previous.push((key, sink.current_table(key)));
            sink.set_table(key, bytes);
        }
        Self { sink, previous }
    }

    /// Keys installed by this guard.
    pub fn keys(&self) -> impl Iterator<Item = TableKey> + '_ {
        self.previous.iter().map(|(key, _)| *key)
    }

    pub fn release(self) {}
}

impl Drop for ScopedTables<'_> {
    fn drop(&mut self) {
        // Reverse order so a key installed twice ends on its oldest value.
        for (key, previous) in self.previous.drain(..).rev() {
            match previous {
                Some(bytes) => self.sink.set_table(key, bytes),
                None => self.sink.reset_table(key),
            }
        }
    }
}
