//! Per-collection work scheduling.
//!
//! Events never touch a cache directly; they queue work that the manager runs
//! on its next tick. Work is keyed by collection:
//!
//! 1. A queued full recalculation replaces any incremental work for the same
//!    collection.
//! 2. Incremental jobs arriving while a full recalculation is queued are dropped.
//! 3. A collection whose incremental list grows past the threshold is escalated
//!    to a full recalculation.
//!
//! Full recalculations queued as important run in the first phase of the next
//! tick; everything else runs in the second.

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use modcache_core::{CollectionId, ModKey};
use tracing::{debug, trace};

/// An incremental edit of one collection cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheJob {
    AddMod(ModKey),
    RemoveMod(ModKey),
    ReloadMod(ModKey),
}

impl CacheJob {
    pub fn mod_key(self) -> ModKey {
        match self {
            CacheJob::AddMod(key) | CacheJob::RemoveMod(key) | CacheJob::ReloadMod(key) => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWork {
    Full,
    Incremental(Vec<CacheJob>),
}

#[derive(Debug)]
pub struct WorkQueue {
    pending: IndexMap<CollectionId, PendingWork>,
    important: IndexSet<CollectionId>,
    threshold: usize,
}

impl WorkQueue {
    pub fn new(threshold: usize) -> Self {
        Self {
            pending: IndexMap::new(),
            important: IndexSet::new(),
            threshold,
        }
    }

    /// Queue a full recalculation, superseding queued incremental work.
    pub fn push_full(&mut self, id: CollectionId, important: bool) {
        if let Some(PendingWork::Incremental(jobs)) = self.pending.get(&id) {
            debug!(collection = %id, dropped = jobs.len(), "Full recalculation supersedes queued jobs");
        }
        self.pending.insert(id, PendingWork::Full);
        if important {
            self.important.insert(id);
        }
    }

    /// Queue an incremental job.
    pub fn push(&mut self, id: CollectionId, job: CacheJob) {
        match self.pending.entry(id) {
            Entry::Occupied(mut entry) => {
                let escalate = match entry.get_mut() {
                    PendingWork::Full => {
                        trace!(collection = %id, ?job, "Dropped job, full recalculation pending");
                        false
                    }
                    PendingWork::Incremental(jobs) => {
                        if jobs.last() != Some(&job) {
                            jobs.push(job);
                        }
                        jobs.len() > self.threshold
                    }
                };
                if escalate {
                    debug!(collection = %id, threshold = self.threshold, "Escalated queued jobs to a full recalculation");
                    entry.insert(PendingWork::Full);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(PendingWork::Incremental(vec![job]));
            }
        }
    }

    /// Remove the important work for this tick.
    pub fn take_important(&mut self) -> Vec<(CollectionId, PendingWork)> {
        let ids: Vec<CollectionId> = self.important.drain(..).collect();
        ids.into_iter()
            .filter_map(|id| Some((id, self.pending.shift_remove(&id)?)))
            .collect()
    }

    /// Remove everything that is left, in arrival order.
    pub fn take_delayed(&mut self) -> Vec<(CollectionId, PendingWork)> {
        self.important.clear();
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Forget the work of a collection that is no longer active.
    pub fn remove(&mut self, id: CollectionId) {
        self.pending.shift_remove(&id);
        self.important.shift_remove(&id);
    }

    pub fn is_pending_full(&self, id: CollectionId) -> bool {
        matches!(self.pending.get(&id), Some(PendingWork::Full))
    }

    /// Number of collections with queued work.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: CollectionId = CollectionId(1);
    const TWO: CollectionId = CollectionId(2);
    const A: ModKey = ModKey::Persisted(0);
    const B: ModKey = ModKey::Persisted(1);

    #[test]
    fn test_full_supersedes_incremental() {
        let mut queue = WorkQueue::new(64);
        queue.push(ONE, CacheJob::AddMod(A));
        queue.push_full(ONE, false);
        queue.push(ONE, CacheJob::RemoveMod(B));

        assert!(queue.is_pending_full(ONE));
        assert_eq!(queue.take_delayed(), vec![(ONE, PendingWork::Full)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_escalates_past_threshold() {
        let mut queue = WorkQueue::new(2);
        queue.push(ONE, CacheJob::AddMod(A));
        queue.push(ONE, CacheJob::AddMod(A));
        queue.push(ONE, CacheJob::ReloadMod(B));
        assert!(!queue.is_pending_full(ONE));
        queue.push(ONE, CacheJob::RemoveMod(A));
        assert!(queue.is_pending_full(ONE));
    }

    #[test]
    fn test_important_first() {
        let mut queue = WorkQueue::new(64);
        queue.push(ONE, CacheJob::AddMod(A));
        queue.push_full(TWO, true);

        assert_eq!(queue.take_important(), vec![(TWO, PendingWork::Full)]);
        assert!(queue.take_important().is_empty());
        assert_eq!(
            queue.take_delayed(),
            vec![(ONE, PendingWork::Incremental(vec![CacheJob::AddMod(A)]))]
        );
    }

    #[test]
    fn test_remove_forgets_collection() {
        let mut queue = WorkQueue::new(64);
        queue.push_full(ONE, true);
        queue.remove(ONE);
        assert!(queue.take_important().is_empty());
        assert_eq!(queue.len(), 0);
    }
}
