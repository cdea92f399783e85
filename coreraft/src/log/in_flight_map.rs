use std::collections::BTreeMap;

use crate::entry::RaftLogEntry;
use crate::raft_types::LogIndex;
use crate::type_config::RaftTypeConfig;

/// A cache of recently appended entries keyed by index.
///
/// The leader fills it as it writes entries and log shippers consult it
/// before falling back to [`RaftLog::entries_from`](crate::RaftLog::entries_from).
/// It is not a correctness component: a miss only costs a log read.
///
/// Entries are evicted from the head once the map exceeds its capacity,
/// and removed eagerly when the corresponding log prefix is pruned or a
/// suffix is truncated.
#[derive(Debug, Clone)]
pub struct InFlightMap<C: RaftTypeConfig> {
    entries: BTreeMap<LogIndex, RaftLogEntry<C>>,
    capacity: usize,
}

impl<C: RaftTypeConfig> InFlightMap<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    /// Register an entry; the first write for an index wins. Returns false
    /// if the index was already present.
    pub fn put(&mut self, index: LogIndex, entry: RaftLogEntry<C>) -> bool {
        if self.entries.contains_key(&index) {
            return false;
        }
        self.entries.insert(index, entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_first();
        }
        true
    }

    pub fn get(&self, index: LogIndex) -> Option<&RaftLogEntry<C>> {
        self.entries.get(&index)
    }

    /// Drop all cached entries with index `>= from_index`.
    pub fn truncate_from(&mut self, from_index: LogIndex) {
        self.entries.split_off(&from_index);
    }

    /// Drop all cached entries with index `<= up_to_index`.
    pub fn prune(&mut self, up_to_index: LogIndex) {
        self.entries = self.entries.split_off(&(up_to_index + 1));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
