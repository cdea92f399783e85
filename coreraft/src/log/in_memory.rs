use std::collections::BTreeMap;

use crate::entry::RaftLogEntry;
use crate::error::RaftLogError;
use crate::log::RaftLog;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::raft_types::NO_INDEX;
use crate::raft_types::NO_TERM;
use crate::type_config::RaftTypeConfig;

/// An in-memory [`RaftLog`], used by the test suite and as the reference
/// semantics for durable implementations.
#[derive(Debug, Clone)]
pub struct InMemoryRaftLog<C: RaftTypeConfig> {
    entries: BTreeMap<LogIndex, RaftLogEntry<C>>,
    append_index: LogIndex,
    prev_index: LogIndex,
}

impl<C: RaftTypeConfig> Default for InMemoryRaftLog<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RaftTypeConfig> InMemoryRaftLog<C> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            append_index: NO_INDEX,
            prev_index: NO_INDEX,
        }
    }
}

impl<C: RaftTypeConfig> RaftLog<C> for InMemoryRaftLog<C> {
    fn append(&mut self, entry: RaftLogEntry<C>) -> Result<LogIndex, RaftLogError> {
        self.append_index += 1;
        self.entries.insert(self.append_index, entry);
        Ok(self.append_index)
    }

    fn truncate(&mut self, from_index: LogIndex) -> Result<(), RaftLogError> {
        if from_index <= self.prev_index {
            return Err(RaftLogError::Pruned {
                index: from_index,
                prev_index: self.prev_index,
            });
        }
        self.entries.split_off(&from_index);
        if self.append_index >= from_index {
            self.append_index = from_index - 1;
        }
        Ok(())
    }

    fn prune(&mut self, safe_index: LogIndex) -> Result<LogIndex, RaftLogError> {
        let new_prev = safe_index - 1;
        if new_prev > self.prev_index {
            let retained = self.entries.split_off(&(new_prev + 1));
            self.entries = retained;
            self.prev_index = new_prev;
        }
        Ok(self.prev_index)
    }

    fn append_index(&self) -> LogIndex {
        self.append_index
    }

    fn prev_index(&self) -> LogIndex {
        self.prev_index
    }

    fn read_entry_term(&self, index: LogIndex) -> Result<Term, RaftLogError> {
        if index <= self.prev_index || index > self.append_index {
            return Ok(NO_TERM);
        }
        Ok(self.entries.get(&index).map(|e| e.term).unwrap_or(NO_TERM))
    }

    fn entries_from(&self, from_index: LogIndex) -> Result<Box<dyn Iterator<Item = RaftLogEntry<C>> + '_>, RaftLogError> {
        if from_index <= self.prev_index {
            return Err(RaftLogError::Pruned {
                index: from_index,
                prev_index: self.prev_index,
            });
        }
        Ok(Box::new(self.entries.range(from_index..).map(|(_, e)| e.clone())))
    }
}
