//! The replicated operation log.
//!
//! Only the abstract contract and the in-memory representation live here;
//! the durable segmented log is a collaborator implementing [`RaftLog`].

mod in_flight_map;
mod in_memory;

pub use in_flight_map::InFlightMap;
pub use in_memory::InMemoryRaftLog;

use crate::entry::RaftLogEntry;
use crate::error::RaftLogError;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::type_config::RaftTypeConfig;

/// An append-only ordered log of `(term, payload)` entries with prefix
/// pruning and random reads.
///
/// Indices are dense and monotonically assigned; the first entry sits at
/// index `0`. Entries at and below [`prev_index`](RaftLog::prev_index)
/// have been pruned and are no longer readable; reading their term yields
/// the `-1` sentinel. Pruning never moves
/// [`append_index`](RaftLog::append_index).
pub trait RaftLog<C: RaftTypeConfig>: Send + 'static {
    /// Append the entry, returning its assigned index
    /// (`append_index() + 1` at the time of the call).
    fn append(&mut self, entry: RaftLogEntry<C>) -> Result<LogIndex, RaftLogError>;

    /// Remove all entries with index `>= from_index`.
    ///
    /// Callers must never truncate committed entries; the state update
    /// layer enforces this as a safety violation.
    fn truncate(&mut self, from_index: LogIndex) -> Result<(), RaftLogError>;

    /// Discard entries strictly below `safe_index`, making room ahead of
    /// the commit line. Returns the new
    /// [`prev_index`](RaftLog::prev_index), which is `safe_index - 1`
    /// unless the log had already pruned further.
    fn prune(&mut self, safe_index: LogIndex) -> Result<LogIndex, RaftLogError>;

    /// The index of the last appended entry, or `-1` if the log is empty.
    fn append_index(&self) -> LogIndex;

    /// The index of the last pruned entry, or `-1` if nothing was pruned.
    fn prev_index(&self) -> LogIndex;

    /// The term of the entry at `index`, or `-1` if there is no readable
    /// entry there (before the log, pruned away, or past the end).
    fn read_entry_term(&self, index: LogIndex) -> Result<Term, RaftLogError>;

    /// An ordered sequence of the readable entries starting at
    /// `from_index`. The sequence is finite and must not be reused across
    /// mutations of the log.
    ///
    /// Requesting a pruned start index is reported as
    /// [`RaftLogError::Pruned`] so that replication can turn it into a
    /// compaction signal.
    fn entries_from(&self, from_index: LogIndex) -> Result<Box<dyn Iterator<Item = RaftLogEntry<C>> + '_>, RaftLogError>;

    /// The entry at `index`, if it is readable.
    fn read_entry(&self, index: LogIndex) -> Result<Option<RaftLogEntry<C>>, RaftLogError> {
        if index > self.append_index() {
            return Ok(None);
        }
        Ok(self.entries_from(index)?.next())
    }
}
