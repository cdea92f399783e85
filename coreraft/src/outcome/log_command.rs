use crate::entry::RaftLogEntry;
use crate::raft_types::LogIndex;
use crate::type_config::RaftTypeConfig;

/// A mutation of the entry log requested by a handler and applied by the
/// state update layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogCommand<C: RaftTypeConfig> {
    /// Append `entries`, the first of which must land at `base_index`.
    Append {
        base_index: LogIndex,
        entries: Vec<RaftLogEntry<C>>,
    },

    /// Remove all entries with index `>= from_index`. Truncating a
    /// committed entry is a safety violation caught on application.
    Truncate { from_index: LogIndex },
}
