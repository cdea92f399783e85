use crate::entry::RaftLogEntry;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::type_config::RaftTypeConfig;

/// A replication event produced by the leader handler and routed to the
/// per-follower log shippers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShipCommand<C: RaftTypeConfig> {
    /// A follower rejected an append; its shipper must back-track.
    /// `last_remote_append_index` is negative when the follower's log end
    /// is unknown.
    Mismatch {
        target: C::Member,
        last_remote_append_index: LogIndex,
    },

    /// A follower acknowledged entries up to `new_match_index`.
    Match {
        target: C::Member,
        new_match_index: LogIndex,
    },

    /// Fresh entries were appended locally; every pipelined shipper
    /// forwards them.
    NewEntries {
        prev_log_index: LogIndex,
        prev_log_term: Term,
        entries: Vec<RaftLogEntry<C>>,
    },
}
