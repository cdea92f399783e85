//! Per-follower log replication.
//!
//! The leader runs one [`RaftLogShipper`] per other voting member. A
//! shipper is a small state machine fed with match/mismatch/new-entry
//! events from the leader handler (through the instance queue) and with
//! retry/heartbeat timeouts from the instance tick.

mod log_shipper;
mod log_shipping;

#[cfg(test)]
mod log_shipper_test;

pub(crate) use log_shipper::RaftLogShipper;
pub(crate) use log_shipping::LogShipping;

use crate::raft_types::LogIndex;
use crate::raft_types::Term;

/// The leader's view at the time a replication event was produced.
///
/// Shippers never read the consensus state directly; everything they need
/// beyond the log travels in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeaderContext {
    pub(crate) term: Term,
    pub(crate) commit_index: LogIndex,
}

impl LeaderContext {
    pub(crate) fn new(term: Term, commit_index: LogIndex) -> Self {
        Self { term, commit_index }
    }
}
