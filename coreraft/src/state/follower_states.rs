//! Leader-side replication progress per follower.

use std::collections::HashMap;
use std::fmt;

use crate::raft_types::LogIndex;
use crate::raft_types::NO_INDEX;
use crate::type_config::RaftTypeConfig;

/// What the leader knows to be replicated on one follower.
///
/// Only the match index lives here; the probe/streaming positions are
/// private to the follower's log shipper, which is their single writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowerState {
    pub match_index: LogIndex,
}

impl Default for FollowerState {
    fn default() -> Self {
        Self { match_index: NO_INDEX }
    }
}

impl fmt::Display for FollowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{matchIndex={}}}", self.match_index)
    }
}

/// The [`FollowerState`] of every other voting member, kept by leaders for
/// commit computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowerStates<C: RaftTypeConfig> {
    states: HashMap<C::Member, FollowerState>,
}

impl<C: RaftTypeConfig> Default for FollowerStates<C> {
    fn default() -> Self {
        Self { states: HashMap::new() }
    }
}

impl<C: RaftTypeConfig> FollowerStates<C> {
    /// Fresh states for the given followers, each with no match known yet.
    pub fn fresh(followers: impl IntoIterator<Item = C::Member>) -> Self {
        Self {
            states: followers.into_iter().map(|m| (m, FollowerState::default())).collect(),
        }
    }

    pub fn get(&self, member: &C::Member) -> Option<&FollowerState> {
        self.states.get(member)
    }

    pub fn contains(&self, member: &C::Member) -> bool {
        self.states.contains_key(member)
    }

    /// Raise the match index of `member`; a lower value is ignored since
    /// responses can be reordered.
    pub fn on_match(&mut self, member: &C::Member, match_index: LogIndex) {
        if let Some(s) = self.states.get_mut(member) {
            if match_index > s.match_index {
                s.match_index = match_index;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&C::Member, &FollowerState)> {
        self.states.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
