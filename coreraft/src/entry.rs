//! Log entry type.

use std::fmt;

use crate::raft_types::Term;
use crate::type_config::RaftTypeConfig;

/// One entry of the replicated log: the term it was proposed in and an
/// opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct RaftLogEntry<C: RaftTypeConfig> {
    pub term: Term,
    pub content: C::Content,
}

impl<C: RaftTypeConfig> RaftLogEntry<C> {
    pub fn new(term: Term, content: C::Content) -> Self {
        Self { term, content }
    }
}

impl<C: RaftTypeConfig> fmt::Display for RaftLogEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{term={} content={:?}}}", self.term, self.content)
    }
}
