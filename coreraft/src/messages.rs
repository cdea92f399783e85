//! The messages exchanged between cluster members.
//!
//! The bit layout on the wire is owned by the transport; the fields here
//! are the canonical content. A heartbeat is not a distinct message: it is
//! an [`AppendEntriesRequest`] with no entries and the current leader
//! commit.

use std::fmt;

use crate::entry::RaftLogEntry;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::store_id::StoreId;
use crate::type_config::RaftTypeConfig;

/// A candidate asks for a vote in `term`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct VoteRequest<C: RaftTypeConfig> {
    pub from: C::Member,
    pub term: Term,
    pub candidate: C::Member,
    pub last_log_index: LogIndex,
    pub last_log_term: Term,
    /// Identity of the candidate's data store; receivers deny candidates
    /// attached to an incompatible store.
    pub store_id: StoreId,
}

impl<C: RaftTypeConfig> fmt::Display for VoteRequest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vote.Request{{from={} term={} lastLog=({},{})}}",
            self.from, self.term, self.last_log_index, self.last_log_term
        )
    }
}

/// The answer to a [`VoteRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct VoteResponse<C: RaftTypeConfig> {
    pub from: C::Member,
    pub term: Term,
    pub granted: bool,
}

impl<C: RaftTypeConfig> fmt::Display for VoteResponse<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vote.Response{{from={} term={} granted={}}}", self.from, self.term, self.granted)
    }
}

/// Log replication from a leader, also serving as heartbeat when `entries`
/// is empty.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct AppendEntriesRequest<C: RaftTypeConfig> {
    pub from: C::Member,
    pub term: Term,
    pub prev_log_index: LogIndex,
    pub prev_log_term: Term,
    pub entries: Vec<RaftLogEntry<C>>,
    pub leader_commit: LogIndex,
}

impl<C: RaftTypeConfig> fmt::Display for AppendEntriesRequest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AppendEntries.Request{{from={} term={} prev=({},{}) entries={} leaderCommit={}}}",
            self.from,
            self.term,
            self.prev_log_index,
            self.prev_log_term,
            self.entries.len(),
            self.leader_commit
        )
    }
}

/// The answer to an [`AppendEntriesRequest`].
///
/// On failure `match_index` is the sentinel `-1`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct AppendEntriesResponse<C: RaftTypeConfig> {
    pub from: C::Member,
    pub term: Term,
    pub success: bool,
    pub match_index: LogIndex,
}

impl<C: RaftTypeConfig> fmt::Display for AppendEntriesResponse<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AppendEntries.Response{{from={} term={} success={} matchIndex={}}}",
            self.from, self.term, self.success, self.match_index
        )
    }
}

/// Sent by a leader when a follower needs entries that have been pruned
/// away; the follower should catch up out of band (store copy).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct LogCompactionInfo<C: RaftTypeConfig> {
    pub from: C::Member,
    pub term: Term,
    pub prev_index: LogIndex,
}

impl<C: RaftTypeConfig> fmt::Display for LogCompactionInfo<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogCompactionInfo{{from={} term={} prevIndex={}}}", self.from, self.term, self.prev_index)
    }
}

/// A client submission: replicate `content` through the cluster.
///
/// Only meaningful on the leader; other roles drop it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct NewEntryRequest<C: RaftTypeConfig> {
    pub content: C::Content,
}

/// Every kind of message a member can receive, including locally
/// synthesized timer events.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub enum RaftMessage<C: RaftTypeConfig> {
    VoteRequest(VoteRequest<C>),
    VoteResponse(VoteResponse<C>),
    AppendEntriesRequest(AppendEntriesRequest<C>),
    AppendEntriesResponse(AppendEntriesResponse<C>),
    LogCompactionInfo(LogCompactionInfo<C>),
    NewEntry(NewEntryRequest<C>),
    /// The election timer elapsed without leader contact.
    ElectionTimeout,
}

impl<C: RaftTypeConfig> fmt::Display for RaftMessage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaftMessage::VoteRequest(m) => fmt::Display::fmt(m, f),
            RaftMessage::VoteResponse(m) => fmt::Display::fmt(m, f),
            RaftMessage::AppendEntriesRequest(m) => fmt::Display::fmt(m, f),
            RaftMessage::AppendEntriesResponse(m) => fmt::Display::fmt(m, f),
            RaftMessage::LogCompactionInfo(m) => fmt::Display::fmt(m, f),
            RaftMessage::NewEntry(m) => write!(f, "NewEntry.Request{{content={:?}}}", m.content),
            RaftMessage::ElectionTimeout => write!(f, "Timeout.Election"),
        }
    }
}

/// A message addressed to one member, produced by handlers and consumed by
/// the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(bound = ""))]
pub struct Directed<C: RaftTypeConfig> {
    pub to: C::Member,
    pub message: RaftMessage<C>,
}

impl<C: RaftTypeConfig> Directed<C> {
    pub fn new(to: C::Member, message: RaftMessage<C>) -> Self {
        Self { to, message }
    }
}

impl<C: RaftTypeConfig> fmt::Display for Directed<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.message, self.to)
    }
}
