//! Error types exposed by this crate.
//!
//! The policy is: transient storage I/O is retried with backoff and only
//! then escalated; stale messages are dropped (and traced); everything
//! that would break a safety invariant is fatal and halts the instance.

use anyerror::AnyError;

use crate::raft_types::LogIndex;
use crate::raft_types::Term;

/// A violation of a consensus safety invariant.
///
/// These indicate a programming error or a corrupted peer and must never
/// be swallowed: the instance halts when one surfaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SafetyViolation {
    #[error("refusing to truncate at {index}: entries up to {commit_index} are committed")]
    TruncatingCommittedEntry { index: LogIndex, commit_index: LogIndex },

    #[error("refusing to prune to {index}: commit index is only {commit_index}")]
    PruningPastCommit { index: LogIndex, commit_index: LogIndex },

    #[error("can only vote once per term: term {term} already voted for {voted_for}")]
    DoubleVote { term: Term, voted_for: String },

    #[error("term must not regress: current {current}, proposed {proposed}")]
    TermRegression { current: Term, proposed: Term },

    #[error("two leaders in term {term}")]
    LeaderConflict { term: Term },

    #[error("append produced index {actual}, expected {expected}")]
    UnexpectedAppendIndex { expected: LogIndex, actual: LogIndex },

    #[error("cannot mark {index} applied: commit index is only {commit_index}")]
    AppliedBeyondCommit { index: LogIndex, commit_index: LogIndex },
}

/// Failure of a log read or write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RaftLogError {
    #[error("log I/O failed: {0}")]
    Io(AnyError),

    #[error("entries at and below {prev_index} are pruned; requested {index}")]
    Pruned { index: LogIndex, prev_index: LogIndex },
}

/// What a failed storage operation was acting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorSubject {
    Vote,
    Term,
    Log,
}

/// What a failed storage operation was doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorVerb {
    Read,
    Write,
}

/// Failure of persistent-state storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("storage {verb:?} of {subject:?} failed: {source}")]
pub struct StorageError {
    pub subject: ErrorSubject,
    pub verb: ErrorVerb,
    pub source: AnyError,
}

impl StorageError {
    pub fn new(subject: ErrorSubject, verb: ErrorVerb, source: impl std::error::Error + 'static) -> Self {
        Self {
            subject,
            verb,
            source: AnyError::new(&source),
        }
    }
}

/// An error a role handler can produce while processing one message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaftError {
    #[error(transparent)]
    Safety(#[from] SafetyViolation),

    #[error(transparent)]
    Log(#[from] RaftLogError),
}

/// An unrecoverable error: the instance stops processing and reports it to
/// the host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fatal {
    #[error(transparent)]
    Safety(#[from] SafetyViolation),

    #[error(transparent)]
    Log(#[from] RaftLogError),

    #[error("storage failed repeatedly: {0}")]
    Storage(#[from] StorageError),
}

/// The instance task is no longer accepting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the consensus instance has stopped")]
pub struct InstanceStopped;

impl From<RaftError> for Fatal {
    fn from(e: RaftError) -> Self {
        match e {
            RaftError::Safety(s) => Fatal::Safety(s),
            RaftError::Log(l) => Fatal::Log(l),
        }
    }
}
