//! Storage interface for the persistent vote and term records.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::state::term_state::TermState;
use crate::state::vote_state::VoteState;
use crate::type_config::RaftTypeConfig;

/// Durable storage for the small per-member state the consensus core must
/// never lose: the current term and the vote record.
///
/// Writes must be durable when the future resolves; the core persists
/// through this trait before any response leaves the member.
#[async_trait]
pub trait RaftStateStorage<C: RaftTypeConfig>: Send + 'static {
    async fn load_term(&mut self) -> Result<TermState, StorageError>;

    async fn persist_term(&mut self, term: &TermState) -> Result<(), StorageError>;

    async fn load_vote(&mut self) -> Result<VoteState<C::Member>, StorageError>;

    async fn persist_vote(&mut self, vote: &VoteState<C::Member>) -> Result<(), StorageError>;
}

/// Volatile [`RaftStateStorage`] for tests and experiments.
#[derive(Debug, Clone)]
pub struct InMemoryStateStorage<C: RaftTypeConfig> {
    term: TermState,
    vote: VoteState<C::Member>,
}

impl<C: RaftTypeConfig> Default for InMemoryStateStorage<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RaftTypeConfig> InMemoryStateStorage<C> {
    pub fn new() -> Self {
        Self {
            term: TermState::new(),
            vote: VoteState::new(),
        }
    }
}

#[async_trait]
impl<C: RaftTypeConfig> RaftStateStorage<C> for InMemoryStateStorage<C> {
    async fn load_term(&mut self) -> Result<TermState, StorageError> {
        Ok(self.term.clone())
    }

    async fn persist_term(&mut self, term: &TermState) -> Result<(), StorageError> {
        self.term = term.clone();
        Ok(())
    }

    async fn load_vote(&mut self) -> Result<VoteState<C::Member>, StorageError> {
        Ok(self.vote.clone())
    }

    async fn persist_vote(&mut self, vote: &VoteState<C::Member>) -> Result<(), StorageError> {
        self.vote = vote.clone();
        Ok(())
    }
}
