//! The aggregate state of one member.

use std::collections::HashSet;
use std::error::Error;

use validit::Validate;

use crate::error::RaftError;
use crate::error::SafetyViolation;
use crate::log::RaftLog;
use crate::outcome::LogCommand;
use crate::outcome::Outcome;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::raft_types::NO_INDEX;
use crate::state::follower_states::FollowerStates;
use crate::state::term_state::TermState;
use crate::state::vote_state::VoteState;
use crate::type_config::RaftTypeConfig;

/// What changed when an [`Outcome`] was applied; the instance uses it to
/// decide what to persist and which events to emit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UpdateReport {
    pub(crate) term_changed: bool,
    pub(crate) vote_changed: bool,
    pub(crate) leader_changed: bool,
    pub(crate) commit_advanced: Option<LogIndex>,
}

/// Everything a member knows: identity, membership, the persistent term
/// and vote records, the entry log, and the volatile role bookkeeping.
///
/// Handlers read it; only [`RaftState::update`] writes it, applying one
/// [`Outcome`] at a time.
pub struct RaftState<C, L>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    myself: C::Member,
    voting_members: HashSet<C::Member>,

    term_state: TermState,
    vote_state: VoteState<C::Member>,

    entry_log: L,

    commit_index: LogIndex,
    last_applied: LogIndex,

    leader: Option<C::Member>,
    leader_commit: LogIndex,

    // Candidate bookkeeping.
    votes_for_me: HashSet<C::Member>,

    // Leader bookkeeping.
    last_log_index_before_we_became_leader: LogIndex,
    follower_states: FollowerStates<C>,
}

impl<C, L> RaftState<C, L>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    pub fn new(
        myself: C::Member,
        voting_members: HashSet<C::Member>,
        term_state: TermState,
        vote_state: VoteState<C::Member>,
        entry_log: L,
    ) -> Self {
        Self {
            myself,
            voting_members,
            term_state,
            vote_state,
            entry_log,
            commit_index: NO_INDEX,
            last_applied: NO_INDEX,
            leader: None,
            leader_commit: NO_INDEX,
            votes_for_me: HashSet::new(),
            last_log_index_before_we_became_leader: NO_INDEX,
            follower_states: FollowerStates::default(),
        }
    }

    pub fn myself(&self) -> &C::Member {
        &self.myself
    }

    pub fn voting_members(&self) -> &HashSet<C::Member> {
        &self.voting_members
    }

    pub fn term(&self) -> Term {
        self.term_state.current()
    }

    pub fn voted_for(&self) -> Option<&C::Member> {
        self.vote_state.voted_for()
    }

    pub fn entry_log(&self) -> &L {
        &self.entry_log
    }

    pub fn commit_index(&self) -> LogIndex {
        self.commit_index
    }

    pub fn last_applied(&self) -> LogIndex {
        self.last_applied
    }

    pub fn leader(&self) -> Option<&C::Member> {
        self.leader.as_ref()
    }

    pub fn leader_commit(&self) -> LogIndex {
        self.leader_commit
    }

    pub fn votes_for_me(&self) -> &HashSet<C::Member> {
        &self.votes_for_me
    }

    pub fn last_log_index_before_we_became_leader(&self) -> LogIndex {
        self.last_log_index_before_we_became_leader
    }

    pub fn follower_states(&self) -> &FollowerStates<C> {
        &self.follower_states
    }

    pub(crate) fn term_state(&self) -> &TermState {
        &self.term_state
    }

    pub(crate) fn vote_state(&self) -> &VoteState<C::Member> {
        &self.vote_state
    }

    /// Apply one handler outcome. The log and the in-memory copies of the
    /// persistent records are updated here; durably writing the changed
    /// records (reported in the returned [`UpdateReport`]) is the
    /// caller's job and must precede sending any outgoing message.
    pub(crate) fn update(&mut self, outcome: &Outcome<C>) -> Result<UpdateReport, RaftError> {
        let term_changed = self.term_state.update(outcome.term)?;
        let vote_changed = self.vote_state.update(outcome.voted_for.clone(), outcome.term)?;

        let leader_changed = self.leader != outcome.leader;
        if leader_changed {
            tracing::info!(
                "{}: leader changed from {:?} to {:?} in term {}",
                self.myself,
                self.leader,
                outcome.leader,
                outcome.term
            );
        }
        self.leader = outcome.leader.clone();
        self.leader_commit = outcome.leader_commit;

        self.votes_for_me = outcome.votes_for_me.clone();
        self.last_log_index_before_we_became_leader = outcome.last_log_index_before_we_became_leader;
        self.follower_states = outcome.follower_states.clone();

        for command in &outcome.log_commands {
            self.apply_log_command(command)?;
        }

        let commit_advanced = if outcome.commit_index > self.commit_index {
            self.commit_index = outcome.commit_index;
            Some(outcome.commit_index)
        } else {
            None
        };

        Ok(UpdateReport {
            term_changed,
            vote_changed,
            leader_changed,
            commit_advanced,
        })
    }

    fn apply_log_command(&mut self, command: &LogCommand<C>) -> Result<(), RaftError> {
        match command {
            LogCommand::Append { base_index, entries } => {
                for (offset, entry) in entries.iter().enumerate() {
                    let expected = base_index + offset as LogIndex;
                    let actual = self.entry_log.append(entry.clone())?;
                    if actual != expected {
                        return Err(SafetyViolation::UnexpectedAppendIndex { expected, actual }.into());
                    }
                }
            }
            LogCommand::Truncate { from_index } => {
                if *from_index <= self.commit_index {
                    return Err(SafetyViolation::TruncatingCommittedEntry {
                        index: *from_index,
                        commit_index: self.commit_index,
                    }
                    .into());
                }
                self.entry_log.truncate(*from_index)?;
            }
        }
        Ok(())
    }

    /// Discard log entries below `safe_index`. Pruning across the commit
    /// line is forbidden.
    pub(crate) fn prune_log(&mut self, safe_index: LogIndex) -> Result<LogIndex, RaftError> {
        if safe_index > self.commit_index {
            return Err(SafetyViolation::PruningPastCommit {
                index: safe_index,
                commit_index: self.commit_index,
            }
            .into());
        }
        Ok(self.entry_log.prune(safe_index)?)
    }

    /// Record that the host applied entries up to `index`.
    pub(crate) fn mark_applied(&mut self, index: LogIndex) -> Result<(), SafetyViolation> {
        if index > self.commit_index {
            return Err(SafetyViolation::AppliedBeyondCommit {
                index,
                commit_index: self.commit_index,
            });
        }
        if index > self.last_applied {
            self.last_applied = index;
        }
        Ok(())
    }
}

impl<C, L> Validate for RaftState<C, L>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        validit::less_equal!(self.last_applied, self.commit_index);
        validit::less_equal!(self.entry_log.prev_index(), self.commit_index);
        validit::less_equal!(self.commit_index, self.entry_log.append_index());
        Ok(())
    }
}
