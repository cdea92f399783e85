//! Handler outcomes.
//!
//! A role handler never mutates state. It returns an [`Outcome`]: the next
//! role, term and vote, the log operations to perform, the messages to
//! send, and the replication events to feed to the log shippers. The
//! instance applies the outcome atomically, persisting before sending.

mod log_command;
mod ship_command;

pub(crate) use log_command::LogCommand;
pub(crate) use ship_command::ShipCommand;

use std::collections::HashSet;

use crate::log::RaftLog;
use crate::messages::Directed;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::roles::Role;
use crate::state::FollowerStates;
use crate::state::RaftState;
use crate::type_config::RaftTypeConfig;

/// The complete effect of handling one message.
///
/// Built from a snapshot of the current state, then refined by the
/// handler through the builder methods.
#[derive(Debug, Clone)]
pub(crate) struct Outcome<C: RaftTypeConfig> {
    pub(crate) next_role: Role,

    pub(crate) term: Term,
    pub(crate) voted_for: Option<C::Member>,

    pub(crate) leader: Option<C::Member>,
    pub(crate) leader_commit: LogIndex,

    pub(crate) commit_index: LogIndex,
    pub(crate) log_commands: Vec<LogCommand<C>>,
    pub(crate) outgoing_messages: Vec<Directed<C>>,
    pub(crate) ship_commands: Vec<ShipCommand<C>>,

    pub(crate) renew_election_timeout: bool,
    pub(crate) store_copy_required: bool,

    pub(crate) votes_for_me: HashSet<C::Member>,
    pub(crate) last_log_index_before_we_became_leader: LogIndex,
    pub(crate) follower_states: FollowerStates<C>,

    pub(crate) elected_leader: bool,
    pub(crate) stepping_down: bool,
}

impl<C: RaftTypeConfig> Outcome<C> {
    /// Snapshot the current state; an untouched outcome is a no-op.
    pub(crate) fn new<L: RaftLog<C>>(current_role: Role, state: &RaftState<C, L>) -> Self {
        Self {
            next_role: current_role,
            term: state.term(),
            voted_for: state.voted_for().cloned(),
            leader: state.leader().cloned(),
            leader_commit: state.leader_commit(),
            commit_index: state.commit_index(),
            log_commands: Vec::new(),
            outgoing_messages: Vec::new(),
            ship_commands: Vec::new(),
            renew_election_timeout: false,
            store_copy_required: false,
            votes_for_me: state.votes_for_me().clone(),
            last_log_index_before_we_became_leader: state.last_log_index_before_we_became_leader(),
            follower_states: state.follower_states().clone(),
            elected_leader: false,
            stepping_down: false,
        }
    }

    pub(crate) fn set_next_role(&mut self, role: Role) {
        self.next_role = role;
    }

    pub(crate) fn set_next_term(&mut self, term: Term) {
        debug_assert!(term >= self.term, "term must not regress: {} -> {}", self.term, term);
        if term > self.term {
            self.term = term;
            // A vote belongs to the term it was cast in.
            self.voted_for = None;
        }
    }

    pub(crate) fn set_voted_for(&mut self, voted_for: Option<C::Member>) {
        self.voted_for = voted_for;
    }

    pub(crate) fn set_leader(&mut self, leader: Option<C::Member>) {
        self.leader = leader;
    }

    pub(crate) fn set_leader_commit(&mut self, leader_commit: LogIndex) {
        self.leader_commit = leader_commit;
    }

    pub(crate) fn set_commit_index(&mut self, commit_index: LogIndex) {
        self.commit_index = commit_index;
    }

    pub(crate) fn add_log_command(&mut self, command: LogCommand<C>) {
        self.log_commands.push(command);
    }

    pub(crate) fn add_outgoing_message(&mut self, message: Directed<C>) {
        self.outgoing_messages.push(message);
    }

    pub(crate) fn add_ship_command(&mut self, command: ShipCommand<C>) {
        self.ship_commands.push(command);
    }

    pub(crate) fn renew_election_timeout(&mut self) {
        self.renew_election_timeout = true;
    }

    pub(crate) fn mark_store_copy_required(&mut self) {
        self.store_copy_required = true;
    }

    pub(crate) fn add_vote_for_me(&mut self, voter: C::Member) {
        self.votes_for_me.insert(voter);
    }

    pub(crate) fn set_votes_for_me(&mut self, votes: HashSet<C::Member>) {
        self.votes_for_me = votes;
    }

    pub(crate) fn set_last_log_index_before_we_became_leader(&mut self, index: LogIndex) {
        self.last_log_index_before_we_became_leader = index;
    }

    pub(crate) fn replace_follower_states(&mut self, follower_states: FollowerStates<C>) {
        self.follower_states = follower_states;
    }

    pub(crate) fn mark_elected_leader(&mut self) {
        self.elected_leader = true;
    }

    pub(crate) fn mark_stepping_down(&mut self) {
        self.stepping_down = true;
    }
}
