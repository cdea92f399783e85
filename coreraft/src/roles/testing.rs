//! Fixtures for driving role handlers directly.

use std::collections::HashSet;

use maplit::hashset;

use crate::entry::RaftLogEntry;
use crate::log::InMemoryRaftLog;
use crate::log::RaftLog;
use crate::messages::RaftMessage;
use crate::messages::VoteRequest;
use crate::outcome::Outcome;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::state::RaftState;
use crate::state::TermState;
use crate::state::VoteState;
use crate::store_id::StoreId;
use crate::testing::TestMember;
use crate::testing::TestTypes;

pub(crate) type TestState = RaftState<TestTypes, InMemoryRaftLog<TestTypes>>;

pub(crate) fn member(id: u64) -> TestMember {
    TestMember(id)
}

pub(crate) fn local_store_id() -> StoreId {
    StoreId::new(1, 2, 3, 4)
}

pub(crate) fn entry(term: Term, content: &str) -> RaftLogEntry<TestTypes> {
    RaftLogEntry::new(term, content.to_string())
}

pub(crate) fn log_with(entries: &[RaftLogEntry<TestTypes>]) -> InMemoryRaftLog<TestTypes> {
    let mut log = InMemoryRaftLog::new();
    for e in entries {
        log.append(e.clone()).unwrap();
    }
    log
}

/// The message the outcome addressed to `target`.
pub(crate) fn message_for(outcome: &Outcome<TestTypes>, target: &TestMember) -> RaftMessage<TestTypes> {
    outcome
        .outgoing_messages
        .iter()
        .find(|d| d.to == *target)
        .map(|d| d.message.clone())
        .unwrap_or_else(|| panic!("no message for {}", target))
}

pub(crate) fn vote_request(from: TestMember, term: Term, last_log_index: LogIndex, last_log_term: Term) -> RaftMessage<TestTypes> {
    RaftMessage::VoteRequest(VoteRequest {
        from,
        term,
        candidate: from,
        last_log_index,
        last_log_term,
        store_id: local_store_id(),
    })
}

pub(crate) struct RaftStateBuilder {
    myself: TestMember,
    voting_members: HashSet<TestMember>,
    term: Term,
    voted_for: Option<TestMember>,
    entry_log: InMemoryRaftLog<TestTypes>,
}

impl RaftStateBuilder {
    pub(crate) fn myself(mut self, myself: TestMember) -> Self {
        self.myself = myself;
        self
    }

    pub(crate) fn voting_members(mut self, members: HashSet<TestMember>) -> Self {
        self.voting_members = members;
        self
    }

    pub(crate) fn term(mut self, term: Term) -> Self {
        self.term = term;
        self
    }

    pub(crate) fn voted_for(mut self, voted_for: TestMember) -> Self {
        self.voted_for = Some(voted_for);
        self
    }

    pub(crate) fn entry_log(mut self, log: InMemoryRaftLog<TestTypes>) -> Self {
        self.entry_log = log;
        self
    }

    pub(crate) fn build(self) -> TestState {
        let vote_state = match self.voted_for {
            Some(m) => VoteState::with_vote(m, self.term),
            None => VoteState::new(),
        };
        RaftState::new(
            self.myself,
            self.voting_members,
            TermState::with_term(self.term),
            vote_state,
            self.entry_log,
        )
    }
}

pub(crate) fn raft_state() -> RaftStateBuilder {
    RaftStateBuilder {
        myself: member(0),
        voting_members: hashset! {member(0), member(1), member(2)},
        term: 0,
        voted_for: None,
        entry_log: InMemoryRaftLog::new(),
    }
}
