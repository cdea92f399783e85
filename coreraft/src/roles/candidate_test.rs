use maplit::hashset;
use pretty_assertions::assert_eq;

use crate::log::RaftLog;
use crate::messages::RaftMessage;
use crate::messages::VoteResponse;
use crate::raft_types::Term;
use crate::roles;
use crate::roles::testing::entry;
use crate::roles::testing::local_store_id;
use crate::roles::testing::member;
use crate::roles::testing::message_for;
use crate::roles::testing::raft_state;
use crate::roles::testing::TestState;
use crate::roles::Role;
use crate::testing::TestMember;
use crate::testing::TestTypes;

fn vote_response(from: TestMember, term: Term, granted: bool) -> RaftMessage<TestTypes> {
    RaftMessage::VoteResponse(VoteResponse { from, term, granted })
}

/// Run a follower through an election timeout so the state carries a
/// self-vote and `votesForMe = {myself}`.
fn candidate_state() -> anyhow::Result<TestState> {
    let mut state = raft_state().build();
    let outcome = roles::handle(Role::Follower, RaftMessage::ElectionTimeout, &state, &local_store_id())?;
    assert_eq!(Role::Candidate, outcome.next_role);
    state.update(&outcome)?;
    Ok(state)
}

#[test]
fn test_winning_quorum_promotes_to_leader() -> anyhow::Result<()> {
    let state = candidate_state()?;

    let outcome = roles::handle(
        Role::Candidate,
        vote_response(member(1), state.term(), true),
        &state,
        &local_store_id(),
    )?;

    assert_eq!(Role::Leader, outcome.next_role);
    assert!(outcome.elected_leader);
    assert_eq!(Some(member(0)), outcome.leader);
    assert_eq!(hashset! {member(0), member(1)}, outcome.votes_for_me);
    assert_eq!(state.entry_log().append_index(), outcome.last_log_index_before_we_became_leader);
    assert!(outcome.follower_states.contains(&member(1)));
    assert!(outcome.follower_states.contains(&member(2)));
    Ok(())
}

#[test]
fn test_denied_vote_leaves_candidate_waiting() -> anyhow::Result<()> {
    let state = candidate_state()?;

    let outcome = roles::handle(
        Role::Candidate,
        vote_response(member(1), state.term(), false),
        &state,
        &local_store_id(),
    )?;

    assert_eq!(Role::Candidate, outcome.next_role);
    assert_eq!(hashset! {member(0)}, outcome.votes_for_me);
    Ok(())
}

#[test]
fn test_stale_vote_response_is_ignored() -> anyhow::Result<()> {
    let state = candidate_state()?;

    let outcome = roles::handle(
        Role::Candidate,
        vote_response(member(1), state.term() - 1, true),
        &state,
        &local_store_id(),
    )?;

    assert_eq!(Role::Candidate, outcome.next_role);
    assert_eq!(hashset! {member(0)}, outcome.votes_for_me);
    Ok(())
}

#[test]
fn test_later_term_vote_response_reverts_to_follower() -> anyhow::Result<()> {
    let state = candidate_state()?;

    let outcome = roles::handle(
        Role::Candidate,
        vote_response(member(1), state.term() + 1, false),
        &state,
        &local_store_id(),
    )?;

    assert_eq!(Role::Follower, outcome.next_role);
    assert_eq!(state.term() + 1, outcome.term);
    assert_eq!(None, outcome.voted_for);
    Ok(())
}

#[test]
fn test_concedes_to_an_established_leader_of_same_term() -> anyhow::Result<()> {
    let state = candidate_state()?;

    let request = RaftMessage::AppendEntriesRequest(crate::messages::AppendEntriesRequest {
        from: member(1),
        term: state.term(),
        prev_log_index: -1,
        prev_log_term: -1,
        entries: vec![entry(state.term(), "a")],
        leader_commit: -1,
    });
    let outcome = roles::handle(Role::Candidate, request, &state, &local_store_id())?;

    assert_eq!(Role::Follower, outcome.next_role);
    assert_eq!(Some(member(1)), outcome.leader);
    // Processed as a follower would.
    let res = match message_for(&outcome, &member(1)) {
        RaftMessage::AppendEntriesResponse(res) => res,
        other => panic!("expected an append response, got {}", other),
    };
    assert!(res.success);
    assert_eq!(0, res.match_index);
    Ok(())
}

#[test]
fn test_rejects_append_from_an_earlier_term() -> anyhow::Result<()> {
    let state = candidate_state()?;

    let request = RaftMessage::AppendEntriesRequest(crate::messages::AppendEntriesRequest {
        from: member(1),
        term: state.term() - 1,
        prev_log_index: -1,
        prev_log_term: -1,
        entries: vec![],
        leader_commit: -1,
    });
    let outcome = roles::handle(Role::Candidate, request, &state, &local_store_id())?;

    assert_eq!(Role::Candidate, outcome.next_role);
    let res = match message_for(&outcome, &member(1)) {
        RaftMessage::AppendEntriesResponse(res) => res,
        other => panic!("expected an append response, got {}", other),
    };
    assert!(!res.success);
    Ok(())
}

#[test]
fn test_election_timeout_restarts_the_election() -> anyhow::Result<()> {
    let state = candidate_state()?;
    let term_before = state.term();

    let outcome = roles::handle(Role::Candidate, RaftMessage::ElectionTimeout, &state, &local_store_id())?;

    assert_eq!(Role::Candidate, outcome.next_role);
    assert_eq!(term_before + 1, outcome.term);
    assert_eq!(hashset! {member(0)}, outcome.votes_for_me);
    assert!(outcome.renew_election_timeout);
    assert!(matches!(message_for(&outcome, &member(1)), RaftMessage::VoteRequest(_)));
    assert!(matches!(message_for(&outcome, &member(2)), RaftMessage::VoteRequest(_)));
    Ok(())
}
