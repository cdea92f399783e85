use pretty_assertions::assert_eq;

use crate::error::RaftError;
use crate::error::SafetyViolation;
use crate::messages::AppendEntriesRequest;
use crate::messages::RaftMessage;
use crate::outcome::LogCommand;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::roles;
use crate::roles::testing::entry;
use crate::roles::testing::local_store_id;
use crate::roles::testing::log_with;
use crate::roles::testing::member;
use crate::roles::testing::message_for;
use crate::roles::testing::raft_state;
use crate::roles::Role;
use crate::testing::TestMember;
use crate::testing::TestTypes;

fn append_request(
    from: TestMember,
    term: Term,
    prev: (LogIndex, Term),
    entries: &[crate::entry::RaftLogEntry<TestTypes>],
    leader_commit: LogIndex,
) -> RaftMessage<TestTypes> {
    RaftMessage::AppendEntriesRequest(AppendEntriesRequest {
        from,
        term,
        prev_log_index: prev.0,
        prev_log_term: prev.1,
        entries: entries.to_vec(),
        leader_commit,
    })
}

fn response_of(message: RaftMessage<TestTypes>) -> crate::messages::AppendEntriesResponse<TestTypes> {
    match message {
        RaftMessage::AppendEntriesResponse(res) => res,
        other => panic!("expected an append response, got {}", other),
    }
}

#[test]
fn test_stale_term_is_rejected_without_timer_reset() -> anyhow::Result<()> {
    let state = raft_state().term(2).build();

    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 1, (-1, -1), &[entry(1, "a")], -1),
        &state,
        &local_store_id(),
    )?;

    let res = response_of(message_for(&outcome, &member(1)));
    assert!(!res.success);
    assert_eq!(-1, res.match_index);
    assert_eq!(2, res.term);

    assert_eq!(Role::Follower, outcome.next_role);
    assert_eq!(2, outcome.term);
    assert!(!outcome.renew_election_timeout);
    assert!(outcome.log_commands.is_empty());
    Ok(())
}

#[test]
fn test_missing_history_is_rejected_but_resets_timer() -> anyhow::Result<()> {
    let state = raft_state().entry_log(log_with(&[entry(0, "a")])).build();

    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 0, (5, 0), &[entry(0, "f")], -1),
        &state,
        &local_store_id(),
    )?;

    let res = response_of(message_for(&outcome, &member(1)));
    assert!(!res.success);
    assert_eq!(-1, res.match_index);

    // Valid leader contact nonetheless.
    assert!(outcome.renew_election_timeout);
    assert_eq!(Some(member(1)), outcome.leader);
    assert!(outcome.log_commands.is_empty());
    Ok(())
}

#[test]
fn test_appends_new_entries_and_acknowledges() -> anyhow::Result<()> {
    let state = raft_state().build();

    let entries = [entry(0, "a"), entry(0, "b")];
    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 0, (-1, -1), &entries, -1),
        &state,
        &local_store_id(),
    )?;

    assert_eq!(
        vec![LogCommand::Append {
            base_index: 0,
            entries: entries.to_vec(),
        }],
        outcome.log_commands
    );

    let res = response_of(message_for(&outcome, &member(1)));
    assert!(res.success);
    assert_eq!(1, res.match_index);
    assert_eq!(-1, outcome.commit_index);
    Ok(())
}

#[test]
fn test_commit_is_min_of_leader_commit_and_last_new_entry() -> anyhow::Result<()> {
    let state = raft_state().build();

    // Leader is far ahead: commit caps at our last new entry.
    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 0, (-1, -1), &[entry(0, "a"), entry(0, "b")], 5),
        &state,
        &local_store_id(),
    )?;
    assert_eq!(1, outcome.commit_index);

    // Leader commit is behind the entries it sent.
    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 0, (-1, -1), &[entry(0, "a"), entry(0, "b")], 0),
        &state,
        &local_store_id(),
    )?;
    assert_eq!(0, outcome.commit_index);
    Ok(())
}

#[test]
fn test_existing_entries_are_not_reappended() -> anyhow::Result<()> {
    let state = raft_state().entry_log(log_with(&[entry(0, "a"), entry(0, "b")])).build();

    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 0, (-1, -1), &[entry(0, "a"), entry(0, "b")], -1),
        &state,
        &local_store_id(),
    )?;

    assert!(outcome.log_commands.is_empty());
    let res = response_of(message_for(&outcome, &member(1)));
    assert!(res.success);
    assert_eq!(1, res.match_index);
    Ok(())
}

#[test]
fn test_conflicting_suffix_is_truncated_then_appended() -> anyhow::Result<()> {
    let state = raft_state().term(1).entry_log(log_with(&[entry(0, "a"), entry(0, "b")])).build();

    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 1, (-1, -1), &[entry(0, "a"), entry(1, "c")], -1),
        &state,
        &local_store_id(),
    )?;

    assert_eq!(
        vec![
            LogCommand::Truncate { from_index: 1 },
            LogCommand::Append {
                base_index: 1,
                entries: vec![entry(1, "c")],
            },
        ],
        outcome.log_commands
    );
    let res = response_of(message_for(&outcome, &member(1)));
    assert!(res.success);
    assert_eq!(1, res.match_index);
    Ok(())
}

#[test]
fn test_conflict_below_commit_index_is_fatal() -> anyhow::Result<()> {
    let mut state = raft_state().build();

    // Commit entry "a" at index 0.
    let outcome = roles::handle(
        Role::Follower,
        append_request(member(1), 0, (-1, -1), &[entry(0, "a")], 0),
        &state,
        &local_store_id(),
    )?;
    state.update(&outcome)?;
    assert_eq!(0, state.commit_index());

    // A sender that disagrees with committed history is broken.
    let res = roles::handle(
        Role::Follower,
        append_request(member(2), 1, (-1, -1), &[entry(1, "x")], -1),
        &state,
        &local_store_id(),
    );

    assert!(matches!(
        res,
        Err(RaftError::Safety(SafetyViolation::TruncatingCommittedEntry { index: 0, commit_index: 0 }))
    ));
    Ok(())
}

#[test]
fn test_later_term_append_turns_any_role_into_follower() -> anyhow::Result<()> {
    for role in Role::ALL {
        let state = raft_state().term(1).build();

        let outcome = roles::handle(
            role,
            append_request(member(1), 2, (-1, -1), &[entry(2, "a"), entry(2, "b")], 0),
            &state,
            &local_store_id(),
        )?;

        assert_eq!(Role::Follower, outcome.next_role, "as {}", role);
        assert_eq!(2, outcome.term, "as {}", role);
        assert_eq!(Some(member(1)), outcome.leader, "as {}", role);
        // min(leaderCommit, lastNewIndex)
        assert_eq!(0, outcome.commit_index, "as {}", role);
    }
    Ok(())
}
