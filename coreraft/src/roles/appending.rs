//! Append-entries handling and leader-side entry creation.

use std::cmp::min;

use crate::entry::RaftLogEntry;
use crate::error::RaftError;
use crate::error::SafetyViolation;
use crate::log::RaftLog;
use crate::messages::AppendEntriesRequest;
use crate::messages::AppendEntriesResponse;
use crate::messages::Directed;
use crate::messages::RaftMessage;
use crate::outcome::LogCommand;
use crate::outcome::Outcome;
use crate::outcome::ShipCommand;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::raft_types::NO_INDEX;
use crate::raft_types::NO_TERM;
use crate::state::RaftState;
use crate::type_config::RaftTypeConfig;

/// Process replication from a leader: consistency check, conflict
/// truncation, append, commit advance, response.
pub(crate) fn handle_append_entries_request<C, L>(
    state: &RaftState<C, L>,
    outcome: &mut Outcome<C>,
    request: AppendEntriesRequest<C>,
) -> Result<(), RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    if request.term < outcome.term {
        tracing::debug!(
            "rejecting append from {}: stale term {} < {}",
            request.from,
            request.term,
            outcome.term
        );
        let current_term = outcome.term;
        respond_failure(state, outcome, request.from, current_term);
        return Ok(());
    }

    outcome.renew_election_timeout();
    outcome.set_next_term(request.term);
    outcome.set_leader(Some(request.from.clone()));
    outcome.set_leader_commit(request.leader_commit);

    if !log_history_matches(state, request.prev_log_index, request.prev_log_term)? {
        tracing::debug!(
            "append mismatch: no local entry ({},{}); our appendIndex={}",
            request.prev_log_index,
            request.prev_log_term,
            state.entry_log().append_index()
        );
        respond_failure(state, outcome, request.from, request.term);
        return Ok(());
    }

    let base_index = request.prev_log_index + 1;
    let mut offset = 0usize;

    // Skip entries we already hold; a term conflict truncates our suffix.
    while offset < request.entries.len() {
        let log_index = base_index + offset as LogIndex;

        if log_index <= state.entry_log().prev_index() {
            // Pruned, hence committed and identical by log matching.
            offset += 1;
            continue;
        }
        if log_index > state.entry_log().append_index() {
            break;
        }

        let local_term = state.entry_log().read_entry_term(log_index)?;
        if local_term != request.entries[offset].term {
            if log_index <= state.commit_index() {
                // The sender disagrees with our committed history.
                return Err(SafetyViolation::TruncatingCommittedEntry {
                    index: log_index,
                    commit_index: state.commit_index(),
                }
                .into());
            }
            outcome.add_log_command(LogCommand::Truncate { from_index: log_index });
            break;
        }
        offset += 1;
    }

    if offset < request.entries.len() {
        outcome.add_log_command(LogCommand::Append {
            base_index: base_index + offset as LogIndex,
            entries: request.entries[offset..].to_vec(),
        });
    }

    let index_of_last_new_entry = request.prev_log_index + request.entries.len() as LogIndex;
    commit_to_log_on_update(state, index_of_last_new_entry, request.leader_commit, outcome);

    outcome.add_outgoing_message(Directed::new(
        request.from,
        RaftMessage::AppendEntriesResponse(AppendEntriesResponse {
            from: state.myself().clone(),
            term: outcome.term,
            success: true,
            match_index: index_of_last_new_entry,
        }),
    ));

    Ok(())
}

/// Create a fresh entry on the leader: append locally and hand it to the
/// pipelined shippers.
pub(crate) fn append_new_entry<C, L>(
    state: &RaftState<C, L>,
    outcome: &mut Outcome<C>,
    content: C::Content,
) -> Result<(), RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    let prev_log_index = state.entry_log().append_index();

    let prev_log_term = if prev_log_index == NO_INDEX {
        NO_TERM
    } else if prev_log_index > state.last_log_index_before_we_became_leader() {
        // The predecessor was appended by us, in our own term.
        outcome.term
    } else {
        state.entry_log().read_entry_term(prev_log_index)?
    };

    let entry = RaftLogEntry::new(outcome.term, content);

    outcome.add_ship_command(ShipCommand::NewEntries {
        prev_log_index,
        prev_log_term,
        entries: vec![entry.clone()],
    });
    outcome.add_log_command(LogCommand::Append {
        base_index: prev_log_index + 1,
        entries: vec![entry],
    });

    Ok(())
}

pub(crate) fn respond_failure<C, L>(
    state: &RaftState<C, L>,
    outcome: &mut Outcome<C>,
    to: C::Member,
    term: Term,
) where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    outcome.add_outgoing_message(Directed::new(
        to,
        RaftMessage::AppendEntriesResponse(AppendEntriesResponse {
            from: state.myself().clone(),
            term,
            success: false,
            match_index: NO_INDEX,
        }),
    ));
}

fn log_history_matches<C, L>(
    state: &RaftState<C, L>,
    prev_log_index: LogIndex,
    prev_log_term: Term,
) -> Result<bool, RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    if prev_log_index == NO_INDEX {
        return Ok(true);
    }
    if prev_log_index > state.entry_log().append_index() {
        return Ok(false);
    }
    Ok(state.entry_log().read_entry_term(prev_log_index)? == prev_log_term)
}

fn commit_to_log_on_update<C, L>(
    state: &RaftState<C, L>,
    index_of_last_new_entry: LogIndex,
    leader_commit: LogIndex,
    outcome: &mut Outcome<C>,
) where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    let new_commit_index = min(leader_commit, index_of_last_new_entry);
    if new_commit_index > state.commit_index() {
        outcome.set_commit_index(new_commit_index);
    }
}
