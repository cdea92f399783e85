//! The leader role.

use crate::error::RaftError;
use crate::error::SafetyViolation;
use crate::log::RaftLog;
use crate::messages::Directed;
use crate::messages::RaftMessage;
use crate::messages::VoteResponse;
use crate::outcome::Outcome;
use crate::outcome::ShipCommand;
use crate::quorum;
use crate::raft_types::LogIndex;
use crate::raft_types::NO_INDEX;
use crate::roles::appending;
use crate::roles::voting;
use crate::roles::Role;
use crate::state::RaftState;
use crate::store_id::StoreId;
use crate::type_config::RaftTypeConfig;

pub(crate) fn handle<C, L>(
    message: RaftMessage<C>,
    state: &RaftState<C, L>,
    store_id: &StoreId,
) -> Result<Outcome<C>, RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    let mut outcome = Outcome::new(Role::Leader, state);

    match message {
        RaftMessage::AppendEntriesRequest(request) => {
            if request.term < outcome.term {
                let current_term = outcome.term;
                appending::respond_failure(state, &mut outcome, request.from, current_term);
            } else if request.term == outcome.term {
                // Election safety guarantees a single leader per term.
                return Err(SafetyViolation::LeaderConflict { term: request.term }.into());
            } else {
                tracing::info!(
                    "{}: stepping down, {} leads in later term {}",
                    state.myself(),
                    request.from,
                    request.term
                );
                outcome.mark_stepping_down();
                outcome.set_next_role(Role::Follower);
                appending::handle_append_entries_request(state, &mut outcome, request)?;
            }
        }

        RaftMessage::AppendEntriesResponse(response) => {
            if response.term < outcome.term {
                tracing::debug!("ignoring stale append response: {}", response);
            } else if response.term > outcome.term {
                tracing::info!("{}: stepping down, follower {} is in later term {}", state.myself(), response.from, response.term);
                outcome.set_next_term(response.term);
                outcome.set_voted_for(None);
                outcome.set_leader(None);
                outcome.mark_stepping_down();
                outcome.set_next_role(Role::Follower);
            } else if !outcome.follower_states.contains(&response.from) {
                tracing::warn!("ignoring append response from unknown follower {}", response.from);
            } else if response.success {
                debug_assert!(
                    response.match_index <= state.entry_log().append_index(),
                    "follower {} acknowledged {} beyond our log end {}",
                    response.from,
                    response.match_index,
                    state.entry_log().append_index()
                );

                outcome.follower_states.on_match(&response.from, response.match_index);
                outcome.add_ship_command(ShipCommand::Match {
                    target: response.from,
                    new_match_index: response.match_index,
                });
                try_advance_commit(state, &mut outcome)?;
            } else {
                outcome.add_ship_command(ShipCommand::Mismatch {
                    target: response.from,
                    last_remote_append_index: response.match_index,
                });
            }
        }

        RaftMessage::VoteRequest(request) => {
            if request.term > outcome.term {
                tracing::info!("{}: stepping down for election in later term {}", state.myself(), request.term);
                outcome.mark_stepping_down();
                outcome.set_next_role(Role::Follower);
                outcome.set_leader(None);
                voting::handle_vote_request(state, &mut outcome, request, store_id)?;
            } else {
                // We hold this term; our own vote is spoken for.
                outcome.add_outgoing_message(Directed::new(
                    request.from,
                    RaftMessage::VoteResponse(VoteResponse {
                        from: state.myself().clone(),
                        term: outcome.term,
                        granted: false,
                    }),
                ));
            }
        }

        RaftMessage::VoteResponse(response) => {
            tracing::debug!("ignoring vote response as established leader: {}", response);
        }

        RaftMessage::LogCompactionInfo(info) => {
            tracing::debug!("ignoring compaction info as leader: {}", info);
        }

        RaftMessage::NewEntry(request) => {
            appending::append_new_entry(state, &mut outcome, request.content)?;

            if state.voting_members().len() == 1 {
                // We are the whole majority: the local append commits.
                let new_index = state.entry_log().append_index() + 1;
                outcome.set_commit_index(new_index);
                outcome.set_leader_commit(new_index);
            }
        }

        RaftMessage::ElectionTimeout => {
            tracing::debug!("ignoring election timeout as leader");
        }
    }

    Ok(outcome)
}

/// Raise the commit index to the highest entry of the current term that a
/// majority of voting members hold.
///
/// Counting only current-term entries is essential: an earlier-term entry
/// on a majority may still be overwritten by a later leader.
fn try_advance_commit<C, L>(state: &RaftState<C, L>, outcome: &mut Outcome<C>) -> Result<(), RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    let members = state.voting_members();

    let mut match_indexes: Vec<LogIndex> = Vec::with_capacity(members.len());
    for member in members {
        if member == state.myself() {
            match_indexes.push(state.entry_log().append_index());
        } else {
            let matched = outcome.follower_states.get(member).map(|s| s.match_index).unwrap_or(NO_INDEX);
            match_indexes.push(matched);
        }
    }
    match_indexes.sort_unstable_by(|a, b| b.cmp(a));

    let quorum_index = match_indexes[quorum::majority(members.len()) - 1];

    if quorum_index > outcome.commit_index
        && quorum_index > NO_INDEX
        && state.entry_log().read_entry_term(quorum_index)? == outcome.term
    {
        tracing::debug!("advancing commit index from {} to {}", outcome.commit_index, quorum_index);
        outcome.set_commit_index(quorum_index);
        outcome.set_leader_commit(quorum_index);
    }

    Ok(())
}
