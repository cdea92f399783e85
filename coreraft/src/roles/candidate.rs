//! The candidate role.

use crate::error::RaftError;
use crate::log::RaftLog;
use crate::messages::Directed;
use crate::messages::RaftMessage;
use crate::messages::VoteResponse;
use crate::outcome::Outcome;
use crate::quorum;
use crate::roles::appending;
use crate::roles::election;
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
    let mut outcome = Outcome::new(Role::Candidate, state);

    match message {
        RaftMessage::AppendEntriesRequest(request) => {
            if request.term < outcome.term {
                let current_term = outcome.term;
                appending::respond_failure(state, &mut outcome, request.from, current_term);
            } else {
                // A leader exists for this (or a later) term: concede.
                tracing::info!("{}: conceding election to {} in term {}", state.myself(), request.from, request.term);
                outcome.set_next_role(Role::Follower);
                appending::handle_append_entries_request(state, &mut outcome, request)?;
            }
        }

        RaftMessage::VoteRequest(request) => {
            if request.term > outcome.term {
                outcome.votes_for_me.clear();
                outcome.set_next_role(Role::Follower);
                voting::handle_vote_request(state, &mut outcome, request, store_id)?;
            } else {
                // We already voted for ourselves this term.
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
            if response.term > outcome.term {
                tracing::info!("{}: vote response from later term {}, reverting to follower", state.myself(), response.term);
                outcome.set_next_term(response.term);
                outcome.set_voted_for(None);
                outcome.set_next_role(Role::Follower);
            } else if response.term < outcome.term || !response.granted {
                tracing::debug!("ignoring vote response: {}", response);
            } else if state.voting_members().contains(&response.from) {
                outcome.add_vote_for_me(response.from);
                if quorum::is_quorum(state.voting_members().len(), outcome.votes_for_me.len()) {
                    election::promote_to_leader(state, &mut outcome);
                }
            } else {
                tracing::warn!("ignoring vote from non-voting member {}", response.from);
            }
        }

        RaftMessage::AppendEntriesResponse(response) => {
            tracing::debug!("ignoring append response as candidate: {}", response);
        }

        RaftMessage::LogCompactionInfo(info) => {
            if info.term > outcome.term {
                outcome.set_next_term(info.term);
                outcome.set_voted_for(None);
                outcome.set_next_role(Role::Follower);
                outcome.mark_store_copy_required();
            } else {
                tracing::debug!("ignoring compaction info as candidate: {}", info);
            }
        }

        RaftMessage::NewEntry(request) => {
            tracing::debug!("dropping client submission, not the leader: {:?}", request.content);
        }

        RaftMessage::ElectionTimeout => {
            tracing::info!("{}: election timed out, restarting election", state.myself());
            if election::start(state, &mut outcome, store_id)? {
                if quorum::is_quorum(state.voting_members().len(), outcome.votes_for_me.len()) {
                    election::promote_to_leader(state, &mut outcome);
                }
            }
        }
    }

    Ok(outcome)
}
