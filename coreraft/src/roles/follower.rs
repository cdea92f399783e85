//! The follower role.

use crate::error::RaftError;
use crate::log::RaftLog;
use crate::messages::RaftMessage;
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
    let mut outcome = Outcome::new(Role::Follower, state);

    match message {
        RaftMessage::AppendEntriesRequest(request) => {
            appending::handle_append_entries_request(state, &mut outcome, request)?;
        }

        RaftMessage::VoteRequest(request) => {
            voting::handle_vote_request(state, &mut outcome, request, store_id)?;
        }

        RaftMessage::VoteResponse(response) => {
            tracing::debug!("ignoring vote response as follower: {}", response);
        }

        RaftMessage::AppendEntriesResponse(response) => {
            tracing::debug!("ignoring append response as follower: {}", response);
        }

        RaftMessage::LogCompactionInfo(info) => {
            if info.term < outcome.term {
                tracing::debug!("ignoring stale compaction info: {}", info);
            } else {
                if info.term > outcome.term {
                    outcome.set_next_term(info.term);
                    outcome.set_voted_for(None);
                }
                tracing::info!("leader pruned entries we still need, requesting store copy: {}", info);
                outcome.mark_store_copy_required();
            }
        }

        RaftMessage::NewEntry(request) => {
            tracing::debug!("dropping client submission, not the leader: {:?}", request.content);
        }

        RaftMessage::ElectionTimeout => {
            tracing::info!("{}: election timeout, standing for election", state.myself());
            if election::start(state, &mut outcome, store_id)? {
                outcome.set_next_role(Role::Candidate);
                if quorum::is_quorum(state.voting_members().len(), outcome.votes_for_me.len()) {
                    election::promote_to_leader(state, &mut outcome);
                }
            }
        }
    }

    Ok(outcome)
}
