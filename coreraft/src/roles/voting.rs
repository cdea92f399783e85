//! Vote-request handling, shared by every role.

use crate::error::RaftError;
use crate::log::RaftLog;
use crate::messages::Directed;
use crate::messages::RaftMessage;
use crate::messages::VoteRequest;
use crate::messages::VoteResponse;
use crate::outcome::Outcome;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::state::RaftState;
use crate::store_id::StoreId;
use crate::type_config::RaftMember;
use crate::type_config::RaftTypeConfig;

/// Decide on a vote request and queue the response.
///
/// A request from a later term advances our term first (clearing the
/// vote), so the grant decision below is always taken within the
/// candidate's term. Callers are responsible for any role change.
pub(crate) fn handle_vote_request<C, L>(
    state: &RaftState<C, L>,
    outcome: &mut Outcome<C>,
    request: VoteRequest<C>,
    local_store_id: &StoreId,
) -> Result<(), RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    if request.term > outcome.term {
        outcome.set_next_term(request.term);
        outcome.set_voted_for(None);
    }

    let same_store = request.store_id == *local_store_id;
    if !same_store {
        tracing::warn!(
            "denying vote to {}: candidate store {} does not match local store {}",
            request.candidate,
            request.store_id,
            local_store_id
        );
    }

    let our_last_log_index = state.entry_log().append_index();
    let our_last_log_term = state.entry_log().read_entry_term(our_last_log_index)?;

    let will_vote_for_candidate = same_store
        && should_vote_for(
            &request.candidate,
            outcome.term,
            request.term,
            our_last_log_term,
            request.last_log_term,
            our_last_log_index,
            request.last_log_index,
            outcome.voted_for.as_ref(),
        );

    if will_vote_for_candidate {
        outcome.set_voted_for(Some(request.candidate.clone()));
        // A granted vote is leader contact: hold off our own election.
        outcome.renew_election_timeout();
    }

    outcome.add_outgoing_message(Directed::new(
        request.from,
        RaftMessage::VoteResponse(VoteResponse {
            from: state.myself().clone(),
            term: outcome.term,
            granted: will_vote_for_candidate,
        }),
    ));

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn should_vote_for<M: RaftMember>(
    candidate: &M,
    context_term: Term,
    request_term: Term,
    context_last_log_term: Term,
    request_last_log_term: Term,
    context_last_appended: LogIndex,
    request_last_log_index: LogIndex,
    committed_vote: Option<&M>,
) -> bool {
    if request_term < context_term {
        tracing::debug!(
            "denying vote to {}: candidate term {} is behind local term {}",
            candidate,
            request_term,
            context_term
        );
        return false;
    }

    let request_log_ends_at_higher_term = request_last_log_term > context_last_log_term;
    let logs_end_at_same_term = request_last_log_term == context_last_log_term;
    let request_log_at_least_as_long = request_last_log_index >= context_last_appended;

    let requester_log_up_to_date =
        request_log_ends_at_higher_term || (logs_end_at_same_term && request_log_at_least_as_long);

    let voted_for_another = matches!(committed_vote, Some(v) if v != candidate);

    tracing::debug!(
        "vote decision for {}: upToDate={} (theirLastLog=({},{}) ourLastLog=({},{})) votedForAnother={}",
        candidate,
        requester_log_up_to_date,
        request_last_log_index,
        request_last_log_term,
        context_last_appended,
        context_last_log_term,
        voted_for_another
    );

    requester_log_up_to_date && !voted_for_another
}
