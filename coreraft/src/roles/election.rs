//! Starting and concluding elections.

use crate::error::RaftError;
use crate::log::RaftLog;
use crate::messages::Directed;
use crate::messages::RaftMessage;
use crate::messages::VoteRequest;
use crate::outcome::Outcome;
use crate::roles::Role;
use crate::state::FollowerStates;
use crate::state::RaftState;
use crate::store_id::StoreId;
use crate::type_config::RaftTypeConfig;

/// Start a new election: bump the term, vote for ourselves and ask every
/// other voting member for theirs.
///
/// Returns false (and starts nothing) when we are not a voting member.
pub(crate) fn start<C, L>(
    state: &RaftState<C, L>,
    outcome: &mut Outcome<C>,
    store_id: &StoreId,
) -> Result<bool, RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    let current_members = state.voting_members();
    if !current_members.contains(state.myself()) {
        tracing::info!(
            "election attempted but not started, current members are {:?}, i am {}",
            current_members,
            state.myself()
        );
        return Ok(false);
    }

    outcome.set_next_term(state.term() + 1);

    let last_log_index = state.entry_log().append_index();
    let vote_for_me = VoteRequest {
        from: state.myself().clone(),
        term: outcome.term,
        candidate: state.myself().clone(),
        last_log_index,
        last_log_term: state.entry_log().read_entry_term(last_log_index)?,
        store_id: *store_id,
    };

    for member in current_members.iter().filter(|m| *m != state.myself()) {
        outcome.add_outgoing_message(Directed::new(
            member.clone(),
            RaftMessage::VoteRequest(vote_for_me.clone()),
        ));
    }

    outcome.set_voted_for(Some(state.myself().clone()));
    outcome.set_votes_for_me(std::iter::once(state.myself().clone()).collect());
    outcome.renew_election_timeout();

    tracing::info!(
        "election started with vote request {} towards {} other members",
        vote_for_me,
        current_members.len() - 1
    );
    Ok(true)
}

/// A quorum granted its votes: take leadership.
pub(crate) fn promote_to_leader<C, L>(state: &RaftState<C, L>, outcome: &mut Outcome<C>)
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    tracing::info!("{}: won election, becoming leader of term {}", state.myself(), outcome.term);

    outcome.set_next_role(Role::Leader);
    outcome.set_leader(Some(state.myself().clone()));
    outcome.set_leader_commit(state.commit_index());
    outcome.set_last_log_index_before_we_became_leader(state.entry_log().append_index());

    let followers = state.voting_members().iter().filter(|m| *m != state.myself()).cloned();
    outcome.replace_follower_states(FollowerStates::fresh(followers));

    outcome.mark_elected_leader();
}
