//! The role state machine.
//!
//! A member is always exactly one of Follower, Candidate or Leader. Each
//! role is a pure handler from `(message, state)` to an
//! [`Outcome`](crate::outcome::Outcome); common behaviour (stale-term
//! rejection, term advancement, vote handling) lives in the shared
//! submodules.

mod appending;
mod candidate;
mod election;
mod follower;
mod leader;
mod voting;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod append_entries_request_test;
#[cfg(test)]
mod candidate_test;

use std::fmt;

use crate::error::RaftError;
use crate::log::RaftLog;
use crate::messages::RaftMessage;
use crate::outcome::Outcome;
use crate::state::RaftState;
use crate::store_id::StoreId;
use crate::type_config::RaftTypeConfig;

/// The three operating modes of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl Role {
    /// All roles, mainly for parameterized tests.
    pub const ALL: [Role; 3] = [Role::Follower, Role::Candidate, Role::Leader];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Follower => "Follower",
            Role::Candidate => "Candidate",
            Role::Leader => "Leader",
        };
        write!(f, "{}", name)
    }
}

/// Dispatch one message to the handler of the current role.
#[tracing::instrument(level = "debug", skip_all, fields(role = %role, message = %message))]
pub(crate) fn handle<C, L>(
    role: Role,
    message: RaftMessage<C>,
    state: &RaftState<C, L>,
    store_id: &StoreId,
) -> Result<Outcome<C>, RaftError>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
{
    match role {
        Role::Follower => follower::handle(message, state, store_id),
        Role::Candidate => candidate::handle(message, state, store_id),
        Role::Leader => leader::handle(message, state, store_id),
    }
}
