//! Persistent and volatile member state.

mod durable;
mod follower_states;
pub mod marshal;
mod raft_state;
mod storage;
mod term_state;
mod vote_state;

pub use durable::FileStateStorage;
pub use follower_states::FollowerState;
pub use follower_states::FollowerStates;
pub use raft_state::RaftState;
pub(crate) use raft_state::UpdateReport;
pub use storage::InMemoryStateStorage;
pub use storage::RaftStateStorage;
pub use term_state::TermState;
pub use term_state::TermStateMarshal;
pub use vote_state::VoteState;
pub use vote_state::VoteStateMarshal;
