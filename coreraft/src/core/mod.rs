//! The consensus instance: one task owning all state, fed by one queue.

mod raft_core;
mod raft_msg;
mod tick;

pub use raft_core::RaftEvent;
pub use raft_core::RaftInstance;
