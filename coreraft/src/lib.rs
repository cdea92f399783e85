//! A Raft consensus core for the core members of a graph database
//! cluster.
//!
//! `coreraft` replicates a linearizable log of opaque operations among a
//! fixed set of voting members. It contains the role state machine
//! (follower, candidate, leader), leader election, per-follower log
//! shipping with catch-up and back-pressure, the persistent vote and term
//! records, and the in-memory log representation those components use.
//!
//! Everything around it is a collaborator behind a trait: the durable
//! segmented log implements [`RaftLog`], the transport implements
//! [`Outbound`] and feeds inbound messages to
//! [`RaftInstance::handle_message`], and the vote/term records persist
//! through [`RaftStateStorage`]. Store copy after log compaction,
//! membership changes and the storage engine itself are out of scope; the
//! core only emits the [`LogCompactionInfo`] signal and the matching
//! [`RaftEvent::StoreCopyRequired`] event.
//!
//! Handlers are pure: each inbound message produces an outcome that the
//! instance task applies atomically, persisting vote and term changes
//! before any response leaves the member. All events, including timer
//! ticks and client submissions, are serialized through one queue.

#![deny(unused_qualifications)]

mod base;
mod entry;
mod error;
mod messages;
mod network;
mod quorum;
mod raft_types;
mod store_id;
mod type_config;

pub(crate) mod outcome;
pub(crate) mod roles;
pub(crate) mod shipping;

pub mod config;
pub mod core;
pub mod log;
pub mod state;
pub mod testing;

pub use crate::base::OptionalSerde;
pub use crate::config::Config;
pub use crate::config::ConfigError;
pub use crate::core::RaftEvent;
pub use crate::core::RaftInstance;
pub use crate::entry::RaftLogEntry;
pub use crate::error::ErrorSubject;
pub use crate::error::ErrorVerb;
pub use crate::error::Fatal;
pub use crate::error::InstanceStopped;
pub use crate::error::RaftError;
pub use crate::error::RaftLogError;
pub use crate::error::SafetyViolation;
pub use crate::error::StorageError;
pub use crate::log::InFlightMap;
pub use crate::log::InMemoryRaftLog;
pub use crate::log::RaftLog;
pub use crate::messages::AppendEntriesRequest;
pub use crate::messages::AppendEntriesResponse;
pub use crate::messages::Directed;
pub use crate::messages::LogCompactionInfo;
pub use crate::messages::NewEntryRequest;
pub use crate::messages::RaftMessage;
pub use crate::messages::VoteRequest;
pub use crate::messages::VoteResponse;
pub use crate::network::Outbound;
pub use crate::raft_types::LogIndex;
pub use crate::raft_types::Term;
pub use crate::raft_types::NO_INDEX;
pub use crate::raft_types::NO_TERM;
pub use crate::roles::Role;
pub use crate::state::marshal::ChannelMarshal;
pub use crate::state::marshal::StateMarshal;
pub use crate::state::FileStateStorage;
pub use crate::state::FollowerState;
pub use crate::state::FollowerStates;
pub use crate::state::InMemoryStateStorage;
pub use crate::state::RaftState;
pub use crate::state::RaftStateStorage;
pub use crate::state::TermState;
pub use crate::state::TermStateMarshal;
pub use crate::state::VoteState;
pub use crate::state::VoteStateMarshal;
pub use crate::store_id::StoreId;
pub use crate::type_config::RaftMember;
pub use crate::type_config::RaftTypeConfig;
pub use crate::type_config::ReplicatedContent;
