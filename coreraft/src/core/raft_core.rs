//! The top-level dispatcher.
//!
//! `RaftInstance` is the cheap cloneable handle; the spawned `RaftCore`
//! task owns every piece of state and consumes one message at a time from
//! an unbounded queue. Each message is handled by the current role's pure
//! handler, and the resulting outcome is applied atomically: state and log
//! first, durable writes second, outgoing messages and replication events
//! last.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use validit::Valid;

use crate::config::Config;
use crate::core::raft_msg::RaftMsg;
use crate::core::tick::Tick;
use crate::error::Fatal;
use crate::error::InstanceStopped;
use crate::error::StorageError;
use crate::log::InFlightMap;
use crate::log::RaftLog;
use crate::messages::NewEntryRequest;
use crate::messages::RaftMessage;
use crate::network::Outbound;
use crate::outcome::LogCommand;
use crate::outcome::Outcome;
use crate::raft_types::LogIndex;
use crate::roles;
use crate::roles::Role;
use crate::shipping::LeaderContext;
use crate::shipping::LogShipping;
use crate::state::RaftState;
use crate::state::RaftStateStorage;
use crate::store_id::StoreId;
use crate::type_config::RaftTypeConfig;

/// Out-of-band notifications to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaftEvent<C: RaftTypeConfig> {
    /// The known leader changed (possibly to none).
    LeaderChanged { leader: Option<C::Member> },

    /// Entries up to `commit_index` are safe to apply to the store.
    Committed { commit_index: LogIndex },

    /// The leader pruned entries this member still needs; the host should
    /// trigger a store copy.
    StoreCopyRequired { leader: Option<C::Member> },

    /// The instance stopped on an unrecoverable error.
    Halted { error: Fatal },
}

/// Handle to a running consensus instance.
#[derive(Clone)]
pub struct RaftInstance<C: RaftTypeConfig> {
    tx: mpsc::UnboundedSender<RaftMsg<C>>,
    inner: Arc<Inner>,
}

struct Inner {
    core: Mutex<Option<JoinHandle<Result<(), Fatal>>>>,
    tick: JoinHandle<()>,
}

impl<C: RaftTypeConfig> RaftInstance<C> {
    /// Load persistent state and start the instance task as a follower.
    ///
    /// The entry log is expected to be replayed by the caller; the vote
    /// and term records are loaded from `storage` here. Returns the handle
    /// and the event stream.
    pub async fn spawn<L, O, S>(
        myself: C::Member,
        voting_members: HashSet<C::Member>,
        store_id: StoreId,
        config: Config,
        entry_log: L,
        outbound: Arc<O>,
        mut storage: S,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RaftEvent<C>>), Fatal>
    where
        L: RaftLog<C>,
        O: Outbound<C>,
        S: RaftStateStorage<C>,
    {
        let term_state = storage.load_term().await?;
        let vote_state = storage.load_vote().await?;

        tracing::info!(
            "{}: starting as follower, term={} votedFor={:?} appendIndex={}",
            myself,
            term_state.current(),
            vote_state.voted_for(),
            entry_log.append_index()
        );

        let state = RaftState::new(myself.clone(), voting_members.clone(), term_state, vote_state, entry_log);

        let (tx, rx) = mpsc::unbounded_channel();
        let (tx_event, rx_event) = mpsc::unbounded_channel();

        let tick = Tick::spawn(config.heartbeat_interval(), tx.clone());

        let shipping = LogShipping::new(myself, voting_members, outbound.clone(), &config);
        let in_flight = InFlightMap::new(config.in_flight_cache_entries as usize);
        let election_deadline = Instant::now() + config.new_rand_election_timeout();

        let core = RaftCore {
            config,
            store_id,
            role: Role::Follower,
            state: Valid::new(state),
            in_flight,
            shipping,
            outbound,
            storage,
            rx,
            tx_event: tx_event.clone(),
            election_deadline,
        };

        let core_handle = tokio::spawn(async move {
            let res = core.main().await;
            if let Err(ref fatal) = res {
                tracing::error!("consensus instance halted: {}", fatal);
                let _ = tx_event.send(RaftEvent::Halted { error: fatal.clone() });
            }
            res
        });

        let instance = RaftInstance {
            tx,
            inner: Arc::new(Inner {
                core: Mutex::new(Some(core_handle)),
                tick,
            }),
        };
        Ok((instance, rx_event))
    }

    /// Feed one inbound message from the transport.
    pub fn handle_message(&self, message: RaftMessage<C>) -> Result<(), InstanceStopped> {
        self.tx.send(RaftMsg::Inbound(message)).map_err(|_| InstanceStopped)
    }

    /// Submit a client operation for replication. Dropped unless this
    /// member currently leads.
    pub fn append(&self, content: C::Content) -> Result<(), InstanceStopped> {
        self.handle_message(RaftMessage::NewEntry(NewEntryRequest { content }))
    }

    /// Allow the log prefix below `safe_index` to be discarded.
    pub fn prune(&self, safe_index: LogIndex) -> Result<(), InstanceStopped> {
        self.tx.send(RaftMsg::Prune { safe_index }).map_err(|_| InstanceStopped)
    }

    /// Record that the host applied entries up to `index`.
    pub fn mark_applied(&self, index: LogIndex) -> Result<(), InstanceStopped> {
        self.tx.send(RaftMsg::MarkApplied { index }).map_err(|_| InstanceStopped)
    }

    /// Stop the instance and wait for the task to finish, returning the
    /// fatal error if it halted on one.
    pub async fn shutdown(&self) -> Result<(), Fatal> {
        let _ = self.tx.send(RaftMsg::Shutdown);
        self.inner.tick.abort();

        let handle = self.inner.core.lock().unwrap().take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(res) => res,
                Err(e) => {
                    tracing::error!("core task did not shut down cleanly: {}", e);
                    Ok(())
                }
            }
        } else {
            Ok(())
        }
    }
}

struct RaftCore<C, L, O, S>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
    O: Outbound<C>,
    S: RaftStateStorage<C>,
{
    config: Config,
    store_id: StoreId,

    role: Role,
    state: Valid<RaftState<C, L>>,
    in_flight: InFlightMap<C>,
    shipping: LogShipping<C, O>,

    outbound: Arc<O>,
    storage: S,

    rx: mpsc::UnboundedReceiver<RaftMsg<C>>,
    tx_event: mpsc::UnboundedSender<RaftEvent<C>>,

    election_deadline: Instant,
}

impl<C, L, O, S> RaftCore<C, L, O, S>
where
    C: RaftTypeConfig,
    L: RaftLog<C>,
    O: Outbound<C>,
    S: RaftStateStorage<C>,
{
    async fn main(mut self) -> Result<(), Fatal> {
        loop {
            let Some(msg) = self.rx.recv().await else {
                tracing::info!("message queue closed, stopping");
                return Ok(());
            };

            match msg {
                RaftMsg::Inbound(message) => self.dispatch(message).await?,
                RaftMsg::Tick => self.handle_tick().await?,
                RaftMsg::Prune { safe_index } => {
                    let new_prev = self.state.prune_log(safe_index).map_err(Fatal::from)?;
                    self.in_flight.prune(new_prev);
                }
                RaftMsg::MarkApplied { index } => self.state.mark_applied(index).map_err(Fatal::from)?,
                RaftMsg::Shutdown => {
                    tracing::info!("shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(role = %self.role))]
    async fn dispatch(&mut self, message: RaftMessage<C>) -> Result<(), Fatal> {
        let outcome = roles::handle(self.role, message, &*self.state, &self.store_id)?;
        self.apply_outcome(outcome).await
    }

    /// Apply one outcome completely before the next message is seen:
    /// in-memory state and log, then durable records, then messages,
    /// timers and shipping.
    async fn apply_outcome(&mut self, mut outcome: Outcome<C>) -> Result<(), Fatal> {
        let report = self.state.update(&outcome)?;

        // Keep the replication cache aligned with the log.
        for command in &outcome.log_commands {
            match command {
                LogCommand::Append { base_index, entries } => {
                    if self.role == Role::Leader || outcome.next_role == Role::Leader {
                        for (offset, entry) in entries.iter().enumerate() {
                            self.in_flight.put(base_index + offset as LogIndex, entry.clone());
                        }
                    }
                }
                LogCommand::Truncate { from_index } => self.in_flight.truncate_from(*from_index),
            }
        }

        // Durability precedes any response or event.
        if report.term_changed {
            self.persist_term().await?;
        }
        if report.vote_changed {
            self.persist_vote().await?;
        }

        if report.leader_changed {
            let _ = self.tx_event.send(RaftEvent::LeaderChanged {
                leader: outcome.leader.clone(),
            });
        }
        if let Some(commit_index) = report.commit_advanced {
            // Committed entries are replicated to a quorum; stragglers can
            // read them back from the log.
            self.in_flight.prune(commit_index);
            let _ = self.tx_event.send(RaftEvent::Committed { commit_index });
        }
        if outcome.store_copy_required {
            let _ = self.tx_event.send(RaftEvent::StoreCopyRequired {
                leader: outcome.leader.clone(),
            });
        }

        for directed in outcome.outgoing_messages.drain(..) {
            self.outbound.send(directed.to, directed.message);
        }

        if outcome.renew_election_timeout {
            self.election_deadline = Instant::now() + self.config.new_rand_election_timeout();
        }

        let ctx = LeaderContext::new(outcome.term, outcome.leader_commit);
        if outcome.elected_leader {
            self.shipping.start(&ctx, self.state.entry_log(), &self.in_flight)?;
        } else if outcome.stepping_down {
            self.shipping.stop();
        }
        if outcome.next_role == Role::Leader {
            self.shipping
                .handle_commands(&outcome.ship_commands, &ctx, self.state.entry_log(), &self.in_flight)?;
        }

        if self.role != outcome.next_role {
            tracing::info!(
                "{}: transition {} -> {} in term {}",
                self.state.myself(),
                self.role,
                outcome.next_role,
                outcome.term
            );
            self.role = outcome.next_role;
        }

        Ok(())
    }

    async fn handle_tick(&mut self) -> Result<(), Fatal> {
        let now = Instant::now();

        if self.role != Role::Leader && now >= self.election_deadline {
            // Re-arm first: a declined election must not spin.
            self.election_deadline = now + self.config.new_rand_election_timeout();
            self.dispatch(RaftMessage::ElectionTimeout).await?;
        }

        if self.role == Role::Leader {
            let ctx = LeaderContext::new(self.state.term(), self.state.commit_index());
            self.shipping.on_tick(now, &ctx, self.state.entry_log(), &self.in_flight)?;
        }

        Ok(())
    }

    async fn persist_term(&mut self) -> Result<(), Fatal> {
        let term_state = self.state.term_state().clone();
        let mut last_err: Option<StorageError> = None;
        let mut backoff = Duration::from_millis(10);

        for attempt in 0..3 {
            match self.storage.persist_term(&term_state).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("persisting term failed (attempt {}): {}", attempt, e);
                    last_err = Some(e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
        Err(Fatal::Storage(last_err.expect("at least one attempt was made")))
    }

    async fn persist_vote(&mut self) -> Result<(), Fatal> {
        let vote_state = self.state.vote_state().clone();
        let mut last_err: Option<StorageError> = None;
        let mut backoff = Duration::from_millis(10);

        for attempt in 0..3 {
            match self.storage.persist_vote(&vote_state).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("persisting vote failed (attempt {}): {}", attempt, e);
                    last_err = Some(e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
        Err(Fatal::Storage(last_err.expect("at least one attempt was made")))
    }
}
