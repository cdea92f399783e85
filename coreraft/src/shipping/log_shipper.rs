use std::cmp::max;
use std::cmp::min;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::entry::RaftLogEntry;
use crate::error::RaftLogError;
use crate::log::InFlightMap;
use crate::log::RaftLog;
use crate::messages::AppendEntriesRequest;
use crate::messages::LogCompactionInfo;
use crate::messages::RaftMessage;
use crate::network::Outbound;
use crate::raft_types::LogIndex;
use crate::raft_types::Term;
use crate::raft_types::NO_INDEX;
use crate::raft_types::NO_TERM;
use crate::shipping::LeaderContext;
use crate::type_config::RaftTypeConfig;

/// The operating mode of a shipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Back-tracking: probe with single entries at successively lower
    /// positions until the follower's log matches.
    Mismatch,
    /// In sync: stream new entries as they are appended.
    Pipeline,
    /// Behind but matching: ship batches until the follower reaches the
    /// log end.
    Catchup,
}

/// Replication to a single follower.
///
/// The shipper owns the probe and streaming positions for its follower;
/// the leader only mirrors the match index for commit computation. All
/// methods are invoked from the instance task, so the shipper reads the
/// log and the in-flight cache by reference without further
/// synchronization.
pub(crate) struct RaftLogShipper<C, O>
where
    C: RaftTypeConfig,
    O: Outbound<C>,
{
    outbound: Arc<O>,
    leader: C::Member,
    follower: C::Member,

    retry_time: Duration,
    heartbeat_time: Duration,
    catchup_batch_size: u64,
    max_allowed_shipping_lag: u64,

    mode: Mode,
    last_sent_index: LogIndex,
    match_index: LogIndex,
    timeout_deadline: Option<Instant>,
}

impl<C, O> RaftLogShipper<C, O>
where
    C: RaftTypeConfig,
    O: Outbound<C>,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        outbound: Arc<O>,
        leader: C::Member,
        follower: C::Member,
        retry_time: Duration,
        heartbeat_time: Duration,
        catchup_batch_size: u64,
        max_allowed_shipping_lag: u64,
    ) -> Self {
        Self {
            outbound,
            leader,
            follower,
            retry_time,
            heartbeat_time,
            catchup_batch_size,
            max_allowed_shipping_lag,
            mode: Mode::Mismatch,
            last_sent_index: NO_INDEX,
            match_index: NO_INDEX,
            timeout_deadline: None,
        }
    }

    /// Send the initial append carrying the current last entry (or a bare
    /// heartbeat when the log is empty).
    pub(crate) fn start<L: RaftLog<C>>(
        &mut self,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        tracing::info!("starting log shipper: {} -> {}", self.leader, self.follower);

        let last_index = log.append_index();
        if last_index == NO_INDEX {
            self.send_empty(NO_INDEX, ctx, log)
        } else {
            self.send_single(last_index, ctx, log, in_flight)
        }
    }

    pub(crate) fn stop(&mut self) {
        tracing::info!("stopping log shipper: {} -> {}", self.leader, self.follower);
        self.timeout_deadline = None;
    }

    /// The follower rejected our last append. Probe further back, floored
    /// at the first entry still in the log.
    ///
    /// `last_remote_append_index` caps the probe when known; a negative
    /// value means the follower's log end is unknown and we back off one
    /// step at a time.
    pub(crate) fn on_mismatch<L: RaftLog<C>>(
        &mut self,
        last_remote_append_index: LogIndex,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        match self.mode {
            Mode::Mismatch => {
                let mut probe = self.last_sent_index - 1;
                if last_remote_append_index >= 0 {
                    probe = min(probe, last_remote_append_index);
                }
                let probe = max(probe, log.prev_index() + 1);
                self.send_single(probe, ctx, log, in_flight)
            }
            Mode::Pipeline | Mode::Catchup => {
                tracing::info!("follower {} mismatched at {}, back-tracking", self.follower, self.last_sent_index);
                self.mode = Mode::Mismatch;
                self.send_single(self.last_sent_index, ctx, log, in_flight)
            }
        }
    }

    /// The follower acknowledged entries up to `new_match_index`.
    pub(crate) fn on_match<L: RaftLog<C>>(
        &mut self,
        new_match_index: LogIndex,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        let progress = new_match_index > self.match_index;
        if progress {
            self.match_index = new_match_index;
        }

        match self.mode {
            Mode::Mismatch => self.send_next_batch_after_match(ctx, log, in_flight),
            Mode::Pipeline => {
                if self.match_index == self.last_sent_index {
                    // Fully caught up; only keepalives from here.
                    self.schedule_timeout(self.heartbeat_time);
                } else if progress {
                    self.schedule_timeout(self.retry_time);
                }
                Ok(())
            }
            Mode::Catchup => {
                if self.match_index >= self.last_sent_index {
                    self.send_next_batch_after_match(ctx, log, in_flight)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The leader appended fresh entries; forward them if we are in sync.
    pub(crate) fn on_new_entries<L: RaftLog<C>>(
        &mut self,
        prev_log_index: LogIndex,
        prev_log_term: Term,
        new_entries: &[RaftLogEntry<C>],
        ctx: &LeaderContext,
    ) -> Result<(), RaftLogError> {
        match self.mode {
            Mode::Pipeline => {
                if prev_log_index != self.last_sent_index {
                    tracing::debug!(
                        "dropping pipelined entries at {}: shipper is at {}",
                        prev_log_index,
                        self.last_sent_index
                    );
                    return Ok(());
                }
                if prev_log_index - self.match_index <= self.max_allowed_shipping_lag as LogIndex {
                    self.send_new_entries(prev_log_index, prev_log_term, new_entries, ctx);
                } else {
                    tracing::info!(
                        "follower {} is {} entries behind, pausing pipeline",
                        self.follower,
                        prev_log_index - self.match_index
                    );
                    self.mode = Mode::Catchup;
                }
                Ok(())
            }
            Mode::Mismatch | Mode::Catchup => {
                // No new entries are shipped before the follower matches.
                tracing::debug!("dropping pipelined entries in {:?} mode", self.mode);
                Ok(())
            }
        }
    }

    /// Retry timer fired: retransmit the current probe or batch, or emit a
    /// keepalive when pipelining.
    pub(crate) fn on_timeout<L: RaftLog<C>>(
        &mut self,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        tracing::trace!("shipper timeout towards {} in {:?} mode", self.follower, self.mode);
        match self.mode {
            Mode::Pipeline => self.send_empty(self.last_sent_index, ctx, log),
            Mode::Mismatch => self.send_single(self.last_sent_index, ctx, log, in_flight),
            Mode::Catchup => self.send_next_batch_after_match(ctx, log, in_flight),
        }
    }

    pub(crate) fn is_timed_out(&self, now: Instant) -> bool {
        match self.timeout_deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    fn schedule_timeout(&mut self, after: Duration) {
        self.timeout_deadline = Some(Instant::now() + after);
    }

    /// Ship the next catch-up batch, or settle into the pipeline when the
    /// follower has reached the log end.
    fn send_next_batch_after_match<L: RaftLog<C>>(
        &mut self,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        let last_index = log.append_index();
        if last_index > self.match_index {
            let end_index = min(last_index, self.match_index + self.catchup_batch_size as LogIndex);
            self.mode = Mode::Catchup;
            self.send_range(self.match_index + 1, end_index, ctx, log, in_flight)
        } else {
            self.mode = Mode::Pipeline;
            self.schedule_timeout(self.heartbeat_time);
            Ok(())
        }
    }

    fn send_single<L: RaftLog<C>>(
        &mut self,
        index: LogIndex,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        if index == NO_INDEX {
            return self.send_empty(NO_INDEX, ctx, log);
        }

        self.schedule_timeout(self.retry_time);
        self.last_sent_index = index;

        let prev_log_index = index - 1;
        let prev_log_term = log.read_entry_term(prev_log_index)?;

        if prev_log_term > ctx.term {
            tracing::warn!(
                "aborting send: entry term {} at {} is beyond the leader context term {}",
                prev_log_term,
                prev_log_index,
                ctx.term
            );
            return Ok(());
        }

        if prev_log_index > NO_INDEX && prev_log_term == NO_TERM {
            // The predecessor was pruned under us: the follower needs a
            // store copy, but the freshest entry can still be shipped.
            self.send_log_compaction_info(ctx, log);
            let last_index = log.append_index();
            if last_index > index && last_index - 1 > log.prev_index() {
                return self.send_single(last_index, ctx, log, in_flight);
            }
            return Ok(());
        }

        match self.read_entry(index, log, in_flight) {
            Ok(Some(entry)) => {
                self.ship(prev_log_index, prev_log_term, vec![entry], ctx);
                Ok(())
            }
            Ok(None) => self.send_empty(log.append_index(), ctx, log),
            Err(RaftLogError::Pruned { .. }) => {
                self.send_log_compaction_info(ctx, log);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn send_range<L: RaftLog<C>>(
        &mut self,
        start_index: LogIndex,
        end_index: LogIndex,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        debug_assert!(start_index <= end_index);

        self.schedule_timeout(self.retry_time);
        self.last_sent_index = end_index;

        let prev_log_index = start_index - 1;
        let prev_log_term = log.read_entry_term(prev_log_index)?;

        if prev_log_term > ctx.term {
            tracing::warn!(
                "aborting send: entry term {} at {} is beyond the leader context term {}",
                prev_log_term,
                prev_log_index,
                ctx.term
            );
            return Ok(());
        }

        if prev_log_index > NO_INDEX && prev_log_term == NO_TERM {
            self.send_log_compaction_info(ctx, log);
            return Ok(());
        }

        match self.read_range(start_index, end_index, log, in_flight)? {
            Some(entries) => {
                self.ship(prev_log_index, prev_log_term, entries, ctx);
                Ok(())
            }
            None => {
                // Pruning overtook the read.
                self.send_log_compaction_info(ctx, log);
                Ok(())
            }
        }
    }

    fn send_new_entries(
        &mut self,
        prev_log_index: LogIndex,
        prev_log_term: Term,
        new_entries: &[RaftLogEntry<C>],
        ctx: &LeaderContext,
    ) {
        self.schedule_timeout(self.retry_time);
        self.last_sent_index = prev_log_index + new_entries.len() as LogIndex;
        self.ship(prev_log_index, prev_log_term, new_entries.to_vec(), ctx);
    }

    /// A keepalive: an append with no payload, positioned at `index`.
    fn send_empty<L: RaftLog<C>>(&mut self, index: LogIndex, ctx: &LeaderContext, log: &L) -> Result<(), RaftLogError> {
        self.schedule_timeout(self.heartbeat_time);
        self.last_sent_index = index;

        let prev_log_term = log.read_entry_term(index)?;
        self.ship(index, prev_log_term, Vec::new(), ctx);
        Ok(())
    }

    fn send_log_compaction_info<L: RaftLog<C>>(&mut self, ctx: &LeaderContext, log: &L) {
        tracing::info!(
            "follower {} needs entries below {}, recommending store copy",
            self.follower,
            log.prev_index() + 1
        );
        self.outbound.send(
            self.follower.clone(),
            RaftMessage::LogCompactionInfo(LogCompactionInfo {
                from: self.leader.clone(),
                term: ctx.term,
                prev_index: log.prev_index(),
            }),
        );
    }

    fn ship(&self, prev_log_index: LogIndex, prev_log_term: Term, entries: Vec<RaftLogEntry<C>>, ctx: &LeaderContext) {
        self.outbound.send(
            self.follower.clone(),
            RaftMessage::AppendEntriesRequest(AppendEntriesRequest {
                from: self.leader.clone(),
                term: ctx.term,
                prev_log_index,
                prev_log_term,
                entries,
                leader_commit: ctx.commit_index,
            }),
        );
    }

    fn read_entry<L: RaftLog<C>>(
        &self,
        index: LogIndex,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<Option<RaftLogEntry<C>>, RaftLogError> {
        if let Some(entry) = in_flight.get(index) {
            return Ok(Some(entry.clone()));
        }
        log.read_entry(index)
    }

    /// Read `start..=end`, preferring the in-flight cache. `None` means
    /// part of the range was pruned away before we got to it.
    fn read_range<L: RaftLog<C>>(
        &self,
        start_index: LogIndex,
        end_index: LogIndex,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<Option<Vec<RaftLogEntry<C>>>, RaftLogError> {
        let wanted = (end_index - start_index + 1) as usize;
        let mut entries = Vec::with_capacity(wanted);

        let mut index = start_index;
        while index <= end_index {
            match in_flight.get(index) {
                Some(entry) => {
                    entries.push(entry.clone());
                    index += 1;
                }
                None => break,
            }
        }

        if index <= end_index {
            match log.entries_from(index) {
                Ok(iter) => entries.extend(iter.take((end_index - index + 1) as usize)),
                Err(RaftLogError::Pruned { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        }

        if entries.len() != wanted {
            return Ok(None);
        }
        Ok(Some(entries))
    }
}
