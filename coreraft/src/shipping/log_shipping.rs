use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::config::Config;
use crate::error::RaftLogError;
use crate::log::InFlightMap;
use crate::log::RaftLog;
use crate::network::Outbound;
use crate::outcome::ShipCommand;
use crate::shipping::LeaderContext;
use crate::shipping::RaftLogShipper;
use crate::type_config::RaftTypeConfig;

/// Owns one [`RaftLogShipper`] per other voting member while this member
/// leads, and routes replication events to them.
///
/// Started when leadership is won and torn down on stepping down, so
/// shipper state never leaks across leadership periods.
pub(crate) struct LogShipping<C, O>
where
    C: RaftTypeConfig,
    O: Outbound<C>,
{
    myself: C::Member,
    members: HashSet<C::Member>,
    outbound: Arc<O>,

    retry_time: Duration,
    heartbeat_time: Duration,
    catchup_batch_size: u64,
    max_allowed_shipping_lag: u64,

    shippers: HashMap<C::Member, RaftLogShipper<C, O>>,
}

impl<C, O> LogShipping<C, O>
where
    C: RaftTypeConfig,
    O: Outbound<C>,
{
    pub(crate) fn new(myself: C::Member, members: HashSet<C::Member>, outbound: Arc<O>, config: &Config) -> Self {
        Self {
            myself,
            members,
            outbound,
            retry_time: config.retry_time(),
            heartbeat_time: config.heartbeat_interval(),
            catchup_batch_size: config.catchup_batch_size,
            max_allowed_shipping_lag: config.max_allowed_shipping_lag,
            shippers: HashMap::new(),
        }
    }

    /// Create and start a shipper towards every other voting member.
    pub(crate) fn start<L: RaftLog<C>>(
        &mut self,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        tracing::info!("{}: starting log shipping in term {}", self.myself, ctx.term);

        self.shippers.clear();
        for member in self.members.iter().filter(|m| **m != self.myself) {
            let mut shipper = RaftLogShipper::new(
                self.outbound.clone(),
                self.myself.clone(),
                member.clone(),
                self.retry_time,
                self.heartbeat_time,
                self.catchup_batch_size,
                self.max_allowed_shipping_lag,
            );
            shipper.start(ctx, log, in_flight)?;
            self.shippers.insert(member.clone(), shipper);
        }
        Ok(())
    }

    pub(crate) fn stop(&mut self) {
        if self.shippers.is_empty() {
            return;
        }
        tracing::info!("{}: stopping log shipping", self.myself);
        for shipper in self.shippers.values_mut() {
            shipper.stop();
        }
        self.shippers.clear();
    }

    pub(crate) fn handle_commands<L: RaftLog<C>>(
        &mut self,
        commands: &[ShipCommand<C>],
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        for command in commands {
            match command {
                ShipCommand::Mismatch {
                    target,
                    last_remote_append_index,
                } => {
                    if let Some(shipper) = self.shippers.get_mut(target) {
                        shipper.on_mismatch(*last_remote_append_index, ctx, log, in_flight)?;
                    }
                }
                ShipCommand::Match { target, new_match_index } => {
                    if let Some(shipper) = self.shippers.get_mut(target) {
                        shipper.on_match(*new_match_index, ctx, log, in_flight)?;
                    }
                }
                ShipCommand::NewEntries {
                    prev_log_index,
                    prev_log_term,
                    entries,
                } => {
                    for shipper in self.shippers.values_mut() {
                        shipper.on_new_entries::<L>(*prev_log_index, *prev_log_term, entries, ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Fire retry/heartbeat timeouts of every shipper whose deadline has
    /// passed.
    pub(crate) fn on_tick<L: RaftLog<C>>(
        &mut self,
        now: Instant,
        ctx: &LeaderContext,
        log: &L,
        in_flight: &InFlightMap<C>,
    ) -> Result<(), RaftLogError> {
        for shipper in self.shippers.values_mut() {
            if shipper.is_timed_out(now) {
                shipper.on_timeout(ctx, log, in_flight)?;
            }
        }
        Ok(())
    }
}
