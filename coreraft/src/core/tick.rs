//! Emits a `RaftMsg::Tick` into the instance queue at a fixed interval.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tokio::time::Instant;

use crate::core::raft_msg::RaftMsg;
use crate::type_config::RaftTypeConfig;

pub(crate) struct Tick<C: RaftTypeConfig> {
    interval: Duration,
    tx: mpsc::UnboundedSender<RaftMsg<C>>,
}

impl<C: RaftTypeConfig> Tick<C> {
    pub(crate) fn spawn(interval: Duration, tx: mpsc::UnboundedSender<RaftMsg<C>>) -> JoinHandle<()> {
        let t = Tick { interval, tx };

        tokio::spawn(async move {
            loop {
                let at = Instant::now() + t.interval;
                sleep_until(at).await;

                if t.tx.send(RaftMsg::Tick).is_err() {
                    tracing::debug!("tick receiver dropped, stopping ticker");
                    return;
                }
            }
        })
    }
}
