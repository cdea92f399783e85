use crate::messages::RaftMessage;
use crate::raft_types::LogIndex;
use crate::type_config::RaftTypeConfig;

/// Everything that enters the instance queue.
///
/// Inbound peer messages, client submissions (as
/// [`RaftMessage::NewEntry`]), timer ticks and host hooks are all
/// serialized through one channel, so a handler always runs to completion
/// before the next event is seen.
#[derive(Debug)]
pub(crate) enum RaftMsg<C: RaftTypeConfig> {
    Inbound(RaftMessage<C>),

    Tick,

    /// Host hook: the log prefix below `safe_index` may be discarded.
    Prune { safe_index: LogIndex },

    /// Host hook: entries up to `index` were applied to the store.
    MarkApplied { index: LogIndex },

    Shutdown,
}
