//! The outbound side of the transport.
//!
//! The core never waits for delivery and never assumes it: lost messages
//! are repaired by retransmission timers and the mismatch/match protocol.

use crate::messages::RaftMessage;
use crate::type_config::RaftTypeConfig;

/// An asynchronous sink of outbound messages.
///
/// `send` is a hand-off: it must not block on the network. Implementations
/// typically enqueue onto a per-peer channel drained by transport tasks.
pub trait Outbound<C: RaftTypeConfig>: Send + Sync + 'static {
    fn send(&self, to: C::Member, message: RaftMessage<C>);
}
