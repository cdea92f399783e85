//! Reusable test doubles: a concrete type config, a member marshal and an
//! outbound message collector.
//!
//! These are part of the public API so that applications can test their
//! own wiring against the core without inventing fixtures.

use std::fmt;
use std::sync::Mutex;

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::entry::RaftLogEntry;
use crate::messages::Directed;
use crate::messages::RaftMessage;
use crate::network::Outbound;
use crate::state::marshal::ChannelMarshal;
use crate::type_config::RaftTypeConfig;

/// A minimal member id for tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TestMember(pub u64);

impl fmt::Display for TestMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member-{}", self.0)
    }
}

/// The type config used across the test suite: [`TestMember`] ids and
/// plain `String` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestTypes;

impl RaftTypeConfig for TestTypes {
    type Member = TestMember;
    type Content = String;
}

/// Marshals a [`TestMember`] as its raw id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestMemberMarshal;

impl ChannelMarshal<TestMember> for TestMemberMarshal {
    fn marshal(&self, value: &TestMember, buf: &mut BytesMut) {
        buf.put_u64(value.0);
    }

    fn unmarshal(&self, buf: &mut Bytes) -> Option<TestMember> {
        use bytes::Buf;

        if buf.remaining() < 8 {
            return None;
        }
        Some(TestMember(buf.get_u64()))
    }
}

/// An [`Outbound`] that records every message instead of sending it.
#[derive(Debug)]
pub struct OutboundMessageCollector<C: RaftTypeConfig> {
    sent: Mutex<Vec<Directed<C>>>,
}

impl<C: RaftTypeConfig> Default for OutboundMessageCollector<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RaftTypeConfig> OutboundMessageCollector<C> {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every message sent to `target`, in order.
    pub fn sent_to(&self, target: &C::Member) -> Vec<RaftMessage<C>> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.to == *target)
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// All log entries contained in append requests sent to `target`,
    /// concatenated in send order.
    pub fn entries_sent_to(&self, target: &C::Member) -> Vec<RaftLogEntry<C>> {
        self.sent_to(target)
            .into_iter()
            .filter_map(|m| match m {
                RaftMessage::AppendEntriesRequest(req) => Some(req.entries),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// True if any append request with a payload went to `target`.
    pub fn has_any_entries_to(&self, target: &C::Member) -> bool {
        !self.entries_sent_to(target).is_empty()
    }

    pub fn has_message(&self, target: &C::Member, message: &RaftMessage<C>) -> bool {
        self.sent_to(target).iter().any(|m| m == message)
    }
}

impl<C: RaftTypeConfig> Outbound<C> for OutboundMessageCollector<C> {
    fn send(&self, to: C::Member, message: RaftMessage<C>) {
        self.sent.lock().unwrap().push(Directed::new(to, message));
    }
}
