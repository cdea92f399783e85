use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::entry::RaftLogEntry;
use crate::log::InFlightMap;
use crate::log::InMemoryRaftLog;
use crate::log::RaftLog;
use crate::messages::LogCompactionInfo;
use crate::messages::RaftMessage;
use crate::shipping::LeaderContext;
use crate::shipping::RaftLogShipper;
use crate::testing::OutboundMessageCollector;
use crate::testing::TestMember;
use crate::testing::TestTypes;

const CATCHUP_BATCH_SIZE: u64 = 64;
const MAX_ALLOWED_SHIPPING_LAG: u64 = 256;

fn leader() -> TestMember {
    TestMember(0)
}

fn follower() -> TestMember {
    TestMember(1)
}

fn ctx() -> LeaderContext {
    LeaderContext::new(0, 0)
}

fn entry0() -> RaftLogEntry<TestTypes> {
    RaftLogEntry::new(0, "1000".to_string())
}

fn entry1() -> RaftLogEntry<TestTypes> {
    RaftLogEntry::new(0, "kedha".to_string())
}

fn entry2() -> RaftLogEntry<TestTypes> {
    RaftLogEntry::new(0, "2000".to_string())
}

fn entry3() -> RaftLogEntry<TestTypes> {
    RaftLogEntry::new(0, "chupchick".to_string())
}

struct Fixture {
    outbound: Arc<OutboundMessageCollector<TestTypes>>,
    log: InMemoryRaftLog<TestTypes>,
    in_flight: InFlightMap<TestTypes>,
    shipper: RaftLogShipper<TestTypes, OutboundMessageCollector<TestTypes>>,
}

impl Fixture {
    /// The retry/heartbeat times are far away so that timers never
    /// interfere; tests drive the shipper by hand.
    fn new(entries: &[RaftLogEntry<TestTypes>]) -> Self {
        let outbound = Arc::new(OutboundMessageCollector::new());
        let mut log = InMemoryRaftLog::new();
        for e in entries {
            log.append(e.clone()).unwrap();
        }
        let shipper = RaftLogShipper::new(
            outbound.clone(),
            leader(),
            follower(),
            Duration::from_millis(100_000),
            Duration::from_millis(100_000),
            CATCHUP_BATCH_SIZE,
            MAX_ALLOWED_SHIPPING_LAG,
        );
        Self {
            outbound,
            log,
            in_flight: InFlightMap::new(1024),
            shipper,
        }
    }

    fn start(&mut self) {
        self.shipper.start(&ctx(), &self.log, &self.in_flight).unwrap();
    }
}

#[test]
fn test_should_send_last_entry_on_start() {
    let mut f = Fixture::new(&[entry0(), entry1()]);

    f.start();

    assert_eq!(vec![entry1()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_send_previous_entry_on_mismatch() {
    let mut f = Fixture::new(&[entry0(), entry1()]);
    f.start();

    f.outbound.clear();
    f.shipper.on_mismatch(0, &ctx(), &f.log, &f.in_flight).unwrap();

    assert_eq!(vec![entry0()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_keep_sending_first_entry_after_several_mismatches() {
    let mut f = Fixture::new(&[entry0(), entry1()]);
    f.start();

    f.shipper.on_mismatch(0, &ctx(), &f.log, &f.in_flight).unwrap();
    f.shipper.on_mismatch(0, &ctx(), &f.log, &f.in_flight).unwrap();

    f.outbound.clear();
    f.shipper.on_mismatch(0, &ctx(), &f.log, &f.in_flight).unwrap();

    assert_eq!(vec![entry0()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_send_next_batch_after_match() {
    let mut f = Fixture::new(&[entry0(), entry1(), entry2(), entry3()]);
    f.start();

    f.shipper.on_mismatch(0, &ctx(), &f.log, &f.in_flight).unwrap();

    f.outbound.clear();
    f.shipper.on_match(0, &ctx(), &f.log, &f.in_flight).unwrap();

    assert_eq!(vec![entry1(), entry2(), entry3()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_send_new_entries_after_matching_last_entry() {
    let mut f = Fixture::new(&[entry0()]);
    f.start();

    f.shipper.on_match(0, &ctx(), &f.log, &f.in_flight).unwrap();

    f.outbound.clear();

    f.log.append(entry1()).unwrap();
    f.shipper.on_new_entries::<InMemoryRaftLog<TestTypes>>(0, 0, &[entry1()], &ctx()).unwrap();
    f.log.append(entry2()).unwrap();
    f.shipper.on_new_entries::<InMemoryRaftLog<TestTypes>>(1, 0, &[entry2()], &ctx()).unwrap();

    assert_eq!(vec![entry1(), entry2()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_not_send_new_entries_when_not_matched() {
    let mut f = Fixture::new(&[entry0()]);
    f.start();

    f.outbound.clear();
    f.shipper.on_new_entries::<InMemoryRaftLog<TestTypes>>(0, 0, &[entry1()], &ctx()).unwrap();
    f.shipper.on_new_entries::<InMemoryRaftLog<TestTypes>>(1, 0, &[entry2()], &ctx()).unwrap();

    assert_eq!(0, f.outbound.sent_to(&follower()).len());
}

#[test]
fn test_should_resend_last_sent_entry_on_first_mismatch() {
    let mut f = Fixture::new(&[entry0()]);
    f.start();
    f.log.append(entry1()).unwrap();
    f.log.append(entry2()).unwrap();

    f.shipper.on_match(0, &ctx(), &f.log, &f.in_flight).unwrap();
    f.shipper.on_new_entries::<InMemoryRaftLog<TestTypes>>(0, 0, &[entry1()], &ctx()).unwrap();
    f.shipper.on_new_entries::<InMemoryRaftLog<TestTypes>>(1, 0, &[entry2()], &ctx()).unwrap();

    f.outbound.clear();
    f.shipper.on_mismatch(1, &ctx(), &f.log, &f.in_flight).unwrap();

    assert_eq!(vec![entry2()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_send_all_entries_and_catch_up_completely() {
    let entry_count = CATCHUP_BATCH_SIZE as i64 * 10;
    let entries: Vec<_> = (0..entry_count).map(|i| RaftLogEntry::<TestTypes>::new(0, i.to_string())).collect();
    let mut f = Fixture::new(&entries);

    f.start();

    // Back-tracking stage: probe down to the first entry.
    let first_entry = entries[0].clone();
    while !f.outbound.entries_sent_to(&follower()).contains(&first_entry) {
        f.shipper.on_mismatch(-1, &ctx(), &f.log, &f.in_flight).unwrap();
    }

    // Catch-up stage: acknowledge batch after batch.
    let mut match_index;
    loop {
        let last_request = f
            .outbound
            .sent_to(&follower())
            .into_iter()
            .rev()
            .find_map(|m| match m {
                RaftMessage::AppendEntriesRequest(req) if !req.entries.is_empty() => Some(req),
                _ => None,
            })
            .expect("an append request must have been sent");
        match_index = last_request.prev_log_index + last_request.entries.len() as i64;

        f.outbound.clear();
        f.shipper.on_match(match_index, &ctx(), &f.log, &f.in_flight).unwrap();

        if f.outbound.sent_to(&follower()).is_empty() {
            break;
        }
    }

    assert_eq!(entry_count - 1, match_index);
}

#[test]
fn test_should_send_most_recently_available_entry_if_pruning_happened() {
    let mut f = Fixture::new(&[entry0(), entry1(), entry2(), entry3()]);
    f.start();

    f.log.prune(2).unwrap();
    f.outbound.clear();
    f.shipper.on_mismatch(0, &ctx(), &f.log, &f.in_flight).unwrap();

    assert!(f.outbound.has_any_entries_to(&follower()));
    assert_eq!(vec![entry3()], f.outbound.entries_sent_to(&follower()));
}

#[test]
fn test_should_send_log_compaction_info_on_match_if_entries_pruned_away() {
    let mut f = Fixture::new(&[entry0(), entry1(), entry2(), entry3()]);
    f.start();

    // Pruning slips in between the match decision and the log read.
    f.log.prune(2).unwrap();
    f.outbound.clear();
    f.shipper.on_match(1, &ctx(), &f.log, &f.in_flight).unwrap();

    let expected = RaftMessage::LogCompactionInfo(LogCompactionInfo {
        from: leader(),
        term: 0,
        prev_index: 1,
    });
    assert!(f.outbound.has_message(&follower(), &expected));
    assert!(!f.outbound.has_any_entries_to(&follower()));
}
