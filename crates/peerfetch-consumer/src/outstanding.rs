//! Bookkeeping for requests that have been sent but not answered.
//!
//! Two indices are kept in step:
//!
//! - a time-ordered set of `(sent_at, sequence)` pairs, so the sweep can
//!   examine the oldest request first and stop at the first unexpired one;
//! - a per-sequence record holding first-send time, last-send time and the
//!   number of sends, used for delay accounting and to decide whether a
//!   reply is a usable RTT sample.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use peerfetch_core::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SendRecord {
    first_sent: SimTime,
    last_sent: SimTime,
    sends: u32,
    /// Key currently held in the timeline, if the entry is armed.
    armed: Option<SimTime>,
    /// Cleared once the request has timed out.
    rtt_usable: bool,
}

/// Delays observed when a reply completes a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDelays {
    /// From the first send to the reply.
    pub first_send: Duration,
    /// From the most recent send to the reply.
    pub last_send: Duration,
    /// Number of times the request was sent.
    pub sends: u32,
    /// True when the request was sent once and never timed out.
    pub rtt_usable: bool,
}

/// Outstanding requests of one consumer.
#[derive(Debug, Default, Clone)]
pub struct OutstandingTable {
    timeline: BTreeSet<(SimTime, u32)>,
    records: BTreeMap<u32, SendRecord>,
}

impl OutstandingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a send of `seq` at `now`.
    ///
    /// Sending a sequence that is already outstanding moves it to `now` in
    /// the timeline, keeps its first-send time and bumps its send count.
    pub fn record_send(&mut self, seq: u32, now: SimTime) {
        let record = self.records.entry(seq).or_insert(SendRecord {
            first_sent: now,
            last_sent: now,
            sends: 0,
            armed: None,
            rtt_usable: true,
        });
        if let Some(key) = record.armed.take() {
            self.timeline.remove(&(key, seq));
        }
        record.last_sent = now;
        record.sends += 1;
        if record.sends > 1 {
            record.rtt_usable = false;
        }
        record.armed = Some(now);
        self.timeline.insert((now, seq));
    }

    /// The oldest armed entry.
    pub fn oldest(&self) -> Option<(SimTime, u32)> {
        self.timeline.first().copied()
    }

    /// Disarm the oldest entry after it timed out.
    ///
    /// Its delay record survives until the retransmission is answered or the
    /// sequence is [forgotten](Self::forget), so a late reply still reports
    /// the first-send delay. It no longer yields an RTT sample.
    pub fn expire_oldest(&mut self) -> Option<u32> {
        let (_, seq) = self.timeline.pop_first()?;
        if let Some(record) = self.records.get_mut(&seq) {
            record.armed = None;
            record.rtt_usable = false;
        }
        Some(seq)
    }

    /// Remove `seq` from every index, returning its delays.
    pub fn complete(&mut self, seq: u32, now: SimTime) -> Option<ReplyDelays> {
        let record = self.records.remove(&seq)?;
        if let Some(key) = record.armed {
            self.timeline.remove(&(key, seq));
        }
        Some(ReplyDelays {
            first_send: now - record.first_sent,
            last_send: now - record.last_sent,
            sends: record.sends,
            rtt_usable: record.rtt_usable,
        })
    }

    /// Drop `seq` without producing delays. Used once the sequence can no
    /// longer be answered usefully.
    pub fn forget(&mut self, seq: u32) -> bool {
        let Some(record) = self.records.remove(&seq) else {
            return false;
        };
        if let Some(key) = record.armed {
            self.timeline.remove(&(key, seq));
        }
        true
    }

    /// Number of sends recorded for `seq`.
    pub fn sends(&self, seq: u32) -> u32 {
        self.records.get(&seq).map_or(0, |r| r.sends)
    }

    /// True if `seq` is waiting in the timeline.
    pub fn is_armed(&self, seq: u32) -> bool {
        self.records.get(&seq).is_some_and(|r| r.armed.is_some())
    }

    /// True if `seq` has any record.
    pub fn contains(&self, seq: u32) -> bool {
        self.records.contains_key(&seq)
    }

    /// Number of armed entries.
    pub fn armed_len(&self) -> usize {
        self.timeline.len()
    }

    /// Number of sequences with a delay record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_is_first_sent() {
        let mut table = OutstandingTable::new();
        table.record_send(5, SimTime::from_millis(10));
        table.record_send(2, SimTime::from_millis(20));
        table.record_send(9, SimTime::from_millis(30));
        assert_eq!(table.oldest(), Some((SimTime::from_millis(10), 5)));
    }

    #[test]
    fn test_resend_refreshes_timeline_and_counts() {
        let mut table = OutstandingTable::new();
        table.record_send(1, SimTime::from_millis(0));
        table.record_send(2, SimTime::from_millis(5));
        table.record_send(1, SimTime::from_millis(10));

        assert_eq!(table.oldest(), Some((SimTime::from_millis(5), 2)));
        assert_eq!(table.armed_len(), 2);
        assert_eq!(table.sends(1), 2);

        let delays = table.complete(1, SimTime::from_millis(25)).unwrap();
        assert_eq!(delays.first_send, Duration::from_millis(25));
        assert_eq!(delays.last_send, Duration::from_millis(15));
        assert_eq!(delays.sends, 2);
        assert!(!delays.rtt_usable);
    }

    #[test]
    fn test_complete_removes_every_index() {
        let mut table = OutstandingTable::new();
        table.record_send(3, SimTime::ZERO);
        let delays = table.complete(3, SimTime::from_millis(40)).unwrap();
        assert!(delays.rtt_usable);
        assert_eq!(delays.sends, 1);
        assert!(table.is_empty());
        assert_eq!(table.armed_len(), 0);
        assert_eq!(table.complete(3, SimTime::from_millis(50)), None);
    }

    #[test]
    fn test_expired_entry_keeps_first_send_delay() {
        let mut table = OutstandingTable::new();
        table.record_send(4, SimTime::ZERO);
        assert_eq!(table.expire_oldest(), Some(4));
        assert!(!table.is_armed(4));
        assert!(table.contains(4));

        table.record_send(4, SimTime::from_secs(1));
        let delays = table.complete(4, SimTime::from_millis(1100)).unwrap();
        assert_eq!(delays.first_send, Duration::from_millis(1100));
        assert_eq!(delays.last_send, Duration::from_millis(100));
        assert!(!delays.rtt_usable);
    }

    #[test]
    fn test_forget_drops_armed_and_expired_entries() {
        let mut table = OutstandingTable::new();
        table.record_send(1, SimTime::ZERO);
        table.record_send(2, SimTime::from_millis(5));
        table.expire_oldest();

        assert!(table.forget(1));
        assert!(table.forget(2));
        assert!(!table.forget(2));
        assert!(table.is_empty());
        assert_eq!(table.oldest(), None);
    }

    #[test]
    fn test_late_reply_after_timeout_is_not_a_sample() {
        let mut table = OutstandingTable::new();
        table.record_send(7, SimTime::ZERO);
        table.expire_oldest();
        let delays = table.complete(7, SimTime::from_secs(3)).unwrap();
        assert_eq!(delays.sends, 1);
        assert!(!delays.rtt_usable);
    }
}
