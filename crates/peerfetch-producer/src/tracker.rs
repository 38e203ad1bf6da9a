//! Duplicate-request tracking that decides when an item needs a push.
//!
//! Per item the tracker remembers the first requester name it saw and
//! counts requests carrying exactly that name. A different name is neither
//! counted nor does it reset the count. When the count reaches the
//! threshold the item is flagged; the flag stays set until a sync poll
//! consumes it, and accounting for that item is suspended meanwhile.

use std::collections::BTreeMap;

use peerfetch_core::Name;

/// Identical requests needed to flag an item.
pub const DUPLICATE_THRESHOLD: u32 = 3;

/// Tracking state of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemTrackingRecord {
    /// First requester name observed; `None` until the first request.
    pub last_requester: Option<Name>,
    pub duplicate_count: u32,
    pub needs_sync: bool,
}

/// What one content request did to its item's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Counted; `count` is the new total.
    Counted { count: u32 },
    /// Counted and the threshold was just reached.
    Flagged,
    /// Name did not match the recorded requester.
    Mismatch { count: u32 },
    /// Item already flagged; nothing counted.
    AwaitingSync,
}

/// Item-indexed duplicate tracker.
#[derive(Debug, Clone)]
pub struct DuplicateSyncTrigger {
    threshold: u32,
    items: BTreeMap<u32, ItemTrackingRecord>,
}

impl DuplicateSyncTrigger {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            items: BTreeMap::new(),
        }
    }

    /// Account for a content request for `item` named `requester`.
    pub fn observe(&mut self, item: u32, requester: &Name) -> Observation {
        let record = self.items.entry(item).or_default();
        if record.needs_sync {
            return Observation::AwaitingSync;
        }

        match &record.last_requester {
            None => {
                record.last_requester = Some(requester.clone());
                record.duplicate_count = 1;
            }
            Some(previous) if previous == requester => {
                record.duplicate_count += 1;
            }
            Some(_) => {
                return Observation::Mismatch {
                    count: record.duplicate_count,
                };
            }
        }

        if record.duplicate_count == self.threshold {
            record.needs_sync = true;
            Observation::Flagged
        } else {
            Observation::Counted {
                count: record.duplicate_count,
            }
        }
    }

    /// Consume the lowest flagged item, returning it with the requester
    /// name that triggered it.
    pub fn poll(&mut self) -> Option<(u32, Name)> {
        let (item, record) = self.items.iter_mut().find(|(_, r)| r.needs_sync)?;
        record.needs_sync = false;
        let requester = record.last_requester.clone()?;
        Some((*item, requester))
    }

    pub fn record(&self, item: u32) -> Option<&ItemTrackingRecord> {
        self.items.get(&item)
    }

    pub fn flagged(&self) -> usize {
        self.items.values().filter(|r| r.needs_sync).count()
    }

    pub fn tracked(&self) -> usize {
        self.items.len()
    }
}

impl Default for DuplicateSyncTrigger {
    fn default() -> Self {
        Self::new(DUPLICATE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    #[test]
    fn test_three_identical_requests_flag_once() {
        let mut trigger = DuplicateSyncTrigger::default();
        let b = name("/prefix/file/B/040");
        assert_eq!(trigger.observe(40, &b), Observation::Counted { count: 1 });
        assert_eq!(trigger.observe(40, &b), Observation::Counted { count: 2 });
        assert_eq!(trigger.observe(40, &b), Observation::Flagged);
        assert_eq!(trigger.observe(40, &b), Observation::AwaitingSync);
        assert_eq!(trigger.flagged(), 1);
    }

    #[test]
    fn test_mismatched_name_neither_counts_nor_resets() {
        let mut trigger = DuplicateSyncTrigger::default();
        let b = name("/prefix/file/B/040");
        let c = name("/prefix/file/C/040");
        trigger.observe(40, &b);
        trigger.observe(40, &b);
        assert_eq!(trigger.observe(40, &c), Observation::Mismatch { count: 2 });
        assert_eq!(trigger.record(40).unwrap().last_requester.as_ref(), Some(&b));
        assert_eq!(trigger.observe(40, &b), Observation::Flagged);
    }

    #[test]
    fn test_poll_consumes_lowest_flag() {
        let mut trigger = DuplicateSyncTrigger::default();
        let b = name("/prefix/file/B/041");
        let c = name("/prefix/file/C/012");
        for _ in 0..3 {
            trigger.observe(41, &b);
            trigger.observe(12, &c);
        }
        assert_eq!(trigger.poll(), Some((12, c)));
        assert_eq!(trigger.poll(), Some((41, b)));
        assert_eq!(trigger.poll(), None);
    }

    #[test]
    fn test_no_reflag_after_consumption() {
        let mut trigger = DuplicateSyncTrigger::default();
        let b = name("/prefix/file/B/040");
        for _ in 0..3 {
            trigger.observe(40, &b);
        }
        trigger.poll();
        // Count continues past the threshold; the flag is one-shot.
        assert_eq!(trigger.observe(40, &b), Observation::Counted { count: 4 });
        assert_eq!(trigger.flagged(), 0);
    }

    #[test]
    fn test_items_are_unbounded() {
        let mut trigger = DuplicateSyncTrigger::default();
        let n = name("/prefix/file/B/9000");
        for _ in 0..3 {
            trigger.observe(9000, &n);
        }
        assert_eq!(trigger.poll().map(|(item, _)| item), Some(9000));
    }
}
