//! Choosing which sequence to request next.
//!
//! Retransmissions always win: the retransmit set is drained, lowest
//! sequence first, before a fresh request is considered. A retransmit that
//! falls outside the window the session currently accepts is stale; the
//! caller removes it with [`RequestScheduler::prune`] so it can release the
//! matching outstanding record.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Sentinel meaning "no limit on fresh requests".
pub const UNBOUNDED: u32 = u32::MAX;

/// Outcome of [`RequestScheduler::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Resend a sequence that timed out.
    Retransmit(u32),
    /// Send the session's current sequence.
    Fresh(u32),
    /// The fresh-request budget is spent and nothing awaits retransmission.
    Exhausted,
}

impl Selection {
    pub fn sequence(&self) -> Option<u32> {
        match self {
            Selection::Retransmit(seq) | Selection::Fresh(seq) => Some(*seq),
            Selection::Exhausted => None,
        }
    }
}

/// Retransmit set plus a budget of fresh requests.
#[derive(Debug, Clone)]
pub struct RequestScheduler {
    retransmits: BTreeSet<u32>,
    max_sequence: u32,
    issued: u32,
}

impl RequestScheduler {
    /// `max_sequence` bounds the number of fresh requests; [`UNBOUNDED`]
    /// disables the bound.
    pub fn new(max_sequence: u32) -> Self {
        Self {
            retransmits: BTreeSet::new(),
            max_sequence,
            issued: 0,
        }
    }

    /// Queue `seq` for retransmission.
    pub fn enqueue_retransmit(&mut self, seq: u32) {
        self.retransmits.insert(seq);
    }

    /// Forget any pending retransmission of `seq`.
    pub fn acknowledge(&mut self, seq: u32) {
        self.retransmits.remove(&seq);
    }

    /// Remove and return queued retransmits outside `window`.
    pub fn prune(&mut self, window: &RangeInclusive<u32>) -> Vec<u32> {
        let stale: Vec<u32> = self.retransmits.iter().copied().filter(|seq| !window.contains(seq)).collect();
        for seq in &stale {
            self.retransmits.remove(seq);
        }
        stale
    }

    /// Pick the next sequence. `window` is what the session accepts right
    /// now; `fresh` is its current sequence. Retransmits outside `window`
    /// are left queued for [`prune`](Self::prune).
    pub fn select(&mut self, window: RangeInclusive<u32>, fresh: u32) -> Selection {
        if let Some(seq) = self.retransmits.range(window).next().copied() {
            self.retransmits.remove(&seq);
            return Selection::Retransmit(seq);
        }

        if self.budget_spent() {
            return Selection::Exhausted;
        }
        self.issued = self.issued.saturating_add(1);
        Selection::Fresh(fresh)
    }

    /// True when no fresh request may be issued and nothing is queued.
    pub fn is_exhausted(&self) -> bool {
        self.retransmits.is_empty() && self.budget_spent()
    }

    fn budget_spent(&self) -> bool {
        self.max_sequence != UNBOUNDED && self.issued >= self.max_sequence
    }

    pub fn pending_retransmits(&self) -> usize {
        self.retransmits.len()
    }

    pub fn has_retransmit(&self, seq: u32) -> bool {
        self.retransmits.contains(&seq)
    }

    /// Fresh requests issued so far.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(UNBOUNDED)
    }
}
