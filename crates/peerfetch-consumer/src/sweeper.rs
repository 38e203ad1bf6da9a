//! Periodic scan for timed-out requests.

use std::time::Duration;

use peerfetch_core::{SimTime, Substrate, TimerHandle, TimerKind};

use crate::outstanding::OutstandingTable;

/// Fires on a fixed period, independent of the send cadence, and declares
/// timeouts oldest-first.
#[derive(Debug, Clone)]
pub struct RetransmissionSweeper {
    period: Duration,
    timer: Option<TimerHandle>,
}

impl RetransmissionSweeper {
    pub fn new(period: Duration) -> Self {
        Self { period, timer: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Schedule the next check unless one is already pending.
    pub fn arm(&mut self, substrate: &mut dyn Substrate) {
        if self.timer.is_none() {
            self.timer = Some(substrate.schedule(self.period, TimerKind::RetransmitSweep));
        }
    }

    /// Forget the handle of the timer that just fired.
    pub fn fired(&mut self) {
        self.timer = None;
    }

    /// Cancel the pending check.
    pub fn disarm(&mut self, substrate: &mut dyn Substrate) {
        if let Some(handle) = self.timer.take() {
            substrate.cancel(handle);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Remove and return every entry with `sent_at + rto <= now`, oldest
    /// first. Stops at the first entry that has not expired.
    pub fn sweep(&self, table: &mut OutstandingTable, rto: Duration, now: SimTime) -> Vec<u32> {
        let mut expired = Vec::new();
        while let Some((sent_at, _)) = table.oldest() {
            if sent_at + rto > now {
                break;
            }
            if let Some(seq) = table.expire_oldest() {
                expired.push(seq);
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_core::substrate::recording::RecordingSubstrate;

    #[test]
    fn test_sweep_expires_oldest_first_and_stops() {
        let mut table = OutstandingTable::new();
        table.record_send(8, SimTime::from_millis(0));
        table.record_send(3, SimTime::from_millis(100));
        table.record_send(5, SimTime::from_millis(900));

        let sweeper = RetransmissionSweeper::new(Duration::from_millis(50));
        let expired = sweeper.sweep(&mut table, Duration::from_secs(1), SimTime::from_millis(1100));

        assert_eq!(expired, vec![8, 3]);
        assert_eq!(table.oldest(), Some((SimTime::from_millis(900), 5)));
    }

    #[test]
    fn test_sweep_boundary_is_inclusive() {
        let mut table = OutstandingTable::new();
        table.record_send(1, SimTime::ZERO);
        let sweeper = RetransmissionSweeper::new(Duration::from_millis(50));

        assert!(sweeper
            .sweep(&mut table, Duration::from_secs(1), SimTime::from_millis(999))
            .is_empty());
        assert_eq!(
            sweeper.sweep(&mut table, Duration::from_secs(1), SimTime::from_secs(1)),
            vec![1]
        );
    }

    #[test]
    fn test_arm_is_idempotent_and_disarm_cancels() {
        let mut substrate = RecordingSubstrate::new();
        let mut sweeper = RetransmissionSweeper::new(Duration::from_millis(50));

        sweeper.arm(&mut substrate);
        sweeper.arm(&mut substrate);
        assert_eq!(substrate.pending_timers().len(), 1);

        sweeper.disarm(&mut substrate);
        assert!(!sweeper.is_armed());
        assert!(substrate.pending_timers().is_empty());
    }
}
