//! Contract between protocol applications and the substrate beneath them.
//!
//! The substrate delivers messages and fires timers; applications react.
//! Nothing here blocks: "waiting" is always a scheduled callback.

use std::any::Any;
use std::time::Duration;

use crate::packet::{Data, Interest, Nack};
use crate::types::{SimTime, TimerHandle, TimerKind};

/// Primitives an application consumes.
pub trait Substrate {
    /// Current virtual time.
    fn now(&self) -> SimTime;

    /// Fire-and-forget request. The outcome arrives later as
    /// [`Application::on_data`], [`Application::on_nack`], or not at all.
    fn express_interest(&mut self, interest: Interest);

    /// Publish a reply.
    fn put_data(&mut self, data: Data);

    /// Fire [`Application::on_timer`] with `kind` after `delay`.
    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

/// An event-driven protocol participant.
pub trait Application: Any {
    /// Short label used in logs and reports.
    fn label(&self) -> &str;

    fn start(&mut self, substrate: &mut dyn Substrate);

    /// Tear down. Must cancel every pending timer.
    fn stop(&mut self, substrate: &mut dyn Substrate);

    fn on_interest(&mut self, _interest: &Interest, _substrate: &mut dyn Substrate) {}

    fn on_data(&mut self, _data: &Data, _substrate: &mut dyn Substrate) {}

    fn on_nack(&mut self, _nack: &Nack, _substrate: &mut dyn Substrate) {}

    fn on_timer(&mut self, _kind: TimerKind, _substrate: &mut dyn Substrate) {}

    /// Downcast hook for inspection.
    fn as_any(&self) -> &dyn Any;
}

/// In-memory substrate that records everything, for unit tests.
pub mod recording {
    use super::*;

    /// A timer that has been scheduled and neither fired nor cancelled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PendingTimer {
        pub handle: TimerHandle,
        pub due: SimTime,
        pub kind: TimerKind,
    }

    /// Records emitted messages and timers; time only moves when told to.
    #[derive(Debug, Default)]
    pub struct RecordingSubstrate {
        now: SimTime,
        next_handle: u64,
        pub interests: Vec<Interest>,
        pub data: Vec<Data>,
        pub cancelled: Vec<TimerHandle>,
        timers: Vec<PendingTimer>,
    }

    impl RecordingSubstrate {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_now(&mut self, now: SimTime) {
            self.now = now;
        }

        pub fn advance(&mut self, by: Duration) {
            self.now = self.now + by;
        }

        /// Timers still pending, in scheduling order.
        pub fn pending_timers(&self) -> &[PendingTimer] {
            &self.timers
        }

        /// The pending timer of `kind`, if any.
        pub fn pending(&self, kind: TimerKind) -> Option<PendingTimer> {
            self.timers.iter().copied().find(|t| t.kind == kind)
        }

        /// Drain recorded requests.
        pub fn take_interests(&mut self) -> Vec<Interest> {
            std::mem::take(&mut self.interests)
        }

        /// Drain recorded replies.
        pub fn take_data(&mut self) -> Vec<Data> {
            std::mem::take(&mut self.data)
        }

        /// Fire the earliest pending timer of `kind`, moving the clock to
        /// its due time if that is later. Returns false if none is pending.
        pub fn fire(&mut self, kind: TimerKind, app: &mut dyn Application) -> bool {
            let Some(index) = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.kind == kind)
                .min_by_key(|(_, t)| (t.due, t.handle))
                .map(|(i, _)| i)
            else {
                return false;
            };
            let timer = self.timers.remove(index);
            if timer.due > self.now {
                self.now = timer.due;
            }
            app.on_timer(timer.kind, self);
            true
        }

        /// Fire every timer due at or before `until`, in due order,
        /// including timers scheduled by the callbacks themselves.
        pub fn run_until(&mut self, until: SimTime, app: &mut dyn Application) {
            loop {
                let next = self
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= until)
                    .min_by_key(|(_, t)| (t.due, t.handle))
                    .map(|(i, _)| i);
                let Some(index) = next else { break };
                let timer = self.timers.remove(index);
                if timer.due > self.now {
                    self.now = timer.due;
                }
                app.on_timer(timer.kind, self);
            }
            if until > self.now {
                self.now = until;
            }
        }
    }

    impl Substrate for RecordingSubstrate {
        fn now(&self) -> SimTime {
            self.now
        }

        fn express_interest(&mut self, interest: Interest) {
            self.interests.push(interest);
        }

        fn put_data(&mut self, data: Data) {
            self.data.push(data);
        }

        fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
            let handle = TimerHandle(self.next_handle);
            self.next_handle += 1;
            self.timers.push(PendingTimer {
                handle,
                due: self.now + delay,
                kind,
            });
            handle
        }

        fn cancel(&mut self, handle: TimerHandle) {
            let before = self.timers.len();
            self.timers.retain(|t| t.handle != handle);
            if self.timers.len() != before {
                self.cancelled.push(handle);
            }
        }
    }
}
