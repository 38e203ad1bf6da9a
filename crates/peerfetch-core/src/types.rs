//! Strong type definitions shared by every peerfetch component.
//!
//! Time is virtual: a [`SimTime`] is the offset from the moment the
//! substrate started, so the protocol logic never reads a wall clock.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A point on the substrate's monotonic clock, measured from its start.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of time.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Create from an offset since start.
    pub const fn from_duration(offset: Duration) -> Self {
        Self(offset)
    }

    /// Create from whole milliseconds since start.
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Create from whole seconds since start.
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Offset since start.
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(rhs))
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Duration {
        self.saturating_since(rhs)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({:?})", self.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// Opaque handle for a scheduled callback, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

/// Which callback a timer fires into.
///
/// Applications own at most one pending timer of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Issue the next scheduled request.
    SendNext,
    /// Scan outstanding requests for expired retransmission timeouts.
    RetransmitSweep,
    /// Producer-side poll for items that need a push.
    SyncPoll,
}

/// Serde adapter storing a [`Duration`] as integer milliseconds.
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_arithmetic() {
        let t = SimTime::from_millis(1500) + Duration::from_millis(500);
        assert_eq!(t, SimTime::from_secs(2));
        assert_eq!(t - SimTime::from_secs(1), Duration::from_secs(1));
        assert_eq!(SimTime::ZERO - t, Duration::ZERO);
    }

    #[test]
    fn test_sim_time_display() {
        assert_eq!(format!("{}", SimTime::from_millis(1250)), "1.250s");
    }

    #[test]
    fn test_duration_millis_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "duration_millis")]
            d: Duration,
        }

        let json = serde_json::to_string(&Wrapper {
            d: Duration::from_millis(50),
        })
        .unwrap();
        assert_eq!(json, r#"{"d":50}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.d, Duration::from_millis(50));
    }
}
