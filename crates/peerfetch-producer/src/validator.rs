//! Peer-key validation and work-range assignment.
//!
//! A key `k` is valid iff `10000 < k < 20000` and `k mod 1000 != 0`. A
//! valid key is assigned ten items starting at `((k mod 1000) - 1) * 10`.
//!
//! The second condition narrows the plain range check: the multiples of
//! 1000 inside the range (11000, 12000, ..., 19000) have no slot and would
//! start their range at -10, so they are rejected like out-of-range keys.

use peerfetch_core::content::{self, INVALID_PEER};

/// Exclusive lower bound of valid keys.
pub const KEY_MIN_EXCLUSIVE: u32 = 10_000;

/// Exclusive upper bound of valid keys.
pub const KEY_MAX_EXCLUSIVE: u32 = 20_000;

/// Items assigned per valid key.
pub const RANGE_LEN: u32 = 10;

/// Outcome of validating a presented key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted { start: u32, end: u32 },
    Rejected,
}

impl Verdict {
    /// Reply content for this verdict.
    pub fn content(&self) -> String {
        match self {
            Verdict::Accepted { start, end } => content::range_content(*start, *end),
            Verdict::Rejected => INVALID_PEER.to_string(),
        }
    }
}

/// Stateless validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerValidator;

impl PeerValidator {
    /// Validate a numeric key. In-range multiples of 1000 are rejected.
    pub fn validate_key(&self, key: u32) -> Verdict {
        if !(KEY_MIN_EXCLUSIVE < key && key < KEY_MAX_EXCLUSIVE) {
            return Verdict::Rejected;
        }
        match (key % 1000).checked_sub(1) {
            Some(slot) => {
                let start = slot * RANGE_LEN;
                Verdict::Accepted {
                    start,
                    end: start + RANGE_LEN - 1,
                }
            }
            None => Verdict::Rejected,
        }
    }

    /// Validate the `key=<n>` parameters of a metadata request. Missing or
    /// malformed parameters are a rejection.
    pub fn validate_parameters(&self, parameters: &str) -> Verdict {
        match content::parse_key_parameter(parameters) {
            Ok(key) => self.validate_key(key),
            Err(err) => {
                tracing::debug!(%err, "unparseable peer key");
                Verdict::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_keys() {
        let v = PeerValidator;
        assert_eq!(v.validate_key(10001), Verdict::Accepted { start: 0, end: 9 });
        assert_eq!(v.validate_key(10002), Verdict::Accepted { start: 10, end: 19 });
        assert_eq!(v.validate_key(10005), Verdict::Accepted { start: 40, end: 49 });
        assert_eq!(v.validate_key(19999), Verdict::Accepted { start: 9980, end: 9989 });
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let v = PeerValidator;
        assert_eq!(v.validate_key(10000), Verdict::Rejected);
        assert_eq!(v.validate_key(20000), Verdict::Rejected);
        assert_eq!(v.validate_key(20001), Verdict::Rejected);
        assert_eq!(v.validate_key(0), Verdict::Rejected);
    }

    #[test]
    fn test_in_range_multiples_of_1000_are_refused() {
        for key in (11_000..20_000).step_by(1000) {
            assert_eq!(PeerValidator.validate_key(key), Verdict::Rejected, "key {key}");
        }
        assert_eq!(PeerValidator.validate_key(11_001), Verdict::Accepted { start: 0, end: 9 });
    }

    #[test]
    fn test_parameters() {
        let v = PeerValidator;
        assert_eq!(v.validate_parameters("key=10005").content(), "start=040 end=049");
        assert_eq!(v.validate_parameters("key=20001").content(), "Invalid Peer!!!");
        assert_eq!(v.validate_parameters("").content(), "Invalid Peer!!!");
        assert_eq!(v.validate_parameters("key=abc"), Verdict::Rejected);
    }

    proptest! {
        #[test]
        fn prop_in_range_keys_get_ten_items_unless_slotless(key in 10_001u32..20_000) {
            let expected = match key % 1000 {
                0 => Verdict::Rejected,
                slot => {
                    let start = (slot - 1) * 10;
                    Verdict::Accepted { start, end: start + 9 }
                }
            };
            prop_assert_eq!(PeerValidator.validate_key(key), expected);
        }

        #[test]
        fn prop_out_of_range_keys_rejected(key in any::<u32>()) {
            prop_assume!(key <= 10_000 || key >= 20_000);
            prop_assert_eq!(PeerValidator.validate_key(key), Verdict::Rejected);
        }
    }
}
