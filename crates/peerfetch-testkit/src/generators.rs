//! Proptest generators for property-based testing.

use proptest::prelude::*;

use peerfetch_core::content;
use peerfetch_core::Name;

/// A key the validator accepts.
pub fn valid_key() -> impl Strategy<Value = u32> {
    (10_001u32..20_000).prop_filter("multiples of 1000 are refused", |k| k % 1000 != 0)
}

/// A key the validator refuses.
pub fn invalid_key() -> impl Strategy<Value = u32> {
    prop_oneof![
        0u32..=10_000,
        20_000u32..=u32::MAX,
        (11u32..20).prop_map(|k| k * 1000),
    ]
}

/// Any key at all.
pub fn any_key() -> impl Strategy<Value = u32> {
    prop_oneof![valid_key(), invalid_key()]
}

/// A single-component peer identity.
pub fn peer_identity() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_-]{0,11}".prop_map(String::from)
}

/// An item index that still renders as three digits.
pub fn item() -> impl Strategy<Value = u32> {
    0u32..1000
}

/// A generic name component that cannot be mistaken for a sequence.
pub fn component() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,7}".prop_map(String::from)
}

/// A name of one to five generic components.
pub fn name() -> impl Strategy<Value = Name> {
    prop::collection::vec(component(), 1..=5).prop_map(|parts| {
        parts
            .iter()
            .fold(Name::root(), |name, part| name.append(part))
    })
}

/// Round-trip time of one request, in milliseconds.
pub fn rtt_millis() -> impl Strategy<Value = u64> {
    1u64..10_000
}

/// Content a consumer may receive for its current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// The original payload for the requested item.
    Original,
    /// A censored payload for the requested item.
    Censored,
    /// An original payload for some other item.
    OtherItem(u32),
    /// Bytes without any recognised tag.
    Garbage,
}

impl ReplyKind {
    /// Reply content for a request for `item`.
    pub fn content(&self, item: u32) -> String {
        match *self {
            ReplyKind::Original => content::original_content(item),
            ReplyKind::Censored => content::censored_content(item),
            ReplyKind::OtherItem(other) => content::original_content(other),
            ReplyKind::Garbage => "Relayed".to_string(),
        }
    }

    /// Whether the content carries the "Original" tag at all.
    pub fn is_original(&self) -> bool {
        matches!(self, ReplyKind::Original | ReplyKind::OtherItem(_))
    }

    /// Whether the content is the original payload of `item` itself.
    pub fn is_original_of(&self, item: u32) -> bool {
        match *self {
            ReplyKind::Original => true,
            ReplyKind::OtherItem(other) => other == item,
            _ => false,
        }
    }
}

impl Arbitrary for ReplyKind {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            2 => Just(ReplyKind::Original),
            3 => Just(ReplyKind::Censored),
            1 => item().prop_map(ReplyKind::OtherItem),
            1 => Just(ReplyKind::Garbage),
        ]
        .boxed()
    }
}

/// A sequence of replies to feed a session.
pub fn reply_script(max_len: usize) -> impl Strategy<Value = Vec<ReplyKind>> {
    prop::collection::vec(any::<ReplyKind>(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_producer::{PeerValidator, Verdict};

    proptest! {
        #[test]
        fn prop_key_generators_agree_with_validator(valid in valid_key(), invalid in invalid_key()) {
            prop_assert!(matches!(PeerValidator.validate_key(valid), Verdict::Accepted { .. }), "key not accepted");
            prop_assert_eq!(PeerValidator.validate_key(invalid), Verdict::Rejected);
        }

        #[test]
        fn prop_generated_names_parse_back(name in name()) {
            prop_assert_eq!(Name::parse(&name.to_uri()).unwrap(), name);
        }
    }
}
