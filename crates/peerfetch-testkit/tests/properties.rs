//! Protocol properties checked against generated inputs.

use proptest::prelude::*;
use std::time::Duration;

use peerfetch_consumer::{PeerSession, RttConfig, RttEstimator, SessionState, Transition};
use peerfetch_core::content::range_content;
use peerfetch_core::{Name, SimTime, TimerKind};
use peerfetch_producer::{DuplicateSyncTrigger, Observation};
use peerfetch_testkit::generators::{component, invalid_key, reply_script, rtt_millis, valid_key};
use peerfetch_testkit::ConsumerFixture;

fn fetching_session(start: u32, end: u32) -> PeerSession {
    let mut session = PeerSession::new(10_001, "B", 0, 3);
    session.on_metadata_reply(&range_content(start, end));
    session
}

proptest! {
    #[test]
    fn prop_valid_key_range_formula(key in valid_key()) {
        let mut fixture = ConsumerFixture::new("B", key);
        let start = (key % 1000 - 1) * 10;
        prop_assert_eq!(fixture.validate(), Some((start, start + 9)));
        prop_assert_eq!(fixture.consumer.state(), SessionState::Fetching { cursor: start });
    }

    #[test]
    fn prop_invalid_key_stops_all_requests(key in invalid_key()) {
        let mut fixture = ConsumerFixture::new("X", key);
        prop_assert_eq!(fixture.validate(), None);
        prop_assert_eq!(fixture.consumer.state(), SessionState::Rejected);

        fixture.substrate.run_until(SimTime::from_secs(30), &mut fixture.consumer);
        prop_assert!(fixture.substrate.interests.is_empty());
        prop_assert!(fixture.substrate.pending(TimerKind::SendNext).is_none());
        prop_assert_eq!(fixture.consumer.stats().requests_sent, 1);
    }

    #[test]
    fn prop_backoff_is_monotonic_and_reset_restores_floor(
        samples in prop::collection::vec(rtt_millis(), 1..8),
        timeouts in 1usize..12,
        reset in rtt_millis(),
    ) {
        let config = RttConfig::default();
        let mut rtt = RttEstimator::default();
        for ms in samples {
            rtt.sample(Duration::from_millis(ms));
        }

        let mut previous = rtt.rto();
        for _ in 0..timeouts {
            rtt.backoff();
            let rto = rtt.rto();
            prop_assert!(rto >= previous);
            prop_assert!(rto <= config.max_rto);
            previous = rto;
        }

        rtt.sample(Duration::from_millis(reset));
        prop_assert_eq!(rtt.multiplier(), 1);
        prop_assert!(rtt.rto() >= config.min_rto);
    }

    #[test]
    fn prop_third_identical_request_flags_once(
        pattern in prop::collection::vec(any::<bool>(), 0..30),
        other in component(),
    ) {
        let requester = Name::parse("/prefix/file/B/040").unwrap();
        let stranger = Name::root().append("prefix").append("file").append(&other).append("040");
        prop_assume!(stranger != requester);

        let mut trigger = DuplicateSyncTrigger::default();
        let mut flags = 0;
        let mut identical = 1;
        prop_assert_eq!(trigger.observe(40, &requester), Observation::Counted { count: 1 });

        for same in pattern {
            let name = if same { &requester } else { &stranger };
            let observation = trigger.observe(40, name);
            if observation == Observation::Flagged {
                flags += 1;
            }
            if same && observation != Observation::AwaitingSync {
                identical += 1;
            }
            if !same {
                prop_assert!(matches!(observation, Observation::Mismatch { .. } | Observation::AwaitingSync), "unexpected observation: {:?}", observation);
            }
        }

        prop_assert_eq!(flags, u32::from(identical >= 3));
        prop_assert_eq!(trigger.flagged(), flags as usize);
        if flags == 1 {
            prop_assert_eq!(trigger.poll(), Some((40, requester.clone())));
            prop_assert_eq!(trigger.flagged(), 0);
            prop_assert_ne!(trigger.observe(40, &requester), Observation::Flagged);
        }
        prop_assert_eq!(trigger.poll(), None);
    }

    #[test]
    fn prop_cursor_moves_only_on_original(script in reply_script(40)) {
        let mut session = fetching_session(40, 49);
        for reply in script {
            let SessionState::Fetching { cursor } = session.state() else {
                break;
            };
            let originals = session.originals();
            let transition = session.on_content_reply(cursor, &reply.content(cursor));

            if reply.is_original() {
                prop_assert!(matches!(transition, Transition::Advanced { item, .. } if item == cursor), "unexpected transition: {:?}", transition);
                prop_assert_eq!(session.cursor(), Some(cursor + 1));
                prop_assert_eq!(session.originals(), originals + 1);
                prop_assert_eq!(session.retries(), 0);
            } else {
                prop_assert_eq!(session.cursor(), Some(cursor));
                prop_assert_eq!(session.originals(), originals);
            }
        }
    }

    #[test]
    fn prop_local_sync_needs_the_cursor_item(script in reply_script(40)) {
        let mut session = fetching_session(40, 49);
        for reply in script {
            let SessionState::Fetching { cursor } = session.state() else {
                break;
            };
            session.on_local_sync_reply(&reply.content(cursor));
            let expected = if reply.is_original_of(cursor) { cursor + 1 } else { cursor };
            prop_assert_eq!(session.cursor(), Some(expected));
        }
    }

    #[test]
    fn prop_retries_request_sync_every_threshold(non_original in 0u32..20) {
        let mut session = fetching_session(0, 9);
        let mut syncs = 0;
        for _ in 0..non_original {
            if let Transition::SyncRequested { cursor } = session.on_content_reply(0, "Censored data for file 000") {
                prop_assert_eq!(cursor, 0);
                syncs += 1;
            }
        }
        prop_assert_eq!(syncs, non_original / 3);
        prop_assert_eq!(session.retries(), non_original % 3);
        prop_assert_eq!(session.cursor(), Some(0));
    }
}
