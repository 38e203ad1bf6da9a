//! The authoritative producer: validates peers, serves original items and
//! answers sync polls.

use serde::Serialize;
use std::any::Any;
use tracing::{debug, info, warn};

use peerfetch_core::content::{self, ALL_SYNCED};
use peerfetch_core::{Application, Data, Inbound, Interest, Name, Namespace, Signature, Substrate};

use crate::config::ProducerConfig;
use crate::error::Result;
use crate::tracker::{DuplicateSyncTrigger, Observation};
use crate::validator::{PeerValidator, Verdict};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentProducerStats {
    pub peers_accepted: u64,
    pub peers_rejected: u64,
    pub content_requests: u64,
    pub items_flagged: u64,
    pub sync_polls: u64,
    pub syncs_announced: u64,
}

/// Serves `<prefix>/metadata` and `<prefix>/file`.
pub struct ContentProducer {
    label: String,
    config: ProducerConfig,
    namespace: Namespace,
    signature: Signature,
    validator: PeerValidator,
    trigger: DuplicateSyncTrigger,
    active: bool,
    stats: ContentProducerStats,
}

impl ContentProducer {
    pub fn new(label: impl Into<String>, config: ProducerConfig) -> Result<Self> {
        Ok(Self {
            label: label.into(),
            namespace: Namespace::parse(&config.prefix)?,
            signature: config.signature()?,
            validator: PeerValidator,
            trigger: DuplicateSyncTrigger::default(),
            active: false,
            stats: ContentProducerStats::default(),
            config,
        })
    }

    /// Prefixes this producer answers for.
    pub fn prefixes(&self) -> Vec<Name> {
        vec![self.namespace.metadata_prefix(), self.namespace.file_prefix()]
    }

    pub fn trigger(&self) -> &DuplicateSyncTrigger {
        &self.trigger
    }

    pub fn stats(&self) -> &ContentProducerStats {
        &self.stats
    }

    fn reply(&self, interest: &Interest, content: String, substrate: &mut dyn Substrate) {
        debug!(producer = %self.label, "responding with Data: {}", interest.name);
        let data = Data::new(interest.name.clone())
            .content(content)
            .freshness(self.config.freshness)
            .signature(self.signature.clone());
        substrate.put_data(data);
    }

    fn on_metadata(&mut self, peer: &str, interest: &Interest) -> String {
        let verdict = self.validator.validate_parameters(&interest.parameters_text());
        match verdict {
            Verdict::Accepted { start, end } => {
                self.stats.peers_accepted += 1;
                info!(producer = %self.label, peer, start, end, "peer accepted");
            }
            Verdict::Rejected => {
                self.stats.peers_rejected += 1;
                warn!(producer = %self.label, peer, "invalid peer");
            }
        }
        verdict.content()
    }

    fn on_content(&mut self, item: u32, interest: &Interest) -> String {
        self.stats.content_requests += 1;
        match self.trigger.observe(item, &interest.name) {
            Observation::Flagged => {
                self.stats.items_flagged += 1;
                info!(producer = %self.label, item, requester = %interest.name, "sync needed");
            }
            Observation::AwaitingSync => {
                debug!(producer = %self.label, item, "item awaiting sync, empty reply");
                return String::new();
            }
            observation => {
                debug!(producer = %self.label, item, ?observation, "content request");
            }
        }
        content::original_content(item)
    }

    /// Identity of the next flagged item as `<prefix>/peer/<peer>/<NNN>`,
    /// or [`ALL_SYNCED`].
    fn on_sync_poll(&mut self) -> String {
        self.stats.sync_polls += 1;
        while let Some((item, requester)) = self.trigger.poll() {
            match self.namespace.classify(&requester, &[]) {
                Inbound::Content { peer, .. } => {
                    self.stats.syncs_announced += 1;
                    let identity = self.namespace.peer_delivery(&peer, item);
                    info!(producer = %self.label, identity = %identity, "announcing sync");
                    return identity.to_uri();
                }
                other => {
                    warn!(producer = %self.label, item, ?other, "flagged item has no peer");
                }
            }
        }
        ALL_SYNCED.to_string()
    }
}

impl Application for ContentProducer {
    fn label(&self) -> &str {
        &self.label
    }

    fn start(&mut self, _substrate: &mut dyn Substrate) {
        self.active = true;
    }

    fn stop(&mut self, _substrate: &mut dyn Substrate) {
        self.active = false;
    }

    fn on_interest(&mut self, interest: &Interest, substrate: &mut dyn Substrate) {
        if !self.active {
            return;
        }
        let content = match self.namespace.classify(&interest.name, &[]) {
            Inbound::Metadata { peer, .. } => self.on_metadata(&peer, interest),
            Inbound::SyncPoll => self.on_sync_poll(),
            Inbound::Content { item, .. } => self.on_content(item, interest),
            other => {
                debug!(producer = %self.label, ?other, "ignoring interest for {}", interest.name);
                return;
            }
        };
        self.reply(interest, content, substrate);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_core::content::INVALID_PEER;
    use peerfetch_core::substrate::recording::RecordingSubstrate;

    fn producer(substrate: &mut RecordingSubstrate) -> ContentProducer {
        let mut producer = ContentProducer::new("A", ProducerConfig::default()).unwrap();
        producer.start(substrate);
        producer
    }

    fn ask(producer: &mut ContentProducer, substrate: &mut RecordingSubstrate, interest: Interest) -> String {
        producer.on_interest(&interest, substrate);
        let mut data = substrate.take_data();
        assert_eq!(data.len(), 1);
        let data = data.remove(0);
        assert_eq!(data.name, interest.name);
        data.content_text().into_owned()
    }

    #[test]
    fn test_metadata_replies() {
        let mut substrate = RecordingSubstrate::new();
        let mut producer = producer(&mut substrate);
        let ns = Namespace::default();

        let ok = Interest::new(ns.metadata("B", 0)).parameters("key=10005");
        assert_eq!(ask(&mut producer, &mut substrate, ok), "start=040 end=049");

        let bad = Interest::new(ns.metadata("X", 0)).parameters("key=20001");
        assert_eq!(ask(&mut producer, &mut substrate, bad), INVALID_PEER);

        let missing = Interest::new(ns.metadata("Y", 0));
        assert_eq!(ask(&mut producer, &mut substrate, missing), INVALID_PEER);
        assert_eq!(producer.stats().peers_rejected, 2);
    }

    #[test]
    fn test_duplicates_flag_and_sync_poll_consumes() {
        let mut substrate = RecordingSubstrate::new();
        let mut producer = producer(&mut substrate);
        let ns = Namespace::default();

        assert_eq!(ask(&mut producer, &mut substrate, Interest::new(ns.sync_poll(0))), ALL_SYNCED);

        for _ in 0..3 {
            let reply = ask(&mut producer, &mut substrate, Interest::new(ns.content("B", 40)));
            assert_eq!(reply, "Original data packet for file 040");
        }
        assert_eq!(producer.trigger().flagged(), 1);
        assert_eq!(producer.stats().items_flagged, 1);

        let announced = ask(&mut producer, &mut substrate, Interest::new(ns.sync_poll(1)));
        assert_eq!(announced, "/prefix/peer/B/040");
        assert_eq!(producer.trigger().flagged(), 0);
        assert_eq!(ask(&mut producer, &mut substrate, Interest::new(ns.sync_poll(2))), ALL_SYNCED);
    }

    #[test]
    fn test_flagged_item_gets_empty_reply_until_polled() {
        let mut substrate = RecordingSubstrate::new();
        let mut producer = producer(&mut substrate);
        let ns = Namespace::default();

        for _ in 0..3 {
            ask(&mut producer, &mut substrate, Interest::new(ns.content("B", 7)));
        }
        assert_eq!(ask(&mut producer, &mut substrate, Interest::new(ns.content("B", 7))), "");
        assert_eq!(ask(&mut producer, &mut substrate, Interest::new(ns.content("C", 7))), "");
        assert_eq!(
            ask(&mut producer, &mut substrate, Interest::new(ns.content("B", 8))),
            "Original data packet for file 008"
        );

        assert_eq!(ask(&mut producer, &mut substrate, Interest::new(ns.sync_poll(0))), "/prefix/peer/B/007");
        assert_eq!(
            ask(&mut producer, &mut substrate, Interest::new(ns.content("B", 7))),
            "Original data packet for file 007"
        );
    }

    #[test]
    fn test_replies_carry_configured_signature() {
        let mut substrate = RecordingSubstrate::new();
        let config = ProducerConfig {
            fake_signature_value: 42,
            freshness: std::time::Duration::from_secs(1),
            ..ProducerConfig::default()
        };
        let mut producer = ContentProducer::new("A", config).unwrap();
        producer.start(&mut substrate);
        producer.on_interest(&Interest::new(Namespace::default().content("B", 1)), &mut substrate);

        let data = substrate.take_data().remove(0);
        assert_eq!(data.signature.value, 42);
        assert_eq!(data.freshness, std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_ignores_foreign_names() {
        let mut substrate = RecordingSubstrate::new();
        let mut producer = producer(&mut substrate);
        producer.on_interest(&Interest::new(Name::parse("/other/file/B/001").unwrap()), &mut substrate);
        assert!(substrate.data.is_empty());
    }
}
