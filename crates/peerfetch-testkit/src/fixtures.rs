//! Test fixtures and helpers.
//!
//! Each fixture pairs one application with a recording substrate so a test
//! can drive it message by message.

use bytes::Bytes;

use peerfetch_consumer::{ConsumerConfig, PeerConsumer, Result as ConsumerResult};
use peerfetch_core::substrate::recording::RecordingSubstrate;
use peerfetch_core::{Application, Data, Interest, Name, Namespace, TimerKind};
use peerfetch_producer::{ContentProducer, PeerValidator, ProducerConfig};

/// Seed used for every fixture generator.
pub const FIXTURE_SEED: u64 = 7;

/// A started consumer and the substrate it talks to.
pub struct ConsumerFixture {
    pub substrate: RecordingSubstrate,
    pub consumer: PeerConsumer,
}

impl ConsumerFixture {
    /// A started consumer with default settings for `identity` and `key`.
    pub fn new(identity: &str, key: u32) -> Self {
        match Self::with_config(ConsumerConfig::for_peer(identity, key)) {
            Ok(fixture) => fixture,
            Err(err) => panic!("fixture identity {identity:?} rejected: {err}"),
        }
    }

    pub fn with_config(config: ConsumerConfig) -> ConsumerResult<Self> {
        let mut substrate = RecordingSubstrate::new();
        let mut consumer = PeerConsumer::seeded(config, FIXTURE_SEED)?;
        consumer.start(&mut substrate);
        Ok(Self { substrate, consumer })
    }

    /// Fire the pending send tick and return what went out. Empty if no
    /// tick was pending.
    pub fn tick(&mut self) -> Vec<Interest> {
        if !self.substrate.fire(TimerKind::SendNext, &mut self.consumer) {
            return Vec::new();
        }
        self.substrate.take_interests()
    }

    /// Deliver a reply named `name`.
    pub fn reply(&mut self, name: &Name, content: impl Into<Bytes>) {
        let data = Data::new(name.clone()).content(content);
        self.consumer.on_data(&data, &mut self.substrate);
    }

    /// Send the metadata request and answer it the way a content producer
    /// would. Returns the assigned range, if any.
    pub fn validate(&mut self) -> Option<(u32, u32)> {
        let sent = self.tick();
        let request = sent.first()?;
        let verdict = PeerValidator.validate_parameters(&request.parameters_text());
        let name = request.name.clone();
        self.reply(&name, verdict.content());
        self.consumer.session().range()
    }

    /// Name of the content request for `item`.
    pub fn content_name(&self, item: u32) -> Name {
        Namespace::default().content(self.consumer.session().identity(), item)
    }
}

/// A started content producer and the substrate it replies through.
pub struct ProducerFixture {
    pub substrate: RecordingSubstrate,
    pub producer: ContentProducer,
}

impl ProducerFixture {
    pub fn new() -> Self {
        let mut substrate = RecordingSubstrate::new();
        let mut producer = match ContentProducer::new("producer", ProducerConfig::default()) {
            Ok(producer) => producer,
            Err(err) => panic!("default producer config rejected: {err}"),
        };
        producer.start(&mut substrate);
        Self { substrate, producer }
    }

    /// Deliver `interest` and return the reply content, if any.
    pub fn ask(&mut self, interest: Interest) -> Option<String> {
        self.producer.on_interest(&interest, &mut self.substrate);
        let data = self.substrate.take_data().pop()?;
        Some(data.content_text().into_owned())
    }

    /// Request `item` on behalf of `peer`.
    pub fn request_item(&mut self, peer: &str, item: u32) -> Option<String> {
        self.ask(Interest::new(Namespace::default().content(peer, item)))
    }

    /// Issue sync poll number `n`.
    pub fn sync_poll(&mut self, n: u64) -> Option<String> {
        self.ask(Interest::new(Namespace::default().sync_poll(n)))
    }
}

impl Default for ProducerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures for `count` peers with consecutive valid keys from 10001.
pub fn valid_peer_fixtures(count: usize) -> Vec<ConsumerFixture> {
    (0..count)
        .map(|i| ConsumerFixture::new(&format!("peer{i}"), 10_001 + i as u32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_consumer::SessionState;
    use peerfetch_core::content::{original_content, ALL_SYNCED};

    #[test]
    fn test_consumer_fixture_validates() {
        let mut fixture = ConsumerFixture::new("B", 10005);
        assert_eq!(fixture.validate(), Some((40, 49)));
        assert_eq!(fixture.consumer.state(), SessionState::Fetching { cursor: 40 });
        assert_eq!(fixture.content_name(40).to_uri(), "/prefix/file/B/040");
    }

    #[test]
    fn test_invalid_fixture_is_rejected() {
        let mut fixture = ConsumerFixture::new("X", 20001);
        assert_eq!(fixture.validate(), None);
        assert_eq!(fixture.consumer.state(), SessionState::Rejected);
        assert!(fixture.tick().is_empty());
    }

    #[test]
    fn test_producer_fixture() {
        let mut fixture = ProducerFixture::new();
        assert_eq!(fixture.request_item("B", 3), Some(original_content(3)));
        assert_eq!(fixture.sync_poll(0).as_deref(), Some(ALL_SYNCED));
    }

    #[test]
    fn test_valid_peer_fixtures_get_disjoint_ranges() {
        let ranges: Vec<_> = valid_peer_fixtures(3).iter_mut().map(|f| f.validate()).collect();
        assert_eq!(ranges, vec![Some((0, 9)), Some((10, 19)), Some((20, 29))]);
    }
}
