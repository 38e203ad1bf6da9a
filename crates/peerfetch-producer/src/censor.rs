//! A producer that answers item requests with non-original payloads.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::any::Any;
use tracing::debug;

use peerfetch_core::content;
use peerfetch_core::{Application, Data, Inbound, Interest, Name, Namespace, Signature, Substrate};

use crate::config::ProducerConfig;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CensorStats {
    pub censored: u64,
}

/// Serves `<prefix>/file`. Sync polls and metadata are left alone.
pub struct CensorProducer {
    label: String,
    config: ProducerConfig,
    namespace: Namespace,
    signature: Signature,
    active: bool,
    stats: CensorStats,
}

impl CensorProducer {
    pub fn new(label: impl Into<String>, config: ProducerConfig) -> Result<Self> {
        Ok(Self {
            label: label.into(),
            namespace: Namespace::parse(&config.prefix)?,
            signature: config.signature()?,
            active: false,
            stats: CensorStats::default(),
            config,
        })
    }

    pub fn prefix(&self) -> Name {
        self.namespace.file_prefix()
    }

    pub fn stats(&self) -> &CensorStats {
        &self.stats
    }

    /// Censored text zero-padded to the configured payload size.
    fn payload(&self, item: u32) -> Bytes {
        let text = content::censored_content(item);
        let mut buf = BytesMut::with_capacity(self.config.payload_size.max(text.len()));
        buf.put_slice(text.as_bytes());
        if buf.len() < self.config.payload_size {
            buf.put_bytes(0, self.config.payload_size - buf.len());
        }
        buf.freeze()
    }
}

impl Application for CensorProducer {
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
        let Inbound::Content { item, .. } = self.namespace.classify(&interest.name, &[]) else {
            return;
        };
        debug!(producer = %self.label, item, "censoring {}", interest.name);
        self.stats.censored += 1;
        substrate.put_data(
            Data::new(interest.name.clone())
                .content(self.payload(item))
                .freshness(self.config.freshness)
                .signature(self.signature.clone()),
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_core::substrate::recording::RecordingSubstrate;

    #[test]
    fn test_content_requests_are_censored_and_padded() {
        let mut substrate = RecordingSubstrate::new();
        let mut censor = CensorProducer::new("censor", ProducerConfig::default()).unwrap();
        censor.start(&mut substrate);

        censor.on_interest(&Interest::new(Namespace::default().content("B", 40)), &mut substrate);
        let data = substrate.take_data().remove(0);
        assert_eq!(data.content.len(), 1024);
        assert!(data.content_text().starts_with("Censored data for file 040"));
        assert!(!content::is_original(&data.content_text()));
    }

    #[test]
    fn test_sync_polls_and_metadata_are_not_answered() {
        let mut substrate = RecordingSubstrate::new();
        let mut censor = CensorProducer::new("censor", ProducerConfig::default()).unwrap();
        censor.start(&mut substrate);
        let ns = Namespace::default();

        censor.on_interest(&Interest::new(ns.sync_poll(0)), &mut substrate);
        censor.on_interest(&Interest::new(ns.metadata("B", 0)).parameters("key=10001"), &mut substrate);
        assert!(substrate.data.is_empty());
    }

    #[test]
    fn test_short_payload_size_keeps_full_text() {
        let config = ProducerConfig {
            payload_size: 4,
            ..ProducerConfig::default()
        };
        let censor = CensorProducer::new("censor", config).unwrap();
        assert_eq!(censor.payload(7), Bytes::from("Censored data for file 007"));
    }
}
