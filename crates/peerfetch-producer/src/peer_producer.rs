//! Local endpoint co-located with a consumer.
//!
//! Holds at most one pushed payload. A delivery overwrites the slot; a
//! local sync request from the co-located consumer drains it.

use bytes::Bytes;
use serde::Serialize;
use std::any::Any;
use tracing::{debug, info};

use peerfetch_core::{Application, Data, Inbound, Interest, Name, Namespace, Signature, Substrate};

use crate::config::ProducerConfig;
use crate::error::{ProducerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeerProducerStats {
    pub deliveries: u64,
    pub local_syncs_served: u64,
    pub local_syncs_ignored: u64,
}

/// Serves `<prefix>/peer/<identity>`.
pub struct PeerProducer {
    identity: String,
    config: ProducerConfig,
    namespace: Namespace,
    signature: Signature,
    pending: Option<Bytes>,
    active: bool,
    stats: PeerProducerStats,
}

impl PeerProducer {
    pub fn new(identity: impl Into<String>, config: ProducerConfig) -> Result<Self> {
        let identity = identity.into();
        if identity.is_empty() || identity.contains('/') {
            return Err(ProducerError::InvalidConfig(format!(
                "peer identity must be a single name component, got {identity:?}"
            )));
        }
        Ok(Self {
            identity,
            namespace: Namespace::parse(&config.prefix)?,
            signature: config.signature()?,
            pending: None,
            active: false,
            stats: PeerProducerStats::default(),
            config,
        })
    }

    pub fn prefix(&self) -> Name {
        self.namespace.peer_prefix(&self.identity)
    }

    pub fn pending(&self) -> Option<&Bytes> {
        self.pending.as_ref()
    }

    pub fn stats(&self) -> &PeerProducerStats {
        &self.stats
    }

    fn reply(&self, interest: &Interest, content: Bytes, substrate: &mut dyn Substrate) {
        substrate.put_data(
            Data::new(interest.name.clone())
                .content(content)
                .freshness(self.config.freshness)
                .signature(self.signature.clone()),
        );
    }
}

impl Application for PeerProducer {
    fn label(&self) -> &str {
        &self.identity
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
        match self.namespace.classify(&interest.name, &[]) {
            Inbound::PeerDelivery { peer, item } if peer == self.identity => {
                if let Some(payload) = &interest.parameters {
                    info!(peer = %self.identity, item, "push buffered");
                    self.pending = Some(payload.clone());
                    self.stats.deliveries += 1;
                }
                self.reply(interest, Bytes::new(), substrate);
            }
            Inbound::LocalSync { peer, .. } if peer == self.identity => match self.pending.take() {
                Some(payload) => {
                    info!(peer = %self.identity, "serving buffered push to local consumer");
                    self.stats.local_syncs_served += 1;
                    self.reply(interest, payload, substrate);
                }
                None => {
                    debug!(peer = %self.identity, "local sync with nothing buffered");
                    self.stats.local_syncs_ignored += 1;
                }
            },
            other => debug!(peer = %self.identity, ?other, "ignoring interest"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
