//! Rendezvous point serving one or more relay identities.
//!
//! A parameter-bearing request `<relay>/<rest>` is acknowledged with
//! `Relayed`. If `rest` names a peer delivery the request is re-emitted
//! once to `rest` with the same parameters; otherwise the push is recorded
//! as published here.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::any::Any;
use tracing::{debug, info};

use peerfetch_core::content::RELAYED;
use peerfetch_core::namespace::parse_relays;
use peerfetch_core::packet::DEFAULT_INTEREST_LIFETIME;
use peerfetch_core::{
    Application, Data, Inbound, Interest, Name, Namespace, RandomSource, Signature, Substrate,
};

use crate::config::ProducerConfig;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Pushes re-emitted toward a peer.
    pub relayed: u64,
    /// Pushes that terminated here.
    pub published: u64,
    pub acks_received: u64,
}

pub struct RelayNode<R = StdRng> {
    label: String,
    config: ProducerConfig,
    namespace: Namespace,
    identities: Vec<Name>,
    signature: Signature,
    rng: R,
    active: bool,
    stats: RelayStats,
}

impl RelayNode<StdRng> {
    pub fn seeded<S: AsRef<str>>(
        label: impl Into<String>,
        identities: &[S],
        config: ProducerConfig,
        seed: u64,
    ) -> Result<Self> {
        Self::new(label, identities, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> RelayNode<R> {
    pub fn new<S: AsRef<str>>(
        label: impl Into<String>,
        identities: &[S],
        config: ProducerConfig,
        rng: R,
    ) -> Result<Self> {
        Ok(Self {
            label: label.into(),
            namespace: Namespace::parse(&config.prefix)?,
            identities: parse_relays(identities)?,
            signature: config.signature()?,
            rng,
            active: false,
            stats: RelayStats::default(),
            config,
        })
    }

    /// Relay identities served, one routing prefix each.
    pub fn identities(&self) -> &[Name] {
        &self.identities
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }
}

impl<R: RandomSource + 'static> Application for RelayNode<R> {
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
        let Inbound::Relay { relay, rest } = self.namespace.classify(&interest.name, &self.identities) else {
            debug!(relay = %self.label, "ignoring interest for {}", interest.name);
            return;
        };
        let Some(parameters) = &interest.parameters else {
            debug!(relay = %self.label, "push without payload for {}", interest.name);
            return;
        };

        match self.namespace.classify(&rest, &[]) {
            Inbound::PeerDelivery { peer, item } => {
                info!(relay = %self.label, via = %relay, peer = %peer, item, "relaying push to {}", rest);
                self.stats.relayed += 1;
                let forward = Interest::new(rest)
                    .nonce(self.rng.nonce())
                    .lifetime(DEFAULT_INTEREST_LIFETIME)
                    .parameters(parameters.clone());
                substrate.express_interest(forward);
            }
            _ => {
                info!(relay = %self.label, via = %relay, "push published: {}", rest);
                self.stats.published += 1;
            }
        }

        substrate.put_data(
            Data::new(interest.name.clone())
                .content(RELAYED)
                .freshness(self.config.freshness)
                .signature(self.signature.clone()),
        );
    }

    fn on_data(&mut self, data: &Data, _substrate: &mut dyn Substrate) {
        debug!(relay = %self.label, "< DATA for {}", data.name);
        self.stats.acks_received += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
