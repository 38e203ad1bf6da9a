//! The proxy scenario.
//!
//! One content producer with its sync poller, one censor that answers item
//! requests faster than the producer, a set of relay nodes serving every
//! rendezvous identity, and peers that each pair a consumer with a local
//! peer producer. Valid peers get keys `10001..`, invalid peers `20003..`.
//!
//! A valid peer only ever sees censored item replies directly. Its repeated
//! requests flag the item at the producer, the poller pushes the original
//! through a relay into the peer producer, and the consumer's local sync
//! picks it up from there.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use peerfetch_consumer::{ConsumerConfig, ConsumerStats, PeerConsumer, SessionState};
use peerfetch_core::types::duration_millis;
use peerfetch_core::{Name, SimTime};
use peerfetch_producer::{
    CensorProducer, CensorStats, ContentProducer, ContentProducerStats, PeerProducer,
    PeerProducerStats, ProducerConfig, RelayNode, RelayStats, SyncPoller, SyncPollerConfig,
    SyncPollerStats,
};

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::simulation::{AppId, NetworkStats, Simulation};

/// First key handed to valid peers.
pub const FIRST_VALID_KEY: u32 = 10_001;

/// First key handed to invalid peers.
pub const FIRST_INVALID_KEY: u32 = 20_003;

/// Valid keys available before the first multiple of 1000.
const MAX_VALID_PEERS: usize = 999;

/// Topology and per-role settings of a proxy scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyScenarioConfig {
    pub valid_peers: usize,
    pub invalid_peers: usize,
    pub relay_nodes: usize,
    /// Template for every consumer; identity and key are filled per peer.
    pub consumer: ConsumerConfig,
    pub producer: ProducerConfig,
    pub poller: SyncPollerConfig,
    #[serde(with = "duration_millis")]
    pub producer_delay: Duration,
    #[serde(with = "duration_millis")]
    pub censor_delay: Duration,
    #[serde(with = "duration_millis")]
    pub relay_delay: Duration,
    #[serde(with = "duration_millis")]
    pub peer_delay: Duration,
}

impl Default for ProxyScenarioConfig {
    fn default() -> Self {
        Self {
            valid_peers: 2,
            invalid_peers: 1,
            relay_nodes: 2,
            consumer: ConsumerConfig {
                send_frequency: 3.0,
                ..ConsumerConfig::default()
            },
            producer: ProducerConfig::default(),
            poller: SyncPollerConfig::default(),
            producer_delay: Duration::from_millis(20),
            censor_delay: Duration::from_millis(5),
            relay_delay: Duration::from_millis(10),
            peer_delay: Duration::from_millis(2),
        }
    }
}

impl ProxyScenarioConfig {
    pub fn new(valid_peers: usize, invalid_peers: usize) -> Self {
        Self {
            valid_peers,
            invalid_peers,
            ..Self::default()
        }
    }
}

/// Where one peer's applications live.
#[derive(Debug, Clone)]
pub struct PeerHandles {
    pub identity: String,
    pub key: u32,
    /// Whether the key is meant to be accepted.
    pub valid: bool,
    pub consumer: AppId,
    pub local: AppId,
}

/// Outcome for one peer.
#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    pub identity: String,
    pub key: u32,
    pub valid: bool,
    pub state: SessionState,
    pub range: Option<(u32, u32)>,
    pub cursor: Option<u32>,
    pub originals: u32,
    pub retries: u32,
    pub consumer: ConsumerStats,
    pub local: PeerProducerStats,
}

impl PeerReport {
    /// Valid peers finished their range; invalid peers were turned away.
    pub fn settled(&self) -> bool {
        if self.valid {
            self.state == SessionState::Done
        } else {
            self.state == SessionState::Rejected
        }
    }
}

/// Summary of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub seed: u64,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub peers: Vec<PeerReport>,
    pub producer: ContentProducerStats,
    /// Items flagged at the producer and not yet announced.
    pub flags_pending: usize,
    pub poller: SyncPollerStats,
    pub censor: CensorStats,
    pub relays: Vec<RelayStats>,
    pub network: NetworkStats,
}

impl ScenarioReport {
    pub fn all_settled(&self) -> bool {
        self.peers.iter().all(PeerReport::settled)
    }
}

/// A built proxy scenario, ready to run.
pub struct ProxyScenario {
    sim: Simulation,
    peers: Vec<PeerHandles>,
    producer: AppId,
    poller: AppId,
    censor: AppId,
    relays: Vec<AppId>,
}

/// The proxy scenario with default settings.
pub fn proxy_scenario(valid_peers: usize, invalid_peers: usize) -> Result<ProxyScenario> {
    ProxyScenario::build(
        SimConfig::default(),
        ProxyScenarioConfig::new(valid_peers, invalid_peers),
    )
}

impl ProxyScenario {
    pub fn build(sim_config: SimConfig, config: ProxyScenarioConfig) -> Result<Self> {
        if config.valid_peers > MAX_VALID_PEERS {
            return Err(SimError::InvalidScenario(format!(
                "at most {MAX_VALID_PEERS} valid peers, got {}",
                config.valid_peers
            )));
        }
        if config.relay_nodes == 0 {
            return Err(SimError::InvalidScenario("at least one relay node is required".into()));
        }

        let mut sim = Simulation::new(sim_config);

        let producer_node = sim.add_node("producer");
        let content = ContentProducer::new("producer", config.producer.clone())?;
        let prefixes = content.prefixes();
        let producer = sim.install_with_delay(producer_node, content, prefixes, config.producer_delay)?;

        let seed = sim.next_seed();
        let poller = SyncPoller::seeded("producer-sync", config.poller.clone(), seed)?;
        let poller = sim.install_with_delay(producer_node, poller, Vec::new(), config.producer_delay)?;

        let censor_node = sim.add_node("censor");
        let censor = CensorProducer::new("censor", config.producer.clone())?;
        let prefix = censor.prefix();
        let censor = sim.install_with_delay(censor_node, censor, vec![prefix], config.censor_delay)?;

        let mut relays = Vec::with_capacity(config.relay_nodes);
        for index in 0..config.relay_nodes {
            let label = format!("relay-{index}");
            let node = sim.add_node(label.clone());
            let seed = sim.next_seed();
            let relay = RelayNode::seeded(label, &config.poller.relay_targets, config.producer.clone(), seed)?;
            let identities = relay.identities().to_vec();
            relays.push(sim.install_with_delay(node, relay, identities, config.relay_delay)?);
        }

        let mut peers = Vec::with_capacity(config.valid_peers + config.invalid_peers);
        let valid = (0..config.valid_peers).map(|i| (true, FIRST_VALID_KEY + i as u32));
        let invalid = (0..config.invalid_peers).map(|i| (false, FIRST_INVALID_KEY + i as u32));
        for (index, (is_valid, key)) in valid.chain(invalid).enumerate() {
            let identity = format!("peer{index}");
            let node = sim.add_node(identity.clone());

            let local = PeerProducer::new(identity.clone(), config.producer.clone())?;
            let prefix: Name = local.prefix();
            let local = sim.install_with_delay(node, local, vec![prefix], config.peer_delay)?;

            let consumer_config = ConsumerConfig {
                peer_identity: identity.clone(),
                peer_key: key,
                ..config.consumer.clone()
            };
            let seed = sim.next_seed();
            let consumer = PeerConsumer::seeded(consumer_config, seed)?;
            let consumer = sim.install_with_delay(node, consumer, Vec::new(), config.peer_delay)?;

            info!(peer = %identity, key, valid = is_valid, "peer installed");
            peers.push(PeerHandles {
                identity,
                key,
                valid: is_valid,
                consumer,
                local,
            });
        }

        Ok(Self {
            sim,
            peers,
            producer,
            poller,
            censor,
            relays,
        })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn peers(&self) -> &[PeerHandles] {
        &self.peers
    }

    pub fn consumer(&self, handles: &PeerHandles) -> Result<&PeerConsumer> {
        self.sim
            .app::<PeerConsumer>(handles.consumer)
            .ok_or(SimError::UnknownApp(handles.consumer))
    }

    pub fn content_producer(&self) -> Result<&ContentProducer> {
        self.sim
            .app::<ContentProducer>(self.producer)
            .ok_or(SimError::UnknownApp(self.producer))
    }

    /// Advance the run without stopping it.
    pub fn run_until(&mut self, until: SimTime) {
        self.sim.run_until(until);
    }

    /// Run to the configured stop time, stop everything and report.
    pub fn run(&mut self) -> Result<ScenarioReport> {
        self.sim.run();
        let report = self.report()?;
        info!(
            settled = report.all_settled(),
            elapsed = %self.sim.now(),
            "scenario finished"
        );
        Ok(report)
    }

    pub fn report(&self) -> Result<ScenarioReport> {
        let mut peers = Vec::with_capacity(self.peers.len());
        for handles in &self.peers {
            let consumer = self.consumer(handles)?;
            let local = self
                .sim
                .app::<PeerProducer>(handles.local)
                .ok_or(SimError::UnknownApp(handles.local))?;
            let session = consumer.session();
            peers.push(PeerReport {
                identity: handles.identity.clone(),
                key: handles.key,
                valid: handles.valid,
                state: session.state(),
                range: session.range(),
                cursor: session.cursor(),
                originals: session.originals(),
                retries: session.retries(),
                consumer: consumer.stats().clone(),
                local: local.stats().clone(),
            });
        }

        let producer = self.content_producer()?;
        let poller = self
            .sim
            .app::<SyncPoller>(self.poller)
            .ok_or(SimError::UnknownApp(self.poller))?;
        let censor = self
            .sim
            .app::<CensorProducer>(self.censor)
            .ok_or(SimError::UnknownApp(self.censor))?;
        let relays = self
            .relays
            .iter()
            .map(|&id| {
                self.sim
                    .app::<RelayNode>(id)
                    .map(|relay| relay.stats().clone())
                    .ok_or(SimError::UnknownApp(id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ScenarioReport {
            seed: self.sim.config().seed,
            elapsed: self.sim.now().as_duration(),
            peers,
            producer: producer.stats().clone(),
            flags_pending: producer.trigger().flagged(),
            poller: poller.stats().clone(),
            censor: censor.stats().clone(),
            relays,
            network: self.sim.stats().clone(),
        })
    }
}
