//! Periodic sync poll on the producer side.
//!
//! Polls `<prefix>/file/sync/seq=<n>`. A reply naming a flagged item
//! (`<prefix>/peer/<peer>/<NNN>`) is turned into a push of the original
//! payload through a randomly chosen relay, addressed as
//! `<relay>/<prefix>/peer/<peer>/<NNN>`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::any::Any;
use tracing::{debug, info, warn};

use peerfetch_consumer::ProxyRelay;
use peerfetch_core::content::{self, ALL_SYNCED};
use peerfetch_core::namespace::parse_relays;
use peerfetch_core::{
    Application, Data, Inbound, Interest, Name, Namespace, RandomSource, Substrate, TimerHandle,
    TimerKind,
};

use crate::config::SyncPollerConfig;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPollerStats {
    pub polls_sent: u64,
    pub all_synced: u64,
    pub pushes_sent: u64,
    pub relay_acks: u64,
}

pub struct SyncPoller<R = StdRng> {
    label: String,
    config: SyncPollerConfig,
    namespace: Namespace,
    relays: Vec<Name>,
    relay: ProxyRelay,
    rng: R,
    next_poll: u64,
    timer: Option<TimerHandle>,
    active: bool,
    stats: SyncPollerStats,
}

impl SyncPoller<StdRng> {
    pub fn seeded(label: impl Into<String>, config: SyncPollerConfig, seed: u64) -> Result<Self> {
        Self::new(label, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> SyncPoller<R> {
    pub fn new(label: impl Into<String>, config: SyncPollerConfig, rng: R) -> Result<Self> {
        let relays = parse_relays(&config.relay_targets)?;
        Ok(Self {
            label: label.into(),
            namespace: Namespace::parse(&config.prefix)?,
            relay: ProxyRelay::new(relays.clone()),
            relays,
            rng,
            next_poll: 0,
            timer: None,
            active: false,
            stats: SyncPollerStats::default(),
            config,
        })
    }

    pub fn stats(&self) -> &SyncPollerStats {
        &self.stats
    }

    fn poll(&mut self, substrate: &mut dyn Substrate) {
        let name = self.namespace.sync_poll(self.next_poll);
        self.next_poll += 1;
        debug!(poller = %self.label, "> Interest for {}", name);
        let interest = Interest::new(name)
            .nonce(self.rng.nonce())
            .lifetime(self.config.request_lifetime);
        self.stats.polls_sent += 1;
        substrate.express_interest(interest);
        self.timer = Some(substrate.schedule(self.config.poll_period, TimerKind::SyncPoll));
    }

    fn on_announcement(&mut self, announced: &str, substrate: &mut dyn Substrate) {
        let Ok(identity) = Name::parse(announced) else {
            warn!(poller = %self.label, announced, "unparseable sync announcement");
            return;
        };
        let Inbound::PeerDelivery { item, .. } = self.namespace.classify(&identity, &[]) else {
            warn!(poller = %self.label, %identity, "announcement is not a peer delivery");
            return;
        };
        self.relay.arm(identity, content::original_content(item));
        if let Some(interest) = self.relay.forward(&mut self.rng, self.config.request_lifetime) {
            info!(poller = %self.label, "> push {}", interest.name);
            self.stats.pushes_sent += 1;
            substrate.express_interest(interest);
        }
    }
}

impl<R: RandomSource + 'static> Application for SyncPoller<R> {
    fn label(&self) -> &str {
        &self.label
    }

    fn start(&mut self, substrate: &mut dyn Substrate) {
        if self.active {
            return;
        }
        self.active = true;
        self.timer = Some(substrate.schedule(std::time::Duration::ZERO, TimerKind::SyncPoll));
    }

    fn stop(&mut self, substrate: &mut dyn Substrate) {
        self.active = false;
        if let Some(handle) = self.timer.take() {
            substrate.cancel(handle);
        }
    }

    fn on_data(&mut self, data: &Data, substrate: &mut dyn Substrate) {
        if !self.active {
            return;
        }
        match self.namespace.classify(&data.name, &self.relays) {
            Inbound::SyncPoll => {
                let text = data.content_text();
                if text == ALL_SYNCED {
                    self.stats.all_synced += 1;
                } else {
                    self.on_announcement(&text, substrate);
                }
            }
            Inbound::Relay { .. } => self.stats.relay_acks += 1,
            other => debug!(poller = %self.label, ?other, "ignoring data"),
        }
    }

    fn on_timer(&mut self, kind: TimerKind, substrate: &mut dyn Substrate) {
        if kind != TimerKind::SyncPoll {
            return;
        }
        self.timer = None;
        if self.active {
            self.poll(substrate);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
