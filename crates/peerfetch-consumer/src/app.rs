//! The peer consumer application.
//!
//! Drives a [`PeerSession`] through the substrate: one primary request per
//! send tick (metadata, then content for the cursor), followed by an armed
//! local sync and an armed push, if any. A separate sweep timer declares
//! timeouts and feeds them back into the scheduler.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::any::Any;
use std::time::Duration;
use tracing::{debug, info, warn};

use peerfetch_core::content;
use peerfetch_core::namespace::parse_relays;
use peerfetch_core::types::duration_millis;
use peerfetch_core::{
    Application, Data, Inbound, Interest, Nack, Name, Namespace, RandomSource, SimTime, Substrate,
    TimerHandle, TimerKind,
};

use crate::cadence::Cadence;
use crate::config::ConsumerConfig;
use crate::error::Result;
use crate::outstanding::{OutstandingTable, ReplyDelays};
use crate::relay::ProxyRelay;
use crate::rtt::RttEstimator;
use crate::scheduler::{RequestScheduler, Selection};
use crate::session::{PeerSession, Phase, SessionState, Transition};
use crate::sweeper::RetransmissionSweeper;

/// Counters exposed for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    /// Metadata and content requests, retransmissions included.
    pub requests_sent: u64,
    pub local_syncs_sent: u64,
    pub pushes_sent: u64,
    pub replies: u64,
    /// Content replies that did not advance the cursor.
    pub non_original_replies: u64,
    pub timeouts: u64,
    pub nacks: u64,
    pub relay_acks: u64,
    /// Completed requests that had been sent more than once.
    pub retransmitted_replies: u64,
    #[serde(with = "duration_millis")]
    pub max_first_send_delay: Duration,
    #[serde(with = "duration_millis")]
    pub max_last_send_delay: Duration,
}

impl ConsumerStats {
    fn record_delays(&mut self, delays: &ReplyDelays) {
        if delays.sends > 1 {
            self.retransmitted_replies += 1;
        }
        self.max_first_send_delay = self.max_first_send_delay.max(delays.first_send);
        self.max_last_send_delay = self.max_last_send_delay.max(delays.last_send);
    }
}

/// Consumer that validates its key, then walks its assigned range.
pub struct PeerConsumer<R = StdRng> {
    label: String,
    config: ConsumerConfig,
    namespace: Namespace,
    relays: Vec<Name>,
    rng: R,
    rtt: RttEstimator,
    outstanding: OutstandingTable,
    sweeper: RetransmissionSweeper,
    scheduler: RequestScheduler,
    cadence: Cadence,
    session: PeerSession,
    relay: ProxyRelay,
    /// Cursor a local sync has been requested for, sent on the next tick.
    pending_sync: Option<u32>,
    send_timer: Option<TimerHandle>,
    first_send: bool,
    active: bool,
    stats: ConsumerStats,
}

impl PeerConsumer<StdRng> {
    /// Consumer with a seeded standard generator.
    pub fn seeded(config: ConsumerConfig, seed: u64) -> Result<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> PeerConsumer<R> {
    pub fn new(config: ConsumerConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let namespace = Namespace::parse(&config.prefix)?;
        let relays = parse_relays(&config.relay_targets)?;

        Ok(Self {
            label: config.peer_identity.clone(),
            namespace,
            relay: ProxyRelay::new(relays.clone()),
            relays,
            rng,
            rtt: RttEstimator::default(),
            outstanding: OutstandingTable::new(),
            sweeper: RetransmissionSweeper::new(config.retransmit_check_period),
            scheduler: RequestScheduler::new(config.max_sequence),
            cadence: Cadence::new(config.send_frequency, config.randomization),
            session: PeerSession::new(
                config.peer_key,
                config.peer_identity.clone(),
                config.start_sequence,
                config.retry_threshold,
            ),
            pending_sync: None,
            send_timer: None,
            first_send: true,
            active: false,
            stats: ConsumerStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn session(&self) -> &PeerSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    pub fn outstanding(&self) -> &OutstandingTable {
        &self.outstanding
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn relay(&self) -> &ProxyRelay {
        &self.relay
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn wants_to_send(&self) -> bool {
        let primary = self.session.window().is_some() && !self.scheduler.is_exhausted();
        primary || self.pending_sync.is_some() || self.relay.is_armed()
    }

    /// Schedule the next send tick unless one is pending or there is
    /// nothing left to send. The very first tick fires immediately.
    fn schedule_next(&mut self, substrate: &mut dyn Substrate) {
        if !self.active || self.send_timer.is_some() || !self.wants_to_send() {
            return;
        }
        let delay = if self.first_send {
            self.first_send = false;
            Duration::ZERO
        } else {
            self.cadence.next_delay(&mut self.rng)
        };
        self.send_timer = Some(substrate.schedule(delay, TimerKind::SendNext));
    }

    fn cancel_send(&mut self, substrate: &mut dyn Substrate) {
        if let Some(handle) = self.send_timer.take() {
            substrate.cancel(handle);
        }
    }

    fn send_next(&mut self, substrate: &mut dyn Substrate) {
        if !self.active {
            return;
        }

        if let Some((phase, window)) = self.session.window() {
            for seq in self.scheduler.prune(&window) {
                debug!(peer = %self.label, seq, "dropping stale retransmission");
                self.outstanding.forget(seq);
            }
            let fresh = *window.start();
            match self.scheduler.select(window, fresh) {
                Selection::Retransmit(seq) | Selection::Fresh(seq) => {
                    self.send_primary(phase, seq, substrate)
                }
                Selection::Exhausted => {
                    info!(peer = %self.label, "request budget exhausted");
                }
            }
        }

        if let Some(cursor) = self.pending_sync.take() {
            let name = self.namespace.local_sync(self.session.identity(), cursor as u64);
            debug!(peer = %self.label, "> Interest for {}", name);
            let interest = Interest::new(name)
                .nonce(self.rng.nonce())
                .lifetime(self.config.request_lifetime);
            self.stats.local_syncs_sent += 1;
            substrate.express_interest(interest);
        }

        if let Some(interest) = self.relay.forward(&mut self.rng, self.config.request_lifetime) {
            debug!(peer = %self.label, "> Interest for {}", interest.name);
            self.stats.pushes_sent += 1;
            substrate.express_interest(interest);
        }

        self.schedule_next(substrate);
    }

    fn send_primary(&mut self, phase: Phase, seq: u32, substrate: &mut dyn Substrate) {
        let identity = self.session.identity();
        let interest = match phase {
            Phase::Metadata => Interest::new(self.namespace.metadata(identity, seq as u64))
                .parameters(content::key_parameter(self.session.key())),
            Phase::Content => Interest::new(self.namespace.content(identity, seq)),
        }
        .nonce(self.rng.nonce())
        .lifetime(self.config.request_lifetime);

        self.outstanding.record_send(seq, substrate.now());
        self.stats.requests_sent += 1;
        debug!(peer = %self.label, "> Interest for {}", interest.name);
        substrate.express_interest(interest);
    }

    /// Drop `seq` from every outstanding index and take an RTT sample if
    /// the request was answered on its first and only send.
    fn complete(&mut self, seq: u32, now: SimTime) {
        self.scheduler.acknowledge(seq);
        let Some(delays) = self.outstanding.complete(seq, now) else {
            return;
        };
        if delays.rtt_usable {
            self.rtt.sample(delays.last_send);
        }
        debug!(
            peer = %self.label,
            seq,
            first_delay_ms = delays.first_send.as_millis() as u64,
            last_delay_ms = delays.last_send.as_millis() as u64,
            sends = delays.sends,
            "request completed"
        );
        self.stats.record_delays(&delays);
    }

    fn apply(&mut self, transition: Transition, substrate: &mut dyn Substrate) {
        match transition {
            Transition::RangeAssigned { start, end } => {
                info!(peer = %self.label, start, end, "range assigned");
            }
            Transition::Rejected => {
                warn!(peer = %self.label, key = self.session.key(), "invalid peer, stopping requests");
                self.pending_sync = None;
                self.cancel_send(substrate);
            }
            Transition::Advanced { item, payload, done } => {
                info!(peer = %self.label, item, "original payload received");
                // A local sync can answer for a request still in flight.
                self.scheduler.acknowledge(item);
                self.outstanding.forget(item);
                self.relay.arm(Name::root().append_sequence(item as u64), payload);
                if done {
                    info!(peer = %self.label, "range complete");
                }
            }
            Transition::Retry { retries } => {
                self.stats.non_original_replies += 1;
                debug!(peer = %self.label, retries, "non-original reply");
            }
            Transition::SyncRequested { cursor } => {
                self.stats.non_original_replies += 1;
                info!(peer = %self.label, cursor, "retry threshold reached, requesting local sync");
                self.pending_sync = Some(cursor);
            }
            Transition::Ignored => {}
        }
        self.schedule_next(substrate);
    }

    fn check_timeouts(&mut self, substrate: &mut dyn Substrate) {
        let rto = self.rtt.rto();
        let expired = self.sweeper.sweep(&mut self.outstanding, rto, substrate.now());
        for &seq in &expired {
            self.rtt.backoff();
            self.scheduler.enqueue_retransmit(seq);
            self.stats.timeouts += 1;
            debug!(peer = %self.label, seq, rto_ms = rto.as_millis() as u64, "request timed out");
        }
        if !expired.is_empty() {
            self.schedule_next(substrate);
        }
    }

    fn own(&self, peer: &str) -> bool {
        peer == self.session.identity()
    }
}

impl<R: RandomSource + 'static> Application for PeerConsumer<R> {
    fn label(&self) -> &str {
        &self.label
    }

    fn start(&mut self, substrate: &mut dyn Substrate) {
        if self.active {
            return;
        }
        self.active = true;
        self.sweeper.arm(substrate);
        self.schedule_next(substrate);
    }

    fn stop(&mut self, substrate: &mut dyn Substrate) {
        self.active = false;
        self.cancel_send(substrate);
        self.sweeper.disarm(substrate);
    }

    fn on_data(&mut self, data: &Data, substrate: &mut dyn Substrate) {
        if !self.active {
            return;
        }
        let now = substrate.now();
        let text = data.content_text();
        debug!(peer = %self.label, "< DATA for {}", data.name);
        self.stats.replies += 1;

        let transition = match self.namespace.classify(&data.name, &self.relays) {
            Inbound::Metadata { peer, sequence } if self.own(&peer) => {
                // Metadata and content share sequence numbers; once fetching,
                // the table only holds content requests.
                if self.session.state() == SessionState::AwaitingMetadata {
                    if let Ok(seq) = u32::try_from(sequence) {
                        self.complete(seq, now);
                    }
                }
                self.session.on_metadata_reply(&text)
            }
            Inbound::Content { peer, item } if self.own(&peer) => {
                self.complete(item, now);
                self.session.on_content_reply(item, &text)
            }
            Inbound::LocalSync { peer, .. } if self.own(&peer) => self.session.on_local_sync_reply(&text),
            Inbound::Relay { relay, .. } => {
                debug!(peer = %self.label, relay = %relay, "push acknowledged");
                self.stats.relay_acks += 1;
                Transition::Ignored
            }
            other => {
                debug!(peer = %self.label, ?other, "ignoring unexpected data");
                Transition::Ignored
            }
        };
        self.apply(transition, substrate);
    }

    fn on_nack(&mut self, nack: &Nack, _substrate: &mut dyn Substrate) {
        if !self.active {
            return;
        }
        warn!(peer = %self.label, reason = %nack.reason, "NACK for {}", nack.interest.name);
        self.stats.nacks += 1;
    }

    fn on_timer(&mut self, kind: TimerKind, substrate: &mut dyn Substrate) {
        match kind {
            TimerKind::SendNext => {
                self.send_timer = None;
                self.send_next(substrate);
            }
            TimerKind::RetransmitSweep => {
                self.sweeper.fired();
                if !self.active {
                    return;
                }
                self.check_timeouts(substrate);
                self.sweeper.arm(substrate);
            }
            TimerKind::SyncPoll => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_core::content::{censored_content, original_content, range_content, INVALID_PEER};
    use peerfetch_core::substrate::recording::RecordingSubstrate;

    fn consumer(identity: &str, key: u32) -> PeerConsumer {
        PeerConsumer::seeded(ConsumerConfig::for_peer(identity, key), 9).unwrap()
    }

    fn reply(name: &Name, content: impl Into<bytes::Bytes>) -> Data {
        Data::new(name.clone()).content(content)
    }

    /// Fire the next send tick and return what went out.
    fn tick(app: &mut PeerConsumer, substrate: &mut RecordingSubstrate) -> Vec<Interest> {
        assert!(substrate.fire(TimerKind::SendNext, app), "no send tick pending");
        substrate.take_interests()
    }

    #[test]
    fn test_first_send_fires_immediately_with_key() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10005);
        app.start(&mut substrate);

        let pending = substrate.pending(TimerKind::SendNext).unwrap();
        assert_eq!(pending.due, SimTime::ZERO);
        assert!(substrate.pending(TimerKind::RetransmitSweep).is_some());

        let sent = tick(&mut app, &mut substrate);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name.to_uri(), "/prefix/metadata/B/seq=0");
        assert_eq!(sent[0].parameters_text(), "key=10005");
        assert_eq!(sent[0].lifetime, Duration::from_secs(2));
        assert_eq!(substrate.pending(TimerKind::SendNext).unwrap().due, SimTime::from_secs(1));
    }

    #[test]
    fn test_invalid_key_is_terminal_after_one_request() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("X", 20001);
        app.start(&mut substrate);
        let sent = tick(&mut app, &mut substrate);

        substrate.advance(Duration::from_millis(20));
        app.on_data(&reply(&sent[0].name, INVALID_PEER), &mut substrate);

        assert_eq!(app.state(), SessionState::Rejected);
        assert!(substrate.pending(TimerKind::SendNext).is_none());
        substrate.run_until(SimTime::from_secs(30), &mut app);
        assert!(substrate.interests.is_empty());
        assert_eq!(app.stats().requests_sent, 1);
    }

    #[test]
    fn test_reply_clears_outstanding_and_samples_rtt() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10001);
        app.start(&mut substrate);
        let sent = tick(&mut app, &mut substrate);
        assert!(app.outstanding().is_armed(0));

        substrate.advance(Duration::from_millis(40));
        app.on_data(&reply(&sent[0].name, range_content(0, 9)), &mut substrate);

        assert!(app.outstanding().is_empty());
        assert_eq!(app.rtt().samples(), 1);
        assert_eq!(app.rtt().srtt(), Duration::from_millis(40));
        assert_eq!(app.state(), SessionState::Fetching { cursor: 0 });
    }

    #[test]
    fn test_timeout_backs_off_and_retransmits() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10001);
        app.start(&mut substrate);
        tick(&mut app, &mut substrate);

        // Initial RTO is one second; the sweep runs every 50ms.
        while substrate.now() < SimTime::from_millis(1000) {
            substrate.fire(TimerKind::RetransmitSweep, &mut app);
        }
        assert_eq!(app.stats().timeouts, 1);
        assert_eq!(app.rtt().multiplier(), 2);
        assert!(app.scheduler().has_retransmit(0));

        let sent = tick(&mut app, &mut substrate);
        assert_eq!(sent[0].name.to_uri(), "/prefix/metadata/B/seq=0");
        assert!(!app.scheduler().has_retransmit(0));
        assert_eq!(app.outstanding().sends(0), 2);

        substrate.advance(Duration::from_millis(10));
        app.on_data(&reply(&sent[0].name, range_content(0, 9)), &mut substrate);
        assert_eq!(app.rtt().samples(), 0, "retransmitted sample must be discarded");
        assert_eq!(app.stats().retransmitted_replies, 1);
    }

    #[test]
    fn test_retry_threshold_sends_local_sync_and_sync_reply_advances() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10005);
        app.start(&mut substrate);
        let sent = tick(&mut app, &mut substrate);
        app.on_data(&reply(&sent[0].name, range_content(40, 49)), &mut substrate);

        for _ in 0..3 {
            let sent = tick(&mut app, &mut substrate);
            assert_eq!(sent[0].name.to_uri(), "/prefix/file/B/040");
            app.on_data(&reply(&sent[0].name, censored_content(40)), &mut substrate);
        }
        assert_eq!(app.session().cursor(), Some(40));

        let sent = tick(&mut app, &mut substrate);
        let uris: Vec<String> = sent.iter().map(|i| i.name.to_uri()).collect();
        assert_eq!(uris, vec!["/prefix/file/B/040", "/prefix/peer/B/local_sync/seq=40"]);

        app.on_data(&reply(&sent[1].name, original_content(40)), &mut substrate);
        assert_eq!(app.session().cursor(), Some(41));
        assert!(app.relay().is_armed());

        let sent = tick(&mut app, &mut substrate);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].name.to_uri(), "/prefix/file/B/041");
        assert_eq!(sent[1].name.last_sequence(), Ok(40));
        assert_eq!(sent[1].parameters_text(), "Original data packet for file 040");
        assert!(!app.relay().is_armed());
    }

    #[test]
    fn test_late_metadata_reply_leaves_content_request_alone() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10001);
        app.start(&mut substrate);
        let metadata = tick(&mut app, &mut substrate).remove(0);
        app.on_data(&reply(&metadata.name, range_content(0, 9)), &mut substrate);
        let samples = app.rtt().samples();

        let sent = tick(&mut app, &mut substrate);
        assert_eq!(sent[0].name.to_uri(), "/prefix/file/B/000");
        assert!(app.outstanding().is_armed(0));

        substrate.advance(Duration::from_millis(15));
        app.on_data(&reply(&metadata.name, range_content(0, 9)), &mut substrate);
        assert!(app.outstanding().is_armed(0));
        assert_eq!(app.rtt().samples(), samples);
        assert_eq!(app.state(), SessionState::Fetching { cursor: 0 });
    }

    #[test]
    fn test_done_forwards_last_push_then_goes_quiet() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10001);
        app.start(&mut substrate);
        let sent = tick(&mut app, &mut substrate);
        app.on_data(&reply(&sent[0].name, range_content(0, 0)), &mut substrate);

        let sent = tick(&mut app, &mut substrate);
        app.on_data(&reply(&sent[0].name, original_content(0)), &mut substrate);
        assert_eq!(app.state(), SessionState::Done);

        let sent = tick(&mut app, &mut substrate);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].parameters.is_some());
        assert!(substrate.pending(TimerKind::SendNext).is_none());
    }

    #[test]
    fn test_nack_is_counted_not_retried() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10001);
        app.start(&mut substrate);
        let sent = tick(&mut app, &mut substrate);

        app.on_nack(&Nack::new(sent[0].clone(), peerfetch_core::NackReason::NoRoute), &mut substrate);
        assert_eq!(app.stats().nacks, 1);
        assert_eq!(app.state(), SessionState::AwaitingMetadata);
        assert!(!app.scheduler().has_retransmit(0));
    }

    #[test]
    fn test_stop_cancels_all_timers() {
        let mut substrate = RecordingSubstrate::new();
        let mut app = consumer("B", 10001);
        app.start(&mut substrate);
        tick(&mut app, &mut substrate);
        app.stop(&mut substrate);

        assert!(substrate.pending_timers().is_empty());
        assert!(!app.is_active());
    }

    #[test]
    fn test_max_sequence_exhausts() {
        let mut substrate = RecordingSubstrate::new();
        let mut config = ConsumerConfig::for_peer("B", 10001);
        config.max_sequence = 1;
        let mut app = PeerConsumer::seeded(config, 1).unwrap();
        app.start(&mut substrate);
        assert_eq!(tick(&mut app, &mut substrate).len(), 1);
        assert!(app.scheduler().is_exhausted());
        assert!(substrate.pending(TimerKind::SendNext).is_none());
    }
}
