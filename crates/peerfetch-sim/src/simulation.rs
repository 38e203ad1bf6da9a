//! Deterministic discrete-event substrate.
//!
//! A single event queue ordered by `(time, insertion order)` drives every
//! installed [`Application`]. Requests are multicast to every other
//! application that registered a matching prefix; a request nobody can
//! take is answered with a `NoRoute` Nack. Replies are matched by exact
//! name against the pending-interest table; the first reply consumes the
//! entry and later ones are dropped as unsolicited.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::any::Any;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, trace};

use peerfetch_core::{
    Application, Data, Interest, Nack, NackReason, Name, SimTime, Substrate, TimerHandle,
    TimerKind,
};

use crate::config::SimConfig;
use crate::error::{Result, SimError};

/// Index of a node added with [`Simulation::add_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

/// Index of an installed application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AppId(pub usize);

/// Message and table counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    pub interests_delivered: u64,
    pub data_delivered: u64,
    pub unsolicited_data: u64,
    pub nacks: u64,
    pub expired_interests: u64,
    pub timers_fired: u64,
}

enum Event {
    Interest { to: AppId, interest: Interest },
    Data { to: AppId, data: Data },
    Nack { to: AppId, nack: Nack },
    Timer { app: AppId, handle: TimerHandle, kind: TimerKind },
    ExpirePending { name: Name },
}

struct Scheduled {
    at: SimTime,
    order: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.order) == (other.at, other.order)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.order).cmp(&(other.at, other.order))
    }
}

struct PendingEntry {
    requester: AppId,
    expires: SimTime,
}

struct Route {
    prefix: Name,
    app: AppId,
}

/// Clock, queue and forwarding tables shared by every application.
#[derive(Default)]
struct Network {
    now: SimTime,
    next_order: u64,
    next_timer: u64,
    queue: BinaryHeap<Reverse<Scheduled>>,
    routes: Vec<Route>,
    delays: Vec<Duration>,
    pit: HashMap<Name, Vec<PendingEntry>>,
    timers: HashSet<TimerHandle>,
    stats: NetworkStats,
}

impl Network {
    fn push(&mut self, at: SimTime, event: Event) {
        let order = self.next_order;
        self.next_order += 1;
        self.queue.push(Reverse(Scheduled { at, order, event }));
    }

    fn delay(&self, app: AppId) -> Duration {
        self.delays.get(app.0).copied().unwrap_or_default()
    }

    fn express(&mut self, from: AppId, interest: Interest) {
        let mut targets: Vec<AppId> = Vec::new();
        for route in &self.routes {
            if route.app != from && route.prefix.is_prefix_of(&interest.name) && !targets.contains(&route.app) {
                targets.push(route.app);
            }
        }

        if targets.is_empty() {
            debug!(app = from.0, "no route for {}", interest.name);
            let at = self.now + self.delay(from);
            self.push(
                at,
                Event::Nack {
                    to: from,
                    nack: Nack::new(interest, NackReason::NoRoute),
                },
            );
            return;
        }

        let expires = self.now + interest.lifetime;
        self.pit.entry(interest.name.clone()).or_default().push(PendingEntry {
            requester: from,
            expires,
        });
        self.push(
            expires,
            Event::ExpirePending {
                name: interest.name.clone(),
            },
        );

        for to in targets {
            let at = self.now + self.delay(to);
            self.push(
                at,
                Event::Interest {
                    to,
                    interest: interest.clone(),
                },
            );
        }
    }

    fn put(&mut self, from: AppId, data: Data) {
        let now = self.now;
        let mut requesters: Vec<AppId> = Vec::new();
        if let Some(entries) = self.pit.remove(&data.name) {
            for entry in entries {
                if entry.expires > now && entry.requester != from && !requesters.contains(&entry.requester) {
                    requesters.push(entry.requester);
                }
            }
        }

        if requesters.is_empty() {
            trace!(app = from.0, "dropping unsolicited data for {}", data.name);
            self.stats.unsolicited_data += 1;
            return;
        }

        for to in requesters {
            let at = now + self.delay(to);
            self.push(at, Event::Data { to, data: data.clone() });
        }
    }

    fn expire(&mut self, name: &Name) {
        let now = self.now;
        let Some(entries) = self.pit.get_mut(name) else {
            return;
        };
        let before = entries.len();
        entries.retain(|entry| entry.expires > now);
        self.stats.expired_interests += (before - entries.len()) as u64;
        if entries.is_empty() {
            self.pit.remove(name);
        }
    }

    fn schedule(&mut self, app: AppId, delay: Duration, kind: TimerKind) -> TimerHandle {
        let handle = TimerHandle(self.next_timer);
        self.next_timer += 1;
        self.timers.insert(handle);
        let at = self.now + delay;
        self.push(at, Event::Timer { app, handle, kind });
        handle
    }
}

/// The substrate as seen by one application during a callback.
struct Context<'a> {
    network: &'a mut Network,
    app: AppId,
}

impl Substrate for Context<'_> {
    fn now(&self) -> SimTime {
        self.network.now
    }

    fn express_interest(&mut self, interest: Interest) {
        self.network.express(self.app, interest);
    }

    fn put_data(&mut self, data: Data) {
        self.network.put(self.app, data);
    }

    fn schedule(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        self.network.schedule(self.app, delay, kind)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.network.timers.remove(&handle);
    }
}

struct Installed {
    node: NodeId,
    app: Box<dyn Application>,
}

/// A seeded, single-threaded network of applications.
pub struct Simulation {
    config: SimConfig,
    rng: StdRng,
    nodes: Vec<String>,
    apps: Vec<Installed>,
    network: Network,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            nodes: Vec::new(),
            apps: Vec::new(),
            network: Network::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.network.now
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.network.stats
    }

    /// Draw a seed for an application's own generator.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.push(name.into());
        NodeId(self.nodes.len() - 1)
    }

    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(String::as_str)
    }

    /// Install `app` on `node` with the default link delay, register its
    /// prefixes and start it.
    pub fn install<A: Application>(&mut self, node: NodeId, app: A, prefixes: Vec<Name>) -> Result<AppId> {
        let delay = self.config.link_delay;
        self.install_with_delay(node, app, prefixes, delay)
    }

    /// As [`install`](Self::install) with an explicit link delay. Every
    /// message delivered to the application costs this delay.
    pub fn install_with_delay<A: Application>(
        &mut self,
        node: NodeId,
        app: A,
        prefixes: Vec<Name>,
        link_delay: Duration,
    ) -> Result<AppId> {
        if node.0 >= self.nodes.len() {
            return Err(SimError::UnknownNode(node));
        }
        let id = AppId(self.apps.len());
        debug!(
            node = %self.nodes[node.0],
            app = app.label(),
            delay_ms = link_delay.as_millis() as u64,
            "installing application"
        );
        self.apps.push(Installed {
            node,
            app: Box::new(app),
        });
        self.network.delays.push(link_delay);
        self.network
            .routes
            .extend(prefixes.into_iter().map(|prefix| Route { prefix, app: id }));

        self.with_app(id, |app, substrate| app.start(substrate));
        Ok(id)
    }

    /// Installed applications in installation order.
    pub fn app_ids(&self) -> impl Iterator<Item = AppId> {
        (0..self.apps.len()).map(AppId)
    }

    pub fn node_of(&self, id: AppId) -> Option<NodeId> {
        self.apps.get(id.0).map(|installed| installed.node)
    }

    pub fn label(&self, id: AppId) -> Option<&str> {
        self.apps.get(id.0).map(|installed| installed.app.label())
    }

    /// Inspect an installed application as its concrete type.
    pub fn app<T: Any>(&self, id: AppId) -> Option<&T> {
        self.apps.get(id.0)?.app.as_any().downcast_ref::<T>()
    }

    /// Timers scheduled and neither fired nor cancelled.
    pub fn pending_timers(&self) -> usize {
        self.network.timers.len()
    }

    /// Interests still waiting for a reply.
    pub fn pending_interests(&self) -> usize {
        self.network.pit.values().map(Vec::len).sum()
    }

    /// Process every event due at or before `until`, then move the clock
    /// to `until`.
    pub fn run_until(&mut self, until: SimTime) {
        while let Some(Reverse(next)) = self.network.queue.peek() {
            if next.at > until {
                break;
            }
            let Some(Reverse(scheduled)) = self.network.queue.pop() else {
                break;
            };
            if scheduled.at > self.network.now {
                self.network.now = scheduled.at;
            }
            self.dispatch(scheduled.event);
        }
        if until > self.network.now {
            self.network.now = until;
        }
    }

    /// Run to the configured stop time, then stop every application.
    pub fn run(&mut self) {
        let stop = self.config.stop_at();
        self.run_until(stop);
        self.stop_all();
    }

    /// Stop every application in installation order.
    pub fn stop_all(&mut self) {
        for index in 0..self.apps.len() {
            self.with_app(AppId(index), |app, substrate| app.stop(substrate));
        }
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Interest { to, interest } => {
                self.network.stats.interests_delivered += 1;
                self.with_app(to, |app, substrate| app.on_interest(&interest, substrate));
            }
            Event::Data { to, data } => {
                self.network.stats.data_delivered += 1;
                self.with_app(to, |app, substrate| app.on_data(&data, substrate));
            }
            Event::Nack { to, nack } => {
                self.network.stats.nacks += 1;
                self.with_app(to, |app, substrate| app.on_nack(&nack, substrate));
            }
            Event::Timer { app, handle, kind } => {
                if !self.network.timers.remove(&handle) {
                    return;
                }
                self.network.stats.timers_fired += 1;
                self.with_app(app, |app, substrate| app.on_timer(kind, substrate));
            }
            Event::ExpirePending { name } => self.network.expire(&name),
        }
    }

    fn with_app(&mut self, id: AppId, f: impl FnOnce(&mut dyn Application, &mut dyn Substrate)) {
        let Some(installed) = self.apps.get_mut(id.0) else {
            return;
        };
        let mut context = Context {
            network: &mut self.network,
            app: id,
        };
        f(installed.app.as_mut(), &mut context);
    }
}
