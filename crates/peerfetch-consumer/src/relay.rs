//! One-shot forwarding through a randomly chosen rendezvous point.

use bytes::Bytes;
use std::time::Duration;

use peerfetch_core::{Interest, Name, RandomSource};

/// A buffered payload waiting to be forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPush {
    /// Appended to the chosen relay identity.
    pub suffix: Name,
    pub payload: Bytes,
}

/// Single-slot push buffer over a fixed relay set.
#[derive(Debug, Clone)]
pub struct ProxyRelay {
    targets: Vec<Name>,
    pending: Option<PendingPush>,
}

impl ProxyRelay {
    pub fn new(targets: Vec<Name>) -> Self {
        Self {
            targets,
            pending: None,
        }
    }

    pub fn targets(&self) -> &[Name] {
        &self.targets
    }

    /// Buffer a push, replacing anything not yet forwarded.
    pub fn arm(&mut self, suffix: Name, payload: impl Into<Bytes>) {
        if let Some(previous) = self.pending.replace(PendingPush {
            suffix,
            payload: payload.into(),
        }) {
            tracing::debug!(suffix = %previous.suffix, "overwriting unsent push");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingPush> {
        self.pending.as_ref()
    }

    /// Draw a relay uniformly at random from the target set.
    pub fn choose<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Option<&Name> {
        rng.pick_index(self.targets.len()).and_then(|i| self.targets.get(i))
    }

    /// Take the buffered push and address it to a random relay as
    /// `<relay>/<suffix>` carrying the payload as parameters.
    ///
    /// The slot is cleared even when there is no relay to send to.
    pub fn forward<R: RandomSource + ?Sized>(&mut self, rng: &mut R, lifetime: Duration) -> Option<Interest> {
        let push = self.pending.take()?;
        let Some(relay) = self.choose(rng) else {
            tracing::warn!(suffix = %push.suffix, "no relay targets configured, dropping push");
            return None;
        };
        let name = relay.append_name(&push.suffix);
        tracing::info!(relay = %relay, name = %name, "forwarding push");
        Some(
            Interest::new(name)
                .nonce(rng.nonce())
                .lifetime(lifetime)
                .parameters(push.payload),
        )
    }
}
