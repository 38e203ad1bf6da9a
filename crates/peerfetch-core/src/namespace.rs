//! Name layout and ingress classification.
//!
//! Every inbound name is classified once, at ingress, into an [`Inbound`]
//! variant. Handlers then match on the variant instead of comparing
//! string prefixes.
//!
//! ```text
//! <prefix>/metadata/<peer>/seq=<n>        Metadata
//! <prefix>/file/sync[/...]                SyncPoll
//! <prefix>/file/<peer>/<NNN>              Content
//! <prefix>/peer/<peer>/local_sync/seq=<n> LocalSync
//! <prefix>/peer/<peer>/<NNN>              PeerDelivery
//! /<relay>/...                            Relay
//! ```

use serde::{Deserialize, Serialize};

use crate::content::{item_label, parse_item_label};
use crate::error::Result;
use crate::name::{Component, Name};

pub const METADATA: &str = "metadata";
pub const FILE: &str = "file";
pub const SYNC: &str = "sync";
pub const PEER: &str = "peer";
pub const LOCAL_SYNC: &str = "local_sync";

/// Default application prefix.
pub const DEFAULT_PREFIX: &str = "/prefix";

/// Default rendezvous identities.
pub const DEFAULT_RELAY_TARGETS: [&str; 3] = ["/cnn", "/bbc", "/nytimes"];

/// A classified inbound name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Peer-key validation request.
    Metadata { peer: String, sequence: u64 },
    /// Producer-side poll for flagged items.
    SyncPoll,
    /// Request for one item.
    Content { peer: String, item: u32 },
    /// Consumer asking its co-located peer producer for a buffered push.
    LocalSync { peer: String, sequence: u64 },
    /// Push delivered to a peer producer.
    PeerDelivery { peer: String, item: u32 },
    /// Request addressed to a rendezvous identity.
    Relay { relay: Name, rest: Name },
    Unknown,
}

/// Names under one application prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    prefix: Name,
}

impl Namespace {
    pub fn new(prefix: Name) -> Self {
        Self { prefix }
    }

    /// Parse the prefix from a URI.
    pub fn parse(prefix: &str) -> Result<Self> {
        Name::parse(prefix).map(Self::new)
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// `<prefix>/metadata`
    pub fn metadata_prefix(&self) -> Name {
        self.prefix.append(METADATA)
    }

    /// `<prefix>/file`
    pub fn file_prefix(&self) -> Name {
        self.prefix.append(FILE)
    }

    /// `<prefix>/peer/<peer>`
    pub fn peer_prefix(&self, peer: &str) -> Name {
        self.prefix.append(PEER).append(peer)
    }

    /// `<prefix>/metadata/<peer>/seq=<n>`
    pub fn metadata(&self, peer: &str, sequence: u64) -> Name {
        self.metadata_prefix().append(peer).append_sequence(sequence)
    }

    /// `<prefix>/file/<peer>/<NNN>`
    pub fn content(&self, peer: &str, item: u32) -> Name {
        self.file_prefix().append(peer).append(&item_label(item))
    }

    /// `<prefix>/file/sync/seq=<n>`
    pub fn sync_poll(&self, sequence: u64) -> Name {
        self.file_prefix().append(SYNC).append_sequence(sequence)
    }

    /// `<prefix>/peer/<peer>/local_sync/seq=<n>`
    pub fn local_sync(&self, peer: &str, sequence: u64) -> Name {
        self.peer_prefix(peer).append(LOCAL_SYNC).append_sequence(sequence)
    }

    /// `<prefix>/peer/<peer>/<NNN>`
    pub fn peer_delivery(&self, peer: &str, item: u32) -> Name {
        self.peer_prefix(peer).append(&item_label(item))
    }

    /// Classify `name`. `relays` are the configured rendezvous identities.
    pub fn classify(&self, name: &Name, relays: &[Name]) -> Inbound {
        if self.prefix.is_prefix_of(name) {
            let rest = name.skip(self.prefix.len());
            let inbound = classify_local(&rest);
            if inbound != Inbound::Unknown {
                return inbound;
            }
        }

        if let Some(relay) = relays
            .iter()
            .filter(|relay| !relay.is_empty())
            .find(|relay| relay.is_prefix_of(name))
        {
            return Inbound::Relay {
                relay: relay.clone(),
                rest: name.skip(relay.len()),
            };
        }

        Inbound::Unknown
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(Name::root().append("prefix"))
    }
}

fn text(component: Option<&Component>) -> Option<&str> {
    component.and_then(Component::as_text)
}

fn classify_local(rest: &Name) -> Inbound {
    match (text(rest.get(0)), rest.len()) {
        (Some(METADATA), 3) => match (text(rest.get(1)), rest.get(2).and_then(Component::as_sequence)) {
            (Some(peer), Some(sequence)) => Inbound::Metadata {
                peer: peer.to_string(),
                sequence,
            },
            _ => Inbound::Unknown,
        },
        (Some(FILE), len) if len >= 2 && text(rest.get(1)) == Some(SYNC) => Inbound::SyncPoll,
        (Some(FILE), 3) => match (text(rest.get(1)), text(rest.get(2)).and_then(parse_item_label)) {
            (Some(peer), Some(item)) => Inbound::Content {
                peer: peer.to_string(),
                item,
            },
            _ => Inbound::Unknown,
        },
        (Some(PEER), 4) if text(rest.get(2)) == Some(LOCAL_SYNC) => {
            match (text(rest.get(1)), rest.get(3).and_then(Component::as_sequence)) {
                (Some(peer), Some(sequence)) => Inbound::LocalSync {
                    peer: peer.to_string(),
                    sequence,
                },
                _ => Inbound::Unknown,
            }
        }
        (Some(PEER), 3) => match (text(rest.get(1)), text(rest.get(2)).and_then(parse_item_label)) {
            (Some(peer), Some(item)) => Inbound::PeerDelivery {
                peer: peer.to_string(),
                item,
            },
            _ => Inbound::Unknown,
        },
        _ => Inbound::Unknown,
    }
}

/// Parse the configured relay identities.
pub fn parse_relays<S: AsRef<str>>(relays: &[S]) -> Result<Vec<Name>> {
    relays.iter().map(|r| Name::parse(r.as_ref())).collect()
}
