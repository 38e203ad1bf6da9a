//! The three message kinds of the pull protocol.
//!
//! - [`Interest`]: a named request
//! - [`Data`]: a named reply echoing the request name
//! - [`Nack`]: an explicit rejection of a request

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;

use crate::name::Name;
use crate::types::duration_millis;

/// Default request lifetime.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(2);

/// Signature type code used for the unverified placeholder signature.
pub const FAKE_SIGNATURE_TYPE: u8 = 255;

/// A named request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    /// The requested name.
    pub name: Name,
    /// De-duplication hint. Not a security property.
    pub nonce: u32,
    /// How long the request stays pending in the substrate.
    #[serde(with = "duration_millis")]
    pub lifetime: Duration,
    /// Optional opaque application parameters.
    pub parameters: Option<Bytes>,
}

impl Interest {
    /// Create a request for `name` with default lifetime and no parameters.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            nonce: 0,
            lifetime: DEFAULT_INTEREST_LIFETIME,
            parameters: None,
        }
    }

    /// Set the nonce.
    pub fn nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    /// Set the lifetime.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Attach parameters.
    pub fn parameters(mut self, parameters: impl Into<Bytes>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Parameters decoded as (lossy) UTF-8, empty if absent.
    pub fn parameters_text(&self) -> Cow<'_, str> {
        match &self.parameters {
            Some(p) => String::from_utf8_lossy(p),
            None => Cow::Borrowed(""),
        }
    }
}

/// Placeholder signature block. Carried, never verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signature_type: u8,
    pub key_locator: Option<Name>,
    pub value: u32,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            signature_type: FAKE_SIGNATURE_TYPE,
            key_locator: None,
            value: 0,
        }
    }
}

/// A named reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// Echoes the request name.
    pub name: Name,
    /// Freshness period; zero means unlimited.
    #[serde(with = "duration_millis")]
    pub freshness: Duration,
    /// Opaque payload.
    pub content: Bytes,
    /// Unverified placeholder signature.
    pub signature: Signature,
}

impl Data {
    /// Create an empty reply for `name`.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            freshness: Duration::ZERO,
            content: Bytes::new(),
            signature: Signature::default(),
        }
    }

    /// Set the content.
    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the freshness period.
    pub fn freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Set the signature block.
    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Content decoded as (lossy) UTF-8.
    pub fn content_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NackReason {
    None,
    Congestion,
    Duplicate,
    NoRoute,
}

impl std::fmt::Display for NackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NackReason::None => "None",
            NackReason::Congestion => "Congestion",
            NackReason::Duplicate => "Duplicate",
            NackReason::NoRoute => "NoRoute",
        };
        f.write_str(s)
    }
}

/// An explicit rejection. Terminal for its request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nack {
    pub interest: Interest,
    pub reason: NackReason,
}

impl Nack {
    pub fn new(interest: Interest, reason: NackReason) -> Self {
        Self { interest, reason }
    }
}
