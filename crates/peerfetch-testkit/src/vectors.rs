//! Known vectors for key validation and wire names.
//!
//! The reply strings and name layouts are protocol markers; these vectors
//! pin them down byte for byte.

use peerfetch_core::content::INVALID_PEER;
use peerfetch_core::Namespace;
use peerfetch_producer::PeerValidator;

/// A metadata key and the exact reply it must produce.
#[derive(Debug, Clone)]
pub struct KeyVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub key: u32,
    /// Expected metadata reply content.
    pub expected: &'static str,
}

/// All key vectors.
pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "first valid key",
            key: 10_001,
            expected: "start=000 end=009",
        },
        KeyVector {
            name: "second valid key",
            key: 10_002,
            expected: "start=010 end=019",
        },
        KeyVector {
            name: "scenario key",
            key: 10_005,
            expected: "start=040 end=049",
        },
        KeyVector {
            name: "last slot of the first thousand",
            key: 10_999,
            expected: "start=9980 end=9989",
        },
        KeyVector {
            name: "slot numbering wraps every thousand",
            key: 11_001,
            expected: "start=000 end=009",
        },
        KeyVector {
            name: "lower bound is exclusive",
            key: 10_000,
            expected: INVALID_PEER,
        },
        KeyVector {
            name: "multiple of a thousand",
            key: 15_000,
            expected: INVALID_PEER,
        },
        KeyVector {
            name: "upper bound is exclusive",
            key: 20_000,
            expected: INVALID_PEER,
        },
        KeyVector {
            name: "scenario invalid key",
            key: 20_001,
            expected: INVALID_PEER,
        },
        KeyVector {
            name: "zero",
            key: 0,
            expected: INVALID_PEER,
        },
    ]
}

/// Check every key vector; returns `(name, passed, actual)` per vector.
pub fn verify_key_vectors() -> Vec<(String, bool, String)> {
    key_vectors()
        .into_iter()
        .map(|v| {
            let actual = PeerValidator.validate_key(v.key).content();
            (v.name.to_string(), actual == v.expected, actual)
        })
        .collect()
}

/// A name builder output and its expected URI.
#[derive(Debug, Clone)]
pub struct NameVector {
    pub name: &'static str,
    pub uri: String,
    pub expected: &'static str,
}

/// Names built under the default prefix.
pub fn name_vectors() -> Vec<NameVector> {
    let ns = Namespace::default();
    vec![
        NameVector {
            name: "metadata request",
            uri: ns.metadata("B", 0).to_uri(),
            expected: "/prefix/metadata/B/seq=0",
        },
        NameVector {
            name: "content request",
            uri: ns.content("B", 40).to_uri(),
            expected: "/prefix/file/B/040",
        },
        NameVector {
            name: "sync poll",
            uri: ns.sync_poll(12).to_uri(),
            expected: "/prefix/file/sync/seq=12",
        },
        NameVector {
            name: "local sync",
            uri: ns.local_sync("B", 40).to_uri(),
            expected: "/prefix/peer/B/local_sync/seq=40",
        },
        NameVector {
            name: "peer delivery",
            uri: ns.peer_delivery("B", 40).to_uri(),
            expected: "/prefix/peer/B/040",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_vectors_pass() {
        for (name, passed, actual) in verify_key_vectors() {
            assert!(passed, "vector '{name}' produced {actual:?}");
        }
    }

    #[test]
    fn test_name_vectors_pass() {
        for v in name_vectors() {
            assert_eq!(v.uri, v.expected, "vector '{}'", v.name);
        }
    }
}
