//! # Peerfetch Testkit
//!
//! Testing utilities for peerfetch.
//!
//! - **Vectors**: known keys and names with their exact wire form
//! - **Generators**: proptest strategies for keys, names and reply scripts
//! - **Fixtures**: started applications wired to a recording substrate
//!
//! ```rust
//! use peerfetch_testkit::fixtures::ConsumerFixture;
//!
//! let mut fixture = ConsumerFixture::new("B", 10005);
//! assert_eq!(fixture.validate(), Some((40, 49)));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{valid_peer_fixtures, ConsumerFixture, ProducerFixture};
pub use generators::{any_key, invalid_key, reply_script, valid_key, ReplyKind};
pub use vectors::{key_vectors, name_vectors, verify_key_vectors, KeyVector, NameVector};
