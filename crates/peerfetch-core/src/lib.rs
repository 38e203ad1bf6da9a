//! # Peerfetch Core
//!
//! Pure primitives for the peerfetch pull protocol: names, packets, content
//! conventions, and the contract between applications and their substrate.
//!
//! This crate contains no scheduling logic and no I/O. Applications built on
//! it are sans-IO state machines driven through [`Substrate`] callbacks.
//!
//! ## Key Types
//!
//! - [`Name`] - Hierarchical identifier addressing requests and replies
//! - [`Interest`] / [`Data`] / [`Nack`] - The three message kinds
//! - [`Inbound`] - An inbound name classified once at ingress
//! - [`Substrate`] / [`Application`] - The event-driven contract
//! - [`RandomSource`] - Injected randomness
//!
//! ## Content conventions
//!
//! Textual markers exchanged between peers live in [`content`].

pub mod content;
pub mod error;
pub mod name;
pub mod namespace;
pub mod packet;
pub mod random;
pub mod substrate;
pub mod types;

pub use content::MetadataReply;
pub use error::{CoreError, Result};
pub use name::{Component, Name};
pub use namespace::{Inbound, Namespace};
pub use packet::{Data, Interest, Nack, NackReason, Signature};
pub use random::RandomSource;
pub use substrate::{Application, Substrate};
pub use types::{SimTime, TimerHandle, TimerKind};
