//! Textual content conventions.
//!
//! These tags are protocol markers shared by consumers and producers and
//! must be reproduced byte-for-byte:
//!
//! | marker | meaning |
//! |---|---|
//! | `start=%03u end=%03u` | assigned work range |
//! | `Invalid Peer!!!` | peer key rejected |
//! | `Original data packet for file %03u` | genuine item payload |
//! | `AllSynced` | sync-poll found nothing flagged |
//! | `key=%u` | peer key request parameter |

use crate::error::{CoreError, Result};

/// Reply content for a rejected peer key.
pub const INVALID_PEER: &str = "Invalid Peer!!!";

/// Sync-poll reply when no item needs a push.
pub const ALL_SYNCED: &str = "AllSynced";

/// Leading tag of a genuine item payload.
pub const ORIGINAL_TAG: &str = "Original";

/// Acknowledgement content sent by rendezvous relays.
pub const RELAYED: &str = "Relayed";

const ORIGINAL_PREFIX: &str = "Original data packet for file ";
const CENSORED_PREFIX: &str = "Censored data for file ";
const KEY_PREFIX: &str = "key=";
const START_PREFIX: &str = "start=";
const END_PREFIX: &str = "end=";

/// Zero-padded three digit item label, as used in names and payloads.
pub fn item_label(item: u32) -> String {
    format!("{item:03}")
}

/// Parse a zero-padded item label.
pub fn parse_item_label(label: &str) -> Option<u32> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

/// `start=%03u end=%03u`
pub fn range_content(start: u32, end: u32) -> String {
    format!("{START_PREFIX}{start:03} {END_PREFIX}{end:03}")
}

/// `Original data packet for file %03u`
pub fn original_content(item: u32) -> String {
    format!("{ORIGINAL_PREFIX}{item:03}")
}

/// Non-original payload served by a censoring producer.
pub fn censored_content(item: u32) -> String {
    format!("{CENSORED_PREFIX}{item:03}")
}

/// `key=%u`
pub fn key_parameter(key: u32) -> String {
    format!("{KEY_PREFIX}{key}")
}

/// True if the content carries the "Original" tag.
pub fn is_original(content: &str) -> bool {
    content.starts_with(ORIGINAL_TAG)
}

/// Item number of an "Original data packet for file N" payload.
pub fn parse_original(content: &str) -> Option<u32> {
    content
        .strip_prefix(ORIGINAL_PREFIX)
        .and_then(|rest| parse_item_label(rest.trim_end_matches('\0')))
}

/// Parse a `key=<n>` parameter string.
pub fn parse_key_parameter(parameter: &str) -> Result<u32> {
    let digits = parameter
        .strip_prefix(KEY_PREFIX)
        .ok_or_else(|| CoreError::MalformedParameters(format!("missing key tag in {parameter:?}")))?;
    digits
        .trim()
        .parse::<u32>()
        .map_err(|_| CoreError::MalformedParameters(format!("bad key digits in {parameter:?}")))
}

/// Decoded metadata-phase reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataReply {
    /// Work range assigned, inclusive on both ends.
    Range { start: u32, end: u32 },
    /// The peer key was refused.
    Rejected,
}

/// Decode a metadata reply.
///
/// Anything that is not a well-formed range is a rejection, mirroring how
/// the producer only ever answers with a range or [`INVALID_PEER`].
pub fn parse_metadata_reply(content: &str) -> MetadataReply {
    match parse_range_content(content) {
        Ok((start, end)) => MetadataReply::Range { start, end },
        Err(_) => MetadataReply::Rejected,
    }
}

/// Parse `start=NNN end=NNN`.
pub fn parse_range_content(content: &str) -> Result<(u32, u32)> {
    let malformed = || CoreError::MalformedContent(format!("not a range: {content:?}"));

    let rest = content.strip_prefix(START_PREFIX).ok_or_else(malformed)?;
    let start_digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = rest[start_digits.len()..].trim_start();
    let rest = rest.strip_prefix(END_PREFIX).ok_or_else(malformed)?;
    let end_digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();

    let start = start_digits.parse::<u32>().map_err(|_| malformed())?;
    let end = end_digits.parse::<u32>().map_err(|_| malformed())?;
    if end < start {
        return Err(malformed());
    }
    Ok((start, end))
}
