//! Range iteration state machine.
//!
//! ```text
//! AwaitingMetadata --range--> Fetching{cursor} --cursor > end--> Done
//!        |
//!        +--rejection--> Rejected
//! ```
//!
//! The cursor moves only on an "Original" reply for the current cursor.
//! Anything else counts as a retry; every `retry_threshold` retries the
//! session asks its co-located peer producer for a local sync.

use serde::Serialize;
use std::ops::RangeInclusive;

use peerfetch_core::content::{self, MetadataReply};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    AwaitingMetadata,
    Fetching { cursor: u32 },
    Done,
    Rejected,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Rejected)
    }
}

/// What kind of primary request the session issues in its current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Metadata,
    Content,
}

/// Result of feeding a reply into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Key accepted; fetching starts at `start`.
    RangeAssigned { start: u32, end: u32 },
    /// Key refused. Terminal.
    Rejected,
    /// `item` arrived as an original payload; `done` if it was the last.
    Advanced { item: u32, payload: String, done: bool },
    /// Non-original or mismatched reply.
    Retry { retries: u32 },
    /// Retry threshold reached for `cursor`; counter reset.
    SyncRequested { cursor: u32 },
    /// Reply not applicable in the current state.
    Ignored,
}

/// A consumer's view of its assigned work.
#[derive(Debug, Clone)]
pub struct PeerSession {
    key: u32,
    identity: String,
    start_sequence: u32,
    retry_threshold: u32,
    state: SessionState,
    range: Option<(u32, u32)>,
    retries: u32,
    originals: u32,
}

impl PeerSession {
    pub fn new(key: u32, identity: impl Into<String>, start_sequence: u32, retry_threshold: u32) -> Self {
        Self {
            key,
            identity: identity.into(),
            start_sequence,
            retry_threshold: retry_threshold.max(1),
            state: SessionState::AwaitingMetadata,
            range: None,
            retries: 0,
            originals: 0,
        }
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state != SessionState::Rejected
    }

    /// Assigned range, inclusive.
    pub fn range(&self) -> Option<(u32, u32)> {
        self.range
    }

    /// Current cursor; past the end once done.
    pub fn cursor(&self) -> Option<u32> {
        match self.state {
            SessionState::Fetching { cursor } => Some(cursor),
            SessionState::Done => self.range.map(|(_, end)| end.saturating_add(1)),
            _ => None,
        }
    }

    /// Retries counted against the current cursor.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Original payloads consumed.
    pub fn originals(&self) -> u32 {
        self.originals
    }

    /// Sequences the session accepts a request for right now, with the
    /// phase they belong to. `None` once terminal.
    pub fn window(&self) -> Option<(Phase, RangeInclusive<u32>)> {
        match self.state {
            SessionState::AwaitingMetadata => {
                Some((Phase::Metadata, self.start_sequence..=self.start_sequence))
            }
            SessionState::Fetching { cursor } => {
                let end = self.range.map_or(cursor, |(_, end)| end);
                Some((Phase::Content, cursor..=end))
            }
            SessionState::Done | SessionState::Rejected => None,
        }
    }

    /// Feed the content of a metadata reply.
    pub fn on_metadata_reply(&mut self, reply: &str) -> Transition {
        if self.state != SessionState::AwaitingMetadata {
            return Transition::Ignored;
        }
        match content::parse_metadata_reply(reply) {
            MetadataReply::Range { start, end } => {
                self.range = Some((start, end));
                self.state = SessionState::Fetching { cursor: start };
                Transition::RangeAssigned { start, end }
            }
            MetadataReply::Rejected => {
                self.state = SessionState::Rejected;
                Transition::Rejected
            }
        }
    }

    /// Feed a reply to a content request for `item`.
    pub fn on_content_reply(&mut self, item: u32, reply: &str) -> Transition {
        let SessionState::Fetching { cursor } = self.state else {
            return Transition::Ignored;
        };
        if item == cursor && content::is_original(reply) {
            self.advance(cursor, reply)
        } else {
            self.count_retry(cursor)
        }
    }

    /// Feed a reply to a local sync request.
    ///
    /// Only an original payload for the current cursor advances; anything
    /// else is ignored.
    pub fn on_local_sync_reply(&mut self, reply: &str) -> Transition {
        let SessionState::Fetching { cursor } = self.state else {
            return Transition::Ignored;
        };
        match content::parse_original(reply) {
            Some(item) if item == cursor => self.advance(cursor, reply),
            _ => Transition::Ignored,
        }
    }

    fn advance(&mut self, cursor: u32, payload: &str) -> Transition {
        let end = self.range.map_or(cursor, |(_, end)| end);
        let next = cursor.saturating_add(1);
        let done = cursor >= end;
        self.state = if done {
            SessionState::Done
        } else {
            SessionState::Fetching { cursor: next }
        };
        self.retries = 0;
        self.originals += 1;
        Transition::Advanced {
            item: cursor,
            payload: payload.to_string(),
            done,
        }
    }

    fn count_retry(&mut self, cursor: u32) -> Transition {
        self.retries += 1;
        if self.retries >= self.retry_threshold {
            self.retries = 0;
            Transition::SyncRequested { cursor }
        } else {
            Transition::Retry { retries: self.retries }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerfetch_core::content::{censored_content, original_content, range_content, INVALID_PEER};

    fn fetching(start: u32, end: u32) -> PeerSession {
        let mut session = PeerSession::new(10005, "B", 0, 3);
        session.on_metadata_reply(&range_content(start, end));
        session
    }

    #[test]
    fn test_metadata_assigns_range() {
        let mut session = PeerSession::new(10005, "B", 0, 3);
        assert_eq!(session.window(), Some((Phase::Metadata, 0..=0)));
        assert_eq!(
            session.on_metadata_reply("start=040 end=049"),
            Transition::RangeAssigned { start: 40, end: 49 }
        );
        assert_eq!(session.state(), SessionState::Fetching { cursor: 40 });
        assert_eq!(session.window(), Some((Phase::Content, 40..=49)));
    }

    #[test]
    fn test_invalid_peer_is_terminal() {
        let mut session = PeerSession::new(20001, "X", 0, 3);
        assert_eq!(session.on_metadata_reply(INVALID_PEER), Transition::Rejected);
        assert_eq!(session.state(), SessionState::Rejected);
        assert!(!session.is_valid());
        assert_eq!(session.window(), None);
        assert_eq!(session.on_metadata_reply("start=000 end=009"), Transition::Ignored);
        assert_eq!(session.on_content_reply(0, &original_content(0)), Transition::Ignored);
    }

    #[test]
    fn test_original_advances_cursor() {
        let mut session = fetching(40, 49);
        match session.on_content_reply(40, &original_content(40)) {
            Transition::Advanced { item, done, .. } => {
                assert_eq!(item, 40);
                assert!(!done);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(session.cursor(), Some(41));
    }

    #[test]
    fn test_non_original_counts_retry_without_moving() {
        let mut session = fetching(40, 49);
        assert_eq!(
            session.on_content_reply(40, &censored_content(40)),
            Transition::Retry { retries: 1 }
        );
        assert_eq!(
            session.on_content_reply(39, &original_content(39)),
            Transition::Retry { retries: 2 }
        );
        assert_eq!(
            session.on_content_reply(40, "garbage"),
            Transition::SyncRequested { cursor: 40 }
        );
        assert_eq!(session.retries(), 0);
        assert_eq!(session.cursor(), Some(40));
    }

    #[test]
    fn test_local_sync_reply_advances_only_for_cursor() {
        let mut session = fetching(0, 9);
        assert_eq!(session.on_local_sync_reply(&original_content(5)), Transition::Ignored);
        assert_eq!(session.on_local_sync_reply(""), Transition::Ignored);
        assert!(matches!(
            session.on_local_sync_reply(&original_content(0)),
            Transition::Advanced { item: 0, .. }
        ));
        assert_eq!(session.cursor(), Some(1));
    }

    #[test]
    fn test_full_range_ends_done() {
        let mut session = fetching(40, 49);
        for item in 40..=49 {
            let t = session.on_content_reply(item, &original_content(item));
            assert!(matches!(t, Transition::Advanced { done, .. } if done == (item == 49)));
        }
        assert_eq!(session.state(), SessionState::Done);
        assert_eq!(session.cursor(), Some(50));
        assert_eq!(session.originals(), 10);
        assert_eq!(session.window(), None);
        assert_eq!(session.on_content_reply(50, &original_content(50)), Transition::Ignored);
    }
}
