//! Hierarchical names.
//!
//! A [`Name`] is an ordered list of opaque components. Requests are
//! addressed by name and replies echo the request name, so name equality
//! and prefix matching are the only routing primitives the protocol needs.
//!
//! URI form: `/prefix/file/B/003`. A sequence-number component is written
//! `seq=<n>`; bytes outside the unreserved ASCII set are percent-encoded.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// URI marker for a sequence-number component.
const SEQUENCE_MARKER: &str = "seq=";

/// One name component.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Opaque bytes.
    Generic(Bytes),
    /// Typed sequence number.
    Sequence(u64),
}

impl Component {
    /// Build a generic component from a string segment.
    pub fn from_str_segment(segment: &str) -> Self {
        Component::Generic(Bytes::copy_from_slice(segment.as_bytes()))
    }

    /// The sequence number, if this is a sequence component.
    pub fn as_sequence(&self) -> Option<u64> {
        match self {
            Component::Sequence(n) => Some(*n),
            Component::Generic(_) => None,
        }
    }

    /// The component bytes as UTF-8 text, if generic and valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Component::Generic(bytes) => std::str::from_utf8(bytes).ok(),
            Component::Sequence(_) => None,
        }
    }

    fn parse(segment: &str) -> Result<Self> {
        if let Some(digits) = segment.strip_prefix(SEQUENCE_MARKER) {
            let n = digits
                .parse::<u64>()
                .map_err(|_| CoreError::InvalidName(format!("bad sequence component {segment:?}")))?;
            return Ok(Component::Sequence(n));
        }
        Ok(Component::Generic(Bytes::from(percent_decode(segment)?)))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Sequence(n) => write!(f, "{SEQUENCE_MARKER}{n}"),
            Component::Generic(bytes) => {
                for &b in bytes.iter() {
                    if is_unreserved(b) {
                        write!(f, "{}", b as char)?;
                    } else {
                        write!(f, "%{b:02X}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'!')
}

fn percent_decode(segment: &str) -> Result<Vec<u8>> {
    let raw = segment.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = segment
                .get(i + 1..i + 3)
                .ok_or_else(|| CoreError::InvalidName(format!("truncated escape in {segment:?}")))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| CoreError::InvalidName(format!("bad escape in {segment:?}")))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// An immutable hierarchical name.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name(Vec<Component>);

impl Name {
    /// The root name `/`.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build from components.
    pub fn from_components(components: Vec<Component>) -> Self {
        Self(components)
    }

    /// Parse a URI such as `/prefix/metadata/B/seq=0`.
    pub fn parse(uri: &str) -> Result<Self> {
        if !uri.starts_with('/') {
            return Err(CoreError::InvalidName(format!("{uri:?} must start with '/'")));
        }
        uri.split('/')
            .filter(|segment| !segment.is_empty())
            .map(Component::parse)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Component at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<&Component> {
        let idx = if index < 0 {
            self.0.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.0.get(idx)
    }

    /// All components.
    pub fn components(&self) -> &[Component] {
        &self.0
    }

    /// A new name with `segment` appended as a generic component.
    pub fn append(&self, segment: &str) -> Self {
        self.append_component(Component::from_str_segment(segment))
    }

    /// A new name with `component` appended.
    pub fn append_component(&self, component: Component) -> Self {
        let mut components = self.0.clone();
        components.push(component);
        Self(components)
    }

    /// A new name with every component of `other` appended.
    pub fn append_name(&self, other: &Name) -> Self {
        let mut components = self.0.clone();
        components.extend(other.0.iter().cloned());
        Self(components)
    }

    /// A new name with a sequence-number component appended.
    pub fn append_sequence(&self, seq: u64) -> Self {
        self.append_component(Component::Sequence(seq))
    }

    /// Up to `len` components starting at `start`.
    pub fn sub_name(&self, start: usize, len: usize) -> Self {
        let start = start.min(self.0.len());
        let end = start.saturating_add(len).min(self.0.len());
        Self(self.0[start..end].to_vec())
    }

    /// Everything after the first `count` components.
    pub fn skip(&self, count: usize) -> Self {
        self.sub_name(count, usize::MAX)
    }

    /// True if `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    /// The trailing sequence number.
    pub fn last_sequence(&self) -> Result<u64> {
        let index = self.0.len().checked_sub(1).ok_or(CoreError::NotASequence { index: 0 })?;
        self.0[index]
            .as_sequence()
            .ok_or(CoreError::NotASequence { index })
    }

    /// Render as a URI string.
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for component in &self.0 {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Name::parse(s)
    }
}

impl TryFrom<&str> for Name {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self> {
        Name::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let name = Name::parse("/prefix/metadata/B/seq=7").unwrap();
        assert_eq!(name.len(), 4);
        assert_eq!(name.get(-1), Some(&Component::Sequence(7)));
        assert_eq!(name.to_uri(), "/prefix/metadata/B/seq=7");
    }

    #[test]
    fn test_root() {
        let root = Name::parse("/").unwrap();
        assert!(root.is_empty());
        assert_eq!(root.to_uri(), "/");
        assert!(root.is_prefix_of(&Name::parse("/a").unwrap()));
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(Name::parse("prefix"), Err(CoreError::InvalidName(_))));
    }

    #[test]
    fn test_percent_encoding() {
        let name = Name::root().append("a b");
        assert_eq!(name.to_uri(), "/a%20b");
        assert_eq!(Name::parse("/a%20b").unwrap(), name);
        assert!(Name::parse("/a%2").is_err());
    }

    #[test]
    fn test_prefix_matching() {
        let prefix = Name::parse("/prefix/file").unwrap();
        let full = Name::parse("/prefix/file/B/003").unwrap();
        assert!(prefix.is_prefix_of(&full));
        assert!(!full.is_prefix_of(&prefix));
        assert!(full.is_prefix_of(&full));
        assert!(!Name::parse("/prefix/peer").unwrap().is_prefix_of(&full));
    }

    #[test]
    fn test_sub_name_and_skip() {
        let name = Name::parse("/cnn/prefix/peer/B/003").unwrap();
        assert_eq!(name.sub_name(0, 1).to_uri(), "/cnn");
        assert_eq!(name.skip(1).to_uri(), "/prefix/peer/B/003");
        assert_eq!(name.sub_name(3, 10).to_uri(), "/B/003");
        assert!(name.sub_name(9, 2).is_empty());
    }

    #[test]
    fn test_last_sequence() {
        assert_eq!(Name::parse("/x/seq=42").unwrap().last_sequence(), Ok(42));
        assert_eq!(
            Name::parse("/x/042").unwrap().last_sequence(),
            Err(CoreError::NotASequence { index: 1 })
        );
        assert!(Name::root().last_sequence().is_err());
    }

    #[test]
    fn test_append_is_non_destructive() {
        let base = Name::parse("/prefix").unwrap();
        let longer = base.append("file").append_sequence(3);
        assert_eq!(base.len(), 1);
        assert_eq!(longer.to_uri(), "/prefix/file/seq=3");
    }
}
