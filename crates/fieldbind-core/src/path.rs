#![forbid(unsafe_code)]

//! Field paths.
//!
//! A [`FieldPath`] names one slot in a store. Paths are hierarchical and use
//! `.` as the segment delimiter: `"address.country"` lives under `"address"`.
//!
//! # Invariants
//!
//! 1. A path is never empty or whitespace-only.
//! 2. No segment is empty or whitespace-only, so every proper prefix of a path
//!    is itself a valid path.
//! 3. The raw text is kept exactly as given (no trimming, no normalization),
//!    so two bindings address the same slot iff their strings are equal.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Segment delimiter for hierarchical paths.
pub const DELIMITER: char = '.';

/// Validated address of one slot in a field store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    /// Validate `raw` as a field path.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::EmptyPath`] if `raw` is empty or whitespace-only,
    /// [`ConfigurationError::EmptySegment`] if a segment is (`"a..b"`, `".a"`).
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConfigurationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ConfigurationError::EmptyPath { raw });
        }
        if raw.split(DELIMITER).any(|segment| segment.trim().is_empty()) {
            return Err(ConfigurationError::EmptySegment { raw });
        }
        Ok(Self { raw })
    }

    /// The path text as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterate the `.`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split(DELIMITER)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The last segment (`"country"` for `"address.country"`).
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.raw
            .rsplit_once(DELIMITER)
            .map_or(self.raw.as_str(), |(_, leaf)| leaf)
    }

    /// The enclosing path, or `None` for a top-level path.
    #[must_use]
    pub fn parent(&self) -> Option<FieldPath> {
        let (parent, _) = self.raw.rsplit_once(DELIMITER)?;
        FieldPath::parse(parent).ok()
    }

    /// Append `child` below this path.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse) applied to `child`.
    pub fn join(&self, child: &str) -> Result<FieldPath, ConfigurationError> {
        let child = FieldPath::parse(child)?;
        Ok(Self {
            raw: format!("{}{DELIMITER}{}", self.raw, child.raw),
        })
    }

    /// Whether `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &FieldPath) -> bool {
        other
            .raw
            .strip_prefix(self.raw.as_str())
            .is_some_and(|rest| rest.starts_with(DELIMITER))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl FromStr for FieldPath {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = ConfigurationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plain_and_nested() {
        assert_eq!(FieldPath::parse("name").unwrap().as_str(), "name");
        assert_eq!(
            FieldPath::parse("address.country").unwrap().as_str(),
            "address.country"
        );
    }

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        for raw in ["", " ", "\t", " \n "] {
            let err = FieldPath::parse(raw).unwrap_err();
            assert_eq!(
                err,
                ConfigurationError::EmptyPath {
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn parse_rejects_empty_segments() {
        for raw in [".a", "a.", "a..b", "a. .b", "."] {
            let err = FieldPath::parse(raw).unwrap_err();
            assert_eq!(
                err,
                ConfigurationError::EmptySegment {
                    raw: raw.to_string()
                },
                "{raw:?}"
            );
        }
        let base = FieldPath::parse("address").unwrap();
        assert!(base.join("city.").is_err());
    }

    #[test]
    fn parse_keeps_surrounding_whitespace() {
        let path = FieldPath::parse(" name ").unwrap();
        assert_eq!(path.as_str(), " name ");
        assert_ne!(path, FieldPath::parse("name").unwrap());
    }

    #[test]
    fn segments_and_leaf() {
        let path = FieldPath::parse("address.city.zip").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), ["address", "city", "zip"]);
        assert_eq!(path.depth(), 3);
        assert_eq!(path.leaf(), "zip");
        assert_eq!(FieldPath::parse("name").unwrap().leaf(), "name");
    }

    #[test]
    fn parent_walks_up() {
        let path = FieldPath::parse("address.city").unwrap();
        assert_eq!(path.parent().unwrap().as_str(), "address");
        assert!(path.parent().unwrap().parent().is_none());
    }

    #[test]
    fn join_appends_child() {
        let base = FieldPath::parse("address").unwrap();
        assert_eq!(base.join("country").unwrap().as_str(), "address.country");
        assert!(base.join("  ").is_err());
    }

    #[test]
    fn ancestor_requires_segment_boundary() {
        let address = FieldPath::parse("address").unwrap();
        let city = FieldPath::parse("address.city").unwrap();
        let addresses = FieldPath::parse("addresses.0").unwrap();
        assert!(address.is_ancestor_of(&city));
        assert!(!address.is_ancestor_of(&addresses));
        assert!(!address.is_ancestor_of(&address));
        assert!(!city.is_ancestor_of(&address));
    }

    #[test]
    fn from_str_and_try_from() {
        let a: FieldPath = "email".parse().unwrap();
        let b = FieldPath::try_from("email").unwrap();
        let c = FieldPath::try_from(String::from("email")).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_string(), "email");
    }
}
