use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a person record owned by an `IdentityResolver`.
///
/// Handles are arena indices: two handles are the same person exactly when
/// they compare equal. A handle stays valid for the lifetime of the resolver
/// that issued it, even after the person has been merged away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub(crate) usize);

impl PersonId {
    /// Position of the person in its resolver's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "person#{}", self.0)
    }
}

/// Externally durable person identifier such as `PID:000123`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(String);

impl StableId {
    /// Formats sequence number `sequence` as `<prefix><zero-padded digits>`.
    pub fn format(prefix: &str, width: usize, sequence: u64) -> Self {
        StableId(format!("{prefix}{sequence:0width$}"))
    }

    /// Parses `raw`, returning `None` unless it is `prefix` followed by one or
    /// more ASCII digits.
    pub fn parse(raw: &str, prefix: &str) -> Option<Self> {
        let digits = raw.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(StableId(raw.to_string()))
    }

    /// Numeric suffix of this ID, or `None` if it does not carry `prefix`.
    pub fn sequence(&self, prefix: &str) -> Option<u64> {
        self.0.strip_prefix(prefix)?.parse().ok()
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StableId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single `(type, value)` identifier, e.g. `email -> j.doe@example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Identifier {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.kind, self.value)
    }
}

/// Per-type identifier values of one person, keyed by identifier type.
pub type IdentifierRecord = BTreeMap<String, Vec<String>>;

/// On-disk shape of an identity file: stable ID -> identifier type -> values.
///
/// `BTreeMap` keys give the stable ordering needed for reproducible output;
/// value lists keep their insertion order.
pub type IdentityRecord = BTreeMap<String, IdentifierRecord>;

/// Aggregate counts describing a resolver's partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSummary {
    /// Persons that can still receive identifiers.
    pub active_persons: usize,
    /// Merged-away published persons kept only for their redirect.
    pub tombstones: usize,
    /// Identifier values currently owned by an active person.
    pub identifiers: usize,
    /// Sequence number the next assigned stable ID will use.
    pub next_sequence: u64,
}
