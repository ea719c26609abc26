//! Values that flow between replicas, transformers and the merge algorithm

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A backend-reported modification time in seconds.
///
/// `Timestamp::INVALID` is the reserved "unknown, do not sync" value. A file
/// that is missing from a replica is not a timestamp at all; it is an empty
/// slot in the [`VersionMatrix`](crate::VersionMatrix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const INVALID: Timestamp = Timestamp(0);

    pub const fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    pub const fn seconds(self) -> i64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl From<i64> for Timestamp {
    fn from(seconds: i64) -> Self {
        Self(seconds)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// One canonical file produced by a transformer's `read`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub filename: String,
    pub timestamp: Timestamp,
    pub data: Vec<u8>,
}

impl CanonicalEntry {
    pub fn new(filename: impl Into<String>, timestamp: Timestamp, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            timestamp,
            data: data.into(),
        }
    }
}

/// A file in a replica's native representation, produced by a transformer's
/// `write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFile {
    pub filename: String,
    pub data: Vec<u8>,
}

impl NativeFile {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Side-channel values captured while reading and consumed while writing.
///
/// Scoped to one item's pass. Values written later replace earlier ones under
/// the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    values: HashMap<String, Vec<u8>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// The value under `key` if present and valid UTF-8.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.values.insert(key.into(), value.into())
    }

    /// Merge `other` into `self`; values in `other` win on collision.
    pub fn extend(&mut self, other: Metadata) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
