//! Content transformation boundary
//!
//! A [`Transformer`] converts between a replica's native files and the
//! canonical form used for comparison and propagation. Every method has an
//! identity default, so an implementation overrides only what its format
//! needs and inherits pass-through behaviour for the rest.

mod closure;
mod identity;

pub use closure::{AfterFn, CompareFn, FnTransformer, FnTransformerBuilder, ReadFn, WriteFn};
pub use identity::IdentityTransformer;

use std::collections::BTreeMap;

use crate::Result;
use crate::model::{CanonicalEntry, Metadata, NativeFile, Timestamp};

/// Winning canonical body per filename, handed to [`Transformer::after`].
pub type ResolvedBodies = BTreeMap<String, Vec<u8>>;

/// Result of reading one native file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOutput {
    /// Canonical entries in the order the transformer produced them. Empty
    /// drops the native file from this pass.
    pub entries: Vec<CanonicalEntry>,
    pub metadata: Metadata,
}

impl ReadOutput {
    /// No entries: the file does not take part in this pass.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(entry: CanonicalEntry) -> Self {
        Self {
            entries: vec![entry],
            metadata: Metadata::new(),
        }
    }

    pub fn many(entries: Vec<CanonicalEntry>) -> Self {
        Self {
            entries,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Per-item conversion between native and canonical representations.
///
/// `origin` and `destination` are replica ids, so the same logical file can
/// be decoded and encoded differently per backend.
pub trait Transformer: Send + Sync {
    /// Convert one native file into zero or more canonical entries.
    fn read(
        &self,
        filename: &str,
        timestamp: Timestamp,
        data: Vec<u8>,
        origin: &str,
    ) -> Result<ReadOutput> {
        identity::read(filename, timestamp, data, origin)
    }

    /// Semantic equality of two canonical bodies of `filename`.
    fn compare(&self, filename: &str, a: &[u8], b: &[u8]) -> Result<bool> {
        identity::compare(filename, a, b)
    }

    /// Convert a canonical body into the native file stored at `destination`.
    ///
    /// `metadata` carries whatever the reads of this pass recorded for
    /// information the canonical form drops.
    fn write(
        &self,
        filename: &str,
        data: &[u8],
        destination: &str,
        metadata: &Metadata,
    ) -> Result<NativeFile> {
        identity::write(filename, data, destination, metadata)
    }

    /// Side-effect hook run once per item after all files are resolved,
    /// whether or not anything was written. Errors are logged, never
    /// propagated.
    fn after(&self, resolved: &ResolvedBodies, replicas: &[String], metadata: &Metadata) -> Result<()> {
        identity::after(resolved, replicas, metadata)
    }
}
