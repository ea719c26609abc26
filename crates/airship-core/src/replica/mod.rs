//! Replica abstraction
//!
//! A replica is one storage backend holding a possibly stale copy of each
//! item's files. The reconciler owns every replica for the whole run and
//! rebinds it to one item at a time through [`Replica::configure_target`].

mod directory;
mod memory;

pub use directory::DirectoryReplica;
pub use memory::{Lifecycle, MemoryFile, MemoryReplica, MemoryReplicaBuilder};

use async_trait::async_trait;

use crate::Result;
use crate::item::ReplicaTarget;
use crate::model::Timestamp;

/// Capability set the reconciler needs from a storage backend.
///
/// Lifecycle per run: `activate` once; then for each item that requires the
/// replica `configure_target`, `confirm_ready`, any number of
/// `list_files`/`stat_timestamp`/`fetch`/`store` calls, and finally
/// `release`. `release` is always called after `configure_target`, even when
/// `confirm_ready` failed.
#[async_trait]
pub trait Replica: Send + Sync {
    /// Stable identity. Items name replicas by it and transformers receive it
    /// as origin or destination.
    fn id(&self) -> &str;

    /// One-time setup for the run (sessions, credentials, roots).
    async fn activate(&mut self) -> Result<()>;

    /// Bind the replica to one item. Called again for every item.
    fn configure_target(&mut self, target: &ReplicaTarget);

    /// Check the configured target is reachable.
    async fn confirm_ready(&self) -> Result<()>;

    /// Native filenames under the configured target, `/`-separated.
    async fn list_files(&self) -> Result<Vec<String>>;

    /// Modification time of `filename`, [`Timestamp::INVALID`] when unknown.
    async fn stat_timestamp(&self, filename: &str) -> Result<Timestamp>;

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>>;

    /// Write `data` as `filename` under the configured target.
    ///
    /// The reconciler drops this future when the I/O timeout expires.
    /// Backends that hand the write to another thread (see
    /// [`DirectoryReplica`]) cannot be stopped that way, so a write reported
    /// as timed out may still land afterwards.
    async fn store(&self, filename: &str, data: &[u8]) -> Result<()>;

    /// Undo `configure_target`. Must be safe after a failed `confirm_ready`.
    async fn release(&mut self) -> Result<()>;
}
