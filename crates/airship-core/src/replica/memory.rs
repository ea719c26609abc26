//! In-memory replica
//!
//! Holds files in a shared map so that a clone kept by the caller observes
//! everything the reconciler does to the instance it owns. Supports failure
//! injection for exercising the reconciler's error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::Replica;
use crate::item::ReplicaTarget;
use crate::model::Timestamp;
use crate::{Error, Result};

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    pub timestamp: Timestamp,
    pub data: Vec<u8>,
}

/// How often each lifecycle call reached the replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub activations: usize,
    pub configures: usize,
    pub releases: usize,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, MemoryFile>,
    writes: Vec<String>,
    lifecycle: Lifecycle,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    fail_activation: bool,
    refuse_ready: HashSet<String>,
    refuse_all: bool,
    fail_store: bool,
    latency: Option<Duration>,
    slow_listing: HashMap<String, Duration>,
    slow_store: Option<Duration>,
}

/// Replica backed by a shared in-memory map.
///
/// Files are keyed `identifier[/folder]/name`, mirroring how a remote
/// backend scopes files by item.
#[derive(Debug, Clone)]
pub struct MemoryReplica {
    id: String,
    state: Arc<Mutex<State>>,
    faults: Faults,
    store_timestamp: Option<Timestamp>,
    prefix: Option<String>,
}

impl MemoryReplica {
    pub fn new(id: impl Into<String>) -> Self {
        Self::builder(id).build()
    }

    pub fn builder(id: impl Into<String>) -> MemoryReplicaBuilder {
        MemoryReplicaBuilder {
            replica: Self {
                id: id.into(),
                state: Arc::default(),
                faults: Faults::default(),
                store_timestamp: None,
                prefix: None,
            },
        }
    }

    /// Key under which `name` is stored for `target`.
    pub fn key(target: &ReplicaTarget, name: &str) -> String {
        format!("{}/{}", target_prefix(target), name)
    }

    /// Insert or replace a file, bypassing the replica lifecycle.
    pub fn put(&self, key: impl Into<String>, timestamp: impl Into<Timestamp>, data: impl Into<Vec<u8>>) {
        self.lock().files.insert(
            key.into(),
            MemoryFile {
                timestamp: timestamp.into(),
                data: data.into(),
            },
        );
    }

    /// The file stored under the full key, if any.
    pub fn file(&self, key: &str) -> Option<MemoryFile> {
        self.lock().files.get(key).cloned()
    }

    /// Snapshot of every stored file.
    pub fn files(&self) -> BTreeMap<String, MemoryFile> {
        self.lock().files.clone()
    }

    /// Full keys written through [`Replica::store`], in order.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configured_prefix(&self, operation: &str) -> Result<&str> {
        self.prefix
            .as_deref()
            .ok_or_else(|| Error::replica(&self.id, operation, "no target configured"))
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.faults.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn identifier_of(prefix: &str) -> &str {
    prefix.split('/').next().unwrap_or(prefix)
}

fn target_prefix(target: &ReplicaTarget) -> String {
    match &target.folder {
        Some(folder) => format!("{}/{}", target.identifier, folder),
        None => target.identifier.clone(),
    }
}

#[async_trait]
impl Replica for MemoryReplica {
    fn id(&self) -> &str {
        &self.id
    }

    async fn activate(&mut self) -> Result<()> {
        self.simulate_latency().await;
        self.lock().lifecycle.activations += 1;
        if self.faults.fail_activation {
            return Err(Error::activation(&self.id, "activation refused"));
        }
        Ok(())
    }

    fn configure_target(&mut self, target: &ReplicaTarget) {
        self.lock().lifecycle.configures += 1;
        self.prefix = Some(target_prefix(target));
    }

    async fn confirm_ready(&self) -> Result<()> {
        self.simulate_latency().await;
        let prefix = self.configured_prefix("confirm readiness")?;
        if self.faults.refuse_all || self.faults.refuse_ready.contains(identifier_of(prefix)) {
            return Err(Error::readiness(&self.id, format!("target {prefix} unavailable")));
        }
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        self.simulate_latency().await;
        let configured = self.configured_prefix("list files")?;
        if let Some(delay) = self.faults.slow_listing.get(identifier_of(configured)) {
            tokio::time::sleep(*delay).await;
        }
        let prefix = format!("{configured}/");
        let state = self.lock();
        Ok(state
            .files
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(str::to_string)
            .collect())
    }

    async fn stat_timestamp(&self, filename: &str) -> Result<Timestamp> {
        self.simulate_latency().await;
        let key = format!("{}/{}", self.configured_prefix("stat")?, filename);
        self.lock()
            .files
            .get(&key)
            .map(|file| file.timestamp)
            .ok_or_else(|| Error::replica(&self.id, "stat", format!("{key} not found")))
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>> {
        self.simulate_latency().await;
        let key = format!("{}/{}", self.configured_prefix("fetch")?, filename);
        self.lock()
            .files
            .get(&key)
            .map(|file| file.data.clone())
            .ok_or_else(|| Error::replica(&self.id, "fetch", format!("{key} not found")))
    }

    async fn store(&self, filename: &str, data: &[u8]) -> Result<()> {
        self.simulate_latency().await;
        let key = format!("{}/{}", self.configured_prefix("store")?, filename);
        if let Some(delay) = self.faults.slow_store {
            tokio::time::sleep(delay).await;
        }
        if self.faults.fail_store {
            return Err(Error::replica(&self.id, "store", format!("{key} is read-only")));
        }
        let timestamp = self
            .store_timestamp
            .unwrap_or_else(|| Timestamp::new(chrono::Utc::now().timestamp()));
        let mut state = self.lock();
        state.files.insert(
            key.clone(),
            MemoryFile {
                timestamp,
                data: data.to_vec(),
            },
        );
        state.writes.push(key);
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        self.lock().lifecycle.releases += 1;
        self.prefix = None;
        Ok(())
    }
}

/// Builder for [`MemoryReplica`].
#[derive(Debug)]
pub struct MemoryReplicaBuilder {
    replica: MemoryReplica,
}

impl MemoryReplicaBuilder {
    /// Seed a file for `identifier` (no folder).
    pub fn file(self, identifier: &str, name: &str, timestamp: i64, data: impl Into<Vec<u8>>) -> Self {
        self.replica
            .put(format!("{identifier}/{name}"), timestamp, data);
        self
    }

    /// Seed a file for `identifier` inside `folder`.
    pub fn file_in(
        self,
        identifier: &str,
        folder: &str,
        name: &str,
        timestamp: i64,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.replica
            .put(format!("{identifier}/{folder}/{name}"), timestamp, data);
        self
    }

    pub fn failing_activation(mut self) -> Self {
        self.replica.faults.fail_activation = true;
        self
    }

    /// Refuse readiness for items identified as `identifier`.
    pub fn refusing_ready_for(mut self, identifier: impl Into<String>) -> Self {
        self.replica.faults.refuse_ready.insert(identifier.into());
        self
    }

    pub fn refusing_ready(mut self) -> Self {
        self.replica.faults.refuse_all = true;
        self
    }

    pub fn failing_store(mut self) -> Self {
        self.replica.faults.fail_store = true;
        self
    }

    /// Delay every I/O call by `latency`.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.replica.faults.latency = Some(latency);
        self
    }

    /// Delay `list_files` for items identified as `identifier`. Other calls
    /// answer immediately, so activation still succeeds.
    pub fn slow_listing_for(mut self, identifier: impl Into<String>, latency: Duration) -> Self {
        self.replica.faults.slow_listing.insert(identifier.into(), latency);
        self
    }

    /// Delay only `store` calls by `latency`.
    pub fn slow_store(mut self, latency: Duration) -> Self {
        self.replica.faults.slow_store = Some(latency);
        self
    }

    /// Stamp stored files with a fixed time instead of the wall clock.
    pub fn store_timestamp(mut self, timestamp: i64) -> Self {
        self.replica.store_timestamp = Some(Timestamp::new(timestamp));
        self
    }

    pub fn build(self) -> MemoryReplica {
        self.replica
    }
}
