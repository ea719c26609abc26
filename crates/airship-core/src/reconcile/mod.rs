//! Reconciler: drives replicas through one reconciliation pass
//!
//! For each item, in declaration order:
//!
//! 1. configure every required replica and confirm it is ready,
//! 2. read every matching native file through the item's transformer into a
//!    [`VersionMatrix`] (replicas are read concurrently),
//! 3. resolve each canonical file with [`merge::resolve`] and write the winner
//!    to stale replicas,
//! 4. run the transformer's `after` hook,
//! 5. release every configured replica.
//!
//! Failures are scoped as narrowly as possible: a replica problem skips the
//! item, a transform problem skips the file, a failed store is reported for
//! that destination only.

mod activation;
mod report;

pub use report::{
    FileOutcome, FileReport, ItemReport, ItemStatus, ReadFailure, ReplicaStatus, RunOutcome,
    RunReport, WriteFailure,
};

use std::collections::HashSet;
use std::time::Duration;

use airship_fs::checksum::{content_digest, short_digest};
use chrono::Utc;
use futures::future::join_all;

use crate::item::SyncItem;
use crate::matrix::{FileVersions, VersionMatrix};
use crate::merge::{self, MergePlan, Resolution};
use crate::model::Metadata;
use crate::replica::Replica;
use crate::transform::{ReadOutput, ResolvedBodies};
use crate::{Error, Result};
use activation::{ReplicaSlot, timed};

/// Options for a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Upper bound for every individual replica call.
    pub io_timeout: Duration,
    /// Resolve everything but store nothing. Planned writes are reported.
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

/// Owns the replicas of a run and reconciles items across them.
pub struct Reconciler {
    slots: Vec<ReplicaSlot>,
    options: ReconcileOptions,
}

/// Everything one replica contributed to an item's read phase.
#[derive(Default)]
struct ReplicaRead {
    outputs: Vec<ReadOutput>,
    /// Native names whose read failed; never written this pass.
    unreadable: HashSet<String>,
    failures: Vec<ReadFailure>,
}

/// State shared by every file of one item during resolution.
struct ItemPass<'a> {
    item: &'a SyncItem,
    replicas: Vec<&'a dyn Replica>,
    ids: Vec<String>,
    unreadable: Vec<HashSet<String>>,
    metadata: Metadata,
}

impl Reconciler {
    /// Create a reconciler over `replicas`. Their order is the participation
    /// order used by every item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateReplica`] if two replicas share an id.
    pub fn new(replicas: Vec<Box<dyn Replica>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for replica in &replicas {
            if !seen.insert(replica.id().to_string()) {
                return Err(Error::DuplicateReplica(replica.id().to_string()));
            }
        }

        Ok(Self {
            slots: replicas.into_iter().map(ReplicaSlot::new).collect(),
            options: ReconcileOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Activate every replica that has not been activated yet.
    ///
    /// Each replica is activated at most once per reconciler; a failure
    /// excludes it from every later item. Returns the number of active
    /// replicas.
    pub async fn activate(&mut self) -> usize {
        let timeout = self.options.io_timeout;
        let mut active = 0;
        for slot in &mut self.slots {
            if slot.ensure_activated(timeout).await {
                active += 1;
            }
        }
        active
    }

    /// Activation status of every replica, in participation order.
    pub fn replica_statuses(&self) -> Vec<ReplicaStatus> {
        self.slots.iter().map(ReplicaSlot::status).collect()
    }

    /// Reconcile `items` in order.
    ///
    /// Never fails: every problem is recorded in the returned report. With
    /// fewer than two active replicas no item is attempted.
    pub async fn run(&mut self, items: &[SyncItem]) -> RunReport {
        let started_at = Utc::now();
        let active = self.activate().await;

        if active < 2 {
            tracing::info!(active, "Can't reconcile anything with fewer than two active replicas");
            return RunReport {
                started_at,
                finished_at: Utc::now(),
                outcome: RunOutcome::InsufficientReplicas { active },
                replicas: self.replica_statuses(),
                items: Vec::new(),
            };
        }

        let mut reports = Vec::with_capacity(items.len());
        for item in items {
            reports.push(self.reconcile_item(item).await);
        }

        RunReport {
            started_at,
            finished_at: Utc::now(),
            outcome: RunOutcome::Completed,
            replicas: self.replica_statuses(),
            items: reports,
        }
    }

    /// Reconcile a single item. Replicas must have been activated with
    /// [`activate`](Self::activate) or by a previous [`run`](Self::run).
    pub async fn reconcile_item(&mut self, item: &SyncItem) -> ItemReport {
        tracing::info!(item = %item.name(), "Reconciling item");

        let participants = match self.participants(item) {
            Ok(participants) => participants,
            Err(e) => {
                tracing::info!(item = %item.name(), error = %e, "Not syncing this item");
                return ItemReport::skipped(item.name(), Vec::new(), e);
            }
        };
        let ids: Vec<String> = participants
            .iter()
            .map(|&i| self.slots[i].id().to_string())
            .collect();

        let (configured, refusal) = self.configure(item, &participants).await;
        let report = match refusal {
            Some(e) => {
                tracing::info!(item = %item.name(), error = %e, "Not syncing this item");
                ItemReport::skipped(item.name(), ids, e)
            }
            None => self.reconcile_configured(item, &configured).await,
        };

        tracing::info!(item = %item.name(), "Completed item; releasing replicas");
        self.release(&configured).await;
        report
    }

    /// Slot indices the item needs, in participation order.
    fn participants(&self, item: &SyncItem) -> Result<Vec<usize>> {
        for required in item.required_replicas() {
            let slot = self
                .slots
                .iter()
                .find(|slot| slot.id() == required)
                .ok_or_else(|| Error::UnknownReplica(required.to_string()))?;
            if !slot.is_active() {
                return Err(Error::readiness(required, "replica is not active in this run"));
            }
        }

        Ok(self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| item.requires(slot.id()))
            .map(|(i, _)| i)
            .collect())
    }

    /// Configure and health-check each participant. Stops at the first
    /// refusal. Returns every slot that was configured, including the one that
    /// refused, so that all of them get released.
    async fn configure(&mut self, item: &SyncItem, participants: &[usize]) -> (Vec<usize>, Option<Error>) {
        let timeout = self.options.io_timeout;
        let mut configured = Vec::with_capacity(participants.len());

        for &index in participants {
            let slot = &mut self.slots[index];
            let id = slot.id().to_string();
            let Some(target) = item.target_for(&id) else {
                continue;
            };

            slot.replica.configure_target(&target);
            configured.push(index);

            match timed(timeout, &id, "confirm readiness", slot.replica.confirm_ready()).await {
                Ok(()) => tracing::debug!(item = %item.name(), replica = %id, "Replica ready"),
                Err(e) => return (configured, Some(e)),
            }
        }

        (configured, None)
    }

    async fn release(&mut self, configured: &[usize]) {
        let timeout = self.options.io_timeout;
        for &index in configured {
            let slot = &mut self.slots[index];
            let id = slot.id().to_string();
            if let Err(e) = timed(timeout, &id, "release", slot.replica.release()).await {
                tracing::warn!(replica = %id, error = %e, "Replica release failed");
            }
        }
    }

    async fn reconcile_configured(&self, item: &SyncItem, configured: &[usize]) -> ItemReport {
        let timeout = self.options.io_timeout;
        let replicas: Vec<&dyn Replica> = configured
            .iter()
            .map(|&i| self.slots[i].replica.as_ref())
            .collect();
        let ids: Vec<String> = replicas.iter().map(|r| r.id().to_string()).collect();

        // Every replica must finish reading before any file is resolved
        let reads = join_all(
            replicas
                .iter()
                .map(|replica| read_replica(*replica, item, timeout)),
        )
        .await;

        let mut report = ItemReport::reconciled(item.name(), ids.clone());
        let mut matrix = VersionMatrix::new(ids.clone());
        let mut metadata = Metadata::new();
        let mut unreadable = Vec::with_capacity(reads.len());

        for (slot, read) in reads.into_iter().enumerate() {
            let read = match read {
                Ok(read) => read,
                Err(e) => {
                    tracing::info!(item = %item.name(), error = %e, "Not syncing this item");
                    return ItemReport::skipped(item.name(), ids, e);
                }
            };
            for output in read.outputs {
                metadata.extend(output.metadata);
                for entry in output.entries {
                    let filename = entry.filename.clone();
                    if matrix.insert(slot, entry).is_some() {
                        tracing::warn!(
                            item = %item.name(),
                            replica = %ids[slot],
                            file = %filename,
                            "Several native files map to one canonical file; keeping the last"
                        );
                    }
                }
            }
            unreadable.push(read.unreadable);
            report.read_failures.extend(read.failures);
        }

        tracing::info!(item = %item.name(), files = matrix.len(), "Syncing item");

        let pass = ItemPass {
            item,
            replicas,
            ids,
            unreadable,
            metadata,
        };

        let mut resolved = ResolvedBodies::new();
        for (filename, mut versions) in matrix.into_files() {
            let (file_report, body) = self.resolve_file(&pass, &filename, &mut versions).await;
            if let Some(body) = body {
                resolved.insert(filename, body);
            }
            report.files.push(file_report);
        }

        if let Err(e) = item.transformer().after(&resolved, &pass.ids, &pass.metadata) {
            tracing::warn!(item = %item.name(), error = %e, "After hook failed");
            report.after_error = Some(e.to_string());
        }

        report
    }

    /// Resolve one canonical file and propagate its winner. Returns the
    /// report and, when resolved, the winning body.
    async fn resolve_file(
        &self,
        pass: &ItemPass<'_>,
        filename: &str,
        versions: &mut FileVersions,
    ) -> (FileReport, Option<Vec<u8>>) {
        let transformer = pass.item.transformer();
        let resolution = merge::resolve(versions, |a, b| transformer.compare(filename, a, b));

        let plan = match resolution {
            Ok(Resolution::Resolved(plan)) => plan,
            Ok(Resolution::InvalidTimestamp { slot }) => {
                let e = Error::InvalidTimestamp {
                    filename: filename.to_string(),
                    replica: pass.ids[slot].clone(),
                };
                tracing::info!(item = %pass.item.name(), error = %e, "Not syncing this file");
                return (FileReport::skipped(filename, e), None);
            }
            Ok(Resolution::Empty) => {
                return (FileReport::skipped(filename, "no replica holds this file"), None);
            }
            Err(e) => {
                tracing::warn!(item = %pass.item.name(), file = %filename, error = %e, "Compare failed; not syncing this file");
                return (FileReport::skipped(filename, e), None);
            }
        };

        let Some(body) = versions.get(plan.winner).map(|v| v.data.clone()) else {
            return (FileReport::skipped(filename, "winning version vanished"), None);
        };
        let digest = content_digest(&body);
        tracing::debug!(
            item = %pass.item.name(),
            file = %filename,
            winner = %pass.ids[plan.winner],
            timestamp = %plan.timestamp,
            coalesced = plan.coalesced,
            digest = %short_digest(&digest),
            "Resolved file"
        );

        let mut report = FileReport {
            filename: filename.to_string(),
            outcome: FileOutcome::InSync,
            winner: Some(pass.ids[plan.winner].clone()),
            timestamp: Some(plan.timestamp.seconds()),
            digest: Some(digest),
            written: Vec::new(),
            failures: Vec::new(),
        };

        if !plan.stale.is_empty() {
            self.propagate(pass, filename, &body, &plan, &mut report).await;
        }

        (report, Some(body))
    }

    async fn propagate(
        &self,
        pass: &ItemPass<'_>,
        filename: &str,
        body: &[u8],
        plan: &MergePlan,
        report: &mut FileReport,
    ) {
        let transformer = pass.item.transformer();
        let mut writes = Vec::with_capacity(plan.stale.len());

        for &slot in &plan.stale {
            let destination = &pass.ids[slot];
            match transformer.write(filename, body, destination, &pass.metadata) {
                Ok(native) if pass.unreadable[slot].contains(&native.filename) => {
                    report.failures.push(WriteFailure {
                        replica: destination.clone(),
                        reason: format!("{} could not be read this pass; refusing to overwrite it", native.filename),
                    });
                }
                Ok(native) => writes.push((slot, native)),
                Err(e) => {
                    tracing::warn!(file = %filename, replica = %destination, error = %e, "Write transform failed");
                    report.failures.push(WriteFailure {
                        replica: destination.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if self.options.dry_run {
            for (slot, native) in &writes {
                tracing::info!(replica = %pass.ids[*slot], file = %native.filename, "[dry-run] Would write");
                report.written.push(pass.ids[*slot].clone());
            }
            report.outcome = if writes.is_empty() {
                FileOutcome::Failed
            } else {
                FileOutcome::Planned
            };
            return;
        }

        let timeout = self.options.io_timeout;
        let stores = writes.iter().map(|(slot, native)| {
            let replica = pass.replicas[*slot];
            timed(timeout, &pass.ids[*slot], "store", replica.store(&native.filename, &native.data))
        });
        let results = join_all(stores).await;

        for ((slot, native), result) in writes.iter().zip(results) {
            let destination = &pass.ids[*slot];
            match result {
                Ok(()) => {
                    tracing::info!(replica = %destination, file = %native.filename, "Wrote winning version");
                    report.written.push(destination.clone());
                }
                Err(e) => {
                    tracing::warn!(replica = %destination, file = %native.filename, error = %e, "Store failed");
                    let reason = match e {
                        Error::Timeout { .. } => format!("{e}; the write may still complete"),
                        e => e.to_string(),
                    };
                    report.failures.push(WriteFailure {
                        replica: destination.clone(),
                        reason,
                    });
                }
            }
        }

        report.outcome = match (report.written.is_empty(), report.failures.is_empty()) {
            (_, true) => FileOutcome::Propagated,
            (true, false) => FileOutcome::Failed,
            (false, false) => FileOutcome::Partial,
        };
    }
}

/// Read phase for one replica: enumerate, filter, stat, fetch, transform.
async fn read_replica(replica: &dyn Replica, item: &SyncItem, timeout: Duration) -> Result<ReplicaRead> {
    let id = replica.id();
    let names = timed(timeout, id, "list files", replica.list_files()).await?;
    let matching: Vec<String> = names.into_iter().filter(|name| item.matches(name)).collect();

    if matching.is_empty() {
        return Err(Error::EnumerationGap {
            replica: id.to_string(),
            item: item.name().to_string(),
        });
    }

    let mut read = ReplicaRead::default();
    for name in &matching {
        let timestamp = timed(timeout, id, "stat", replica.stat_timestamp(name)).await?;
        let data = timed(timeout, id, "fetch", replica.fetch(name)).await?;

        match item.transformer().read(name, timestamp, data, id) {
            Ok(output) => {
                if output.entries.is_empty() {
                    tracing::debug!(replica = %id, file = %name, "Transformer dropped file from this pass");
                }
                read.outputs.push(output);
            }
            Err(e) => {
                tracing::warn!(replica = %id, file = %name, error = %e, "Read transform failed");
                read.unreadable.insert(name.clone());
                read.failures.push(ReadFailure {
                    replica: id.to_string(),
                    filename: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(read)
}
