//! Run, item and file reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a whole run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every item was attempted.
    Completed,
    /// Fewer than two replicas activated; nothing was attempted.
    InsufficientReplicas { active: usize },
}

/// Activation result for one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    pub id: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report from one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub replicas: Vec<ReplicaStatus>,
    pub items: Vec<ItemReport>,
}

impl RunReport {
    /// Look up an item's report by name.
    pub fn item(&self, name: &str) -> Option<&ItemReport> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Number of native files stored (or planned, in dry-run) across items.
    pub fn write_count(&self) -> usize {
        self.items
            .iter()
            .flat_map(|item| &item.files)
            .map(|file| file.written.len())
            .sum()
    }

    /// Whether any item, file or write did not go through.
    pub fn has_problems(&self) -> bool {
        self.items.iter().any(|item| {
            !item.is_reconciled()
                || !item.read_failures.is_empty()
                || item.files.iter().any(|f| {
                    !f.failures.is_empty() || matches!(f.outcome, FileOutcome::Skipped { .. })
                })
        })
    }
}

/// Whether an item got past setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Reconciled,
    Skipped { reason: String },
}

/// A native file a transformer could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFailure {
    pub replica: String,
    pub filename: String,
    pub reason: String,
}

/// Report for one sync item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub name: String,
    pub status: ItemStatus,
    /// Replica ids in participation order.
    pub participants: Vec<String>,
    pub files: Vec<FileReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_failures: Vec<ReadFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_error: Option<String>,
}

impl ItemReport {
    pub(crate) fn reconciled(name: &str, participants: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            status: ItemStatus::Reconciled,
            participants,
            files: Vec::new(),
            read_failures: Vec::new(),
            after_error: None,
        }
    }

    pub(crate) fn skipped(name: &str, participants: Vec<String>, reason: impl ToString) -> Self {
        Self {
            status: ItemStatus::Skipped {
                reason: reason.to_string(),
            },
            ..Self::reconciled(name, participants)
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.status == ItemStatus::Reconciled
    }

    pub fn file(&self, filename: &str) -> Option<&FileReport> {
        self.files.iter().find(|file| file.filename == filename)
    }
}

/// What happened to one canonical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Every replica already held the winning version.
    InSync,
    /// Stale replicas were overwritten.
    Propagated,
    /// Dry run: stale replicas would have been overwritten.
    Planned,
    /// Some writes went through, some failed.
    Partial,
    /// Every write failed.
    Failed,
    /// The file was not resolved at all.
    Skipped { reason: String },
}

/// A write that did not reach its replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub replica: String,
    pub reason: String,
}

/// Report for one canonical file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub filename: String,
    pub outcome: FileOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// Winning timestamp after coalescing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// `sha256:<hex>` of the winning canonical body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Replicas written (or to be written, in dry-run).
    #[serde(default)]
    pub written: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<WriteFailure>,
}

impl FileReport {
    pub(crate) fn skipped(filename: &str, reason: impl ToString) -> Self {
        Self {
            filename: filename.to_string(),
            outcome: FileOutcome::Skipped {
                reason: reason.to_string(),
            },
            winner: None,
            timestamp: None,
            digest: None,
            written: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_report_serializes_status_tag() {
        let report = ItemReport::skipped("Transistor", vec!["a".into()], "Replica b is not ready");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"]["status"], "skipped");
        assert_eq!(json["status"]["reason"], "Replica b is not ready");
        assert!(json.get("after_error").is_none());
    }

    #[test]
    fn write_count_sums_across_items() {
        let mut item = ItemReport::reconciled("a", vec![]);
        let mut file = FileReport::skipped("f", "x");
        file.outcome = FileOutcome::Propagated;
        file.written = vec!["b".into(), "c".into()];
        item.files.push(file);

        let now = Utc::now();
        let report = RunReport {
            started_at: now,
            finished_at: now,
            outcome: RunOutcome::Completed,
            replicas: vec![],
            items: vec![item],
        };
        assert_eq!(report.write_count(), 2);
        assert!(!report.has_problems());
    }
}
