use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FailureReason;

pub const REPORT_VERSION: &str = "1.0.0";

/// What kind of filesystem object a candidate is, from a non-dereferencing
/// stat. A symlink is always reported as a symlink, never as its target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// One filesystem object considered for deletion. Created during a scan,
/// immutable afterward, consumed exactly once by the deletion transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Byte size from non-dereferencing status. 0 for symlinks; for a
    /// directory, the sum of its eligible descendant sizes.
    pub size_bytes: u64,
    /// False when the path guard blocked the entry or the entry is a
    /// symlink the walk refused to follow.
    pub eligible: bool,
}

/// Result of scanning one root. Owned by the caller once returned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanResult {
    pub root: PathBuf,
    pub candidates: Vec<CandidateEntry>,
    /// Sum of the sizes of eligible candidates.
    pub total_bytes: u64,
    /// Entries recorded but withheld from deletion (protected or symlink).
    pub skipped: u64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_bytes: u64,
    pub human_readable: String,
    pub eligible_entries: u64,
    pub skipped_entries: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    DryRun,
    Apply,
}

/// Terminal state of a single candidate. No transitions out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Deleted,
    SkippedDryRun,
    SkippedProtected,
    SkippedIneligible,
    Failed(FailureReason),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryOutcome {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub outcome: OutcomeKind,
}

/// Aggregate of one transaction run. Bytes freed is the sum of the
/// pre-deletion snapshot sizes of entries that were actually deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeletionReport {
    pub outcomes: Vec<EntryOutcome>,
    pub bytes_freed: u64,
    pub deleted: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeTier {
    User,
    Elevated,
}

/// Structured record of one CLI run, serialized with `--output`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub report_version: String,
    pub generated_at: String,
    pub run_id: String,
    pub categories: Vec<CategoryReport>,
    pub total_reclaimable_bytes: u64,
    pub total_bytes_freed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryReport {
    pub category: String,
    pub label: String,
    pub scans: Vec<ScanResult>,
    pub reclaimable_bytes: u64,
    pub missing_roots: Vec<String>,
    pub outcome: Option<DeletionReport>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            report_version: REPORT_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            run_id: Uuid::new_v4().to_string(),
            categories: Vec::new(),
            total_reclaimable_bytes: 0,
            total_bytes_freed: 0,
        }
    }

    pub fn push(&mut self, category: CategoryReport) {
        self.total_reclaimable_bytes = self
            .total_reclaimable_bytes
            .saturating_add(category.reclaimable_bytes);
        if let Some(outcome) = &category.outcome {
            self.total_bytes_freed = self.total_bytes_freed.saturating_add(outcome.bytes_freed);
        }
        self.categories.push(category);
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryReport, DeletionReport, Report, REPORT_VERSION};

    #[test]
    fn report_accumulates_category_totals() {
        let mut report = Report::new();
        assert_eq!(report.report_version, REPORT_VERSION);

        report.push(CategoryReport {
            category: "logs".to_string(),
            label: "Logs".to_string(),
            scans: Vec::new(),
            reclaimable_bytes: 300,
            missing_roots: Vec::new(),
            outcome: Some(DeletionReport {
                bytes_freed: 100,
                deleted: 1,
                ..DeletionReport::default()
            }),
        });
        report.push(CategoryReport {
            category: "caches".to_string(),
            label: "Caches".to_string(),
            scans: Vec::new(),
            reclaimable_bytes: 50,
            missing_roots: Vec::new(),
            outcome: None,
        });

        assert_eq!(report.total_reclaimable_bytes, 350);
        assert_eq!(report.total_bytes_freed, 100);
        assert_eq!(report.categories.len(), 2);
    }
}
