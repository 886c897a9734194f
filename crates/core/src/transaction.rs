use tracing::{info, warn};

use crate::elevate::ElevationRouter;
use crate::guard::PathGuard;
use crate::model::{
    CandidateEntry, DeletionReport, EntryKind, EntryOutcome, ExecutionMode, OutcomeKind,
};

/// Executes (or simulates) removal of a candidate set. Each candidate is
/// processed independently; one failure never aborts the batch. The guard
/// is consulted again here for every entry rather than trusting the scan's
/// earlier judgment, so a stale or hand-built candidate set can never
/// reach a protected path.
pub struct DeletionTransaction<'a> {
    guard: &'a PathGuard,
    router: &'a ElevationRouter,
}

impl<'a> DeletionTransaction<'a> {
    pub fn new(guard: &'a PathGuard, router: &'a ElevationRouter) -> Self {
        Self { guard, router }
    }

    pub fn execute(&self, candidates: &[CandidateEntry], mode: ExecutionMode) -> DeletionReport {
        let mut report = DeletionReport::default();

        for candidate in candidates {
            let outcome = self.settle(candidate, mode);
            match &outcome {
                OutcomeKind::Deleted => {
                    report.deleted += 1;
                    report.bytes_freed = report.bytes_freed.saturating_add(candidate.size_bytes);
                }
                OutcomeKind::Failed(reason) => {
                    report.failed += 1;
                    warn!(
                        "removal failed for {}: {}",
                        candidate.path.display(),
                        reason
                    );
                }
                OutcomeKind::SkippedDryRun
                | OutcomeKind::SkippedProtected
                | OutcomeKind::SkippedIneligible => {
                    report.skipped += 1;
                }
            }
            report.outcomes.push(EntryOutcome {
                path: candidate.path.clone(),
                size_bytes: candidate.size_bytes,
                outcome,
            });
        }

        info!(
            "transaction done: {} deleted, {} failed, {} skipped, {} byte(s) freed",
            report.deleted, report.failed, report.skipped, report.bytes_freed
        );
        report
    }

    fn settle(&self, candidate: &CandidateEntry, mode: ExecutionMode) -> OutcomeKind {
        // Protected paths are downgraded to a no-op outcome in every mode,
        // as is a directory that shelters a protected path deeper down.
        if self.guard.is_protected(&candidate.path) {
            return OutcomeKind::SkippedProtected;
        }
        if candidate.kind == EntryKind::Directory && self.guard.shelters(&candidate.path) {
            return OutcomeKind::SkippedProtected;
        }
        if !candidate.eligible {
            return OutcomeKind::SkippedIneligible;
        }
        match mode {
            ExecutionMode::DryRun => OutcomeKind::SkippedDryRun,
            ExecutionMode::Apply => match self.router.remove(candidate) {
                Ok(()) => OutcomeKind::Deleted,
                Err(reason) => OutcomeKind::Failed(reason),
            },
        }
    }
}
