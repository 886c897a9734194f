//! Safe-deletion engine for guarded filesystem reclamation.
//!
//! The engine locates reclaimable disk space (logs, caches, build
//! artifacts, oversized files), sizes it with a symlink-safe walk, and
//! deletes only what an explicit confirmation allowed, while refusing to
//! touch a protected set of system paths. Callers supply categories and a
//! pre-resolved confirmation decision; all rendering and prompting stays
//! outside this crate.

pub mod account;
pub mod category;
pub mod classify;
pub mod disk;
pub mod elevate;
pub mod error;
pub mod guard;
pub mod model;
pub mod scan;
pub mod transaction;

pub use account::{format_bytes, summarize, top_n};
pub use category::{
    builtin_categories, category_names, find_category, CategorySpec, DEFAULT_LARGE_FILE_MIN_MB,
};
pub use classify::{Classifier, SkipList};
pub use disk::free_space_for;
pub use elevate::{ElevationRouter, Remover, SudoRemover, UserRemover};
pub use error::{FailureReason, ScanError};
pub use guard::PathGuard;
pub use model::{
    CandidateEntry, CategoryReport, DeletionReport, EntryKind, EntryOutcome, ExecutionMode,
    OutcomeKind, PrivilegeTier, Report, ScanResult, Summary, REPORT_VERSION,
};
pub use scan::{Granularity, ScanOptions, Scanner};
pub use transaction::DeletionTransaction;
