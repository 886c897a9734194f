use std::path::{Path, PathBuf};

use crate::classify::{Classifier, SkipList};
use crate::scan::{Granularity, ScanOptions};

pub const DEFAULT_LARGE_FILE_MIN_MB: u64 = 500;

/// Directory names pruned at any depth during the large-file hunt. These
/// are regenerable or library-managed trees where a "large file" finding
/// is noise.
const LARGE_FILE_SKIP: &[&str] = &[
    ".Trash",
    "Library",
    ".cache",
    "node_modules",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    "Pods",
    ".bundle",
    "vendor",
    ".gradle",
    "build",
    "DerivedData",
];

/// One cleanup category: the roots it scans, how candidates are cut, and
/// the reclaim predicate applied to files.
pub struct CategorySpec {
    pub name: &'static str,
    pub label: &'static str,
    pub roots: Vec<PathBuf>,
    pub granularity: Granularity,
    pub classifier: Classifier,
    pub skip_names: &'static [&'static str],
    /// Report-only categories are listed but never deleted.
    pub report_only: bool,
}

impl CategorySpec {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            granularity: self.granularity,
            classifier: self.classifier.clone(),
            skip: SkipList::from_names(self.skip_names),
        }
    }
}

pub fn builtin_categories(home: &Path, large_file_min_bytes: u64) -> Vec<CategorySpec> {
    vec![
        CategorySpec {
            name: "logs",
            label: "Logs",
            roots: vec![
                home.join("Library").join("Logs"),
                PathBuf::from("/private/var/log"),
            ],
            granularity: Granularity::TopLevel,
            classifier: Classifier::All,
            skip_names: &[],
            report_only: false,
        },
        CategorySpec {
            name: "caches",
            label: "Caches",
            roots: vec![
                home.join("Library").join("Caches"),
                PathBuf::from("/Library/Caches"),
            ],
            granularity: Granularity::TopLevel,
            classifier: Classifier::All,
            skip_names: &[],
            report_only: false,
        },
        CategorySpec {
            name: "xcode-derived-data",
            label: "Xcode DerivedData",
            roots: vec![home
                .join("Library")
                .join("Developer")
                .join("Xcode")
                .join("DerivedData")],
            granularity: Granularity::TopLevel,
            classifier: Classifier::All,
            skip_names: &[],
            report_only: false,
        },
        CategorySpec {
            name: "large-files",
            label: "Large Files",
            roots: vec![home.to_path_buf()],
            granularity: Granularity::MatchingFiles,
            classifier: Classifier::MinSizeBytes(large_file_min_bytes),
            skip_names: LARGE_FILE_SKIP,
            report_only: true,
        },
    ]
}

pub fn find_category(
    name: &str,
    home: &Path,
    large_file_min_bytes: u64,
) -> Option<CategorySpec> {
    builtin_categories(home, large_file_min_bytes)
        .into_iter()
        .find(|category| category.name == name)
}

pub fn category_names() -> Vec<&'static str> {
    vec!["logs", "caches", "xcode-derived-data", "large-files"]
}
