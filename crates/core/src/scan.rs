use std::fs;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::classify::{Classifier, SkipList};
use crate::error::ScanError;
use crate::guard::PathGuard;
use crate::model::{CandidateEntry, EntryKind, ScanResult};

/// How candidates are cut from the tree under a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Candidates are the immediate children of the root; directory
    /// children are sized by a guarded recursive walk. This is the shape
    /// used when emptying a target directory (logs, caches, derived data).
    TopLevel,
    /// Candidates are individual classifier-matching files anywhere under
    /// the root (the large-file hunt).
    MatchingFiles,
}

pub struct ScanOptions {
    pub granularity: Granularity,
    pub classifier: Classifier,
    pub skip: SkipList,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::TopLevel,
            classifier: Classifier::All,
            skip: SkipList::default(),
        }
    }
}

/// Walks a root without following symbolic links, consulting the path
/// guard before recording or descending, and sizing entries from
/// non-dereferencing status.
pub struct Scanner<'a> {
    guard: &'a PathGuard,
}

impl<'a> Scanner<'a> {
    pub fn new(guard: &'a PathGuard) -> Self {
        Self { guard }
    }

    pub fn scan(&self, root: &Path, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let metadata = fs::symlink_metadata(root).map_err(|err| ScanError::from_io(root, err))?;

        let mut result = ScanResult {
            root: root.to_path_buf(),
            candidates: Vec::new(),
            total_bytes: 0,
            skipped: 0,
            warnings: Vec::new(),
        };

        // A root that is itself a symlink is recorded and never followed.
        if metadata.file_type().is_symlink() {
            result.candidates.push(CandidateEntry {
                path: root.to_path_buf(),
                kind: EntryKind::Symlink,
                size_bytes: 0,
                eligible: false,
            });
            result.skipped += 1;
            return Ok(result);
        }

        // An entirely protected root yields one ineligible entry.
        if self.guard.is_protected(root) {
            warn!("refusing protected scan root: {}", root.display());
            result.candidates.push(CandidateEntry {
                path: root.to_path_buf(),
                kind: kind_of(&metadata),
                size_bytes: 0,
                eligible: false,
            });
            result.skipped += 1;
            return Ok(result);
        }

        if !metadata.is_dir() {
            // A plain-file root is its own single candidate.
            if options.classifier.matches(&metadata) {
                result.candidates.push(CandidateEntry {
                    path: root.to_path_buf(),
                    kind: EntryKind::File,
                    size_bytes: metadata.len(),
                    eligible: true,
                });
            }
        } else {
            match options.granularity {
                Granularity::TopLevel => self.scan_children(root, options, &mut result)?,
                Granularity::MatchingFiles => self.scan_matching(root, options, &mut result),
            }
        }

        result.total_bytes = result
            .candidates
            .iter()
            .filter(|candidate| candidate.eligible)
            .map(|candidate| candidate.size_bytes)
            .sum();

        info!(
            "scanned {}: {} candidate(s), {} eligible byte(s), {} skipped",
            root.display(),
            result.candidates.len(),
            result.total_bytes,
            result.skipped
        );
        Ok(result)
    }

    fn scan_children(
        &self,
        root: &Path,
        options: &ScanOptions,
        result: &mut ScanResult,
    ) -> Result<(), ScanError> {
        let entries = fs::read_dir(root).map_err(|err| ScanError::from_io(root, err))?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    result
                        .warnings
                        .push(format!("read error under {}: {}", root.display(), err));
                    continue;
                }
            };
            let path = entry.path();
            if options.skip.is_skipped(&path) {
                continue;
            }

            // DirEntry::metadata does not traverse symlinks.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    result
                        .warnings
                        .push(format!("metadata read failed for {}: {}", path.display(), err));
                    continue;
                }
            };

            if metadata.file_type().is_symlink() {
                result.candidates.push(CandidateEntry {
                    path,
                    kind: EntryKind::Symlink,
                    size_bytes: 0,
                    eligible: false,
                });
                result.skipped += 1;
                continue;
            }

            if self.guard.is_protected(&path) {
                result.candidates.push(CandidateEntry {
                    path,
                    kind: kind_of(&metadata),
                    size_bytes: 0,
                    eligible: false,
                });
                result.skipped += 1;
                continue;
            }

            if metadata.is_dir() {
                // A directory sheltering a protected path deeper down must
                // not become deletable; removing it would take the
                // protected entry with it.
                if self.guard.shelters(&path) {
                    result.candidates.push(CandidateEntry {
                        path,
                        kind: EntryKind::Directory,
                        size_bytes: 0,
                        eligible: false,
                    });
                    result.skipped += 1;
                    continue;
                }
                let size_bytes = self.sized_walk(&path, options, result);
                result.candidates.push(CandidateEntry {
                    path,
                    kind: EntryKind::Directory,
                    size_bytes,
                    eligible: true,
                });
            } else if options.classifier.matches(&metadata) {
                result.candidates.push(CandidateEntry {
                    path,
                    kind: EntryKind::File,
                    size_bytes: metadata.len(),
                    eligible: true,
                });
            }
        }
        Ok(())
    }

    /// Sum of classifier-matching file sizes under `dir`. Symlinks count
    /// as zero and are never descended into; protected subtrees are pruned.
    fn sized_walk(&self, dir: &Path, options: &ScanOptions, result: &mut ScanResult) -> u64 {
        let mut total = 0_u64;
        let mut iter = WalkDir::new(dir).follow_links(false).into_iter();

        while let Some(item) = iter.next() {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    result
                        .warnings
                        .push(format!("walk error under {}: {}", dir.display(), err));
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                if self.guard.is_protected(entry.path()) {
                    result.skipped += 1;
                    iter.skip_current_dir();
                } else if options.skip.is_skipped(entry.path()) {
                    iter.skip_current_dir();
                }
                continue;
            }
            if self.guard.is_protected(entry.path()) {
                result.skipped += 1;
                continue;
            }
            match entry.metadata() {
                Ok(metadata) if options.classifier.matches(&metadata) => {
                    total = total.saturating_add(metadata.len());
                }
                Ok(_) => {}
                Err(err) => {
                    result.warnings.push(format!(
                        "metadata read failed for {}: {}",
                        entry.path().display(),
                        err
                    ));
                }
            }
        }
        total
    }

    fn scan_matching(&self, root: &Path, options: &ScanOptions, result: &mut ScanResult) {
        let mut iter = WalkDir::new(root).follow_links(false).into_iter();

        while let Some(item) = iter.next() {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    result
                        .warnings
                        .push(format!("walk error under {}: {}", root.display(), err));
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path().to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                result.candidates.push(CandidateEntry {
                    path,
                    kind: EntryKind::Symlink,
                    size_bytes: 0,
                    eligible: false,
                });
                result.skipped += 1;
                continue;
            }

            if file_type.is_dir() {
                if self.guard.is_protected(&path) {
                    result.candidates.push(CandidateEntry {
                        path,
                        kind: EntryKind::Directory,
                        size_bytes: 0,
                        eligible: false,
                    });
                    result.skipped += 1;
                    iter.skip_current_dir();
                } else if options.skip.is_skipped(&path) {
                    iter.skip_current_dir();
                }
                continue;
            }

            if self.guard.is_protected(&path) {
                result.candidates.push(CandidateEntry {
                    path,
                    kind: EntryKind::File,
                    size_bytes: 0,
                    eligible: false,
                });
                result.skipped += 1;
                continue;
            }

            match entry.metadata() {
                Ok(metadata) if options.classifier.matches(&metadata) => {
                    result.candidates.push(CandidateEntry {
                        path,
                        kind: EntryKind::File,
                        size_bytes: metadata.len(),
                        eligible: true,
                    });
                }
                Ok(_) => {}
                Err(err) => {
                    result
                        .warnings
                        .push(format!("metadata read failed for {}: {}", path.display(), err));
                }
            }
        }
    }
}

fn kind_of(metadata: &fs::Metadata) -> EntryKind {
    if metadata.file_type().is_symlink() {
        EntryKind::Symlink
    } else if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

#[cfg(test)]
mod tests {
    use super::{Granularity, ScanOptions, Scanner};
    use crate::classify::{Classifier, SkipList};
    use crate::guard::PathGuard;
    use crate::model::EntryKind;
    use std::fs;
    use std::path::PathBuf;

    fn guard_none() -> PathGuard {
        PathGuard::new(Vec::<PathBuf>::new())
    }

    #[test]
    fn missing_root_is_a_not_found_error() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let err = scanner
            .scan(&dir.path().join("absent"), &ScanOptions::default())
            .unwrap_err();
        assert!(matches!(err, crate::error::ScanError::NotFound { .. }));
    }

    #[test]
    fn empty_directory_scans_to_zero_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.total_bytes, 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recorded_as_zero_size_and_never_followed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.log"), vec![0u8; 100]).unwrap();
        fs::write(dir.path().join("b.log"), vec![0u8; 200]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.log"), dir.path().join("link")).unwrap();

        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();

        assert_eq!(result.candidates.len(), 3);
        assert_eq!(result.total_bytes, 300);
        assert_eq!(result.skipped, 1);

        let link = result
            .candidates
            .iter()
            .find(|c| c.kind == EntryKind::Symlink)
            .unwrap();
        assert_eq!(link.size_bytes, 0);
        assert!(!link.eligible);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_contribute_nothing_to_directory_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("huge.bin"), vec![0u8; 4096]).unwrap();

        let child = dir.path().join("child");
        fs::create_dir(&child).unwrap();
        fs::write(child.join("real.txt"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(outside.path(), child.join("escape")).unwrap();

        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();

        let entry = result
            .candidates
            .iter()
            .find(|c| c.path == child)
            .unwrap();
        assert_eq!(entry.size_bytes, 10);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_root_is_a_single_ineligible_entry() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("data"), vec![0u8; 64]).unwrap();
        let link = dir.path().join("root-link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(&link, &ScanOptions::default()).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.total_bytes, 0);
        assert!(!result.candidates[0].eligible);
    }

    #[test]
    fn protected_root_yields_one_ineligible_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file"), b"data").unwrap();

        let guard = PathGuard::new([dir.path().to_path_buf()]);
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert!(!result.candidates[0].eligible);
        assert_eq!(result.total_bytes, 0);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn protected_child_is_reported_but_not_descended() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep");
        fs::create_dir(&keep).unwrap();
        fs::write(keep.join("precious"), vec![0u8; 512]).unwrap();
        fs::write(dir.path().join("junk"), vec![0u8; 32]).unwrap();

        let guard = PathGuard::new([keep.clone()]);
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();

        let protected = result.candidates.iter().find(|c| c.path == keep).unwrap();
        assert!(!protected.eligible);
        assert_eq!(protected.size_bytes, 0);
        assert_eq!(result.total_bytes, 32);
    }

    #[test]
    fn directories_sheltering_a_protected_path_are_ineligible() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        let keep = app.join("keep");
        fs::create_dir_all(&keep).unwrap();
        fs::write(keep.join("precious"), vec![0u8; 512]).unwrap();
        fs::write(app.join("junk.log"), vec![0u8; 32]).unwrap();

        let guard = PathGuard::new([keep]);
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();

        let parent = result.candidates.iter().find(|c| c.path == app).unwrap();
        assert!(!parent.eligible);
        assert_eq!(parent.size_bytes, 0);
        assert_eq!(result.total_bytes, 0);
    }

    #[test]
    fn total_bytes_equals_sum_of_eligible_entry_sizes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), vec![0u8; 11]).unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("b"), vec![0u8; 22]).unwrap();

        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let result = scanner.scan(dir.path(), &ScanOptions::default()).unwrap();

        let eligible_sum: u64 = result
            .candidates
            .iter()
            .filter(|c| c.eligible)
            .map(|c| c.size_bytes)
            .sum();
        assert_eq!(result.total_bytes, eligible_sum);
        assert_eq!(result.total_bytes, 33);
    }

    #[test]
    fn matching_files_granularity_applies_classifier_and_skip_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.iso"), vec![0u8; 600]).unwrap();
        fs::write(dir.path().join("tiny.txt"), vec![0u8; 5]).unwrap();
        let skipped = dir.path().join("node_modules");
        fs::create_dir(&skipped).unwrap();
        fs::write(skipped.join("also-big.bin"), vec![0u8; 900]).unwrap();

        let guard = guard_none();
        let scanner = Scanner::new(&guard);
        let options = ScanOptions {
            granularity: Granularity::MatchingFiles,
            classifier: Classifier::MinSizeBytes(500),
            skip: SkipList::from_names(&["node_modules"]),
        };
        let result = scanner.scan(dir.path(), &options).unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].path, dir.path().join("big.iso"));
        assert_eq!(result.total_bytes, 600);
    }
}
