use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::FailureReason;
use crate::model::{CandidateEntry, EntryKind, PrivilegeTier};

/// A removal mechanism for one privilege tier. The router only decides
/// which tier a path needs and translates mechanism failures into the
/// per-entry failure taxonomy; tests inject their own implementations.
pub trait Remover {
    fn remove(&self, entry: &CandidateEntry) -> Result<(), FailureReason>;
}

/// Ordinary-privilege removal through std::fs.
pub struct UserRemover;

impl Remover for UserRemover {
    fn remove(&self, entry: &CandidateEntry) -> Result<(), FailureReason> {
        let result = match entry.kind {
            EntryKind::Directory => fs::remove_dir_all(&entry.path),
            EntryKind::File | EntryKind::Symlink => fs::remove_file(&entry.path),
        };
        result.map_err(|err| FailureReason::from_io(&err))
    }
}

/// Elevated removal via `sudo rm -rf`, the mechanism system-owned cache
/// and log directories need. The existence pre-check keeps retries honest:
/// `rm -rf` reports success on a path that is already gone.
pub struct SudoRemover;

impl Remover for SudoRemover {
    fn remove(&self, entry: &CandidateEntry) -> Result<(), FailureReason> {
        if let Err(err) = fs::symlink_metadata(&entry.path) {
            return Err(FailureReason::from_io(&err));
        }
        let output = Command::new("sudo")
            .args(["rm", "-rf", "--"])
            .arg(&entry.path)
            .output()
            .map_err(|err| FailureReason::Io(err.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.to_lowercase().contains("permission denied") {
                Err(FailureReason::PermissionDenied)
            } else {
                Err(FailureReason::Io(stderr))
            }
        }
    }
}

/// Decides per path whether removal needs elevated privilege and dispatches
/// to the mechanism for that tier. Protected-path checks happen upstream in
/// the deletion transaction; the router assumes they already passed.
pub struct ElevationRouter {
    home: PathBuf,
    user: Box<dyn Remover>,
    elevated: Box<dyn Remover>,
}

impl ElevationRouter {
    pub fn new(home: PathBuf, user: Box<dyn Remover>, elevated: Box<dyn Remover>) -> Self {
        Self {
            home,
            user,
            elevated,
        }
    }

    pub fn with_system_removers(home: PathBuf) -> Self {
        Self::new(home, Box::new(UserRemover), Box::new(SudoRemover))
    }

    /// Pure function of the path: inside the invoking user's home subtree
    /// is user tier, everything else needs elevation.
    pub fn tier_for(&self, path: &Path) -> PrivilegeTier {
        if path.starts_with(&self.home) {
            PrivilegeTier::User
        } else {
            PrivilegeTier::Elevated
        }
    }

    pub fn remove(&self, entry: &CandidateEntry) -> Result<(), FailureReason> {
        let tier = self.tier_for(&entry.path);
        debug!("removing {} via {:?} tier", entry.path.display(), tier);
        match tier {
            PrivilegeTier::User => self.user.remove(entry),
            PrivilegeTier::Elevated => self.elevated.remove(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ElevationRouter, Remover, UserRemover};
    use crate::error::FailureReason;
    use crate::model::{CandidateEntry, EntryKind, PrivilegeTier};
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn candidate(path: PathBuf, kind: EntryKind) -> CandidateEntry {
        CandidateEntry {
            path,
            kind,
            size_bytes: 0,
            eligible: true,
        }
    }

    #[test]
    fn home_subtree_is_user_tier_everything_else_elevated() {
        let router = ElevationRouter::with_system_removers(PathBuf::from("/Users/me"));
        assert_eq!(
            router.tier_for(&PathBuf::from("/Users/me/Library/Caches/x")),
            PrivilegeTier::User
        );
        assert_eq!(
            router.tier_for(&PathBuf::from("/Library/Caches/x")),
            PrivilegeTier::Elevated
        );
        assert_eq!(
            router.tier_for(&PathBuf::from("/private/var/log/system.log")),
            PrivilegeTier::Elevated
        );
        // component-wise prefix, not a string prefix
        assert_eq!(
            router.tier_for(&PathBuf::from("/Users/me2/file")),
            PrivilegeTier::Elevated
        );
    }

    #[test]
    fn user_remover_handles_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("junk.log");
        fs::write(&file, b"junk").unwrap();
        let sub = dir.path().join("cache");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("inner"), b"junk").unwrap();

        UserRemover
            .remove(&candidate(file.clone(), EntryKind::File))
            .unwrap();
        UserRemover
            .remove(&candidate(sub.clone(), EntryKind::Directory))
            .unwrap();
        assert!(!file.exists());
        assert!(!sub.exists());
    }

    #[test]
    fn user_remover_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = UserRemover
            .remove(&candidate(dir.path().join("gone"), EntryKind::File))
            .unwrap_err();
        assert_eq!(err, FailureReason::NotFound);
    }

    struct RecordingRemover {
        calls: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl Remover for RecordingRemover {
        fn remove(&self, entry: &CandidateEntry) -> Result<(), FailureReason> {
            self.calls.borrow_mut().push(entry.path.clone());
            Ok(())
        }
    }

    #[test]
    fn router_dispatches_to_the_tier_mechanism() {
        let user_calls = Rc::new(RefCell::new(Vec::new()));
        let elevated_calls = Rc::new(RefCell::new(Vec::new()));
        let router = ElevationRouter::new(
            PathBuf::from("/Users/me"),
            Box::new(RecordingRemover {
                calls: Rc::clone(&user_calls),
            }),
            Box::new(RecordingRemover {
                calls: Rc::clone(&elevated_calls),
            }),
        );

        router
            .remove(&candidate(
                PathBuf::from("/Users/me/Library/Logs/app.log"),
                EntryKind::File,
            ))
            .unwrap();
        router
            .remove(&candidate(
                PathBuf::from("/private/var/log/system.log"),
                EntryKind::File,
            ))
            .unwrap();

        assert_eq!(user_calls.borrow().len(), 1);
        assert_eq!(elevated_calls.borrow().len(), 1);
    }
}
