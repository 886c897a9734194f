use std::path::{Component, Path, PathBuf};

/// System roots the tool refuses to modify regardless of caller intent.
/// Mirrors the macOS integrity-protected directories.
const SYSTEM_PROTECTED: &[&str] = &["/System", "/usr", "/bin", "/sbin", "/Applications"];

/// Immutable set of protected path prefixes. A candidate is protected when
/// it equals or is nested under any entry, judged on the path's own
/// components after lexical `.`/`..` normalization. Symlinks are never
/// resolved: a link pointing into `/System` is judged by where the link
/// lives, not where it points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGuard {
    protected: Vec<PathBuf>,
}

impl PathGuard {
    pub fn new(protected: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            protected: protected.into_iter().map(|p| normalize(&p)).collect(),
        }
    }

    /// The fixed system-critical set from the original tool.
    pub fn with_system_defaults() -> Self {
        Self::new(SYSTEM_PROTECTED.iter().map(PathBuf::from))
    }

    pub fn is_protected(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        self.protected
            .iter()
            .any(|prefix| normalized.starts_with(prefix))
    }

    /// True when a protected entry is equal to or nested under `path`.
    /// Deleting such a path wholesale would take the protected entry with
    /// it, so directory candidates that shelter one must stay ineligible.
    pub fn shelters(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        self.protected
            .iter()
            .any(|prefix| prefix.starts_with(&normalized))
    }

    pub fn protected_paths(&self) -> &[PathBuf] {
        &self.protected
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
/// `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
