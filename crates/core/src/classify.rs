use std::fs::Metadata;
use std::path::{Component, Path};

use chrono::{DateTime, Duration, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Caller-supplied policy selecting which non-directory entries count as
/// reclaimable. The scanner only handles safe traversal and sizing; the
/// selection policy lives here as a closed set of variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    /// Every regular file matches.
    All,
    /// Files at or above the threshold match.
    MinSizeBytes(u64),
    /// Files whose mtime is older than the given number of days match.
    /// Files with an unreadable mtime do not match.
    OlderThanDays(i64),
}

impl Classifier {
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Classifier::All => true,
            Classifier::MinSizeBytes(threshold) => metadata.len() >= *threshold,
            Classifier::OlderThanDays(days) => {
                let cutoff = Utc::now() - Duration::days(*days);
                metadata
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from)
                    .is_some_and(|mtime| mtime <= cutoff)
            }
        }
    }
}

/// Directory names and glob patterns the walk prunes without descending.
/// Plain patterns (no glob metacharacters) match a path component exactly;
/// anything else is compiled into a glob set. Invalid globs degrade to
/// component matches, reported through `warnings`.
#[derive(Debug, Default)]
pub struct SkipList {
    globset: Option<GlobSet>,
    names: Vec<String>,
}

impl SkipList {
    pub fn new(patterns: &[String], warnings: &mut Vec<String>) -> Self {
        if patterns.is_empty() {
            return Self::default();
        }

        let mut builder = GlobSetBuilder::new();
        let mut names = Vec::new();
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if is_plain_name(pattern) {
                names.push(pattern.to_string());
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => {
                    warnings.push(format!(
                        "invalid skip glob '{pattern}': {err}; using name match"
                    ));
                    names.push(pattern.to_string());
                }
            }
        }

        let globset = match builder.build() {
            Ok(set) => Some(set),
            Err(err) => {
                warnings.push(format!("failed to compile skip glob set: {err}"));
                None
            }
        };

        Self { globset, names }
    }

    pub fn from_names(names: &[&str]) -> Self {
        Self {
            globset: None,
            names: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        if let Some(globset) = &self.globset {
            if globset.is_match(path) {
                return true;
            }
        }
        if self.names.is_empty() {
            return false;
        }
        path.components().any(|component| {
            matches!(component, Component::Normal(name)
                if self.names.iter().any(|skip| name.to_string_lossy() == *skip))
        })
    }
}

fn is_plain_name(pattern: &str) -> bool {
    !pattern
        .chars()
        .any(|ch| matches!(ch, '*' | '?' | '[' | ']' | '{' | '}' | '/'))
}
