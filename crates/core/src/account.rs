use crate::model::{CandidateEntry, ScanResult, Summary};

/// Pure aggregation over scan results. No I/O, no mutation of the input.
pub fn summarize(result: &ScanResult) -> Summary {
    let eligible_entries = result
        .candidates
        .iter()
        .filter(|candidate| candidate.eligible)
        .count() as u64;
    Summary {
        total_bytes: result.total_bytes,
        human_readable: format_bytes(result.total_bytes),
        eligible_entries,
        skipped_entries: result.skipped,
    }
}

/// The `n` largest eligible entries, size descending, ties broken by path
/// lexical order so the output is deterministic.
pub fn top_n(result: &ScanResult, n: usize) -> Vec<CandidateEntry> {
    let mut entries: Vec<CandidateEntry> = result
        .candidates
        .iter()
        .filter(|candidate| candidate.eligible)
        .cloned()
        .collect();
    entries.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| a.path.cmp(&b.path))
    });
    entries.truncate(n);
    entries
}

pub fn format_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if value == 0 {
        return "0 B".to_string();
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::{format_bytes, summarize, top_n};
    use crate::model::{CandidateEntry, EntryKind, ScanResult};
    use std::path::PathBuf;

    fn entry(path: &str, size_bytes: u64, eligible: bool) -> CandidateEntry {
        CandidateEntry {
            path: PathBuf::from(path),
            kind: EntryKind::File,
            size_bytes,
            eligible,
        }
    }

    fn fixture() -> ScanResult {
        ScanResult {
            root: PathBuf::from("/tmp/root"),
            candidates: vec![
                entry("/tmp/root/a", 100, true),
                entry("/tmp/root/b", 200, true),
                entry("/tmp/root/link", 0, false),
            ],
            total_bytes: 300,
            skipped: 1,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn summarize_counts_eligible_and_skipped() {
        let result = fixture();
        let summary = summarize(&result);
        assert_eq!(summary.total_bytes, 300);
        assert_eq!(summary.eligible_entries, 2);
        assert_eq!(summary.skipped_entries, 1);
        assert_eq!(summary.human_readable, "300.0 B");
        // input untouched
        assert_eq!(result.candidates.len(), 3);
    }

    #[test]
    fn top_n_orders_by_size_descending() {
        let result = fixture();
        let top = top_n(&result, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].path, PathBuf::from("/tmp/root/b"));
    }

    #[test]
    fn top_n_breaks_ties_by_path() {
        let result = ScanResult {
            root: PathBuf::from("/r"),
            candidates: vec![entry("/r/zeta", 50, true), entry("/r/alpha", 50, true)],
            total_bytes: 100,
            skipped: 0,
            warnings: Vec::new(),
        };
        let top = top_n(&result, 2);
        assert_eq!(top[0].path, PathBuf::from("/r/alpha"));
        assert_eq!(top[1].path, PathBuf::from("/r/zeta"));
    }

    #[test]
    fn top_n_never_returns_ineligible_entries() {
        let result = fixture();
        let top = top_n(&result, 10);
        assert!(top.iter().all(|candidate| candidate.eligible));
    }

    #[test]
    fn formats_byte_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
