use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod cache;
pub mod cancel;
pub mod cleaner;
pub mod error;
pub mod filter;
pub mod pruner;
pub mod scanner;
pub mod walker;

pub use cache::{CacheLocation, LocationEnv, LocationKind, LocationScan};
pub use cancel::CancellationToken;
pub use cleaner::{CleanConfig, FileCleaner};
pub use error::{Error, Result};
pub use filter::{EntryMeta, FileFilter};
pub use pruner::PruneResult;
pub use scanner::{FileScanner, MatchedEntry, ScanReport};
pub use walker::{SkipReason, SkippedEntry, TreeWalker, WalkConfig};

/// An entry that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub path: PathBuf,
    pub error: String,
}

impl FailedEntry {
    pub fn new(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

/// Outcome of a delete or cache-clean run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanResult {
    pub removed_files: usize,
    pub total_size_freed: u64,
    pub failures: Vec<FailedEntry>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl Default for CleanResult {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanResult {
    pub fn new() -> Self {
        Self {
            removed_files: 0,
            total_size_freed: 0,
            failures: Vec::new(),
            cancelled: false,
            duration_ms: 0,
        }
    }

    pub fn add_success(&mut self, size_freed: u64) {
        self.removed_files += 1;
        self.total_size_freed += size_freed;
    }

    pub fn add_failure(&mut self, failure: FailedEntry) {
        self.failures.push(failure);
    }

    /// Folds another result into this one.
    pub fn merge(mut self, other: CleanResult) -> Self {
        self.removed_files += other.removed_files;
        self.total_size_freed += other.total_size_freed;
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
        self
    }

    pub fn format_size(&self) -> String {
        format_bytes(self.total_size_freed)
    }
}

/// Formats a byte count as a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(5), "5 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_clean_result_operations() {
        let mut result = CleanResult::new();
        assert_eq!(result.removed_files, 0);
        assert!(result.failures.is_empty());

        result.add_success(1024);
        result.add_failure(FailedEntry::new("/locked", "permission denied"));
        assert_eq!(result.removed_files, 1);
        assert_eq!(result.failures[0].path, PathBuf::from("/locked"));
        assert_eq!(result.format_size(), "1.00 KB");
    }

    #[test]
    fn test_clean_result_merge() {
        let mut a = CleanResult::new();
        a.add_success(10);
        let mut b = CleanResult::new();
        b.add_success(20);
        b.add_failure(FailedEntry::new("/x", "busy"));
        b.cancelled = true;

        let merged = a.merge(b);
        assert_eq!(merged.removed_files, 2);
        assert_eq!(merged.total_size_freed, 30);
        assert_eq!(merged.failures.len(), 1);
        assert!(merged.cancelled);
    }
}
