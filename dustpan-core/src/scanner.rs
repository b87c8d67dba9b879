use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::filter::{EntryMeta, FileFilter};
use crate::walker::{SkippedEntry, TreeWalker, WalkConfig};

/// One file that passed the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedEntry {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
}

/// Result of scanning one root.
///
/// `total_size` always equals the sum of `entries[..].size`. Entry order is
/// not meaningful.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub entries: Vec<MatchedEntry>,
    pub total_size: u64,
    pub skipped: Vec<SkippedEntry>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matched path -> human-readable size, e.g. `"5 B"`.
    pub fn size_labels(&self) -> HashMap<PathBuf, String> {
        self.entries
            .iter()
            .map(|entry| (entry.path.clone(), crate::format_bytes(entry.size)))
            .collect()
    }

    pub fn formatted_size(&self) -> String {
        crate::format_bytes(self.total_size)
    }

    /// Sorts entries largest first.
    pub fn sort_by_size(&mut self) {
        self.entries
            .sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    }

    /// Entry path relative to the scanned root.
    pub fn relative_path<'a>(&self, entry: &'a MatchedEntry) -> &'a Path {
        entry.path.strip_prefix(&self.root).unwrap_or(&entry.path)
    }
}

/// Finds the files under a root that match a [`FileFilter`].
pub struct FileScanner {
    walker: TreeWalker,
}

impl FileScanner {
    pub fn new(config: WalkConfig) -> Self {
        Self {
            walker: TreeWalker::new(config),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.walker = self.walker.with_cancellation(token);
        self
    }

    /// Scans `root` and returns every matching file with the total size.
    ///
    /// Fails only when `root` itself cannot be listed.
    pub fn scan<P: AsRef<Path>>(&self, root: P, filter: &FileFilter) -> Result<ScanReport> {
        let root = root.as_ref();
        let start = Instant::now();
        info!(
            "scanning {:?} (recursive: {})",
            root,
            self.walker.config().recursive
        );

        let summary = self.walker.run(
            root,
            |path, metadata| {
                let meta = EntryMeta::from(metadata);
                if !filter.matches(&meta, path) {
                    return None;
                }
                debug!("match: {:?} ({} bytes)", path, meta.size);
                Some(MatchedEntry {
                    path: path.to_path_buf(),
                    size: meta.size,
                    is_dir: meta.is_dir,
                })
            },
            (Vec::new(), 0u64),
            |(entries, total): &mut (Vec<MatchedEntry>, u64), entry| {
                *total += entry.size;
                entries.push(entry);
            },
        )?;

        let (entries, total_size) = summary.output;
        let report = ScanReport {
            root: root.to_path_buf(),
            entries,
            total_size,
            skipped: summary.skipped,
            cancelled: summary.cancelled,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "found {} matching files ({}) under {:?}, {} skipped",
            report.len(),
            report.formatted_size(),
            root,
            report.skipped.len()
        );

        Ok(report)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new(WalkConfig::default())
    }
}
