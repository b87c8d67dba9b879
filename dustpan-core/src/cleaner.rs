use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::filter::{EntryMeta, FileFilter};
use crate::walker::{TreeWalker, WalkConfig};
use crate::{CleanResult, FailedEntry};

/// Deleter configuration
#[derive(Debug, Clone, Default)]
pub struct CleanConfig {
    pub walk: WalkConfig,
    /// Report what would be removed without touching the filesystem.
    pub dry_run: bool,
}

enum Removal {
    Removed(u64),
    Failed(FailedEntry),
}

/// Removes the files under a root that match a [`FileFilter`].
pub struct FileCleaner {
    config: CleanConfig,
    cancel: CancellationToken,
}

impl FileCleaner {
    pub fn new(config: CleanConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Deletes every matching file under `root`.
    ///
    /// Each file is removed independently; a failure is recorded in
    /// [`CleanResult::failures`] and never stops the remaining removals.
    /// Running the same call twice removes nothing the second time.
    pub fn delete_matching<P: AsRef<Path>>(
        &self,
        root: P,
        filter: &FileFilter,
    ) -> Result<CleanResult> {
        let root = root.as_ref();
        let start = Instant::now();
        let dry_run = self.config.dry_run;

        if dry_run {
            info!("DRY RUN: deleting matches under {:?}", root);
        } else {
            info!("deleting matches under {:?}", root);
        }

        let walker =
            TreeWalker::new(self.config.walk.clone()).with_cancellation(self.cancel.clone());
        let summary = walker.run(
            root,
            |path, metadata| {
                let meta = EntryMeta::from(metadata);
                if !filter.matches(&meta, path) {
                    return None;
                }
                Some(remove_entry(path, meta.size, dry_run))
            },
            CleanResult::new(),
            |result: &mut CleanResult, removal| match removal {
                Removal::Removed(size) => result.add_success(size),
                Removal::Failed(failure) => result.add_failure(failure),
            },
        )?;

        let mut result = summary.output;
        result.cancelled = summary.cancelled;
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "removed {} files, freed {}, {} failed, took {}ms",
            result.removed_files,
            result.format_size(),
            result.failures.len(),
            result.duration_ms
        );

        Ok(result)
    }

    /// Same as [`delete_matching`](Self::delete_matching) with `dry_run` forced on.
    pub fn preview<P: AsRef<Path>>(&self, root: P, filter: &FileFilter) -> Result<CleanResult> {
        let mut config = self.config.clone();
        config.dry_run = true;

        FileCleaner::new(config)
            .with_cancellation(self.cancel.clone())
            .delete_matching(root, filter)
    }
}

impl Default for FileCleaner {
    fn default() -> Self {
        Self::new(CleanConfig::default())
    }
}

fn remove_entry(path: &Path, size: u64, dry_run: bool) -> Removal {
    if dry_run {
        debug!("DRY RUN: would remove {:?}", path);
        return Removal::Removed(size);
    }

    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed {:?}", path);
            Removal::Removed(size)
        }
        Err(err) => {
            warn!("failed to remove {:?}: {}", path, err);
            Removal::Failed(FailedEntry::new(PathBuf::from(path), err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_files(root: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(root.join("logs"))?;
        fs::write(root.join("keep.rs"), "fn main() {}")?;
        fs::write(root.join("a.log"), "aaaa")?;
        fs::write(root.join("logs/b.log"), "bbbbbb")?;
        Ok(())
    }

    #[test]
    fn test_delete_matching() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_files(root)?;

        let filter = FileFilter::new().with_extensions(["log"]);
        let result = FileCleaner::default().delete_matching(root, &filter)?;

        assert_eq!(result.removed_files, 2);
        assert_eq!(result.total_size_freed, 10);
        assert!(result.failures.is_empty());
        assert!(root.join("keep.rs").exists());
        assert!(!root.join("a.log").exists());
        assert!(!root.join("logs/b.log").exists());
        // Directories are left for the pruner.
        assert!(root.join("logs").is_dir());

        Ok(())
    }

    #[test]
    fn test_dry_run_keeps_files() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_files(root)?;

        let config = CleanConfig {
            dry_run: true,
            ..Default::default()
        };
        let filter = FileFilter::new().with_extensions(["log"]);
        let result = FileCleaner::new(config).delete_matching(root, &filter)?;

        assert_eq!(result.removed_files, 2);
        assert!(root.join("a.log").exists());
        assert!(root.join("logs/b.log").exists());

        Ok(())
    }

    #[test]
    fn test_preview_matches_real_run() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_files(root)?;

        let cleaner = FileCleaner::default();
        let filter = FileFilter::new().with_extensions(["log"]);
        let preview = cleaner.preview(root, &filter)?;
        let real = cleaner.delete_matching(root, &filter)?;

        assert_eq!(preview.removed_files, real.removed_files);
        assert_eq!(preview.total_size_freed, real.total_size_freed);

        Ok(())
    }

    #[test]
    fn test_delete_is_idempotent() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_files(root)?;

        let cleaner = FileCleaner::default();
        let filter = FileFilter::new().with_extensions(["log"]);
        cleaner.delete_matching(root, &filter)?;
        let second = cleaner.delete_matching(root, &filter)?;

        assert_eq!(second.removed_files, 0);
        assert!(second.failures.is_empty());
        assert!(root.join("keep.rs").exists());

        Ok(())
    }

    #[test]
    fn test_non_recursive_delete() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        create_files(root)?;

        let config = CleanConfig {
            walk: WalkConfig {
                recursive: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let filter = FileFilter::new().with_extensions(["log"]);
        let result = FileCleaner::new(config).delete_matching(root, &filter)?;

        assert_eq!(result.removed_files, 1);
        assert!(root.join("logs/b.log").exists());

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_does_not_stop_other_removals() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("locked"))?;
        fs::write(root.join("locked/x.tmp"), "x")?;
        fs::write(root.join("y.tmp"), "y")?;
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o555))?;

        let filter = FileFilter::new().with_extensions(["tmp"]);
        let result = FileCleaner::default().delete_matching(root, &filter);

        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755))?;
        let result = result?;

        // Root may ignore the read-only bit; otherwise one failure is recorded.
        assert!(!root.join("y.tmp").exists());
        assert_eq!(result.removed_files + result.failures.len(), 2);

        Ok(())
    }

    #[test]
    fn test_delete_missing_root() {
        let result =
            FileCleaner::default().delete_matching("/nonexistent/root", &FileFilter::default());
        assert!(result.is_err());
    }
}
