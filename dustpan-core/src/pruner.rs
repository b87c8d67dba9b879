use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::FailedEntry;
use crate::error::{Result, check_root};

/// Outcome of pruning empty directories under a root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneResult {
    /// Removed directories, deepest first.
    pub removed: Vec<PathBuf>,
    pub failures: Vec<FailedEntry>,
}

/// Returns true when `path` holds no files anywhere in its subtree.
///
/// A directory that cannot be listed counts as non-empty, so it is never
/// pruned. Symlinks count as entries.
pub fn is_empty_dir<P: AsRef<Path>>(path: P) -> bool {
    let Ok(entries) = fs::read_dir(path.as_ref()) else {
        return false;
    };

    for entry in entries {
        let Ok(entry) = entry else {
            return false;
        };
        let Ok(file_type) = entry.file_type() else {
            return false;
        };
        if !file_type.is_dir() || !is_empty_dir(entry.path()) {
            return false;
        }
    }

    true
}

/// Lists every empty directory strictly below `root`, shallowest first.
pub fn find_empty_subfolders<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    check_root(root)?;

    let empty: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| is_empty_dir(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    debug!("found {} empty directories under {:?}", empty.len(), root);
    Ok(empty)
}

/// Removes every empty directory below `root`; `root` itself is kept.
///
/// The full list is collected before anything is removed, then removed in
/// reverse order so children always go before their parents.
pub fn prune_empty_subfolders<P: AsRef<Path>>(root: P) -> Result<PruneResult> {
    let root = root.as_ref();
    let empty = find_empty_subfolders(root)?;
    let mut result = PruneResult::default();

    for dir in empty.into_iter().rev() {
        match fs::remove_dir(&dir) {
            Ok(()) => {
                debug!("removed empty directory {:?}", dir);
                result.removed.push(dir);
            }
            Err(err) => {
                warn!("failed to remove {:?}: {}", dir, err);
                result.failures.push(FailedEntry::new(dir, err));
            }
        }
    }

    info!(
        "pruned {} empty directories under {:?}, {} failed",
        result.removed.len(),
        root,
        result.failures.len()
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_empty_dir_nested() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c/d/e"))?;
        fs::create_dir_all(root.join("a/x"))?;

        assert!(is_empty_dir(root));
        assert!(is_empty_dir(root.join("a/b")));

        fs::write(root.join("a/b/c/d/e/file"), "x")?;
        assert!(!is_empty_dir(root));
        assert!(!is_empty_dir(root.join("a/b/c")));
        assert!(is_empty_dir(root.join("a/x")));

        Ok(())
    }

    #[test]
    fn test_is_empty_dir_missing_or_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("f");
        fs::write(&file, "x")?;

        assert!(!is_empty_dir(temp_dir.path().join("missing")));
        assert!(!is_empty_dir(&file));

        Ok(())
    }

    #[test]
    fn test_find_is_shallow_first() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c"))?;

        let found = find_empty_subfolders(root)?;
        assert_eq!(
            found,
            vec![root.join("a"), root.join("a/b"), root.join("a/b/c")]
        );

        Ok(())
    }

    #[test]
    fn test_prune_chain_deepest_first() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b/c"))?;

        let result = prune_empty_subfolders(root)?;

        assert!(result.failures.is_empty());
        assert_eq!(
            result.removed,
            vec![root.join("a/b/c"), root.join("a/b"), root.join("a")]
        );
        assert!(root.exists());
        assert!(!root.join("a").exists());

        Ok(())
    }

    #[test]
    fn test_prune_keeps_branches_with_files() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("x/y/z"))?;
        fs::create_dir_all(root.join("x/w"))?;
        fs::write(root.join("x/w/file.txt"), "keep")?;

        let result = prune_empty_subfolders(root)?;

        assert_eq!(result.removed, vec![root.join("x/y/z"), root.join("x/y")]);
        assert!(root.join("x/w/file.txt").exists());
        assert!(root.join("x").is_dir());

        Ok(())
    }

    #[test]
    fn test_prune_missing_root() {
        assert!(prune_empty_subfolders("/nonexistent/prune/root").is_err());
    }
}
