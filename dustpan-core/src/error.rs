use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced synchronously by the engine.
///
/// Only problems that prevent an operation from starting end up here. Failures
/// on individual entries deep inside a tree are recorded in the operation's
/// report instead (see [`crate::SkippedEntry`] and [`crate::FailedEntry`]).
#[derive(Debug, Error)]
pub enum Error {
    /// The root directory could not be opened or listed.
    #[error("cannot access root {path:?}: {source}")]
    RootAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// A human-readable size such as `10MB` could not be parsed.
    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Checks that `root` is a directory the process can list.
pub(crate) fn check_root(root: &std::path::Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|source| Error::RootAccess {
        path: root.to_path_buf(),
        source,
    })?;

    if !metadata.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    std::fs::read_dir(root).map_err(|source| Error::RootAccess {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_root_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(check_root(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_check_root_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = check_root(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(Error::RootAccess { .. })));
    }

    #[test]
    fn test_check_root_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(check_root(&file), Err(Error::NotADirectory(_))));
    }
}
