use std::io;
use std::path::Path;

/// Platform-specific removal used when an ordinary `remove_file` fails.
///
/// Implementations clear whatever permission or attribute obstruction the
/// platform has and then remove the entry: files and links with a file
/// removal, directories only when they are verified empty.
pub trait ForceRemove: Send + Sync {
    fn name(&self) -> &'static str;

    fn force_remove(&self, path: &Path) -> io::Result<()>;
}

/// The implementation compiled in for this platform.
pub fn platform_remover() -> &'static dyn ForceRemove {
    &PLATFORM_REMOVER
}

#[cfg(unix)]
static PLATFORM_REMOVER: super::unix::UnixRemover = super::unix::UnixRemover;

#[cfg(windows)]
static PLATFORM_REMOVER: super::windows::WindowsRemover = super::windows::WindowsRemover;

#[cfg(not(any(unix, windows)))]
static PLATFORM_REMOVER: Unsupported = Unsupported;

/// Removes `path` according to its actual type.
pub(super) fn remove_by_type(path: &Path, is_dir: bool) -> io::Result<()> {
    if !is_dir {
        return std::fs::remove_file(path);
    }

    if !crate::pruner::is_empty_dir(path) {
        return Err(io::Error::new(
            io::ErrorKind::DirectoryNotEmpty,
            format!("refusing to force-remove non-empty directory {}", path.display()),
        ));
    }
    std::fs::remove_dir(path)
}

#[cfg(not(any(unix, windows)))]
struct Unsupported;

#[cfg(not(any(unix, windows)))]
impl ForceRemove for Unsupported {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn force_remove(&self, path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no forced removal on this platform: {}", path.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_remove_by_type_refuses_non_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("f"), "x").unwrap();

        let err = remove_by_type(&dir, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::DirectoryNotEmpty);
        assert!(dir.exists());
    }

    #[test]
    fn test_remove_by_type_empty_dir_and_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("d");
        let file = temp_dir.path().join("f");
        fs::create_dir(&dir).unwrap();
        fs::write(&file, "x").unwrap();

        remove_by_type(&dir, true).unwrap();
        remove_by_type(&file, false).unwrap();
        assert!(!dir.exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_platform_remover_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let result = platform_remover().force_remove(&temp_dir.path().join("missing"));
        assert!(result.is_err());
    }
}
