use std::fs;
use std::io;
use std::os::windows::fs::MetadataExt;
use std::path::Path;

use super::force::{ForceRemove, remove_by_type};

const FILE_ATTRIBUTE_READONLY: u32 = 0x1;

/// Clears the read-only attribute, then deletes.
pub struct WindowsRemover;

impl ForceRemove for WindowsRemover {
    fn name(&self) -> &'static str {
        "windows-attributes"
    }

    #[allow(clippy::permissions_set_readonly_false)]
    fn force_remove(&self, path: &Path) -> io::Result<()> {
        let metadata = fs::symlink_metadata(path)?;

        if metadata.file_attributes() & FILE_ATTRIBUTE_READONLY != 0 {
            let mut permissions = metadata.permissions();
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }

        remove_by_type(path, metadata.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_read_only_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("locked.tmp");
        fs::write(&file, "x")?;
        let mut permissions = fs::metadata(&file)?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&file, permissions)?;

        WindowsRemover.force_remove(&file)?;
        assert!(!file.exists());

        Ok(())
    }

    #[test]
    fn test_removes_empty_read_only_directory() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path().join("empty");
        fs::create_dir(&dir)?;
        let mut permissions = fs::metadata(&dir)?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&dir, permissions)?;

        WindowsRemover.force_remove(&dir)?;
        assert!(!dir.exists());

        Ok(())
    }

    #[test]
    fn test_refuses_non_empty_directory() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path().join("full");
        fs::create_dir(&dir)?;
        fs::write(dir.join("f"), "x")?;

        assert!(WindowsRemover.force_remove(&dir).is_err());
        assert!(dir.join("f").exists());

        Ok(())
    }
}
