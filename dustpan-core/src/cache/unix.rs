use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::force::{ForceRemove, remove_by_type};

/// Permission bits inspected before removal.
const CHECK_MASK: u32 = 0o777;
/// Mode applied to an obstructed target.
const PERMISSIVE_MODE: u32 = 0o777;
/// Owner write + search, needed on the parent to unlink a child.
const PARENT_OWNER_BITS: u32 = 0o300;
/// Bits `chmod` accepts; anything above is file type.
const MODE_BITS: u32 = 0o7777;

/// chmod-then-remove fallback for Unix-family systems.
///
/// Every mode it changes is put back: the target's when removal fails, the
/// parent's once removal is done either way.
pub struct UnixRemover;

impl ForceRemove for UnixRemover {
    fn name(&self) -> &'static str {
        "unix-chmod"
    }

    fn force_remove(&self, path: &Path) -> io::Result<()> {
        let metadata = fs::symlink_metadata(path)?;
        let file_type = metadata.file_type();

        // chmod would follow the link and touch its target.
        let target = if file_type.is_symlink() {
            None
        } else {
            let mode = metadata.permissions().mode();
            if mode & CHECK_MASK != PERMISSIVE_MODE {
                SavedMode::change(path, mode, PERMISSIVE_MODE)
            } else {
                None
            }
        };

        let parent = path.parent().and_then(relax_parent);

        let result = remove_by_type(path, file_type.is_dir());

        if result.is_err() {
            if let Some(saved) = target {
                saved.restore();
            }
        }
        if let Some(saved) = parent {
            saved.restore();
        }

        result
    }
}

/// A mode to put back on `path` after a temporary chmod.
struct SavedMode {
    path: PathBuf,
    mode: u32,
}

impl SavedMode {
    /// chmods `path` to `new_mode`, remembering `old_mode`. `None` if chmod failed.
    fn change(path: &Path, old_mode: u32, new_mode: u32) -> Option<Self> {
        match fs::set_permissions(path, Permissions::from_mode(new_mode)) {
            Ok(()) => Some(Self {
                path: path.to_path_buf(),
                mode: old_mode & MODE_BITS,
            }),
            Err(err) => {
                debug!("chmod {:o} on {:?} failed: {}", new_mode, path, err);
                None
            }
        }
    }

    fn restore(self) {
        if let Err(err) = fs::set_permissions(&self.path, Permissions::from_mode(self.mode)) {
            debug!("restoring mode {:o} on {:?} failed: {}", self.mode, self.path, err);
        }
    }
}

fn relax_parent(parent: &Path) -> Option<SavedMode> {
    let mode = fs::metadata(parent).ok()?.permissions().mode();
    if mode & PARENT_OWNER_BITS == PARENT_OWNER_BITS {
        return None;
    }
    SavedMode::change(parent, mode, (mode & MODE_BITS) | PARENT_OWNER_BITS)
}
