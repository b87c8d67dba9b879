//! Well-known OS cache and temp directories: sizing and forced cleanup.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{CleanResult, FailedEntry};

pub mod force;
mod locations;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use force::{ForceRemove, platform_remover};
pub use locations::{LocationEnv, locations_for, locations_for_env};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Shared system temp directory.
    System,
    /// Per-user cache or temp directory.
    User,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::System => write!(f, "system"),
            LocationKind::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLocation {
    pub path: PathBuf,
    pub kind: LocationKind,
}

impl CacheLocation {
    pub fn new(path: impl Into<PathBuf>, kind: LocationKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Aggregate size of one cache location.
///
/// Every entry below the location counts once, directories included, and
/// `size` adds up the size the OS reports for each of them. `error` is set
/// only when the location itself could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationScan {
    pub path: PathBuf,
    pub kind: LocationKind,
    pub file_count: u64,
    pub size: u64,
    pub error: Option<String>,
}

impl LocationScan {
    pub fn formatted_size(&self) -> String {
        crate::format_bytes(self.size)
    }
}

/// Sizes every location, one parallel task per location. Results come back in
/// input order.
pub fn scan_all(locations: &[CacheLocation]) -> Vec<LocationScan> {
    info!("scanning {} cache locations", locations.len());
    locations.par_iter().map(scan_location).collect()
}

pub fn scan_location(location: &CacheLocation) -> LocationScan {
    let mut scan = LocationScan {
        path: location.path.clone(),
        kind: location.kind,
        file_count: 0,
        size: 0,
        error: None,
    };

    if let Err(err) = fs::read_dir(&location.path) {
        debug!("cannot read cache location {:?}: {}", location.path, err);
        scan.error = Some(err.to_string());
        return scan;
    }

    for entry in walk(&location.path) {
        if let Ok(metadata) = entry.metadata() {
            scan.file_count += 1;
            scan.size += metadata.len();
        }
    }

    debug!(
        "{:?}: {} entries, {}",
        location.path,
        scan.file_count,
        scan.formatted_size()
    );
    scan
}

/// Removes every file in every location, falling back to the platform's
/// forced removal when the ordinary call fails. Directories are left in place.
pub fn clear_cache(locations: &[CacheLocation]) -> CleanResult {
    clear_cache_with(locations, platform_remover())
}

/// [`clear_cache`] with an explicit fallback.
pub fn clear_cache_with(locations: &[CacheLocation], remover: &dyn ForceRemove) -> CleanResult {
    let start = Instant::now();
    info!(
        "clearing {} cache locations (fallback: {})",
        locations.len(),
        remover.name()
    );

    let mut result = locations
        .par_iter()
        .map(|location| clear_location(&location.path, plain_remove, remover))
        .reduce(CleanResult::new, CleanResult::merge);
    result.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "cache clean removed {} files, freed {}, {} failed",
        result.removed_files,
        result.format_size(),
        result.failures.len()
    );
    result
}

fn plain_remove(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Clears one location: `remove` first, `remover` when that fails.
fn clear_location(
    root: &Path,
    remove: fn(&Path) -> io::Result<()>,
    remover: &dyn ForceRemove,
) -> CleanResult {
    let mut result = CleanResult::new();

    for entry in walk(root) {
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        match remove(path) {
            Ok(()) => result.add_success(size),
            Err(err) => {
                debug!("remove {:?} failed ({}), forcing", path, err);
                match remover.force_remove(path) {
                    Ok(()) => result.add_success(size),
                    Err(err) => {
                        warn!("forced removal of {:?} failed: {}", path, err);
                        result.add_failure(FailedEntry::new(path, err));
                    }
                }
            }
        }
    }

    result
}

fn walk(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
}
