use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::Metadata;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::{Error, Result};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// The parts of an entry's metadata the filter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

impl From<&Metadata> for EntryMeta {
    fn from(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
        }
    }
}

/// Composite file predicate.
///
/// A zero size bound, an empty extension set, an empty exclude list and a
/// `None` age bound never restrict matching, so `FileFilter::default()`
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFilter {
    /// Smallest accepted size in bytes, inclusive. 0 = unbounded.
    pub min_size: u64,
    /// Largest accepted size in bytes, inclusive. 0 = unbounded.
    pub max_size: u64,
    /// Lower-case, dot-prefixed extensions such as `.log`.
    pub extensions: BTreeSet<String>,
    /// Directory names or base-name prefixes to skip.
    pub exclude: Vec<String>,
    /// Keep only entries modified strictly before this instant.
    pub older_than: Option<SystemTime>,
    /// Keep only entries modified strictly after this instant.
    pub newer_than: Option<SystemTime>,
}

impl FileFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size_range(mut self, min_size: u64, max_size: u64) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Adds extensions, normalizing each one (`"TXT"` and `".txt"` both become `".txt"`).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions.extend(
            extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref())),
        );
        self
    }

    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(
            patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty()),
        );
        self
    }

    pub fn with_older_than(mut self, instant: SystemTime) -> Self {
        self.older_than = Some(instant);
        self
    }

    pub fn with_newer_than(mut self, instant: SystemTime) -> Self {
        self.newer_than = Some(instant);
        self
    }

    /// Keep entries last modified more than `days` days ago.
    pub fn older_than_days(self, days: u64) -> Self {
        self.with_older_than(days_ago(days))
    }

    /// Keep entries last modified within the last `days` days.
    pub fn newer_than_days(self, days: u64) -> Self {
        self.with_newer_than(days_ago(days))
    }

    /// True when no criterion is set.
    pub fn is_unrestricted(&self) -> bool {
        self.min_size == 0
            && self.max_size == 0
            && self.extensions.is_empty()
            && self.exclude.is_empty()
            && self.older_than.is_none()
            && self.newer_than.is_none()
    }

    /// Evaluates the filter against one entry.
    ///
    /// Exclusion is checked first and overrides every other criterion.
    pub fn matches(&self, meta: &EntryMeta, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.is_excluded(path, &name) {
            return false;
        }

        if !self.extensions.is_empty() && !self.extensions.contains(extension_of(&name)) {
            return false;
        }

        if self.max_size > 0 && meta.size > self.max_size {
            return false;
        }
        if self.min_size > 0 && meta.size < self.min_size {
            return false;
        }

        self.check_age(meta.modified)
    }

    fn is_excluded(&self, path: &Path, name: &str) -> bool {
        if self.exclude.is_empty() {
            return false;
        }

        let normalized = path.to_string_lossy().replace('\\', "/");
        self.exclude.iter().any(|pattern| {
            normalized.contains(&format!("{pattern}/")) || name.starts_with(pattern.as_str())
        })
    }

    // The two bounds are independent filters, not a range.
    fn check_age(&self, modified: Option<SystemTime>) -> bool {
        if self.older_than.is_none() && self.newer_than.is_none() {
            return true;
        }

        let Some(modified) = modified else {
            return false;
        };

        if let Some(bound) = self.older_than {
            if modified >= bound {
                return false;
            }
        }
        if let Some(bound) = self.newer_than {
            if modified <= bound {
                return false;
            }
        }

        true
    }

    /// Parses a human-readable size such as `"10MB"`, `"1.5GiB"` or `"500"`.
    pub fn parse_size_string(size_str: &str) -> Result<u64> {
        let size_str = size_str.trim().to_uppercase();

        let (number_part, unit_part) = if let Some(pos) = size_str.find(|c: char| c.is_alphabetic())
        {
            (size_str[..pos].trim(), &size_str[pos..])
        } else {
            (size_str.as_str(), "")
        };

        let number: f64 = number_part
            .parse()
            .map_err(|_| Error::InvalidSize(format!("invalid number: {number_part:?}")))?;

        if number < 0.0 {
            return Err(Error::InvalidSize(format!("negative size: {number}")));
        }

        let multiplier: u64 = match unit_part {
            "" | "B" => 1,
            "KB" | "K" => 1_000,
            "KIB" => 1_024,
            "MB" | "M" => 1_000_000,
            "MIB" => 1_024 * 1_024,
            "GB" | "G" => 1_000_000_000,
            "GIB" => 1_024 * 1_024 * 1_024,
            "TB" | "T" => 1_000_000_000_000,
            "TIB" => 1_024_u64.pow(4),
            _ => return Err(Error::InvalidSize(format!("unsupported unit: {unit_part}"))),
        };

        Ok((number * multiplier as f64) as u64)
    }
}

/// Lower-cases an extension and makes sure it starts with a dot.
/// Returns `None` for an empty string.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    if ext.is_empty() || ext == "." {
        return None;
    }

    let lower = ext.to_lowercase();
    if lower.starts_with('.') {
        Some(lower)
    } else {
        Some(format!(".{lower}"))
    }
}

/// Extension of a base name from its last dot, dot included. A dot-file such
/// as `.bashrc` is its own extension; a name without a dot has none.
fn extension_of(name: &str) -> &str {
    name.rfind('.').map(|i| &name[i..]).unwrap_or("")
}

fn days_ago(days: u64) -> SystemTime {
    let span = Duration::from_secs(days.saturating_mul(SECS_PER_DAY));
    SystemTime::now()
        .checked_sub(span)
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
