use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use dustpan_core::{FileFilter, WalkConfig};

const PROFILE_DIR: &str = "dustpan";
const PROFILE_FILE: &str = "filters.toml";

/// Saved filter settings, read from a TOML file.
///
/// ```toml
/// min_size = "1MB"
/// extensions = ["log", "tmp"]
/// exclude = ["node_modules"]
/// older_than_days = 30
/// recursive = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterProfile {
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub older_than_days: Option<u64>,
    pub newer_than_days: Option<u64>,
    pub recursive: Option<bool>,
    pub threads: Option<usize>,
}

impl FilterProfile {
    /// `<config dir>/dustpan/filters.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROFILE_DIR).join(PROFILE_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read filter profile {}", path.display()))?;
        let profile = toml::from_str(&content)
            .with_context(|| format!("invalid filter profile {}", path.display()))?;
        debug!("loaded filter profile {:?}", path);
        Ok(profile)
    }

    /// Loads `explicit` when given, otherwise the default profile if one exists.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Layers `overrides` on top of `self`. Set values and non-empty lists win.
    pub fn overlay(self, overrides: FilterProfile) -> FilterProfile {
        FilterProfile {
            min_size: overrides.min_size.or(self.min_size),
            max_size: overrides.max_size.or(self.max_size),
            extensions: pick_list(overrides.extensions, self.extensions),
            exclude: pick_list(overrides.exclude, self.exclude),
            older_than_days: overrides.older_than_days.or(self.older_than_days),
            newer_than_days: overrides.newer_than_days.or(self.newer_than_days),
            recursive: overrides.recursive.or(self.recursive),
            threads: overrides.threads.or(self.threads),
        }
    }

    pub fn to_filter(&self) -> Result<FileFilter> {
        let min_size = parse_size(self.min_size.as_deref())?;
        let max_size = parse_size(self.max_size.as_deref())?;
        if max_size != 0 && min_size > max_size {
            bail!("minimum size {min_size} exceeds maximum size {max_size}");
        }

        let mut filter = FileFilter::new()
            .with_size_range(min_size, max_size)
            .with_extensions(&self.extensions)
            .with_exclude(self.exclude.iter().cloned());

        if let Some(days) = self.older_than_days {
            filter = filter.older_than_days(days);
        }
        if let Some(days) = self.newer_than_days {
            filter = filter.newer_than_days(days);
        }

        Ok(filter)
    }

    pub fn walk_config(&self) -> WalkConfig {
        WalkConfig {
            recursive: self.recursive.unwrap_or(false),
            threads: self.threads,
            ..Default::default()
        }
    }
}

fn pick_list(preferred: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if preferred.is_empty() { fallback } else { preferred }
}

fn parse_size(size: Option<&str>) -> Result<u64> {
    match size {
        Some(s) => FileFilter::parse_size_string(s).with_context(|| format!("bad size {s:?}")),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_profile() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("filters.toml");
        fs::write(
            &path,
            r#"
min_size = "1KB"
extensions = ["LOG", ".tmp"]
exclude = ["node_modules"]
older_than_days = 7
recursive = true
"#,
        )?;

        let profile = FilterProfile::load(&path)?;
        assert_eq!(profile.min_size.as_deref(), Some("1KB"));
        assert_eq!(profile.older_than_days, Some(7));
        assert_eq!(profile.recursive, Some(true));

        let filter = profile.to_filter()?;
        assert_eq!(filter.min_size, 1_000);
        assert!(filter.extensions.contains(".log"));
        assert!(filter.extensions.contains(".tmp"));
        assert_eq!(filter.exclude, vec!["node_modules".to_string()]);
        assert!(filter.older_than.is_some());
        assert!(profile.walk_config().recursive);

        Ok(())
    }

    #[test]
    fn test_unknown_field_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("filters.toml");
        fs::write(&path, "min_sise = \"1KB\"\n")?;

        let err = FilterProfile::load(&path).unwrap_err();
        assert!(err.to_string().contains("filters.toml"));

        Ok(())
    }

    #[test]
    fn test_missing_explicit_profile_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("none.toml");
        assert!(FilterProfile::resolve(Some(&missing)).is_err());
    }

    #[test]
    fn test_overlay_prefers_overrides() {
        let base = FilterProfile {
            min_size: Some("1MB".to_string()),
            extensions: vec!["log".to_string()],
            exclude: vec!["target".to_string()],
            threads: Some(2),
            ..Default::default()
        };
        let overrides = FilterProfile {
            min_size: Some("10".to_string()),
            extensions: vec!["tmp".to_string()],
            ..Default::default()
        };

        let merged = base.overlay(overrides);
        assert_eq!(merged.min_size.as_deref(), Some("10"));
        assert_eq!(merged.extensions, vec!["tmp".to_string()]);
        assert_eq!(merged.exclude, vec!["target".to_string()]);
        assert_eq!(merged.threads, Some(2));
    }

    #[test]
    fn test_inverted_size_range_rejected() {
        let profile = FilterProfile {
            min_size: Some("2KB".to_string()),
            max_size: Some("1KB".to_string()),
            ..Default::default()
        };
        assert!(profile.to_filter().is_err());
    }

    #[test]
    fn test_bad_size_rejected() {
        let profile = FilterProfile {
            max_size: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(profile.to_filter().is_err());
    }

    #[test]
    fn test_empty_profile_is_unrestricted() -> Result<()> {
        let profile = FilterProfile::default();
        assert!(profile.to_filter()?.is_unrestricted());
        assert!(!profile.walk_config().recursive);
        Ok(())
    }
}
