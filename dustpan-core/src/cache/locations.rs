use std::path::PathBuf;

use super::{CacheLocation, LocationKind};

/// Environment-provided base directories the registry builds on.
///
/// Any field may be missing; the locations derived from it are then left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationEnv {
    pub home: Option<PathBuf>,
    /// Per-user cache directory (`$XDG_CACHE_HOME`, `~/Library/Caches`, ...).
    pub cache: Option<PathBuf>,
    /// `%LOCALAPPDATA%` on Windows.
    pub local_data: Option<PathBuf>,
    /// `$TMPDIR` / `%TEMP%`.
    pub temp: Option<PathBuf>,
    /// `%SystemRoot%` on Windows.
    pub system_root: Option<PathBuf>,
}

impl LocationEnv {
    /// Reads the current process environment.
    pub fn from_process() -> Self {
        Self {
            home: dirs::home_dir(),
            cache: dirs::cache_dir(),
            local_data: env_path("LOCALAPPDATA").or_else(dirs::data_local_dir),
            temp: Some(std::env::temp_dir()),
            system_root: env_path("SystemRoot"),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Cache locations for `os` (as in `std::env::consts::OS`) using the
/// current process environment.
pub fn locations_for(os: &str) -> Vec<CacheLocation> {
    locations_for_env(os, &LocationEnv::from_process())
}

/// Cache locations for `os` built from `env`. Unsupported systems get an
/// empty list.
pub fn locations_for_env(os: &str, env: &LocationEnv) -> Vec<CacheLocation> {
    let candidates: Vec<(Option<PathBuf>, LocationKind)> = match os {
        "windows" => vec![
            (env.temp.clone(), LocationKind::System),
            (
                env.local_data.as_ref().map(|dir| dir.join("Temp")),
                LocationKind::User,
            ),
            (
                env.system_root.as_ref().map(|dir| dir.join("Temp")),
                LocationKind::System,
            ),
            (
                env.local_data
                    .as_ref()
                    .map(|dir| dir.join("Microsoft").join("Windows").join("INetCache")),
                LocationKind::User,
            ),
        ],
        "linux" => vec![
            (Some(PathBuf::from("/tmp")), LocationKind::System),
            (Some(PathBuf::from("/var/tmp")), LocationKind::System),
            (
                env.cache
                    .clone()
                    .or_else(|| env.home.as_ref().map(|home| home.join(".cache"))),
                LocationKind::User,
            ),
        ],
        "macos" | "darwin" => vec![
            (env.temp.clone(), LocationKind::System),
            (
                env.home.as_ref().map(|home| home.join("Library").join("Caches")),
                LocationKind::User,
            ),
            (
                env.home.as_ref().map(|home| home.join("Library").join("Logs")),
                LocationKind::User,
            ),
        ],
        _ => Vec::new(),
    };

    let mut locations: Vec<CacheLocation> = Vec::with_capacity(candidates.len());
    for (path, kind) in candidates {
        let Some(path) = path else { continue };
        if locations.iter().any(|loc| loc.path == path) {
            continue;
        }
        locations.push(CacheLocation { path, kind });
    }

    locations
}
