//! Cache root resolution
//!
//! The cache lives at `<local-data>/<app>/map_cache`. A [`CacheRoot`] is built
//! once at startup and handed to the manager and the tile provider.

use crate::error::{Result, TileCacheError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_APP_NAME: &str = "SbN_Toolkit";
pub const CACHE_DIR_NAME: &str = "map_cache";

/// Directory that owns every cached tile. Exists once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRoot {
    path: PathBuf,
}

impl CacheRoot {
    /// Resolve the per-user cache root for `app_name` and create it
    pub fn resolve(app_name: &str) -> Result<Self> {
        Self::resolve_in(&local_data_dir()?, app_name)
    }

    /// Resolve the cache root under an explicit local-data directory
    pub fn resolve_in(base: &Path, app_name: &str) -> Result<Self> {
        Self::open(base.join(app_name).join(CACHE_DIR_NAME))
    }

    /// Use `path` as the cache root, creating it if missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "Cache root ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for CacheRoot {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

fn local_data_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::data_local_dir() {
        return Ok(dir);
    }

    let home = dirs::home_dir().ok_or(TileCacheError::NoHomeDirectory)?;
    Ok(fallback_local_data_dir(&home))
}

#[cfg(windows)]
fn fallback_local_data_dir(home: &Path) -> PathBuf {
    home.join("AppData").join("Local")
}

#[cfg(not(windows))]
fn fallback_local_data_dir(home: &Path) -> PathBuf {
    home.join(".local").join("share")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_in_builds_namespaced_path() {
        let dir = tempdir().unwrap();
        let root = CacheRoot::resolve_in(dir.path(), "TestApp").unwrap();

        assert_eq!(root.path(), dir.path().join("TestApp").join("map_cache"));
        assert!(root.path().is_dir());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let dir = tempdir().unwrap();
        let first = CacheRoot::resolve_in(dir.path(), "TestApp").unwrap();
        std::fs::write(first.path().join("tile.png"), b"data").unwrap();

        let second = CacheRoot::resolve_in(dir.path(), "TestApp").unwrap();
        assert_eq!(first, second);
        // Existing contents are left alone
        assert!(second.path().join("tile.png").exists());
    }

    #[test]
    fn test_open_fails_when_path_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let result = CacheRoot::open(blocker.join("map_cache"));
        assert!(matches!(result, Err(TileCacheError::Io(_))));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_fallback_local_data_dir() {
        let home = Path::new("/home/someone");
        assert_eq!(
            fallback_local_data_dir(home),
            PathBuf::from("/home/someone/.local/share")
        );
    }
}
