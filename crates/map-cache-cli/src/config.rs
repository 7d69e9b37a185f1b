//! Configuration loaded from the environment and command-line flags

use crate::error::{CliError, Result};
use map_tile_cache::{
    CacheBudget, CacheRoot, HttpTileProviderConfig, DEFAULT_APP_NAME, DEFAULT_MAX_SIZE_MB,
    DEFAULT_TARGET_SIZE_MB,
};
use std::path::PathBuf;

const DEFAULT_USER_AGENT: &str = "SbN_Toolkit map-cache/0.1";

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Explicit cache root; resolved from the platform data dir when unset
    pub cache_dir: Option<PathBuf>,
    pub app_name: String,
    pub max_mb: u64,
    pub target_mb: u64,
    pub user_agent: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            max_mb: DEFAULT_MAX_SIZE_MB,
            target_mb: DEFAULT_TARGET_SIZE_MB,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CliConfig {
    pub fn budget(&self) -> Result<CacheBudget> {
        CacheBudget::from_mb(self.max_mb, self.target_mb).map_err(|_| {
            CliError::Config(format!(
                "target size ({} MB) must be below max size ({} MB)",
                self.target_mb, self.max_mb
            ))
        })
    }

    pub fn cache_root(&self) -> Result<CacheRoot> {
        let root = match &self.cache_dir {
            Some(dir) => CacheRoot::open(dir.clone())?,
            None => CacheRoot::resolve(&self.app_name)?,
        };
        Ok(root)
    }

    pub fn provider_config(&self) -> HttpTileProviderConfig {
        HttpTileProviderConfig {
            user_agent: self.user_agent.clone(),
            ..Default::default()
        }
    }
}

pub fn load_config() -> CliConfig {
    load_config_with(|key| std::env::var(key).ok())
}

fn load_config_with(var: impl Fn(&str) -> Option<String>) -> CliConfig {
    let defaults = CliConfig::default();

    let cache_dir = var("MAP_CACHE_DIR")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let app_name = var("MAP_CACHE_APP_NAME").unwrap_or(defaults.app_name);

    let max_mb = var("MAP_CACHE_MAX_MB")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.max_mb);

    let target_mb = var("MAP_CACHE_TARGET_MB")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.target_mb);

    let user_agent = var("TILE_USER_AGENT").unwrap_or(defaults.user_agent);

    CliConfig {
        cache_dir,
        app_name,
        max_mb,
        target_mb,
        user_agent,
    }
}
