//! Cache types

use crate::error::{Result, TileCacheError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

pub const DEFAULT_MAX_SIZE_MB: u64 = 500;
pub const DEFAULT_TARGET_SIZE_MB: u64 = 300;

/// A cache holding more than this is treated as already prewarmed
const PREWARMED_MIN_BYTES: u64 = 50 * BYTES_PER_MB;
const PREWARMED_MIN_FILES: usize = 100;

/// Size limits for the cache. Eviction starts at `max_bytes` and stops at
/// `target_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBudget {
    max_bytes: u64,
    target_bytes: u64,
}

impl CacheBudget {
    pub fn new(max_bytes: u64, target_bytes: u64) -> Result<Self> {
        if target_bytes >= max_bytes {
            return Err(TileCacheError::InvalidBudget {
                max_bytes,
                target_bytes,
            });
        }
        Ok(Self {
            max_bytes,
            target_bytes,
        })
    }

    pub fn from_mb(max_mb: u64, target_mb: u64) -> Result<Self> {
        match (
            max_mb.checked_mul(BYTES_PER_MB),
            target_mb.checked_mul(BYTES_PER_MB),
        ) {
            (Some(max_bytes), Some(target_bytes)) => Self::new(max_bytes, target_bytes),
            _ => Err(TileCacheError::InvalidBudget {
                max_bytes: max_mb.saturating_mul(BYTES_PER_MB),
                target_bytes: target_mb.saturating_mul(BYTES_PER_MB),
            }),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn target_bytes(&self) -> u64 {
        self.target_bytes
    }
}

impl Default for CacheBudget {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_SIZE_MB * BYTES_PER_MB,
            target_bytes: DEFAULT_TARGET_SIZE_MB * BYTES_PER_MB,
        }
    }
}

/// One cached file found under the cache root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size: u64,
    pub last_accessed: DateTime<Utc>,
}

/// Snapshot of cache usage reported to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub total_bytes: u64,
    pub size_mb: f64,
    pub file_count: usize,
    pub max_mb: f64,
}

impl CacheStatus {
    pub fn new(total_bytes: u64, file_count: usize, max_bytes: u64) -> Self {
        Self {
            total_bytes,
            size_mb: total_bytes as f64 / BYTES_PER_MB as f64,
            file_count,
            max_mb: max_bytes as f64 / BYTES_PER_MB as f64,
        }
    }

    /// Whether the cache already looks populated enough to skip a precache sweep
    pub fn is_prewarmed(&self) -> bool {
        self.total_bytes > PREWARMED_MIN_BYTES && self.file_count > PREWARMED_MIN_FILES
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} MB ({} files), limit: {:.0} MB",
            self.size_mb, self.file_count, self.max_mb
        )
    }
}

/// Outcome of one eviction sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvictionReport {
    /// False when the cache was under budget and nothing was touched
    pub evicted: bool,
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub delete_failures: usize,
    pub size_before: u64,
    pub size_after: u64,
    pub duration_ms: u64,
}
