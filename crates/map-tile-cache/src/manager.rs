//! Size accounting and recency-based eviction over the cache root
//!
//! The cache keeps no index of its own. Sizes and last-access times come
//! straight from the filesystem on every sweep, so the tree may be mutated
//! concurrently by tile readers and writers. A path that disappears between
//! listing and use is treated as already handled.
//!
//! Eviction approximates LRU using the file access time. On filesystems that
//! do not update access times the order degrades, but the size bound still
//! holds.

use crate::error::Result;
use crate::fs::{CacheFs, FileKind, FileMeta, StdFs};
use crate::store::CacheRoot;
use crate::types::{CacheBudget, CacheEntry, CacheStatus, EvictionReport};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Keeps the cache root within a [`CacheBudget`]
pub struct CacheManager<F: CacheFs = StdFs> {
    root: PathBuf,
    budget: CacheBudget,
    fs: F,
}

impl CacheManager<StdFs> {
    pub fn new(root: &CacheRoot, budget: CacheBudget) -> Self {
        Self::with_fs(root, budget, StdFs)
    }
}

impl<F: CacheFs> CacheManager<F> {
    pub fn with_fs(root: &CacheRoot, budget: CacheBudget, fs: F) -> Self {
        Self {
            root: root.path().to_path_buf(),
            budget,
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn budget(&self) -> CacheBudget {
        self.budget
    }

    /// Total bytes and number of regular files under the root.
    ///
    /// Unreadable directories are skipped, so the result may undercount; the
    /// next sweep will see them again.
    pub fn measure(&self) -> (u64, usize) {
        let mut total_bytes = 0u64;
        let mut file_count = 0usize;
        self.walk(&self.root, &mut |_, meta| {
            total_bytes += meta.len;
            file_count += 1;
        });
        (total_bytes, file_count)
    }

    /// Every cached file with its size and last-access time.
    ///
    /// Files whose access time cannot be read are left out.
    pub fn list_entries(&self) -> Vec<CacheEntry> {
        let mut entries = Vec::new();
        self.walk(&self.root, &mut |path, meta| {
            let Some(accessed) = meta.accessed else {
                debug!(path = %path.display(), "No access time, skipping entry");
                return;
            };
            entries.push(CacheEntry {
                path,
                size: meta.len,
                last_accessed: DateTime::<Utc>::from(accessed),
            });
        });
        entries
    }

    /// Evict least recently accessed files when the cache has reached its max
    /// size, stopping once it is at or below the target size.
    pub fn evict_if_over_budget(&self) -> EvictionReport {
        let (total_bytes, _) = self.measure();
        if total_bytes < self.budget.max_bytes() {
            return EvictionReport {
                size_before: total_bytes,
                size_after: total_bytes,
                ..Default::default()
            };
        }
        self.evict_from(total_bytes)
    }

    /// Measure, evict if over budget, and report the resulting usage.
    ///
    /// Cheap enough to call after every batch of writes: when under budget it
    /// only walks the tree.
    pub fn check_and_cleanup(&self) -> CacheStatus {
        let (total_bytes, file_count) = self.measure();
        let max_bytes = self.budget.max_bytes();

        if total_bytes < max_bytes {
            debug!(total_bytes, file_count, max_bytes, "Cache within budget");
            return CacheStatus::new(total_bytes, file_count, max_bytes);
        }

        let report = self.evict_from(total_bytes);
        info!(
            files_deleted = report.files_deleted,
            bytes_freed = report.bytes_freed,
            delete_failures = report.delete_failures,
            size_before = report.size_before,
            size_after = report.size_after,
            duration_ms = report.duration_ms,
            "Cache eviction complete"
        );

        let (total_bytes, file_count) = self.measure();
        CacheStatus::new(total_bytes, file_count, max_bytes)
    }

    /// Delete everything under the root and recreate it empty.
    ///
    /// Returns the usage measured just before the wipe.
    pub fn clear_all(&self) -> Result<CacheStatus> {
        let (total_bytes, file_count) = self.measure();
        let before = CacheStatus::new(total_bytes, file_count, self.budget.max_bytes());

        match self.fs.remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.fs.create_dir_all(&self.root)?;

        info!(
            root = %self.root.display(),
            files_removed = file_count,
            bytes_removed = total_bytes,
            "Cache cleared"
        );
        Ok(before)
    }

    fn evict_from(&self, size_before: u64) -> EvictionReport {
        let start = Instant::now();
        let target_bytes = self.budget.target_bytes();
        let to_free = size_before.saturating_sub(target_bytes);

        info!(
            size_before,
            max_bytes = self.budget.max_bytes(),
            target_bytes,
            "Cache over budget, starting eviction"
        );

        let mut entries = self.list_entries();
        // Stable: ties keep walk order
        entries.sort_by_key(|entry| entry.last_accessed);

        let mut report = EvictionReport {
            evicted: true,
            size_before,
            ..Default::default()
        };
        let mut remaining = size_before;

        for entry in entries {
            if remaining <= target_bytes {
                break;
            }

            match self.fs.remove_file(&entry.path) {
                Ok(()) => {
                    report.files_deleted += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %entry.path.display(), "Entry already gone");
                }
                Err(e) => {
                    report.delete_failures += 1;
                    warn!(
                        path = %entry.path.display(),
                        error = %e,
                        "Failed to delete cache entry, continuing"
                    );
                    continue;
                }
            }

            report.bytes_freed += entry.size;
            remaining = remaining.saturating_sub(entry.size);
            debug!(
                path = %entry.path.display(),
                progress_pct = progress_percent(report.bytes_freed, to_free),
                "Evicted cache entry"
            );
        }

        if remaining > target_bytes {
            warn!(
                remaining,
                target_bytes,
                shortfall_bytes = remaining - target_bytes,
                "Eviction could not reach target size"
            );
        }

        self.remove_empty_dirs(&self.root);

        report.size_after = remaining;
        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    fn walk(&self, dir: &Path, visit: &mut dyn FnMut(PathBuf, FileMeta)) {
        let children = match self.fs.read_dir(dir) {
            Ok(children) => children,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Directory vanished during walk");
                return;
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable cache directory");
                return;
            }
        };

        for path in children {
            let meta = match self.fs.metadata(&path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "File vanished during walk");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to stat cache entry");
                    continue;
                }
            };

            match meta.kind {
                FileKind::Dir => self.walk(&path, visit),
                FileKind::File => visit(path, meta),
                FileKind::Other => {}
            }
        }
    }

    /// Remove empty subdirectories bottom-up. `dir` itself is kept.
    fn remove_empty_dirs(&self, dir: &Path) {
        let Ok(children) = self.fs.read_dir(dir) else {
            return;
        };

        for child in children {
            let is_dir = matches!(self.fs.metadata(&child), Ok(meta) if meta.kind == FileKind::Dir);
            if !is_dir {
                continue;
            }

            self.remove_empty_dirs(&child);

            let is_empty = matches!(self.fs.read_dir(&child), Ok(rest) if rest.is_empty());
            if !is_empty {
                continue;
            }
            match self.fs.remove_dir(&child) {
                Ok(()) => debug!(dir = %child.display(), "Removed empty cache directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => debug!(dir = %child.display(), error = %e, "Could not remove directory"),
            }
        }
    }
}

fn progress_percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0).min(100.0)
}
