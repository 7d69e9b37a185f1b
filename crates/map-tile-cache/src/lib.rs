//! Disk-backed map tile cache
//!
//! Downloaded raster tiles live as plain files under a per-user cache root.
//! The only metadata is what the filesystem already tracks (size and
//! last-access time), which is enough to keep the cache within a size budget
//! and to evict the least recently used tiles first.
//!
//! - [`CacheRoot`] resolves and creates the cache directory.
//! - [`CacheManager`] measures the tree and evicts oldest-accessed files once
//!   it grows past the budget.
//! - [`PrecacheJob`] walks a bounding box across zoom levels and asks a
//!   [`TileProvider`] to fetch and cache each grid cell.
//!
//! # Example
//!
//! ```no_run
//! use map_tile_cache::{
//!     CacheBudget, CacheManager, CacheRoot, HttpTileProvider, HttpTileProviderConfig,
//!     PrecacheJob, PrecacheRequest,
//! };
//!
//! # async fn example() -> map_tile_cache::Result<()> {
//! let root = CacheRoot::resolve("MyApp")?;
//! let manager = CacheManager::new(&root, CacheBudget::default());
//! println!("Map cache: {}", manager.check_and_cleanup());
//!
//! let provider = HttpTileProvider::persistent(&root, HttpTileProviderConfig::default())?;
//! let job = PrecacheJob::new(provider);
//! job.run(&PrecacheRequest::default(), |p| println!("{:.1}%", p.percent()))
//!     .await?;
//!
//! manager.check_and_cleanup();
//! # Ok(())
//! # }
//! ```

mod bbox;
mod error;
mod fs;
mod manager;
mod precache;
mod provider;
mod store;
mod types;

pub use bbox::BoundingBox;
pub use error::{Result, TileCacheError};
pub use fs::{CacheFs, FileKind, FileMeta, StdFs};
pub use manager::CacheManager;
pub use precache::{
    grid_cells, FailedCell, GridCell, PrecacheJob, PrecacheProgress, PrecacheReport,
    PrecacheRequest, DEFAULT_GRID, DEFAULT_ZOOM_MAX, DEFAULT_ZOOM_MIN,
};
pub use provider::{
    tile_range, FetchedTiles, HttpTileProvider, HttpTileProviderConfig, TileCoord, TileImage,
    TileProvider, TileRange, TileSource,
};
pub use store::{CacheRoot, CACHE_DIR_NAME, DEFAULT_APP_NAME};
pub use types::{
    CacheBudget, CacheEntry, CacheStatus, EvictionReport, BYTES_PER_MB, DEFAULT_MAX_SIZE_MB,
    DEFAULT_TARGET_SIZE_MB,
};
