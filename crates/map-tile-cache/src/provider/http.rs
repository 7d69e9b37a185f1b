//! XYZ tile downloads over HTTP with an on-disk tile store

use super::{FetchedTiles, TileCoord, TileImage, TileProvider, TileSource};
use crate::bbox::BoundingBox;
use crate::error::{Result, TileCacheError};
use crate::store::CacheRoot;
use async_trait::async_trait;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str = "map-tile-cache/0.1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Latitude limit of the Web Mercator projection
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Inward nudge of the east and south edges so a box ending exactly on a
/// tile boundary does not pull in the neighbouring tile
const EDGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct HttpTileProviderConfig {
    /// Tile servers such as OpenStreetMap require an identifying user agent
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpTileProviderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

enum TileStorage {
    /// Lives beyond the process; never cleaned up by the provider
    Persistent(PathBuf),
    /// Deleted when the provider is dropped
    Ephemeral(TempDir),
}

/// Downloads XYZ tiles and stores them as `<source>/<z>/<x>/<y>.<ext>`
pub struct HttpTileProvider {
    client: reqwest::Client,
    storage: TileStorage,
}

impl HttpTileProvider {
    /// Provider that writes tiles into the persistent cache root
    pub fn persistent(root: &CacheRoot, config: HttpTileProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            storage: TileStorage::Persistent(root.path().to_path_buf()),
        })
    }

    /// Provider backed by a scratch directory that is removed on drop
    pub fn ephemeral(config: HttpTileProviderConfig) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("map-tiles-").tempdir()?;
        Ok(Self {
            client: build_client(&config)?,
            storage: TileStorage::Ephemeral(dir),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        match &self.storage {
            TileStorage::Persistent(path) => path,
            TileStorage::Ephemeral(dir) => dir.path(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.storage, TileStorage::Persistent(_))
    }

    async fn load_or_download(
        &self,
        tile: TileCoord,
        source: &TileSource,
        use_cache: bool,
    ) -> Result<TileImage> {
        let path = source.tile_path(self.cache_dir(), &tile);

        if use_cache {
            match fs::read(&path).await {
                // Empty files are interrupted writes; fetch those again
                Ok(data) if !data.is_empty() => {
                    debug!(path = %path.display(), "Tile cache hit");
                    return Ok(TileImage {
                        coord: tile,
                        data,
                        from_cache: true,
                    });
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read cached tile");
                }
            }
        }

        let data = self.download(&source.tile_url(&tile)).await?;

        if use_cache {
            if let Err(e) = write_tile(&path, &data).await {
                warn!(path = %path.display(), error = %e, "Failed to cache tile");
                // Continue even if caching fails
            }
        }

        Ok(TileImage {
            coord: tile,
            data,
            from_cache: false,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "Downloading tile");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(TileCacheError::Provider(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TileProvider for HttpTileProvider {
    async fn fetch_tile(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
        source: &TileSource,
        use_cache: bool,
    ) -> Result<FetchedTiles> {
        if zoom > source.max_zoom {
            return Err(TileCacheError::ZoomNotSupported {
                zoom,
                max: source.max_zoom,
            });
        }
        bbox.validate()?;

        let range = tile_range(bbox, zoom);
        let mut tiles = Vec::with_capacity(range.len());
        for tile in range.iter() {
            tiles.push(self.load_or_download(tile, source, use_cache).await?);
        }

        debug!(
            zoom,
            tiles = tiles.len(),
            source = %source.name,
            "Fetched tiles for bounding box"
        );

        Ok(FetchedTiles {
            tiles,
            extent: range.extent(),
        })
    }
}

fn build_client(config: &HttpTileProviderConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .build()?)
}

/// Write to a sibling `.part` file and rename it into place, so an
/// interrupted write never leaves a truncated tile at `path`
async fn write_tile(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = fs::write(&partial, data).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&partial, path).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e);
    }
    Ok(())
}

/// Inclusive rectangle of tile columns and rows at one zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl TileRange {
    pub fn len(&self) -> usize {
        ((self.x_max - self.x_min + 1) as usize) * ((self.y_max - self.y_min + 1) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.y_min..=self.y_max).flat_map(move |y| {
            (self.x_min..=self.x_max).map(move |x| TileCoord {
                zoom: self.zoom,
                x,
                y,
            })
        })
    }

    /// Geographic area covered by the whole range
    pub fn extent(&self) -> BoundingBox {
        BoundingBox {
            lon_min: tile_x_to_lon(self.x_min, self.zoom),
            lat_min: tile_y_to_lat(self.y_max + 1, self.zoom),
            lon_max: tile_x_to_lon(self.x_max + 1, self.zoom),
            lat_max: tile_y_to_lat(self.y_min, self.zoom),
        }
    }
}

/// Tiles intersecting `bbox` at `zoom`. Latitudes are clamped to the Web
/// Mercator limit.
pub fn tile_range(bbox: &BoundingBox, zoom: u8) -> TileRange {
    let x_min = lon_to_tile_x(bbox.lon_min, zoom);
    // Rows count from the north
    let y_min = lat_to_tile_y(bbox.lat_max, zoom);
    TileRange {
        zoom,
        x_min,
        x_max: lon_to_tile_x(bbox.lon_max - EDGE_EPSILON, zoom).max(x_min),
        y_min,
        y_max: lat_to_tile_y(bbox.lat_min + EDGE_EPSILON, zoom).max(y_min),
    }
}

fn tiles_per_side(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}

fn clamp_to_grid(value: f64, zoom: u8) -> u32 {
    let last = tiles_per_side(zoom) - 1.0;
    value.floor().clamp(0.0, last) as u32
}

fn lon_to_tile_x(lon: f64, zoom: u8) -> u32 {
    clamp_to_grid((lon + 180.0) / 360.0 * tiles_per_side(zoom), zoom)
}

fn lat_to_tile_y(lat: f64, zoom: u8) -> u32 {
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * tiles_per_side(zoom);
    clamp_to_grid(y, zoom)
}

fn tile_x_to_lon(x: u32, zoom: u8) -> f64 {
    x as f64 / tiles_per_side(zoom) * 360.0 - 180.0
}

fn tile_y_to_lat(y: u32, zoom: u8) -> f64 {
    let n = PI * (1.0 - 2.0 * y as f64 / tiles_per_side(zoom));
    n.sinh().atan().to_degrees()
}
