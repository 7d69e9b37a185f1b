//! Tile provider capability
//!
//! A provider downloads the raster tiles covering a bounding box at a zoom
//! level and, when asked to, persists them under the cache root. The precache
//! job only talks to the [`TileProvider`] trait; [`HttpTileProvider`] is the
//! XYZ-over-HTTP implementation.

mod http;

pub use http::{tile_range, HttpTileProvider, HttpTileProviderConfig, TileRange};

use crate::bbox::BoundingBox;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Web Mercator tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// An XYZ tile source such as OpenStreetMap Mapnik
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSource {
    /// Short name, also used as the cache subdirectory
    pub name: String,
    /// URL with `{z}`, `{x}` and `{y}` placeholders
    pub url_template: String,
    pub max_zoom: u8,
    /// File extension for cached tiles
    pub extension: String,
}

impl TileSource {
    pub fn openstreetmap_mapnik() -> Self {
        Self {
            name: "openstreetmap_mapnik".to_string(),
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            max_zoom: 19,
            extension: "png".to_string(),
        }
    }

    pub fn tile_url(&self, tile: &TileCoord) -> String {
        self.url_template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    /// Location of `tile` under `cache_dir`: `<name>/<z>/<x>/<y>.<ext>`
    pub fn tile_path(&self, cache_dir: &Path, tile: &TileCoord) -> PathBuf {
        cache_dir
            .join(&self.name)
            .join(tile.zoom.to_string())
            .join(tile.x.to_string())
            .join(format!("{}.{}", tile.y, self.extension))
    }
}

impl Default for TileSource {
    fn default() -> Self {
        Self::openstreetmap_mapnik()
    }
}

/// Encoded bytes of one tile
#[derive(Debug, Clone)]
pub struct TileImage {
    pub coord: TileCoord,
    pub data: Vec<u8>,
    pub from_cache: bool,
}

/// Result of one fetch: the tiles covering the request and their combined
/// geographic extent
#[derive(Debug, Clone)]
pub struct FetchedTiles {
    pub tiles: Vec<TileImage>,
    pub extent: BoundingBox,
}

impl FetchedTiles {
    pub fn bytes(&self) -> u64 {
        self.tiles.iter().map(|t| t.data.len() as u64).sum()
    }

    pub fn cache_hits(&self) -> usize {
        self.tiles.iter().filter(|t| t.from_cache).count()
    }
}

#[async_trait]
pub trait TileProvider: Send + Sync {
    /// Fetch the tiles covering `bbox` at `zoom` from `source`. With
    /// `use_cache`, cached tiles are served from disk and new downloads are
    /// written to the cache.
    async fn fetch_tile(
        &self,
        bbox: &BoundingBox,
        zoom: u8,
        source: &TileSource,
        use_cache: bool,
    ) -> Result<FetchedTiles>;
}
