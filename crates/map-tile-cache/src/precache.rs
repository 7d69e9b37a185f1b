//! Cache prewarming over a bounding box and zoom range
//!
//! The box is cut into a `grid_n × grid_n` lattice and every cell is fetched
//! once per zoom level, one request at a time. Keeping the sweep sequential
//! bounds memory to a single cell's tiles and keeps the request rate polite.
//! A failed cell is logged and skipped; running the job again is the retry.

use crate::bbox::BoundingBox;
use crate::error::{Result, TileCacheError};
use crate::provider::{TileProvider, TileSource};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_GRID: u32 = 6;
pub const DEFAULT_ZOOM_MIN: u8 = 4;
pub const DEFAULT_ZOOM_MAX: u8 = 8;

/// One sub-box of the lattice at one zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub zoom: u8,
    /// Index along latitude, from `lat_min`
    pub row: u32,
    /// Index along longitude, from `lon_min`
    pub col: u32,
    pub bbox: BoundingBox,
}

/// `n` equal intervals over `[min, max]`, returned as `n + 1` boundaries.
/// The last boundary is exactly `max`.
fn boundaries(min: f64, max: f64, n: u32) -> Vec<f64> {
    let step = (max - min) / n as f64;
    (0..n)
        .map(|i| min + i as f64 * step)
        .chain(std::iter::once(max))
        .collect()
}

/// Partition `bbox` into `grid_n × grid_n` cells for `zoom`
pub fn grid_cells(bbox: &BoundingBox, grid_n: u32, zoom: u8) -> Vec<GridCell> {
    let lons = boundaries(bbox.lon_min, bbox.lon_max, grid_n);
    let lats = boundaries(bbox.lat_min, bbox.lat_max, grid_n);

    let mut cells = Vec::with_capacity((grid_n as usize) * (grid_n as usize));
    for row in 0..grid_n as usize {
        for col in 0..grid_n as usize {
            cells.push(GridCell {
                zoom,
                row: row as u32,
                col: col as u32,
                bbox: BoundingBox {
                    lon_min: lons[col],
                    lat_min: lats[row],
                    lon_max: lons[col + 1],
                    lat_max: lats[row + 1],
                },
            });
        }
    }
    cells
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecacheRequest {
    pub bbox: BoundingBox,
    pub zoom_min: u8,
    pub zoom_max: u8,
    pub grid_n: u32,
    pub source: TileSource,
}

impl PrecacheRequest {
    pub fn new(bbox: BoundingBox, zoom_min: u8, zoom_max: u8) -> Self {
        Self {
            bbox,
            zoom_min,
            zoom_max,
            grid_n: DEFAULT_GRID,
            source: TileSource::default(),
        }
    }

    pub fn with_grid(mut self, grid_n: u32) -> Self {
        self.grid_n = grid_n;
        self
    }

    pub fn with_source(mut self, source: TileSource) -> Self {
        self.source = source;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;
        if self.zoom_min > self.zoom_max {
            return Err(TileCacheError::InvalidZoomRange {
                min: self.zoom_min,
                max: self.zoom_max,
            });
        }
        if self.grid_n == 0 {
            return Err(TileCacheError::InvalidGrid(self.grid_n));
        }
        Ok(())
    }

    /// `(zoom_max - zoom_min + 1) × grid_n²`
    pub fn total_units(&self) -> u64 {
        let levels = (self.zoom_max as u64).saturating_sub(self.zoom_min as u64) + 1;
        levels * (self.grid_n as u64) * (self.grid_n as u64)
    }
}

impl Default for PrecacheRequest {
    fn default() -> Self {
        Self::new(BoundingBox::LATIN_AMERICA, DEFAULT_ZOOM_MIN, DEFAULT_ZOOM_MAX)
    }
}

/// Reported after every processed cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecacheProgress {
    pub completed: u64,
    pub total: u64,
    pub zoom: u8,
    pub row: u32,
    pub col: u32,
    pub ok: bool,
}

impl PrecacheProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCell {
    pub zoom: u8,
    pub row: u32,
    pub col: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecacheReport {
    pub total: u64,
    pub succeeded: u64,
    pub failed: Vec<FailedCell>,
    pub tiles_fetched: u64,
    pub cache_hits: u64,
    pub bytes_fetched: u64,
    pub duration_ms: u64,
}

/// Runs precache sweeps against a tile provider
pub struct PrecacheJob<P: TileProvider> {
    provider: P,
}

impl<P: TileProvider> PrecacheJob<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Sweep every zoom level and grid cell of `request`, caching as it goes.
    ///
    /// Only an invalid request is an error. Fetch failures are recorded in the
    /// report and the sweep moves on to the next cell.
    pub async fn run(
        &self,
        request: &PrecacheRequest,
        mut on_progress: impl FnMut(&PrecacheProgress),
    ) -> Result<PrecacheReport> {
        request.validate()?;

        let start = Instant::now();
        let total = request.total_units();
        let mut report = PrecacheReport {
            total,
            ..Default::default()
        };
        let mut completed = 0u64;

        info!(
            bbox = %request.bbox,
            zoom_min = request.zoom_min,
            zoom_max = request.zoom_max,
            grid_n = request.grid_n,
            source = %request.source.name,
            total,
            "Starting precache sweep"
        );

        for zoom in request.zoom_min..=request.zoom_max {
            for cell in grid_cells(&request.bbox, request.grid_n, zoom) {
                let outcome = self
                    .provider
                    .fetch_tile(&cell.bbox, zoom, &request.source, true)
                    .await;

                let ok = match outcome {
                    Ok(fetched) => {
                        report.succeeded += 1;
                        report.tiles_fetched += fetched.tiles.len() as u64;
                        report.cache_hits += fetched.cache_hits() as u64;
                        report.bytes_fetched += fetched.bytes();
                        true
                    }
                    Err(e) => {
                        warn!(zoom, row = cell.row, col = cell.col, error = %e, "Precache cell failed");
                        report.failed.push(FailedCell {
                            zoom,
                            row: cell.row,
                            col: cell.col,
                            error: e.to_string(),
                        });
                        false
                    }
                };

                completed += 1;
                let progress = PrecacheProgress {
                    completed,
                    total,
                    zoom,
                    row: cell.row,
                    col: cell.col,
                    ok,
                };
                debug!(
                    zoom,
                    row = cell.row,
                    col = cell.col,
                    percent = progress.percent(),
                    "Precache progress"
                );
                on_progress(&progress);
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            tiles_fetched = report.tiles_fetched,
            cache_hits = report.cache_hits,
            duration_ms = report.duration_ms,
            "Precache sweep finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FetchedTiles;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and fails on one designated cell
    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<(BoundingBox, u8)>>,
        fail_on: Option<BoundingBox>,
    }

    #[async_trait]
    impl TileProvider for RecordingProvider {
        async fn fetch_tile(
            &self,
            bbox: &BoundingBox,
            zoom: u8,
            _source: &TileSource,
            use_cache: bool,
        ) -> Result<FetchedTiles> {
            assert!(use_cache);
            self.calls.lock().unwrap().push((*bbox, zoom));

            if self.fail_on.as_ref() == Some(bbox) {
                return Err(TileCacheError::Provider("connection reset".to_string()));
            }
            Ok(FetchedTiles {
                tiles: vec![],
                extent: *bbox,
            })
        }
    }

    fn square(half: f64) -> BoundingBox {
        BoundingBox::new(-half, -half, half, half).unwrap()
    }

    #[test]
    fn test_boundaries_end_exactly_at_max() {
        let b = boundaries(-118.0, -34.0, 6);
        assert_eq!(b.len(), 7);
        assert_eq!(b[0], -118.0);
        assert_eq!(b[6], -34.0);
        assert_eq!(b[3], -76.0);
    }

    #[test]
    fn test_grid_cells_two_by_two() {
        let cells = grid_cells(&square(10.0), 2, 1);

        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].bbox, BoundingBox::new(-10.0, -10.0, 0.0, 0.0).unwrap());
        assert_eq!(cells[1].bbox, BoundingBox::new(0.0, -10.0, 10.0, 0.0).unwrap());
        assert_eq!(cells[2].bbox, BoundingBox::new(-10.0, 0.0, 0.0, 10.0).unwrap());
        assert_eq!(cells[3].bbox, BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap());
        assert_eq!((cells[3].row, cells[3].col), (1, 1));
        assert!(cells.iter().all(|c| c.zoom == 1));
    }

    #[test]
    fn test_single_cell_grid_is_whole_bbox() {
        let bbox = square(3.0);
        let cells = grid_cells(&bbox, 1, 0);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].bbox, bbox);
    }

    #[test]
    fn test_total_units() {
        let request = PrecacheRequest::new(square(1.0), 4, 8).with_grid(6);
        assert_eq!(request.total_units(), 5 * 36);
    }

    #[test]
    fn test_default_request() {
        let request = PrecacheRequest::default();
        assert_eq!(request.bbox, BoundingBox::LATIN_AMERICA);
        assert_eq!((request.zoom_min, request.zoom_max), (4, 8));
        assert_eq!(request.grid_n, 6);
        assert_eq!(request.source, TileSource::openstreetmap_mapnik());
    }

    #[tokio::test]
    async fn test_grid_coverage_with_one_failure() {
        let provider = RecordingProvider {
            fail_on: Some(BoundingBox::new(-10.0, -10.0, 0.0, 0.0).unwrap()),
            ..Default::default()
        };
        let job = PrecacheJob::new(provider);
        let request = PrecacheRequest::new(square(10.0), 1, 1).with_grid(2);

        let mut progress = Vec::new();
        let report = job.run(&request, |p| progress.push(*p)).await.unwrap();

        let calls = job.provider().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|(_, zoom)| *zoom == 1));

        for lons in [(-10.0, 0.0), (0.0, 10.0)] {
            for lats in [(-10.0, 0.0), (0.0, 10.0)] {
                let expected = BoundingBox::new(lons.0, lats.0, lons.1, lats.1).unwrap();
                assert!(calls.iter().any(|(bbox, _)| *bbox == expected));
            }
        }

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(
            (report.failed[0].zoom, report.failed[0].row, report.failed[0].col),
            (1, 0, 0)
        );
        assert!(report.failed[0].error.contains("connection reset"));

        assert_eq!(progress.len(), 4);
        assert_eq!(progress.iter().filter(|p| !p.ok).count(), 1);
        assert_eq!(progress.last().unwrap().completed, 4);
        assert_eq!(progress.last().unwrap().fraction(), 1.0);
    }

    #[tokio::test]
    async fn test_sweeps_every_zoom_level() {
        let job = PrecacheJob::new(RecordingProvider::default());
        let request = PrecacheRequest::new(square(20.0), 3, 5).with_grid(3);

        let mut count = 0;
        let report = job.run(&request, |_| count += 1).await.unwrap();

        let calls = job.provider().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 27);
        assert_eq!(count, 27);
        assert_eq!(report.succeeded, 27);
        for zoom in 3..=5u8 {
            assert_eq!(calls.iter().filter(|(_, z)| *z == zoom).count(), 9);
        }
        // Zoom levels are processed in ascending order
        assert!(calls.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[tokio::test]
    async fn test_invalid_zoom_range_issues_no_requests() {
        let job = PrecacheJob::new(RecordingProvider::default());
        let request = PrecacheRequest::new(square(1.0), 6, 2);

        let result = job.run(&request, |_| {}).await;

        assert!(matches!(
            result,
            Err(TileCacheError::InvalidZoomRange { min: 6, max: 2 })
        ));
        assert!(job.provider().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_grid_is_rejected() {
        let job = PrecacheJob::new(RecordingProvider::default());
        let request = PrecacheRequest::new(square(1.0), 1, 1).with_grid(0);

        let result = job.run(&request, |_| {}).await;

        assert!(matches!(result, Err(TileCacheError::InvalidGrid(0))));
    }
}
