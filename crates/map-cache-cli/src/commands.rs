//! Subcommand handlers

use crate::config::CliConfig;
use crate::error::Result;
use map_tile_cache::{
    BoundingBox, CacheManager, CacheStatus, HttpTileProvider, PrecacheJob, PrecacheRequest,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::info;

/// Below this size a manual clear is not worth suggesting
const CLEAR_SUGGESTION_MIN_MB: f64 = 100.0;

pub struct PrecacheOptions {
    pub bbox: BoundingBox,
    pub zoom_min: u8,
    pub zoom_max: u8,
    pub grid: u32,
    pub force: bool,
}

fn open_manager(config: &CliConfig) -> Result<Arc<CacheManager>> {
    let root = config.cache_root()?;
    Ok(Arc::new(CacheManager::new(&root, config.budget()?)))
}

fn current_status(manager: &CacheManager) -> CacheStatus {
    let (total_bytes, file_count) = manager.measure();
    CacheStatus::new(total_bytes, file_count, manager.budget().max_bytes())
}

/// Run `check_and_cleanup` off the async runtime
async fn cleanup(manager: &Arc<CacheManager>) -> Result<CacheStatus> {
    let manager = Arc::clone(manager);
    Ok(tokio::task::spawn_blocking(move || manager.check_and_cleanup()).await?)
}

pub fn status(config: &CliConfig, json: bool) -> Result<()> {
    let manager = open_manager(config)?;
    let status = current_status(&manager);

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Map cache: {}", manager.root().display());
        println!("  Size:  {:.1} MB", status.size_mb);
        println!("  Files: {}", status.file_count);
        println!("  Limit: {:.0} MB", status.max_mb);
    }
    Ok(())
}

pub async fn run_cleanup(config: &CliConfig) -> Result<()> {
    let manager = open_manager(config)?;
    let status = cleanup(&manager).await?;
    println!("Map cache: {}", status);
    Ok(())
}

pub fn clear(config: &CliConfig, yes: bool, force: bool) -> Result<()> {
    let manager = open_manager(config)?;
    let status = current_status(&manager);

    println!("Map cache: {}", manager.root().display());
    println!("  Size:  {:.1} MB", status.size_mb);
    println!("  Files: {}", status.file_count);
    println!(
        "The cache is trimmed automatically once it reaches {:.0} MB.",
        status.max_mb
    );

    if status.size_mb < CLEAR_SUGGESTION_MIN_MB && !force {
        println!(
            "Cache size is fine ({:.1} MB); nothing to clear. Use --force to clear anyway.",
            status.size_mb
        );
        return Ok(());
    }

    if !yes {
        let prompt = format!("Delete the entire cache ({:.1} MB)? (y/n): ", status.size_mb);
        let stdin = std::io::stdin();
        if !confirm(&mut stdin.lock(), &mut std::io::stdout(), &prompt)? {
            println!("Cancelled");
            return Ok(());
        }
    }

    let removed = manager.clear_all()?;
    println!(
        "Cache cleared: {} files ({:.1} MB) removed",
        removed.file_count, removed.size_mb
    );
    println!("Tiles will be downloaded again as the map is browsed.");
    Ok(())
}

pub async fn precache(config: &CliConfig, options: PrecacheOptions) -> Result<()> {
    let root = config.cache_root()?;
    let manager = Arc::new(CacheManager::new(&root, config.budget()?));

    let status = cleanup(&manager).await?;
    if status.is_prewarmed() && !options.force {
        info!(
            size_mb = status.size_mb,
            file_count = status.file_count,
            "Cache already populated, skipping precache"
        );
        println!("Map cache already populated ({}). Use --force to precache anyway.", status);
        return Ok(());
    }

    let provider = HttpTileProvider::persistent(&root, config.provider_config())?;
    let job = PrecacheJob::new(provider);
    let request = PrecacheRequest::new(options.bbox, options.zoom_min, options.zoom_max)
        .with_grid(options.grid);

    let report = job
        .run(&request, |p| {
            info!(
                zoom = p.zoom,
                row = p.row,
                col = p.col,
                ok = p.ok,
                "Precache {:5.1}%",
                p.percent()
            );
        })
        .await?;

    println!(
        "Precache finished: {}/{} cells ok, {} failed, {} tiles ({} from cache)",
        report.succeeded,
        report.total,
        report.failed.len(),
        report.tiles_fetched,
        report.cache_hits
    );

    let status = cleanup(&manager).await?;
    println!("Map cache: {}", status);
    Ok(())
}

/// Ask a yes/no question; anything but `y`/`yes` is a no
fn confirm(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> Result<bool> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
