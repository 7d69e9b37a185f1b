//! Map cache CLI - inspect, clean and prewarm the map tile cache
//!
//! Configuration comes from the environment (`MAP_CACHE_DIR`,
//! `MAP_CACHE_MAX_MB`, `MAP_CACHE_TARGET_MB`, ...) and can be overridden with
//! the global flags below.

mod commands;
mod config;
mod error;

use crate::commands::PrecacheOptions;
use crate::config::load_config;
use crate::error::Result;
use clap::{Parser, Subcommand};
use map_tile_cache::{BoundingBox, DEFAULT_GRID, DEFAULT_ZOOM_MAX, DEFAULT_ZOOM_MIN};
use std::path::PathBuf;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "map-cache")]
#[command(about = "Inspect, clean and prewarm the map tile cache", long_about = None)]
struct Cli {
    /// Cache root (defaults to <local data>/<app>/map_cache)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Size in MB at which eviction starts
    #[arg(long, global = true)]
    max_mb: Option<u64>,

    /// Size in MB eviction trims the cache down to
    #[arg(long, global = true)]
    target_mb: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show cache location, size and file count
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evict least recently used tiles if the cache is over its limit
    Cleanup,
    /// Delete every cached tile
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
        /// Clear even when the cache is small
        #[arg(long)]
        force: bool,
    },
    /// Download and cache tiles for a region ahead of time
    Precache {
        /// Region as lon_min,lat_min,lon_max,lat_max (defaults to Latin America)
        #[arg(long, default_value = "-118,-56,-34,33", allow_hyphen_values = true)]
        bbox: BoundingBox,

        #[arg(long, default_value_t = DEFAULT_ZOOM_MIN)]
        zoom_min: u8,

        #[arg(long, default_value_t = DEFAULT_ZOOM_MAX)]
        zoom_max: u8,

        /// Subdivisions per side of the region
        #[arg(long, default_value_t = DEFAULT_GRID)]
        grid: u32,

        /// Precache even if the cache already looks populated
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("map_cache=info".parse()?)
        .add_directive("map_tile_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    let cli = Cli::parse();

    let mut config = load_config();
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(max_mb) = cli.max_mb {
        config.max_mb = max_mb;
    }
    if let Some(target_mb) = cli.target_mb {
        config.target_mb = target_mb;
    }

    match cli.command {
        Command::Status { json } => commands::status(&config, json),
        Command::Cleanup => commands::run_cleanup(&config).await,
        Command::Clear { yes, force } => commands::clear(&config, yes, force),
        Command::Precache {
            bbox,
            zoom_min,
            zoom_max,
            grid,
            force,
        } => {
            commands::precache(
                &config,
                PrecacheOptions {
                    bbox,
                    zoom_min,
                    zoom_max,
                    grid,
                    force,
                },
            )
            .await
        }
    }
}
