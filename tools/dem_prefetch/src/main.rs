/// Prefetch the OpenTopography DEM tiles covering the North America build
/// box, so a later `na_builder --dem ...` run works from the cache.
/// Truncated or undecodable tiles already in the cache are fetched again.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mappack_core::config::{BOUNDS, OPENTOPO_KEY_VAR};
use mappack_core::fetch::Fetcher;
use mappack_core::MapPackError;

#[derive(Parser, Debug)]
#[command(name = "dem_prefetch", about = "Download the tiled OpenTopography DEMs for the North America map")]
struct Args {
    /// Download cache shared with na_builder
    #[arg(long, default_value = "scripts/data")]
    data_dir: PathBuf,

    /// OpenTopography dataset names to fetch
    #[arg(long = "demtype", default_values_t = ["SRTMGL3".to_string(), "SRTM15Plus".to_string()])]
    demtypes: Vec<String>,

    /// OpenTopography API key
    #[arg(long, env = OPENTOPO_KEY_VAR, hide_env_values = true)]
    opentopo_key: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let key = args
        .opentopo_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or(MapPackError::MissingApiKey(OPENTOPO_KEY_VAR))?;

    let fetcher = Fetcher::new().context("Cannot create HTTP client")?;
    for demtype in &args.demtypes {
        let paths = fetcher
            .fetch_dem_tiles(&args.data_dir, demtype, BOUNDS, Some(key))
            .with_context(|| format!("Fetching {demtype} tiles into {}", args.data_dir.display()))?;
        log::info!("{demtype}: {} tiles cached", paths.len());
    }
    Ok(())
}
