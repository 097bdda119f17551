/// North America map pack builder: downloads Natural Earth boundaries, a
/// bedrock DEM and the Wikipedia high-point tables, then writes the complete
/// editor map directory (layers, legend, locations, metadata, thumbnail).
///
/// Downloads are cached under the data directory; rerunning only rebuilds.
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use mappack_core::config::{build_grid, BuildConfig, DemSource, OPENTOPO_KEY_VAR};
use mappack_core::fetch::Fetcher;
use mappack_core::pipeline::{build_map, fetch_inputs};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Dem {
    /// Global ETOPO1 bedrock (no key needed)
    Etopo1,
    /// OpenTopography SRTM15+ tiles
    Srtm15plus,
    /// OpenTopography SRTM GL3 tiles
    Srtmgl3,
}

impl Dem {
    fn source(self) -> DemSource {
        match self {
            Dem::Etopo1 => DemSource::Etopo1,
            Dem::Srtm15plus => DemSource::OpenTopography { demtype: "SRTM15Plus".into() },
            Dem::Srtmgl3 => DemSource::OpenTopography { demtype: "SRTMGL3".into() },
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "na_builder",
    about = "Build the North America map pack from public boundary and elevation data"
)]
struct Args {
    /// Repository root; the other paths default relative to it
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Download cache [default: <root>/scripts/data]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output map directory [default: <root>/maps/north-america]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Map to copy theme.json and icons/ from [default: <root>/maps/wynnal]
    #[arg(long)]
    template: Option<PathBuf>,

    /// Bedrock elevation source
    #[arg(long, value_enum, default_value_t = Dem::Etopo1)]
    dem: Dem,

    /// OpenTopography API key (required for the tiled sources)
    #[arg(long, env = OPENTOPO_KEY_VAR, hide_env_values = true)]
    opentopo_key: Option<String>,
}

impl Args {
    fn into_config(self) -> BuildConfig {
        let mut config = BuildConfig::from_root(&self.root);
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = self.output {
            config.map_dir = dir;
        }
        if let Some(dir) = self.template {
            config.template_dir = dir;
        }
        config.dem_source = self.dem.source();
        config.opentopo_key = self.opentopo_key;
        config
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    config.validate().context("Invalid DEM configuration")?;

    let started = Instant::now();
    let grid = build_grid();
    log::info!(
        "building {}x{} map into {} ({:?})",
        grid.width,
        grid.height,
        config.map_dir.display(),
        config.dem_source
    );

    let fetcher = Fetcher::new().context("Cannot create HTTP client")?;
    let inputs = fetch_inputs(&fetcher, &config, &grid)
        .with_context(|| format!("Fetching inputs into {}", config.data_dir.display()))?;

    let summary = build_map(grid, inputs, &config.map_dir, &config.template_dir, Local::now())
        .with_context(|| format!("Building map in {}", config.map_dir.display()))?;

    log::info!(
        "done: {} regions, {} locations, {} legend warnings ({:.1}s)",
        summary.regions,
        summary.locations,
        summary.legend.warnings.len(),
        started.elapsed().as_secs_f32()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn flagless_invocation_uses_root_layout() {
        let config = Args::try_parse_from(["na_builder"]).unwrap().into_config();
        assert_eq!(config.map_dir, PathBuf::from("./maps/north-america"));
        assert_eq!(config.dem_source, DemSource::Etopo1);
    }

    #[test]
    fn explicit_paths_override_root() {
        let config = Args::try_parse_from([
            "na_builder",
            "--root",
            "/repo",
            "--output",
            "/tmp/out",
            "--dem",
            "srtmgl3",
            "--opentopo-key",
            "k",
        ])
        .unwrap()
        .into_config();
        assert_eq!(config.map_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.data_dir, PathBuf::from("/repo/scripts/data"));
        assert_eq!(config.dem_source, DemSource::OpenTopography { demtype: "SRTMGL3".into() });
        assert!(config.validate().is_ok());
    }
}
