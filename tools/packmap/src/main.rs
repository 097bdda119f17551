/// Pack a built map directory into a single `.wyn` archive for the editor.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mappack_core::archive::pack_map;

#[derive(Parser, Debug)]
#[command(name = "packmap", about = "Zip a map directory into a .wyn archive")]
struct Args {
    /// Built map directory
    #[arg(long, default_value = "maps/north-america")]
    map_dir: PathBuf,

    /// Archive to write (replaced if present)
    #[arg(short, long, default_value = "maps/north-america-terrain.wyn")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    anyhow::ensure!(args.map_dir.is_dir(), "{} is not a directory", args.map_dir.display());
    let files = pack_map(&args.map_dir, &args.output)
        .with_context(|| format!("Packing {} into {}", args.map_dir.display(), args.output.display()))?;
    log::info!("{} ({files} files)", args.output.display());
    Ok(())
}
