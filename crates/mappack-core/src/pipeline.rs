//! Stage orchestration: everything between "inputs are on disk" and "map
//! directory is complete".

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Local};

use crate::biomes::classify_biomes;
use crate::config::{BuildConfig, DemSource, BORDER_BUFFER_DEG, CA_HIGHPOINTS_URL, US_HIGHPOINTS_URL};
use crate::dem::read_geotiff;
use crate::error::{MapPackError, Result};
use crate::fetch::{Fetcher, CA_HIGHPOINTS_FILE, US_HIGHPOINTS_FILE};
use crate::georaster::DemMosaic;
use crate::grid::Grid;
use crate::highpoints::{parse_ca_highpoints, parse_us_highpoints, HighPoint};
use crate::legend::{build_legend, validate_legend, LegendReport, Metadata};
use crate::locations::{build_locations, features_from_highpoints};
use crate::package::MapLayout;
use crate::raster::{mountain_mask, rasterize, rasterize_buffered_lines, BURN_VALUE};
use crate::terrain::{reproject_to_grid, synthesize_heightmap, SHORE};
use crate::vector::{build_regions, clip_to_bounds, find_capitals, land_geometries, read_features, VectorFeature};

/// Everything the build reads, already parsed.
pub struct MapInputs {
    pub countries: Vec<VectorFeature>,
    pub states: Vec<VectorFeature>,
    pub places: Vec<VectorFeature>,
    pub elevation: DemMosaic,
    pub us_highpoints: HashMap<String, HighPoint>,
    pub ca_highpoints: HashMap<String, HighPoint>,
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub regions: usize,
    pub locations: usize,
    pub legend: LegendReport,
}

/// Fetch (or reuse cached) inputs and parse them.
pub fn fetch_inputs(fetcher: &Fetcher, config: &BuildConfig, grid: &Grid) -> Result<MapInputs> {
    config.validate()?;

    let vectors = fetcher.fetch_vectors(&config.data_dir)?;
    let countries = read_features(&vectors.countries)?;
    let states = read_features(&vectors.states)?;
    let places = read_features(&vectors.places)?;
    log::info!(
        "vectors: {} countries, {} states/provinces, {} places",
        countries.len(),
        states.len(),
        places.len()
    );

    let elevation = match &config.dem_source {
        DemSource::Etopo1 => {
            let tif = fetcher.fetch_etopo1(&config.data_dir)?;
            DemMosaic::new(vec![read_geotiff(&tif, Some(grid.bbox))?])
        }
        DemSource::OpenTopography { demtype } => {
            let paths = fetcher.fetch_dem_tiles(&config.data_dir, demtype, grid.bbox, config.api_key())?;
            let tiles = paths
                .iter()
                .map(|p| read_geotiff(p, Some(grid.bbox)))
                .collect::<Result<Vec<_>>>()?;
            DemMosaic::new(tiles)
        }
    };

    let us_page = fetcher.fetch_html(US_HIGHPOINTS_URL, &config.data_dir.join(US_HIGHPOINTS_FILE))?;
    let ca_page = fetcher.fetch_html(CA_HIGHPOINTS_URL, &config.data_dir.join(CA_HIGHPOINTS_FILE))?;
    let us_highpoints = parse_us_highpoints(&us_page)?;
    let ca_highpoints = parse_ca_highpoints(&ca_page)?;
    log::info!(
        "high points: {} US, {} Canada",
        us_highpoints.len(),
        ca_highpoints.len()
    );

    Ok(MapInputs { countries, states, places, elevation, us_highpoints, ca_highpoints })
}

/// Rasterize, synthesize and package a complete map into `map_dir`.
///
/// Fails with [`MapPackError::InvalidLegend`] when the written files do not
/// satisfy the legend; missing masks are only reported as warnings.
pub fn build_map(
    grid: Grid,
    inputs: MapInputs,
    map_dir: &Path,
    template_dir: &Path,
    built_at: DateTime<Local>,
) -> Result<BuildSummary> {
    let layout = MapLayout::new(map_dir, grid);
    layout.ensure_dirs(template_dir)?;

    let countries = clip_to_bounds(inputs.countries, grid.bbox);
    let states = clip_to_bounds(inputs.states, grid.bbox);

    // ── Masks
    let t = Instant::now();
    let land = rasterize(grid, land_geometries(&countries), BURN_VALUE);
    layout.save_layer("land.png", &land)?;
    layout.save_layer("water_mask.png", &land.inverted())?;
    layout.save_layer("mountain_ranges_mask.png", &mountain_mask(grid))?;
    log::info!("masks: {} land px ({:.1}s)", land.count_set(), t.elapsed().as_secs_f32());

    // ── Terrain
    let t = Instant::now();
    let elevation = reproject_to_grid(&inputs.elevation, &grid);
    layout.save_layer("heightmap.png", &synthesize_heightmap(&elevation, &land)?)?;
    log::info!("heightmap ({:.1}s)", t.elapsed().as_secs_f32());

    // ── Biomes
    for (biome, mask) in &classify_biomes(&land).masks {
        layout.save_layer(&format!("biome_{}.png", biome.key()), mask)?;
    }

    // ── Regions and borders
    let regions = build_regions(&states, &grid);
    let borders = rasterize_buffered_lines(grid, &regions.borders, BORDER_BUFFER_DEG, BURN_VALUE);
    layout.save_layer("state_borders.png", &borders)?;
    log::info!("{} regions, {} border rings", regions.regions.len(), regions.borders.len());

    // ── Locations
    let capitals = find_capitals(&inputs.places, &regions.regions, &grid);
    let features = features_from_highpoints(&regions.regions, &inputs.us_highpoints, &inputs.ca_highpoints, &grid);
    log::debug!(
        "{} capitals and {} high points matched",
        capitals.len(),
        features.len()
    );
    let locations = build_locations(&regions.regions, &capitals, &features, &grid);

    // ── Documents
    let legend = build_legend(&grid, SHORE);
    layout.write_json("legend.json", &legend)?;
    layout.write_json("locations.json", &locations)?;
    layout.write_json("metadata.json", &Metadata::stamped(built_at))?;
    layout.copy_theme(template_dir)?;
    layout.write_thumbnail(&land)?;
    layout.write_readme()?;

    let report = validate_legend(&legend, map_dir);
    if !report.is_ok() {
        return Err(MapPackError::InvalidLegend(report.errors.join("; ")));
    }

    Ok(BuildSummary {
        regions: regions.regions.len(),
        locations: locations.len(),
        legend: report,
    })
}
