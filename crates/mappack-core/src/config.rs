//! Fixed build constants and the resolved per-run configuration.
//!
//! Everything geographic (bounding box, grid, corridors, palette) is a
//! constant: the pack covers one region at one resolution. Only paths and the
//! elevation source vary between runs.

use std::path::{Path, PathBuf};

use crate::error::{MapPackError, Result};
use crate::grid::{BBox, Grid};

// ── Grid ─────────────────────────────────────────────────────────────────────

pub const WIDTH: usize = 4096;
pub const HEIGHT: usize = 4096;

/// US + Canada, including Alaska and the Caribbean margin.
pub const BOUNDS: BBox = BBox {
    min_lon: -168.0,
    min_lat: 14.0,
    max_lon: -52.0,
    max_lat: 72.0,
};

pub fn build_grid() -> Grid {
    Grid::new(BOUNDS, WIDTH, HEIGHT)
}

// ── Sources ──────────────────────────────────────────────────────────────────

pub const COUNTRIES_URL: &str = "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_10m_admin_0_countries.geojson";
pub const STATES_URL: &str = "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_10m_admin_1_states_provinces.geojson";
pub const PLACES_URL: &str = "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_10m_populated_places.geojson";
pub const US_HIGHPOINTS_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_U.S._states_and_territories_by_elevation";
pub const CA_HIGHPOINTS_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_highest_points_of_Canadian_provinces_and_territories";
pub const ETOPO1_BED_URL: &str = "https://www.ngdc.noaa.gov/mgg/global/relief/ETOPO1/data/bedrock/grid_registered/georeferenced_tiff/ETOPO1_Bed_g_geotiff.zip";
pub const OPENTOPO_API: &str = "https://portal.opentopography.org/API/globaldem";

/// Environment variable holding the OpenTopography API key.
pub const OPENTOPO_KEY_VAR: &str = "OPENTOPO_KEY";

/// OpenTopography rejects requests much larger than this, in degrees.
pub const DEM_TILE_STEP_DEG: f64 = 10.0;

// ── Vector selection ─────────────────────────────────────────────────────────

pub const TARGET_COUNTRIES: [&str; 2] = ["United States of America", "Canada"];
pub const EXCLUDED_REGIONS: [&str; 1] = ["District of Columbia"];
pub const CAPITAL_CLASSES: [&str; 2] = ["Admin-1 capital", "Admin-0 capital"];

// ── Procedural geometry ──────────────────────────────────────────────────────

/// Corridor half-width around each mountain range path, in degrees.
pub const MOUNTAIN_BUFFER_DEG: f64 = 2.2;
/// Half-width of region border lines, in degrees.
pub const BORDER_BUFFER_DEG: f64 = 0.15;

/// Hand-placed range spines as (lon, lat) vertices.
pub const MOUNTAIN_RANGES: &[(&str, &[(f64, f64)])] = &[
    ("Alaska Range", &[(-150.0, 62.0), (-140.0, 60.0), (-130.0, 58.0)]),
    ("Brooks Range", &[(-149.0, 69.0), (-141.0, 68.0), (-132.0, 67.0)]),
    ("Cascades", &[(-125.0, 49.0), (-122.0, 47.0), (-121.0, 44.0), (-120.0, 41.0)]),
    ("Sierra Nevada", &[(-123.5, 47.0), (-121.0, 44.0), (-119.0, 41.0), (-118.0, 37.0)]),
    (
        "Rockies",
        &[(-121.0, 55.0), (-114.0, 51.0), (-110.0, 46.0), (-107.0, 43.0), (-105.0, 39.0)],
    ),
    (
        "Appalachians",
        &[(-92.0, 47.0), (-89.0, 43.0), (-86.0, 39.0), (-82.0, 36.0), (-79.0, 34.0), (-76.0, 33.0)],
    ),
];

// ── Packaging ────────────────────────────────────────────────────────────────

pub const THUMBNAIL_SIZE: u32 = 512;
pub const MAP_AUTHOR: &str = "Connected Web";
pub const MAP_SOURCE: &str = "generated";
pub const MAP_DESCRIPTION: &str = "Synthetic North America sample built from Natural Earth boundaries, procedural terrain, and state/province borders.";

// ── Run configuration ────────────────────────────────────────────────────────

/// Where the bedrock elevation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemSource {
    /// One global ETOPO1 bedrock GeoTIFF, shipped as a ZIP.
    Etopo1,
    /// OpenTopography global DEM service, fetched in 10°×10° tiles.
    OpenTopography { demtype: String },
}

impl DemSource {
    pub fn needs_api_key(&self) -> bool {
        matches!(self, DemSource::OpenTopography { .. })
    }
}

/// Paths and switches for one build, resolved from the command line.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Download cache.
    pub data_dir: PathBuf,
    /// Output map directory.
    pub map_dir: PathBuf,
    /// Existing map to borrow `theme.json` and `icons/` from.
    pub template_dir: PathBuf,
    pub dem_source: DemSource,
    pub opentopo_key: Option<String>,
}

impl BuildConfig {
    /// Default layout relative to a repository root.
    pub fn from_root(root: &Path) -> Self {
        Self {
            data_dir: root.join("scripts").join("data"),
            map_dir: root.join("maps").join("north-america"),
            template_dir: root.join("maps").join("wynnal"),
            dem_source: DemSource::Etopo1,
            opentopo_key: None,
        }
    }

    /// Fails fast, before any network traffic, when the selected DEM source
    /// needs an API key that was not provided.
    pub fn validate(&self) -> Result<()> {
        if self.dem_source.needs_api_key() && self.api_key().is_none() {
            return Err(MapPackError::MissingApiKey(OPENTOPO_KEY_VAR));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.opentopo_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}
