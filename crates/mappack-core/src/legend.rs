//! `legend.json` / `metadata.json` documents and the post-write legend check.

use std::path::Path;

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::biomes::Biome;
use crate::config::{MAP_AUTHOR, MAP_DESCRIPTION, MAP_SOURCE};
use crate::grid::Grid;
use crate::terrain::HEIGHT_SCALE;

pub const HEIGHTMAP_PATH: &str = "layers/heightmap.png";
pub const LAND_PATH: &str = "layers/land.png";
pub const WATER_PATH: &str = "layers/water_mask.png";
pub const MOUNTAINS_PATH: &str = "layers/mountain_ranges_mask.png";
pub const BORDERS_PATH: &str = "layers/state_borders.png";

/// Biome order in the legend. Differs from the claim order.
pub const LEGEND_BIOMES: [Biome; 5] = [Biome::Forest, Biome::Plains, Biome::Desert, Biome::Taiga, Biome::Tundra];

const LAND_RGB: [u8; 3] = [66, 120, 86];
const WATER_RGB: [u8; 3] = [34, 92, 124];
const MOUNTAINS_RGB: [u8; 3] = [120, 96, 88];
const BORDERS_RGB: [u8; 3] = [180, 180, 180];

pub fn biome_mask_path(biome: Biome) -> String {
    format!("layers/biome_{}.png", biome.key())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendLayer {
    pub label: String,
    pub mask: String,
    pub rgb: [u8; 3],
}

impl LegendLayer {
    fn new(label: &str, mask: &str, rgb: [u8; 3]) -> Self {
        Self { label: label.to_string(), mask: mask.to_string(), rgb }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub size: [usize; 2],
    pub sea_level: f64,
    pub height_scale: f64,
    pub heightmap: String,
    pub topology: String,
    pub biomes: IndexMap<String, LegendLayer>,
    pub overlays: IndexMap<String, LegendLayer>,
}

impl Legend {
    /// Every (section/key, layer) pair, biomes first.
    pub fn layers(&self) -> impl Iterator<Item = (String, &LegendLayer)> + '_ {
        let biomes = self.biomes.iter().map(|(k, l)| (format!("biomes.{k}"), l));
        let overlays = self.overlays.iter().map(|(k, l)| (format!("overlays.{k}"), l));
        biomes.chain(overlays)
    }
}

/// Legend for a build on `grid` with sea level at `shore`.
pub fn build_legend(grid: &Grid, shore: f32) -> Legend {
    let mut biomes: IndexMap<String, LegendLayer> = LEGEND_BIOMES
        .into_iter()
        .map(|b| (b.key().to_string(), LegendLayer::new(b.label(), &biome_mask_path(b), b.rgb())))
        .collect();
    biomes.insert("land".into(), LegendLayer::new("Land", LAND_PATH, LAND_RGB));

    let mut overlays = IndexMap::new();
    overlays.insert("water".into(), LegendLayer::new("Water", WATER_PATH, WATER_RGB));
    overlays.insert(
        "mountain_ranges".into(),
        LegendLayer::new("Mountain Ranges", MOUNTAINS_PATH, MOUNTAINS_RGB),
    );
    overlays.insert(
        "state_borders".into(),
        LegendLayer::new("State & Province Borders", BORDERS_PATH, BORDERS_RGB),
    );

    Legend {
        size: [grid.width, grid.height],
        sea_level: round_to(shore as f64, 4),
        height_scale: round_to(HEIGHT_SCALE as f64, 4),
        heightmap: HEIGHTMAP_PATH.into(),
        topology: HEIGHTMAP_PATH.into(),
        biomes,
        overlays,
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

// ── Metadata ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub label: String,
    pub author: String,
    pub source: String,
    pub description: String,
}

impl Metadata {
    /// Metadata stamped with the build time, e.g. "North America (2026-02-08 16:10)".
    pub fn stamped(at: DateTime<Local>) -> Self {
        Self {
            label: format!("North America ({})", at.format("%Y-%m-%d %H:%M")),
            author: MAP_AUTHOR.into(),
            source: MAP_SOURCE.into(),
            description: MAP_DESCRIPTION.into(),
        }
    }
}

// ── Validation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegendReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LegendReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every legend entry against the files under `map_dir`.
///
/// A layer without a mask path or label is an error, a mask file that does
/// not exist is a warning, and a mask whose pixel size differs from
/// `legend.size` is an error.
pub fn validate_legend(legend: &Legend, map_dir: &Path) -> LegendReport {
    let mut report = LegendReport::default();
    let [w, h] = legend.size;

    let check_image = |name: &str, rel: &str, report: &mut LegendReport| {
        let path = map_dir.join(rel);
        if !path.is_file() {
            report.warnings.push(format!("{name} references missing mask asset: {rel}"));
            return;
        }
        match image::image_dimensions(&path) {
            Ok((iw, ih)) if iw as usize == w && ih as usize == h => {}
            Ok((iw, ih)) => report
                .errors
                .push(format!("{name} mask {rel} is {iw}x{ih}, legend size is {w}x{h}")),
            Err(e) => report.errors.push(format!("{name} mask {rel} is unreadable: {e}")),
        }
    };

    check_image("heightmap", &legend.heightmap, &mut report);
    if legend.topology != legend.heightmap {
        check_image("topology", &legend.topology, &mut report);
    }

    for (name, layer) in legend.layers() {
        if layer.mask.is_empty() {
            report.errors.push(format!("{name} is missing a mask"));
            continue;
        }
        if layer.label.trim().is_empty() {
            report.errors.push(format!("{name} has an empty label"));
        }
        check_image(name.as_str(), &layer.mask, &mut report);
    }

    for warning in &report.warnings {
        log::warn!("legend: {warning}");
    }
    report
}
