//! Latitude/longitude biome bands.
//!
//! Thresholds, in degrees at each pixel center:
//!   - Tundra  lat ≥ 60
//!   - Taiga   50 ≤ lat < 60
//!   - Desert  lat < 37, lon < −110
//!   - Plains  37 ≤ lat < 50, −110 ≤ lon < −95
//!   - Forest  everything else
//!
//! Masks are claimed in that order; a pixel taken by an earlier biome is
//! excluded from every later one, so the masks partition the land.

use crate::grid::Layer;
use crate::raster::BURN_VALUE;

/// Declared in claim order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Biome {
    Tundra,
    Taiga,
    Desert,
    Plains,
    Forest,
}

impl Biome {
    /// Claim order.
    pub const PRIORITY: [Biome; 5] = [Biome::Tundra, Biome::Taiga, Biome::Desert, Biome::Plains, Biome::Forest];

    pub fn key(self) -> &'static str {
        match self {
            Biome::Tundra => "tundra",
            Biome::Taiga => "taiga",
            Biome::Desert => "desert",
            Biome::Plains => "plains",
            Biome::Forest => "forest",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Biome::Tundra => "Tundra",
            Biome::Taiga => "Taiga",
            Biome::Desert => "Desert",
            Biome::Plains => "Plains",
            Biome::Forest => "Forest",
        }
    }

    /// Editor display color.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Biome::Tundra => [126, 162, 170],
            Biome::Taiga => [60, 88, 85],
            Biome::Desert => [185, 152, 78],
            Biome::Plains => [117, 152, 70],
            Biome::Forest => [34, 98, 60],
        }
    }

    pub fn matches(self, lat: f64, lon: f64) -> bool {
        match self {
            Biome::Tundra => lat >= 60.0,
            Biome::Taiga => (50.0..60.0).contains(&lat),
            Biome::Desert => lat < 37.0 && lon < -110.0,
            Biome::Plains => (37.0..50.0).contains(&lat) && (-110.0..-95.0).contains(&lon),
            Biome::Forest => true,
        }
    }

    /// First biome in priority order whose band contains (lat, lon).
    pub fn classify(lat: f64, lon: f64) -> Biome {
        Self::PRIORITY
            .into_iter()
            .find(|b| b.matches(lat, lon))
            .unwrap_or(Biome::Forest)
    }
}

/// One mask per biome, in [`Biome::PRIORITY`] order.
#[derive(Debug, Clone)]
pub struct BiomeMasks {
    pub masks: Vec<(Biome, Layer)>,
}

/// Build the biome partition of `land`.
pub fn classify_biomes(land: &Layer) -> BiomeMasks {
    let grid = land.grid;
    let mut masks: Vec<(Biome, Layer)> = Biome::PRIORITY.iter().map(|&b| (b, Layer::empty(grid))).collect();

    for row in 0..grid.height {
        let lat = grid.lat_of_row(row);
        for col in 0..grid.width {
            let idx = row * grid.width + col;
            if land.is_set(idx) {
                let biome = Biome::classify(lat, grid.lon_of_col(col));
                masks[biome as usize].1.data[idx] = BURN_VALUE;
            }
        }
    }

    for (biome, mask) in &masks {
        log::debug!("biome {}: {} px", biome.key(), mask.count_set());
    }
    BiomeMasks { masks }
}
