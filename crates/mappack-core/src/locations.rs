//! Points of interest: one capital and one geological feature per region,
//! each with a camera view derived from a stable hash of the region key.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::grid::{Grid, PixelCoord};
use crate::highpoints::HighPoint;
use crate::vector::{Capital, Region};

pub const CITY_ICON: &str = "icons/icon_city.png";
pub const MOUNTAIN_ICON: &str = "icons/icon_mountain.png";

/// Geological marker for a region.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub description: String,
    pub pixel: PixelCoord,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraView {
    pub distance: f64,
    pub polar: f64,
    pub azimuth: f64,
    pub target_pixel: PixelCoord,
}

/// One entry of `locations.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub pixel: PixelCoord,
    pub show_border: bool,
    pub view: CameraView,
    pub description: String,
}

// ── Hashing ──────────────────────────────────────────────────────────────────

/// 64-bit hash of `text`. SipHash with fixed keys, so it is the same on every
/// run, unlike `RandomState`.
pub fn stable_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// `(h(seed) % modulus) / 100`.
fn hashed_offset(seed: &str, modulus: u64) -> f64 {
    (stable_hash(seed) % modulus) as f64 / 100.0
}

/// Azimuth in `[-1.8, 1.8)`.
fn hashed_azimuth(seed: &str) -> f64 {
    ((stable_hash(seed) % 360) as f64 - 180.0) / 100.0
}

impl CameraView {
    pub fn for_capital(key: &str, target: PixelCoord) -> Self {
        Self {
            distance: 2.0 + hashed_offset(key, 60),
            polar: 0.65 + hashed_offset(&format!("{key}polar"), 35),
            azimuth: hashed_azimuth(&format!("{key}azimuth")),
            target_pixel: target,
        }
    }

    pub fn for_feature(key: &str, target: PixelCoord) -> Self {
        Self {
            distance: 1.7 + hashed_offset(&format!("{key}feat"), 40),
            polar: 0.7 + hashed_offset(&format!("{key}feat-polar"), 30),
            azimuth: hashed_azimuth(&format!("{key}feat-azimuth")),
            target_pixel: target,
        }
    }
}

// ── Fallback joins ───────────────────────────────────────────────────────────

/// The region's capital, or a placeholder at its representative point.
pub fn resolve_capital(region: &Region, capitals: &HashMap<String, Capital>) -> Capital {
    match capitals.get(&region.key) {
        Some(capital) => capital.clone(),
        None => Capital {
            pixel: region.point,
            name: format!("{} Capital", region.name),
        },
    }
}

/// The region's high point, or a placeholder at its representative point.
pub fn resolve_feature(region: &Region, features: &HashMap<String, Feature>) -> Feature {
    match features.get(&region.key) {
        Some(feature) => feature.clone(),
        None => Feature {
            name: format!("{} Highlands", region.name),
            description: format!("Representative geological feature for {}.", region.name),
            pixel: region.point,
        },
    }
}

/// Features from the high-point tables. US entries win over Canadian ones
/// with the same key; regions in neither table are absent.
pub fn features_from_highpoints(
    regions: &[Region],
    us: &HashMap<String, HighPoint>,
    ca: &HashMap<String, HighPoint>,
    grid: &Grid,
) -> HashMap<String, Feature> {
    regions
        .iter()
        .filter_map(|region| {
            let hp = us.get(&region.key).or_else(|| ca.get(&region.key))?;
            Some((
                region.key.clone(),
                Feature {
                    name: hp.name.clone(),
                    description: format!("Highest point of {}.", region.name),
                    pixel: grid.geo_to_pixel(hp.lon, hp.lat),
                },
            ))
        })
        .collect()
}

// ── Locations ────────────────────────────────────────────────────────────────

/// Two locations per region, capital first, in region order.
pub fn build_locations(
    regions: &[Region],
    capitals: &HashMap<String, Capital>,
    features: &HashMap<String, Feature>,
    grid: &Grid,
) -> Vec<Location> {
    let mut out = Vec::with_capacity(regions.len() * 2);
    for region in regions {
        let capital = resolve_capital(region, capitals);
        out.push(Location {
            id: format!("loc-na-{}", region.key),
            name: capital.name,
            icon: CITY_ICON.to_string(),
            pixel: capital.pixel,
            show_border: false,
            view: CameraView::for_capital(&region.key, capital.pixel),
            description: format!("Capital city for {}.", region.name),
        });

        let feature = resolve_feature(region, features);
        let pixel = clamp_to_grid(feature.pixel, grid);
        out.push(Location {
            id: format!("loc-na-{}-feature", region.key),
            name: feature.name,
            icon: MOUNTAIN_ICON.to_string(),
            pixel,
            show_border: false,
            view: CameraView::for_feature(&region.key, pixel),
            description: feature.description,
        });
    }
    log::debug!("{} locations for {} regions", out.len(), regions.len());
    out
}

fn clamp_to_grid(px: PixelCoord, grid: &Grid) -> PixelCoord {
    let max_x = grid.width.saturating_sub(1) as u32;
    let max_y = grid.height.saturating_sub(1) as u32;
    PixelCoord::new(px.x.min(max_x), px.y.min(max_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BOUNDS;
    use approx::assert_abs_diff_eq;

    fn region(name: &str, key: &str) -> Region {
        Region { name: name.into(), key: key.into(), point: PixelCoord::new(10, 20) }
    }

    #[test]
    fn hash_is_stable_and_input_sensitive() {
        assert_eq!(stable_hash("alaska"), stable_hash("alaska"));
        assert_ne!(stable_hash("alaska"), stable_hash("alaskapolar"));
    }

    #[test]
    fn camera_parameters_stay_in_range() {
        for key in ["alaska", "quebec", "nunavut", "rhode_island", "british_columbia"] {
            let c = CameraView::for_capital(key, PixelCoord::new(0, 0));
            assert!((2.0..2.6).contains(&c.distance), "{key}: {c:?}");
            assert!((0.65..1.0).contains(&c.polar), "{key}: {c:?}");
            assert!((-1.8..1.8).contains(&c.azimuth), "{key}: {c:?}");

            let f = CameraView::for_feature(key, PixelCoord::new(0, 0));
            assert!((1.7..2.1).contains(&f.distance), "{key}: {f:?}");
            assert!((0.7..1.0).contains(&f.polar), "{key}: {f:?}");
            assert!((-1.8..1.8).contains(&f.azimuth), "{key}: {f:?}");
        }
    }

    #[test]
    fn camera_distance_follows_hash() {
        let c = CameraView::for_capital("ohio", PixelCoord::new(1, 2));
        assert_abs_diff_eq!(c.distance, 2.0 + (stable_hash("ohio") % 60) as f64 / 100.0);
        assert_eq!(c.target_pixel, PixelCoord::new(1, 2));
    }

    #[test]
    fn missing_records_fall_back_to_region_point() {
        let r = region("Nunavut", "nunavut");
        let capital = resolve_capital(&r, &HashMap::new());
        assert_eq!(capital.name, "Nunavut Capital");
        assert_eq!(capital.pixel, r.point);

        let feature = resolve_feature(&r, &HashMap::new());
        assert_eq!(feature.name, "Nunavut Highlands");
        assert_eq!(feature.description, "Representative geological feature for Nunavut.");
        assert_eq!(feature.pixel, r.point);
    }

    #[test]
    fn us_table_wins_over_canada() {
        let grid = Grid::new(BOUNDS, 4096, 4096);
        let regions = [region("Alaska", "alaska"), region("Yukon", "yukon"), region("Ohio", "ohio")];
        let hp = |name: &str| HighPoint { name: name.into(), lat: 61.0, lon: -141.0 };
        let us = HashMap::from([("alaska".to_string(), hp("Denali"))]);
        let ca = HashMap::from([
            ("alaska".to_string(), hp("Wrong")),
            ("yukon".to_string(), hp("Mount Logan")),
        ]);

        let features = features_from_highpoints(&regions, &us, &ca, &grid);
        assert_eq!(features.len(), 2);
        assert_eq!(features["alaska"].name, "Denali");
        assert_eq!(features["yukon"].description, "Highest point of Yukon.");
        assert_eq!(features["yukon"].pixel, grid.geo_to_pixel(-141.0, 61.0));
    }

    #[test]
    fn two_locations_per_region_with_stable_ids() {
        let grid = Grid::new(BOUNDS, 64, 64);
        let regions = [region("Québec", "quebec"), region("Ohio", "ohio")];
        let capitals = HashMap::from([(
            "ohio".to_string(),
            Capital { pixel: PixelCoord::new(5, 6), name: "Columbus".into() },
        )]);

        let locs = build_locations(&regions, &capitals, &HashMap::new(), &grid);
        let ids: Vec<&str> = locs.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["loc-na-quebec", "loc-na-quebec-feature", "loc-na-ohio", "loc-na-ohio-feature"]);
        assert_eq!(locs[2].name, "Columbus");
        assert_eq!(locs[2].description, "Capital city for Ohio.");
        assert_eq!(locs[2].icon, CITY_ICON);
        assert_eq!(locs[3].icon, MOUNTAIN_ICON);
        assert_eq!(locs[2].view.target_pixel, PixelCoord::new(5, 6));

        let again = build_locations(&regions, &capitals, &HashMap::new(), &grid);
        assert_eq!(locs, again);
    }

    #[test]
    fn serializes_camel_case_fields() {
        let grid = Grid::new(BOUNDS, 64, 64);
        let locs = build_locations(&[region("Ohio", "ohio")], &HashMap::new(), &HashMap::new(), &grid);
        let json = serde_json::to_value(&locs[0]).unwrap();
        assert_eq!(json["showBorder"], false);
        assert_eq!(json["pixel"]["x"], 10);
        assert_eq!(json["view"]["targetPixel"]["y"], 20);
        assert!(json["view"]["distance"].is_f64());
    }
}
