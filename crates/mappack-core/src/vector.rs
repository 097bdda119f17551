//! Natural Earth GeoJSON → regions, land geometry, borders and capitals.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use geo::{Geometry, InteriorPoint, Intersects, LineString};
use geojson::{GeoJson, JsonObject, JsonValue};

use crate::config::{CAPITAL_CLASSES, EXCLUDED_REGIONS, TARGET_COUNTRIES};
use crate::error::{MapPackError, Result};
use crate::grid::{BBox, Grid, PixelCoord};
use crate::names::normalize_name;

/// A GeoJSON feature with its geometry already converted to `geo` types.
#[derive(Debug, Clone)]
pub struct VectorFeature {
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

impl VectorFeature {
    /// Non-empty string property.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(JsonValue::as_f64)
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

pub fn read_features(path: &Path) -> Result<Vec<VectorFeature>> {
    let text = fs::read_to_string(path)?;
    parse_features(&text, path)
}

/// Parse a FeatureCollection. Features without geometry are dropped.
pub fn parse_features(text: &str, label: &Path) -> Result<Vec<VectorFeature>> {
    let GeoJson::FeatureCollection(fc) = text.parse::<GeoJson>()? else {
        return Err(MapPackError::NotAFeatureCollection { path: label.to_path_buf() });
    };

    let mut out = Vec::with_capacity(fc.features.len());
    for feature in fc.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        out.push(VectorFeature {
            geometry: Geometry::<f64>::try_from(geometry)?,
            properties: feature.properties.unwrap_or_default(),
        });
    }
    Ok(out)
}

/// Keep features whose geometry intersects `bbox`.
pub fn clip_to_bounds(features: Vec<VectorFeature>, bbox: BBox) -> Vec<VectorFeature> {
    let bounds = Geometry::Polygon(
        geo::Rect::new(
            geo::coord! { x: bbox.min_lon, y: bbox.min_lat },
            geo::coord! { x: bbox.max_lon, y: bbox.max_lat },
        )
        .to_polygon(),
    );
    features
        .into_iter()
        .filter(|f| f.geometry.intersects(&bounds))
        .collect()
}

fn is_target_country(name: Option<&str>) -> bool {
    name.is_some_and(|n| TARGET_COUNTRIES.contains(&n))
}

/// Geometries of the target countries; their union is the land mass.
pub fn land_geometries(countries: &[VectorFeature]) -> Vec<&Geometry<f64>> {
    countries
        .iter()
        .filter(|f| is_target_country(f.prop_str("NAME_EN")))
        .map(|f| &f.geometry)
        .collect()
}

// ── Regions ──────────────────────────────────────────────────────────────────

/// A state or province.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub key: String,
    /// Representative interior point in pixel space.
    pub point: PixelCoord,
}

/// Regions of the target countries plus every ring of their outlines.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    pub regions: Vec<Region>,
    pub borders: Vec<LineString<f64>>,
}

pub fn build_regions(states: &[VectorFeature], grid: &Grid) -> RegionSet {
    let mut set = RegionSet::default();
    for state in states {
        if !is_target_country(state.prop_str("admin")) {
            continue;
        }
        let Some(name) = state
            .prop_str("name")
            .or_else(|| state.prop_str("name_en"))
            .or_else(|| state.prop_str("NAME"))
        else {
            continue;
        };
        if EXCLUDED_REGIONS.contains(&name) {
            continue;
        }
        let Some(point) = state.geometry.interior_point() else {
            log::warn!("region {name} has no interior point, skipping");
            continue;
        };

        set.borders.extend(boundary_rings(&state.geometry));
        set.regions.push(Region {
            name: name.to_string(),
            key: normalize_name(name),
            point: grid.geo_to_pixel(point.x(), point.y()),
        });
    }
    set
}

/// Exterior and interior rings of every polygon in `geometry`.
pub fn boundary_rings(geometry: &Geometry<f64>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    collect_rings(geometry, &mut rings);
    rings
}

fn collect_rings(geometry: &Geometry<f64>, rings: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::Polygon(p) => {
            rings.push(p.exterior().clone());
            rings.extend(p.interiors().iter().cloned());
        }
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                rings.push(p.exterior().clone());
                rings.extend(p.interiors().iter().cloned());
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                collect_rings(g, rings);
            }
        }
        _ => {}
    }
}

// ── Capitals ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Capital {
    pub pixel: PixelCoord,
    pub name: String,
}

/// Capital per region key: the first admin capital listed for the region,
/// else its most populous place. Regions with no places are absent.
pub fn find_capitals(places: &[VectorFeature], regions: &[Region], grid: &Grid) -> HashMap<String, Capital> {
    let mut by_region: HashMap<&str, Vec<&VectorFeature>> = HashMap::new();
    for place in places {
        if !is_target_country(place.prop_str("ADM0NAME")) {
            continue;
        }
        if let Some(adm1) = place.prop_str("ADM1NAME") {
            by_region.entry(adm1).or_default().push(place);
        }
    }

    let mut capitals = HashMap::new();
    for region in regions {
        let Some(candidates) = by_region.get(region.name.as_str()) else {
            continue;
        };
        let chosen = candidates
            .iter()
            .find(|p| p.prop_str("FEATURECLA").is_some_and(|c| CAPITAL_CLASSES.contains(&c)))
            .or_else(|| most_populous(candidates));
        let Some(place) = chosen else {
            continue;
        };
        let Geometry::Point(pt) = &place.geometry else {
            continue;
        };
        let name = place
            .prop_str("NAME")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} Capital", region.name));
        capitals.insert(
            region.key.clone(),
            Capital { pixel: grid.geo_to_pixel(pt.x(), pt.y()), name },
        );
    }
    capitals
}

/// First place with the highest `POP_MAX`; missing populations count as 0.
fn most_populous<'a>(places: &'a [&'a VectorFeature]) -> Option<&'a &'a VectorFeature> {
    let mut best: Option<(&&VectorFeature, f64)> = None;
    for p in places {
        let pop = p.prop_f64("POP_MAX").unwrap_or(0.0);
        if best.map_or(true, |(_, b)| pop > b) {
            best = Some((p, pop));
        }
    }
    best.map(|(p, _)| p)
}
