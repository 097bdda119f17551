/// Geographic bounding box, the shared pixel grid, and the 8-bit layer type.
/// All coordinate math uses f64; layer samples are u8.
use serde::Serialize;

/// Axis-aligned longitude/latitude box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub fn width_deg(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Integer pixel position; (0, 0) is the northwest corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelCoord {
    pub x: u32,
    pub y: u32,
}

impl PixelCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A north-up raster grid over a bounding box. The affine transform is linear
/// in both axes:
///   col = (lon − min_lon) / dx,   row = (max_lat − lat) / dy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub bbox: BBox,
    pub width: usize,
    pub height: usize,
}

impl Grid {
    pub fn new(bbox: BBox, width: usize, height: usize) -> Self {
        Self { bbox, width, height }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Degrees of longitude per pixel column.
    #[inline]
    pub fn dx(&self) -> f64 {
        self.bbox.width_deg() / self.width as f64
    }

    /// Degrees of latitude per pixel row.
    #[inline]
    pub fn dy(&self) -> f64 {
        self.bbox.height_deg() / self.height as f64
    }

    /// GDAL-ordered affine coefficients `[x0, dx, 0, y0, 0, -dy]`.
    pub fn affine(&self) -> [f64; 6] {
        [self.bbox.min_lon, self.dx(), 0.0, self.bbox.max_lat, 0.0, -self.dy()]
    }

    /// Continuous pixel-space position of a geographic coordinate. Pixel
    /// centers sit at half-integers.
    #[inline]
    pub fn to_pixel_f(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (lon - self.bbox.min_lon) / self.dx(),
            (self.bbox.max_lat - lat) / self.dy(),
        )
    }

    /// Pixel containing (lon, lat), clamped into the grid so that points on
    /// (or beyond) the east/south edge land in the last column/row.
    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> PixelCoord {
        let (fx, fy) = self.to_pixel_f(lon, lat);
        PixelCoord {
            x: clamp_index(fx, self.width),
            y: clamp_index(fy, self.height),
        }
    }

    #[inline]
    pub fn lon_of_col(&self, col: usize) -> f64 {
        self.bbox.min_lon + (col as f64 + 0.5) * self.dx()
    }

    #[inline]
    pub fn lat_of_row(&self, row: usize) -> f64 {
        self.bbox.max_lat - (row as f64 + 0.5) * self.dy()
    }

    /// Geographic coordinate of a pixel's center, as (lon, lat).
    pub fn pixel_center(&self, px: PixelCoord) -> (f64, f64) {
        (self.lon_of_col(px.x as usize), self.lat_of_row(px.y as usize))
    }
}

fn clamp_index(v: f64, n: usize) -> u32 {
    if v.is_nan() || v <= 0.0 {
        return 0;
    }
    (v.floor() as usize).min(n - 1) as u32
}

/// Single-channel 8-bit raster on a [`Grid`]. Row-major, row 0 = north.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub grid: Grid,
    pub data: Vec<u8>,
}

impl Layer {
    /// All-zero layer.
    pub fn empty(grid: Grid) -> Self {
        Self::filled(grid, 0)
    }

    pub fn filled(grid: Grid, value: u8) -> Self {
        Self { data: vec![value; grid.len()], grid }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.grid.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: u8) {
        self.data[row * self.grid.width + col] = val;
    }

    /// Land-style test used throughout: anything above half intensity.
    #[inline]
    pub fn is_set(&self, idx: usize) -> bool {
        self.data[idx] > 127
    }

    /// `255 − v` per pixel. Water is the inverse of land.
    pub fn inverted(&self) -> Self {
        Self {
            grid: self.grid,
            data: self.data.iter().map(|&v| 255 - v).collect(),
        }
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v > 127).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{build_grid, BOUNDS};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn corners_map_to_first_and_last_pixel() {
        let grid = build_grid();
        assert_eq!(grid.geo_to_pixel(-168.0, 72.0), PixelCoord::new(0, 0));
        assert_eq!(grid.geo_to_pixel(-52.0, 14.0), PixelCoord::new(4095, 4095));
    }

    #[test]
    fn edge_coordinates_stay_in_range() {
        let grid = build_grid();
        for &(lon, lat) in &[
            (BOUNDS.max_lon, BOUNDS.max_lat),
            (BOUNDS.min_lon, BOUNDS.min_lat),
            (BOUNDS.max_lon, 40.0),
            (-100.0, BOUNDS.min_lat),
            (-200.0, 100.0),
            (f64::NAN, 40.0),
        ] {
            let px = grid.geo_to_pixel(lon, lat);
            assert!((px.x as usize) < grid.width, "x out of range for ({lon}, {lat})");
            assert!((px.y as usize) < grid.height, "y out of range for ({lon}, {lat})");
        }
    }

    #[test]
    fn roundtrip_within_one_pixel() {
        let grid = build_grid();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let lon = rng.gen_range(BOUNDS.min_lon..BOUNDS.max_lon);
            let lat = rng.gen_range(BOUNDS.min_lat..BOUNDS.max_lat);

            let (lon2, lat2) = grid.pixel_center(grid.geo_to_pixel(lon, lat));
            assert!((lon - lon2).abs() <= grid.dx(), "lon {lon} → {lon2}");
            assert!((lat - lat2).abs() <= grid.dy(), "lat {lat} → {lat2}");
        }
    }

    #[test]
    fn affine_is_north_up() {
        let a = build_grid().affine();
        assert_eq!(a[0], -168.0);
        assert_eq!(a[3], 72.0);
        assert!(a[1] > 0.0 && a[5] < 0.0);
        assert_eq!(a[2], 0.0);
        assert_eq!(a[4], 0.0);
    }

    #[test]
    fn inverted_layer_complements() {
        let grid = Grid::new(BOUNDS, 4, 2);
        let mut land = Layer::empty(grid);
        land.set(0, 1, 255);
        let water = land.inverted();
        assert_eq!(water.get(0, 1), 0);
        assert_eq!(water.get(1, 3), 255);
        assert_eq!(land.count_set() + water.count_set(), grid.len());
    }
}
