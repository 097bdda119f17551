//! Burns vector geometry into [`Layer`]s.
//!
//! Polygons use pixel-center sampling with the even-odd rule, so holes and
//! multipolygons need no special handling. Lines are burned as planar buffers:
//! a pixel is set when its center is within `radius` degrees of a segment.

use geo::{Geometry, LineString, Polygon};

use crate::config::{MOUNTAIN_BUFFER_DEG, MOUNTAIN_RANGES};
use crate::grid::{Grid, Layer};

pub const BURN_VALUE: u8 = 255;

// ── Polygons ─────────────────────────────────────────────────────────────────

/// Fill every pixel whose center lies inside `polygon`.
pub fn burn_polygon(layer: &mut Layer, polygon: &Polygon<f64>, value: u8) {
    let grid = layer.grid;

    // Edges in continuous pixel space; pixel (c, r) has its center at (c+0.5, r+0.5).
    let mut edges: Vec<(f64, f64, f64, f64)> = Vec::new();
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        for line in ring.lines() {
            let (x0, y0) = grid.to_pixel_f(line.start.x, line.start.y);
            let (x1, y1) = grid.to_pixel_f(line.end.x, line.end.y);
            if y0 != y1 {
                edges.push((x0, y0, x1, y1));
            }
        }
    }
    if edges.is_empty() {
        return;
    }

    let y_min = edges.iter().map(|e| e.1.min(e.3)).fold(f64::INFINITY, f64::min);
    let y_max = edges.iter().map(|e| e.1.max(e.3)).fold(f64::NEG_INFINITY, f64::max);
    let row_lo = first_center_at_or_after(y_min, grid.height);
    let row_hi = first_center_at_or_after(y_max, grid.height);
    if row_lo >= row_hi {
        return;
    }

    // Crossing x-positions per scanline.
    let mut rows: Vec<Vec<f64>> = vec![Vec::new(); row_hi - row_lo];
    for &(x0, y0, x1, y1) in &edges {
        let (ya, yb) = if y0 < y1 { (y0, y1) } else { (y1, y0) };
        let start = first_center_at_or_after(ya, grid.height).max(row_lo);
        let end = first_center_at_or_after(yb, grid.height).min(row_hi);
        for r in start..end {
            let yc = r as f64 + 0.5;
            let x = x0 + (yc - y0) * (x1 - x0) / (y1 - y0);
            rows[r - row_lo].push(x);
        }
    }

    for (offset, xs) in rows.iter_mut().enumerate() {
        xs.sort_by(|a, b| a.total_cmp(b));
        let row = row_lo + offset;
        for span in xs.chunks_exact(2) {
            let c0 = first_center_at_or_after(span[0], grid.width);
            let c1 = first_center_at_or_after(span[1], grid.width);
            let base = row * grid.width;
            for v in &mut layer.data[base + c0..base + c1] {
                *v = value;
            }
        }
    }
}

/// Index of the first pixel whose center (`i + 0.5`) is ≥ `v`, clamped to `0..=n`.
fn first_center_at_or_after(v: f64, n: usize) -> usize {
    let i = (v - 0.5).ceil();
    if i <= 0.0 {
        0
    } else if i >= n as f64 {
        n
    } else {
        i as usize
    }
}

/// Burn any areal geometry; points and lines are ignored.
pub fn burn_geometry(layer: &mut Layer, geometry: &Geometry<f64>, value: u8) {
    match geometry {
        Geometry::Polygon(p) => burn_polygon(layer, p, value),
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                burn_polygon(layer, p, value);
            }
        }
        Geometry::Rect(r) => burn_polygon(layer, &r.to_polygon(), value),
        Geometry::Triangle(t) => burn_polygon(layer, &t.to_polygon(), value),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                burn_geometry(layer, g, value);
            }
        }
        _ => {}
    }
}

/// Union-rasterize a set of geometries onto a fresh layer.
pub fn rasterize<'a, I>(grid: Grid, geometries: I, value: u8) -> Layer
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut layer = Layer::empty(grid);
    for g in geometries {
        burn_geometry(&mut layer, g, value);
    }
    layer
}

// ── Buffered lines ───────────────────────────────────────────────────────────

/// Burn `union(lines).buffer(radius_deg)`.
pub fn burn_buffered_lines(layer: &mut Layer, lines: &[LineString<f64>], radius_deg: f64, value: u8) {
    for line in lines {
        match line.0.len() {
            0 => {}
            1 => {
                let p = (line.0[0].x, line.0[0].y);
                burn_segment_buffer(layer, p, p, radius_deg, value);
            }
            _ => {
                for seg in line.lines() {
                    burn_segment_buffer(
                        layer,
                        (seg.start.x, seg.start.y),
                        (seg.end.x, seg.end.y),
                        radius_deg,
                        value,
                    );
                }
            }
        }
    }
}

pub fn rasterize_buffered_lines(grid: Grid, lines: &[LineString<f64>], radius_deg: f64, value: u8) -> Layer {
    let mut layer = Layer::empty(grid);
    burn_buffered_lines(&mut layer, lines, radius_deg, value);
    layer
}

fn burn_segment_buffer(layer: &mut Layer, a: (f64, f64), b: (f64, f64), radius: f64, value: u8) {
    let grid = layer.grid;
    let bbox = grid.bbox;

    let (lon_lo, lon_hi) = (a.0.min(b.0) - radius, a.0.max(b.0) + radius);
    let (lat_lo, lat_hi) = (a.1.min(b.1) - radius, a.1.max(b.1) + radius);

    // Columns/rows whose centers fall in the segment's buffered extent.
    let c0 = first_center_at_or_after((lon_lo - bbox.min_lon) / grid.dx(), grid.width);
    let c1 = first_center_at_or_after((lon_hi - bbox.min_lon) / grid.dx(), grid.width);
    let r0 = first_center_at_or_after((bbox.max_lat - lat_hi) / grid.dy(), grid.height);
    let r1 = first_center_at_or_after((bbox.max_lat - lat_lo) / grid.dy(), grid.height);

    let r2 = radius * radius;
    for row in r0..r1 {
        let lat = grid.lat_of_row(row);
        for col in c0..c1 {
            let lon = grid.lon_of_col(col);
            if dist2_to_segment((lon, lat), a, b) <= r2 {
                layer.set(row, col, value);
            }
        }
    }
}

fn dist2_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (qx, qy) = (a.0 + t * dx, a.1 + t * dy);
    (p.0 - qx).powi(2) + (p.1 - qy).powi(2)
}

// ── Procedural mountains ─────────────────────────────────────────────────────

/// Range spines as line strings, in (lon, lat).
pub fn mountain_spines() -> Vec<LineString<f64>> {
    MOUNTAIN_RANGES
        .iter()
        .map(|(_, pts)| LineString::from(pts.to_vec()))
        .collect()
}

/// Corridor mask around the fixed range spines. Independent of any elevation.
pub fn mountain_mask(grid: Grid) -> Layer {
    rasterize_buffered_lines(grid, &mountain_spines(), MOUNTAIN_BUFFER_DEG, BURN_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BBox;
    use geo::{polygon, Coord};

    /// 10×10 grid, one pixel per degree, lon 0..10, lat 0..10.
    fn unit_grid() -> Grid {
        Grid::new(BBox { min_lon: 0.0, min_lat: 0.0, max_lon: 10.0, max_lat: 10.0 }, 10, 10)
    }

    #[test]
    fn square_burns_exact_pixel_block() {
        let mut layer = Layer::empty(unit_grid());
        let square = polygon![(x: 2.0, y: 2.0), (x: 6.0, y: 2.0), (x: 6.0, y: 6.0), (x: 2.0, y: 6.0)];
        burn_polygon(&mut layer, &square, 255);

        assert_eq!(layer.count_set(), 16);
        // lat 2..6 → rows 4..8, lon 2..6 → cols 2..6
        assert_eq!(layer.get(4, 2), 255);
        assert_eq!(layer.get(7, 5), 255);
        assert_eq!(layer.get(3, 2), 0);
        assert_eq!(layer.get(4, 6), 0);
    }

    #[test]
    fn holes_stay_empty() {
        let mut layer = Layer::empty(unit_grid());
        let donut = polygon!(
            exterior: [(x: 1.0, y: 1.0), (x: 9.0, y: 1.0), (x: 9.0, y: 9.0), (x: 1.0, y: 9.0)],
            interiors: [[(x: 4.0, y: 4.0), (x: 6.0, y: 4.0), (x: 6.0, y: 6.0), (x: 4.0, y: 6.0)]],
        );
        burn_polygon(&mut layer, &donut, 255);
        assert_eq!(layer.count_set(), 64 - 4);
        assert_eq!(layer.get(4, 4), 0);
        assert_eq!(layer.get(1, 1), 255);
    }

    #[test]
    fn polygon_outside_grid_is_clipped() {
        let mut layer = Layer::empty(unit_grid());
        let big = polygon![(x: -5.0, y: -5.0), (x: 15.0, y: -5.0), (x: 15.0, y: 15.0), (x: -5.0, y: 15.0)];
        burn_polygon(&mut layer, &big, 9);
        assert!(layer.data.iter().all(|&v| v == 9));
    }

    #[test]
    fn buffered_line_is_a_corridor() {
        let line = LineString::from(vec![Coord { x: 0.0, y: 5.0 }, Coord { x: 10.0, y: 5.0 }]);
        let layer = rasterize_buffered_lines(unit_grid(), &[line], 1.0, 255);
        // Row centers at lat 5.5 and 4.5 are within 1°; 6.5 and 3.5 are not.
        for col in 0..10 {
            assert_eq!(layer.get(4, col), 255);
            assert_eq!(layer.get(5, col), 255);
            assert_eq!(layer.get(3, col), 0);
            assert_eq!(layer.get(6, col), 0);
        }
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        assert_eq!(dist2_to_segment((0.0, 0.0), (1.0, 0.0), (2.0, 0.0)), 1.0);
        assert_eq!(dist2_to_segment((1.5, 2.0), (1.0, 0.0), (2.0, 0.0)), 4.0);
        assert_eq!(dist2_to_segment((3.0, 4.0), (0.0, 0.0), (0.0, 0.0)), 25.0);
    }

    #[test]
    fn mountain_mask_covers_rockies_not_hudson_bay() {
        let grid = Grid::new(crate::config::BOUNDS, 512, 512);
        let mask = mountain_mask(grid);
        let rockies = grid.geo_to_pixel(-110.0, 46.0);
        let hudson = grid.geo_to_pixel(-85.0, 60.0);
        assert_eq!(mask.get(rockies.y as usize, rockies.x as usize), 255);
        assert_eq!(mask.get(hudson.y as usize, hudson.x as usize), 0);
    }
}
