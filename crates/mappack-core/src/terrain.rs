//! Height map synthesis: reproject the bedrock DEM onto the build grid, split
//! it into land elevation and ocean depth, and fold both into one 8-bit
//! channel with sea level at [`SHORE`].
//!
//! Water occupies `[0, SHORE]` (deepest = 0) and land `[SHORE, 1]`
//! (highest = 1).

use image::{ImageBuffer, Luma};

use crate::error::{MapPackError, Result};
use crate::georaster::ElevationSource;
use crate::grid::{Grid, Layer};

/// Normalized height-channel value of sea level.
pub const SHORE: f32 = 0.2;
/// Vertical exaggeration hint written to the legend.
pub const HEIGHT_SCALE: f32 = 0.08;
/// Gaussian sigma, in pixels, used to hide resampling seams.
pub const BLUR_SIGMA: f32 = 2.0;

// ── Reprojection ─────────────────────────────────────────────────────────────

/// Sample `source` at every pixel center of `grid` (bilinear). Pixels the
/// source cannot serve stay NaN.
pub fn reproject_to_grid<S: ElevationSource + Sync>(source: &S, grid: &Grid) -> Vec<f32> {
    let mut out = vec![f32::NAN; grid.len()];

    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(grid.width)
            .enumerate()
            .for_each(|(row, line)| fill_row(source, grid, row, line));
    }

    #[cfg(not(feature = "threading"))]
    for (row, line) in out.chunks_mut(grid.width).enumerate() {
        fill_row(source, grid, row, line);
    }

    out
}

fn fill_row<S: ElevationSource>(source: &S, grid: &Grid, row: usize, line: &mut [f32]) {
    let lat = grid.lat_of_row(row);
    for (col, v) in line.iter_mut().enumerate() {
        if let Some(z) = source.sample(grid.lon_of_col(col), lat) {
            *v = z;
        }
    }
}

// ── Land / water split ───────────────────────────────────────────────────────

/// Elevation separated by the land mask and scaled into [0, 1].
/// Each vector is full-grid; pixels of the other class are NaN.
#[derive(Debug, Clone)]
pub struct SplitElevation {
    /// `clip(elev / max_land, 0, 1)` on land.
    pub land: Vec<f32>,
    /// `clip(-elev / max_depth, 0, 1)` on water.
    pub water: Vec<f32>,
    pub max_land: f32,
    pub max_depth: f32,
}

pub fn split_elevation(elevation: &[f32], land_mask: &Layer) -> SplitElevation {
    debug_assert_eq!(elevation.len(), land_mask.data.len());

    let is_land = |i: usize| land_mask.is_set(i);

    let max_land = finite_max(
        elevation.iter().enumerate().filter(|&(i, _)| is_land(i)).map(|(_, &z)| z),
    );
    let max_depth = finite_max(
        elevation.iter().enumerate().filter(|&(i, _)| !is_land(i)).map(|(_, &z)| -z),
    );

    let mut land = vec![f32::NAN; elevation.len()];
    let mut water = vec![f32::NAN; elevation.len()];
    for (i, &z) in elevation.iter().enumerate() {
        if is_land(i) {
            land[i] = (z / max_land).clamp(0.0, 1.0);
        } else {
            water[i] = (-z / max_depth).clamp(0.0, 1.0);
        }
    }

    SplitElevation { land, water, max_land, max_depth }
}

/// Largest finite value, or 1.0 when there is none or it is not positive.
fn finite_max(values: impl Iterator<Item = f32>) -> f32 {
    let m = values.filter(|v| v.is_finite()).fold(f32::NEG_INFINITY, f32::max);
    if m.is_finite() && m > 0.0 {
        m
    } else {
        1.0
    }
}

/// Fold both channels into one: land → `[shore, 1]`, water → `[0, shore]`.
/// Anything non-finite (no data) floors to 0.
pub fn combine_height(split: &SplitElevation, shore: f32) -> Vec<f32> {
    split
        .land
        .iter()
        .zip(&split.water)
        .map(|(&l, &w)| {
            let h = if !l.is_nan() {
                shore + (1.0 - shore) * l
            } else {
                shore * (1.0 - w)
            };
            if h.is_finite() {
                h
            } else {
                0.0
            }
        })
        .collect()
}

// ── Output ───────────────────────────────────────────────────────────────────

fn length_mismatch(layer: &str, len: usize, grid: Grid) -> MapPackError {
    MapPackError::GridMismatch {
        layer: layer.to_string(),
        expected_w: grid.width,
        expected_h: grid.height,
        found_w: len,
        found_h: 1,
    }
}

/// Gaussian-blur the float channel, then quantize `v · 255` to u8. `height`
/// must hold exactly one sample per pixel of `grid`.
pub fn smooth_and_quantize(height: &[f32], grid: Grid, sigma: f32) -> Result<Layer> {
    if height.len() != grid.len() {
        return Err(length_mismatch("heightmap", height.len(), grid));
    }
    let buf: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(grid.width as u32, grid.height as u32, height.to_vec())
            .ok_or_else(|| length_mismatch("heightmap", height.len(), grid))?;

    let smoothed = if sigma > 0.0 {
        image::imageops::blur(&buf, sigma)
    } else {
        buf
    };

    Ok(Layer {
        grid,
        data: smoothed
            .into_raw()
            .into_iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect(),
    })
}

/// Whole terrain stage on an already reprojected elevation grid.
pub fn synthesize_heightmap(elevation: &[f32], land_mask: &Layer) -> Result<Layer> {
    if elevation.len() != land_mask.grid.len() {
        return Err(length_mismatch("elevation", elevation.len(), land_mask.grid));
    }
    let split = split_elevation(elevation, land_mask);
    log::debug!(
        "terrain: max land elevation {:.0} m, max depth {:.0} m",
        split.max_land,
        split.max_depth
    );
    let height = combine_height(&split, SHORE);
    smooth_and_quantize(&height, land_mask.grid, BLUR_SIGMA)
}
