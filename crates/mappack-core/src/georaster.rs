use crate::grid::BBox;

/// A georeferenced single-band elevation raster in metres, row-major.
/// Row 0 is the northern edge (GeoTIFF storage order). Coordinate math uses
/// f64; samples are f32 with NaN marking nodata.
#[derive(Debug, Clone)]
pub struct GeoRaster {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
    /// Longitude of the west edge of column 0.
    pub origin_lon: f64,
    /// Latitude of the north edge of row 0.
    pub origin_lat: f64,
    /// Degrees per column.
    pub pixel_width: f64,
    /// Degrees per row (positive; rows run southward).
    pub pixel_height: f64,
}

impl GeoRaster {
    /// A raster covering `bbox` exactly, filled with `fill`.
    pub fn new(bbox: BBox, width: usize, height: usize, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            origin_lon: bbox.min_lon,
            origin_lat: bbox.max_lat,
            pixel_width: bbox.width_deg() / width as f64,
            pixel_height: bbox.height_deg() / height as f64,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    pub fn bounds(&self) -> BBox {
        BBox {
            min_lon: self.origin_lon,
            max_lon: self.origin_lon + self.width as f64 * self.pixel_width,
            max_lat: self.origin_lat,
            min_lat: self.origin_lat - self.height as f64 * self.pixel_height,
        }
    }

    /// Bilinear sample at (lon, lat), treating each value as the pixel's
    /// center. Returns None outside the raster footprint or when the
    /// interpolated value is not finite (touches nodata).
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f32> {
        if self.width == 0 || self.height == 0 || !self.bounds().contains(lon, lat) {
            return None;
        }

        let fx = ((lon - self.origin_lon) / self.pixel_width - 0.5).clamp(0.0, (self.width - 1) as f64);
        let fy = ((self.origin_lat - lat) / self.pixel_height - 0.5).clamp(0.0, (self.height - 1) as f64);

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let tx = (fx - x0 as f64) as f32;
        let ty = (fy - y0 as f64) as f32;

        let v00 = self.get(y0, x0);
        let v10 = self.get(y0, x1);
        let v01 = self.get(y1, x0);
        let v11 = self.get(y1, x1);

        let v = v00 * (1.0 - tx) * (1.0 - ty)
            + v10 * tx * (1.0 - ty)
            + v01 * (1.0 - tx) * ty
            + v11 * tx * ty;

        v.is_finite().then_some(v)
    }
}

/// Anything the terrain stage can sample elevation from.
pub trait ElevationSource {
    fn sample(&self, lon: f64, lat: f64) -> Option<f32>;
}

impl ElevationSource for GeoRaster {
    fn sample(&self, lon: f64, lat: f64) -> Option<f32> {
        GeoRaster::sample(self, lon, lat)
    }
}

/// Adjacent DEM tiles. A coordinate is served by the first tile that has a
/// value there, so overlapping seams resolve to the earlier tile.
#[derive(Debug, Clone, Default)]
pub struct DemMosaic {
    pub tiles: Vec<GeoRaster>,
}

impl DemMosaic {
    pub fn new(tiles: Vec<GeoRaster>) -> Self {
        Self { tiles }
    }
}

impl ElevationSource for DemMosaic {
    fn sample(&self, lon: f64, lat: f64) -> Option<f32> {
        self.tiles.iter().find_map(|t| t.sample(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> BBox {
        BBox { min_lon, min_lat, max_lon, max_lat }
    }

    #[test]
    fn sample_at_pixel_centers_returns_exact_values() {
        let mut r = GeoRaster::new(bbox(0.0, 0.0, 4.0, 4.0), 4, 4, 0.0);
        r.set(0, 0, 10.0);
        r.set(3, 3, 40.0);

        assert_abs_diff_eq!(r.sample(0.5, 3.5).unwrap(), 10.0, epsilon = 1e-5);
        assert_abs_diff_eq!(r.sample(3.5, 0.5).unwrap(), 40.0, epsilon = 1e-5);
        // Halfway between (0,0)=10 and (0,1)=0.
        assert_abs_diff_eq!(r.sample(1.0, 3.5).unwrap(), 5.0, epsilon = 1e-5);
    }

    #[test]
    fn sample_out_of_bounds_returns_none() {
        let r = GeoRaster::new(bbox(0.0, 0.0, 4.0, 4.0), 4, 4, 1.0);
        assert!(r.sample(-0.1, 2.0).is_none());
        assert!(r.sample(2.0, 4.1).is_none());
        // Edges are inside.
        assert_eq!(r.sample(4.0, 0.0), Some(1.0));
    }

    #[test]
    fn nodata_neighbours_yield_none() {
        let mut r = GeoRaster::new(bbox(0.0, 0.0, 2.0, 2.0), 2, 2, 5.0);
        r.set(0, 1, f32::NAN);
        assert!(r.sample(1.0, 1.5).is_none());
        assert_eq!(r.sample(0.5, 0.5), Some(5.0));
    }

    #[test]
    fn mosaic_uses_first_tile_with_data() {
        let west = GeoRaster::new(bbox(0.0, 0.0, 10.0, 10.0), 2, 2, 1.0);
        let east = GeoRaster::new(bbox(10.0, 0.0, 20.0, 10.0), 2, 2, 2.0);
        let mosaic = DemMosaic::new(vec![west, east]);
        assert_eq!(ElevationSource::sample(&mosaic, 5.0, 5.0), Some(1.0));
        assert_eq!(ElevationSource::sample(&mosaic, 15.0, 5.0), Some(2.0));
        assert_eq!(ElevationSource::sample(&mosaic, 25.0, 5.0), None);
    }
}
