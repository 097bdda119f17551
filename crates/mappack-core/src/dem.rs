//! Single-band GeoTIFF → [`GeoRaster`].
//!
//! Only the EPSG:4326 layouts served by ETOPO1 and OpenTopography are
//! accepted: georeference comes from ModelPixelScale + ModelTiepoint, with the
//! GTRasterTypeGeoKey deciding whether the tiepoint marks a pixel corner or
//! a pixel center. Rasters whose GeoKeys declare a projected CRS are refused.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::{MapPackError, Result};
use crate::georaster::GeoRaster;
use crate::grid::BBox;

/// GeoKey ids.
const MODEL_TYPE_KEY: u32 = 1024;
const RASTER_TYPE_KEY: u32 = 1025;
const PROJECTED_CS_KEY: u32 = 3072;
/// ModelTypeProjected.
const MODEL_PROJECTED: u32 = 1;
/// RasterPixelIsPoint.
const PIXEL_IS_POINT: u32 = 2;

/// Affine placement of a north-up GeoTIFF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

/// Column/row window of the source image to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    col0: usize,
    col1: usize,
    row0: usize,
    row1: usize,
}

impl GeoReference {
    /// Pixel window covering `bbox` plus one pixel of margin for bilinear
    /// sampling, clipped to the image.
    fn window(&self, bbox: BBox, width: usize, height: usize) -> Window {
        let col = |lon: f64| (lon - self.origin_lon) / self.pixel_width;
        let row = |lat: f64| (self.origin_lat - lat) / self.pixel_height;
        let clip = |v: f64, n: usize| v.clamp(0.0, n as f64) as usize;

        Window {
            col0: clip(col(bbox.min_lon).floor() - 1.0, width),
            col1: clip(col(bbox.max_lon).ceil() + 1.0, width),
            row0: clip(row(bbox.max_lat).floor() - 1.0, height),
            row1: clip(row(bbox.min_lat).ceil() + 1.0, height),
        }
    }
}

/// Read a GeoTIFF from disk, optionally keeping only the part overlapping
/// `crop`.
pub fn read_geotiff(path: &Path, crop: Option<BBox>) -> Result<GeoRaster> {
    let file = File::open(path)?;
    decode_geotiff(BufReader::new(file), path, crop)
}

/// Cheap validity probe used by the tile cache: header, dimensions and
/// georeference must all decode.
pub fn probe_geotiff(path: &Path) -> Result<()> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    decoder.dimensions()?;
    require_geographic(&mut decoder, path)?;
    read_georeference(&mut decoder)?.ok_or_else(|| MapPackError::MissingGeoreference(path.to_path_buf()))?;
    Ok(())
}

pub fn decode_geotiff<R: Read + Seek>(reader: R, label: &Path, crop: Option<BBox>) -> Result<GeoRaster> {
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(MapPackError::UnsupportedSampleFormat {
                path: label.to_path_buf(),
                format: format!("{other:?}"),
            })
        }
    }

    require_geographic(&mut decoder, label)?;
    let georef = read_georeference(&mut decoder)?
        .ok_or_else(|| MapPackError::MissingGeoreference(label.to_path_buf()))?;
    let nodata = read_nodata(&mut decoder)?;

    let win = match crop {
        Some(bbox) => georef.window(bbox, width, height),
        None => Window { col0: 0, col1: width, row0: 0, row1: height },
    };

    let img = decoder.read_image()?;
    let data = match img {
        DecodingResult::U8(v) => extract(&v, width, win, nodata, |x| x as f32),
        DecodingResult::U16(v) => extract(&v, width, win, nodata, |x| x as f32),
        DecodingResult::U32(v) => extract(&v, width, win, nodata, |x| x as f32),
        DecodingResult::I8(v) => extract(&v, width, win, nodata, |x| x as f32),
        DecodingResult::I16(v) => extract(&v, width, win, nodata, |x| x as f32),
        DecodingResult::I32(v) => extract(&v, width, win, nodata, |x| x as f32),
        DecodingResult::F32(v) => extract(&v, width, win, nodata, |x| x),
        DecodingResult::F64(v) => extract(&v, width, win, nodata, |x| x as f32),
        _ => {
            return Err(MapPackError::UnsupportedSampleFormat {
                path: label.to_path_buf(),
                format: "64-bit integer".into(),
            })
        }
    };

    Ok(GeoRaster {
        data,
        width: win.col1.saturating_sub(win.col0),
        height: win.row1.saturating_sub(win.row0),
        origin_lon: georef.origin_lon + win.col0 as f64 * georef.pixel_width,
        origin_lat: georef.origin_lat - win.row0 as f64 * georef.pixel_height,
        pixel_width: georef.pixel_width,
        pixel_height: georef.pixel_height,
    })
}

/// Copy `win` out of a row-major image, converting to f32 and mapping the
/// nodata sentinel to NaN.
fn extract<T: Copy>(
    data: &[T],
    src_cols: usize,
    win: Window,
    nodata: Option<f64>,
    convert: impl Fn(T) -> f32,
) -> Vec<f32> {
    let sentinel = nodata.map(|v| v as f32);
    let mut out = Vec::with_capacity((win.col1 - win.col0) * (win.row1 - win.row0));
    for row in win.row0..win.row1 {
        let start = row * src_cols;
        for &raw in &data[start + win.col0..start + win.col1] {
            let v = convert(raw);
            out.push(if Some(v) == sentinel { f32::NAN } else { v });
        }
    }
    out
}

fn read_georeference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoReference>> {
    let Some(scale) = decoder.find_tag(Tag::ModelPixelScaleTag)? else {
        return Ok(None);
    };
    let Some(tie) = decoder.find_tag(Tag::ModelTiepointTag)? else {
        return Ok(None);
    };
    let scale = scale.into_f64_vec()?;
    let tie = tie.into_f64_vec()?;
    if scale.len() < 2 || tie.len() < 6 {
        return Ok(None);
    }

    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);

    // Pixel-is-point tiepoints name a pixel center; shift to its corner.
    let half = if geo_key(decoder, RASTER_TYPE_KEY)? == Some(PIXEL_IS_POINT) { 0.5 } else { 0.0 };

    Ok(Some(GeoReference {
        origin_lon: x - (i + half) * sx,
        origin_lat: y + (j + half) * sy,
        pixel_width: sx,
        pixel_height: sy,
    }))
}

/// Pixel math assumes degrees, so a projected model is an error. A file with
/// no GeoKeys at all is taken as geographic.
fn require_geographic<R: Read + Seek>(decoder: &mut Decoder<R>, label: &Path) -> Result<()> {
    let projected = geo_key(decoder, MODEL_TYPE_KEY)? == Some(MODEL_PROJECTED)
        || geo_key(decoder, PROJECTED_CS_KEY)?.is_some();
    if projected {
        return Err(MapPackError::ProjectedRaster(label.to_path_buf()));
    }
    Ok(())
}

/// Value of GeoKey `key`, if the key directory carries it inline.
fn geo_key<R: Read + Seek>(decoder: &mut Decoder<R>, key: u32) -> Result<Option<u32>> {
    let Some(dir) = decoder.find_tag(Tag::GeoKeyDirectoryTag)? else {
        return Ok(None);
    };
    let dir = dir.into_u32_vec()?;
    // Header: version, revision, minor, key count; then 4-tuples of
    // (key id, tag location, count, value).
    let entries = dir.get(4..).unwrap_or(&[]);
    Ok(entries
        .chunks_exact(4)
        .find(|e| e[0] == key && e[1] == 0)
        .map(|e| e[3]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    Ok(text.trim_matches(char::from(0)).trim().parse().ok())
}
