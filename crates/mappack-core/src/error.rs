use std::path::PathBuf;

use thiserror::Error;

/// Every failure the map pack build can hit. Nothing here is recovered from;
/// the binaries propagate these to `main`.
#[derive(Debug, Error)]
pub enum MapPackError {
    #[error("{0} is required to download OpenTopography DEMs")]
    MissingApiKey(&'static str),

    #[error("unable to find {0} table")]
    TableNotFound(String),

    #[error("{table} table has no column matching \"{column}\"")]
    MissingColumn { table: String, column: String },

    #[error("invalid CSS selector {selector}: {reason}")]
    Selector { selector: &'static str, reason: String },

    #[error("{0} does not contain a TIFF")]
    ArchiveWithoutTiff(PathBuf),

    #[error("{0} has no GeoTIFF georeference (pixel scale / tiepoint)")]
    MissingGeoreference(PathBuf),

    #[error("{0} uses a projected CRS; only geographic (EPSG:4326) rasters are supported")]
    ProjectedRaster(PathBuf),

    #[error("unsupported sample format in {path}: {format}")]
    UnsupportedSampleFormat { path: PathBuf, format: String },

    #[error("{path} is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection { path: PathBuf },

    #[error("layer {layer} is {found_w}×{found_h}, build grid is {expected_w}×{expected_h}")]
    GridMismatch {
        layer: String,
        expected_w: usize,
        expected_h: usize,
        found_w: usize,
        found_h: usize,
    },

    #[error("legend validation failed: {0}")]
    InvalidLegend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    GeoJson(#[from] geojson::Error),

    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, MapPackError>;
