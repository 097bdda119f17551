//! Remote inputs, cached on disk. A file that already exists in the cache is
//! never fetched again; the only exception is a DEM tile that is truncated or
//! does not decode. The Wikipedia pages are cached the same way, so a rerun
//! needs no network at all.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::USER_AGENT;
use zip::ZipArchive;

use crate::config::{
    COUNTRIES_URL, DEM_TILE_STEP_DEG, ETOPO1_BED_URL, OPENTOPO_API, OPENTOPO_KEY_VAR, PLACES_URL, STATES_URL,
};
use crate::dem::probe_geotiff;
use crate::error::{MapPackError, Result};
use crate::grid::BBox;

pub const COUNTRIES_FILE: &str = "ne_10m_admin_0_countries.geojson";
pub const STATES_FILE: &str = "ne_10m_admin_1_states_provinces.geojson";
pub const PLACES_FILE: &str = "ne_10m_populated_places.geojson";
pub const ETOPO1_ZIP: &str = "ETOPO1_Bed_g_geotiff.zip";
pub const ETOPO1_TIF: &str = "ETOPO1_Bed_g_geotiff.tif";
pub const US_HIGHPOINTS_FILE: &str = "us_highpoints.html";
pub const CA_HIGHPOINTS_FILE: &str = "ca_highpoints.html";

/// Cached tiles smaller than this are treated as failed downloads.
pub const MIN_TILE_BYTES: u64 = 1024;

const BROWSER_AGENT: &str = "Mozilla/5.0";

/// One DEM request rectangle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemTile {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

/// Local copies of the three Natural Earth layers.
#[derive(Debug, Clone)]
pub struct VectorSources {
    pub countries: PathBuf,
    pub states: PathBuf,
    pub places: PathBuf,
}

// ── Tile planning ────────────────────────────────────────────────────────────

/// Split `bbox` into `step_lon × step_lat` tiles, west to east, and south to
/// north within each column. The last column and row are clipped to the box.
pub fn plan_tiles(bbox: BBox, step_lon: f64, step_lat: f64) -> Vec<DemTile> {
    const EPS: f64 = 1e-6;
    let mut tiles = Vec::new();
    let mut lon = bbox.min_lon;
    while lon < bbox.max_lon - EPS {
        let next_lon = (lon + step_lon).min(bbox.max_lon);
        let mut lat = bbox.min_lat;
        while lat < bbox.max_lat - EPS {
            let next_lat = (lat + step_lat).min(bbox.max_lat);
            tiles.push(DemTile { west: lon, east: next_lon, south: lat, north: next_lat });
            lat = next_lat;
        }
        lon = next_lon;
    }
    tiles
}

/// Cache path of tile `index` for `demtype`.
pub fn tile_path(data_dir: &Path, demtype: &str, index: usize) -> PathBuf {
    let demtype = demtype.to_lowercase();
    data_dir
        .join(format!("na_{demtype}_tiles"))
        .join(format!("{demtype}_{index:02}.tif"))
}

pub fn opentopo_url(demtype: &str, tile: &DemTile, api_key: &str) -> String {
    format!(
        "{OPENTOPO_API}?demtype={demtype}&south={}&north={}&west={}&east={}&outputFormat=GTiff&API_Key={api_key}",
        tile.south, tile.north, tile.west, tile.east
    )
}

fn cached_tile_ok(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.len() >= MIN_TILE_BYTES => probe_geotiff(path).is_ok(),
        _ => false,
    }
}

/// `dest` with `.part` appended, used while a download is in flight.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

// ── Fetcher ──────────────────────────────────────────────────────────────────

/// Blocking HTTP client for every remote input.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Requests never time out.
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { client })
    }

    /// GET `url` into `dest` unless `dest` exists. Returns whether anything
    /// was downloaded. The body lands in a `.part` file first, so an
    /// interrupted transfer never looks cached.
    pub fn download(&self, url: &str, dest: &Path) -> Result<bool> {
        self.download_request(self.client.get(url), dest)
    }

    fn download_request(&self, request: RequestBuilder, dest: &Path) -> Result<bool> {
        if dest.exists() {
            log::debug!("cached: {}", dest.display());
            return Ok(false);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        log::info!("downloading {}", dest.display());
        let mut response = request.send()?.error_for_status()?;
        let tmp = partial_path(dest);
        let mut out = BufWriter::new(File::create(&tmp)?);
        let bytes = response.copy_to(&mut out)?;
        out.flush()?;
        drop(out);
        fs::rename(&tmp, dest)?;
        log::debug!("{} bytes -> {}", bytes, dest.display());
        Ok(true)
    }

    /// Page body, fetched once with a browser user agent and cached at `dest`.
    pub fn fetch_html(&self, url: &str, dest: &Path) -> Result<String> {
        self.download_request(self.client.get(url).header(USER_AGENT, BROWSER_AGENT), dest)?;
        Ok(fs::read_to_string(dest)?)
    }

    pub fn fetch_vectors(&self, data_dir: &Path) -> Result<VectorSources> {
        let sources = VectorSources {
            countries: data_dir.join(COUNTRIES_FILE),
            states: data_dir.join(STATES_FILE),
            places: data_dir.join(PLACES_FILE),
        };
        self.download(COUNTRIES_URL, &sources.countries)?;
        self.download(STATES_URL, &sources.states)?;
        self.download(PLACES_URL, &sources.places)?;
        Ok(sources)
    }

    /// Ensure one OpenTopography tile is cached at `dest`. A cached tile that
    /// is too small or does not decode is deleted and fetched again.
    pub fn download_dem_tile(&self, demtype: &str, tile: &DemTile, dest: &Path, api_key: Option<&str>) -> Result<bool> {
        if dest.exists() {
            if cached_tile_ok(dest) {
                log::debug!("cached tile: {}", dest.display());
                return Ok(false);
            }
            log::warn!("discarding corrupt tile {}", dest.display());
            fs::remove_file(dest)?;
        }
        let key = api_key.ok_or(MapPackError::MissingApiKey(OPENTOPO_KEY_VAR))?;
        self.download(&opentopo_url(demtype, tile, key), dest)
    }

    /// Every tile of `bbox` for `demtype`, in plan order.
    pub fn fetch_dem_tiles(&self, data_dir: &Path, demtype: &str, bbox: BBox, api_key: Option<&str>) -> Result<Vec<PathBuf>> {
        let tiles = plan_tiles(bbox, DEM_TILE_STEP_DEG, DEM_TILE_STEP_DEG);
        log::info!("{demtype}: {} tiles", tiles.len());
        let mut paths = Vec::with_capacity(tiles.len());
        for (index, tile) in tiles.iter().enumerate() {
            let path = tile_path(data_dir, demtype, index);
            self.download_dem_tile(demtype, tile, &path, api_key)?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// The ETOPO1 bedrock GeoTIFF, downloaded as a ZIP and unpacked once.
    pub fn fetch_etopo1(&self, data_dir: &Path) -> Result<PathBuf> {
        let tif = data_dir.join(ETOPO1_TIF);
        if tif.exists() {
            log::debug!("cached: {}", tif.display());
            return Ok(tif);
        }
        let zip_path = data_dir.join(ETOPO1_ZIP);
        self.download(ETOPO1_BED_URL, &zip_path)?;
        extract_first_tiff(&zip_path, &tif)?;
        Ok(tif)
    }
}

/// Unpack the first `.tif` member of `zip_path` to `dest`.
pub fn extract_first_tiff(zip_path: &Path, dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let index = (0..archive.len())
        .find(|&i| {
            archive
                .name_for_index(i)
                .is_some_and(|name| name.to_lowercase().ends_with(".tif"))
        })
        .ok_or_else(|| MapPackError::ArchiveWithoutTiff(zip_path.to_path_buf()))?;

    let mut entry = archive.by_index(index)?;
    log::info!("extracting {} -> {}", entry.name(), dest.display());
    let tmp = partial_path(dest);
    let mut out = BufWriter::new(File::create(&tmp)?);
    io::copy(&mut entry, &mut out)?;
    out.flush()?;
    drop(out);
    fs::rename(&tmp, dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BOUNDS;
    use tempfile::tempdir;
    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// A 32×32 Int16 tile at 0.25° per pixel, NW corner at (-168, 24).
    fn write_tile(path: &Path) {
        let mut enc = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        let mut img = enc.new_image::<colortype::GrayI16>(32, 32).unwrap();
        img.encoder()
            .write_tag(Tag::ModelPixelScaleTag, &[0.25f64, 0.25, 0.0][..])
            .unwrap();
        img.encoder()
            .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, -168.0, 24.0, 0.0][..])
            .unwrap();
        img.write_data(&[120i16; 32 * 32][..]).unwrap();
    }

    #[test]
    fn north_america_plan_is_twelve_by_six() {
        let tiles = plan_tiles(BOUNDS, 10.0, 10.0);
        assert_eq!(tiles.len(), 12 * 6);
        assert_eq!(tiles[0], DemTile { west: -168.0, east: -158.0, south: 14.0, north: 24.0 });
        // Latitude varies fastest.
        assert_eq!(tiles[1].west, -168.0);
        assert_eq!(tiles[1].south, 24.0);
        // Last row and column are clipped to the box.
        assert_eq!(tiles[5].north, 72.0);
        let last = tiles.last().unwrap();
        assert_eq!((last.west, last.east), (-58.0, -52.0));
        assert_eq!((last.south, last.north), (64.0, 72.0));
    }

    #[test]
    fn tile_names_are_lowercase_and_padded() {
        let p = tile_path(Path::new("data"), "SRTM15Plus", 7);
        assert_eq!(p, Path::new("data/na_srtm15plus_tiles/srtm15plus_07.tif"));
    }

    #[test]
    fn url_carries_bounds_and_key() {
        let tile = DemTile { west: -168.0, east: -158.0, south: 14.0, north: 24.5 };
        let url = opentopo_url("SRTMGL3", &tile, "abc");
        assert_eq!(
            url,
            "https://portal.opentopography.org/API/globaldem?demtype=SRTMGL3&south=14&north=24.5&west=-168&east=-158&outputFormat=GTiff&API_Key=abc"
        );
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(partial_path(Path::new("a/b.tif")), Path::new("a/b.tif.part"));
    }

    #[test]
    fn truncated_tile_is_discarded_before_key_check() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let dest = dir.join("t.tif");
        fs::write(&dest, b"short").unwrap();
        let tile = plan_tiles(BOUNDS, 10.0, 10.0)[0];
        let err = Fetcher::new().unwrap().download_dem_tile("SRTMGL3", &tile, &dest, None).unwrap_err();
        assert!(matches!(err, MapPackError::MissingApiKey(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn undecodable_tile_is_discarded_before_key_check() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("t.tif");
        fs::write(&dest, vec![0xA5u8; 4096]).unwrap();
        assert!(!cached_tile_ok(&dest));

        let tile = plan_tiles(BOUNDS, 10.0, 10.0)[0];
        let err = Fetcher::new().unwrap().download_dem_tile("SRTMGL3", &tile, &dest, None).unwrap_err();
        assert!(matches!(err, MapPackError::MissingApiKey(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn valid_cached_tile_needs_no_key() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("t.tif");
        write_tile(&dest);
        assert!(fs::metadata(&dest).unwrap().len() >= MIN_TILE_BYTES);
        assert!(cached_tile_ok(&dest));

        let tile = plan_tiles(BOUNDS, 10.0, 10.0)[0];
        let fetched = Fetcher::new().unwrap().download_dem_tile("SRTMGL3", &tile, &dest, None).unwrap();
        assert!(!fetched);
        assert!(dest.exists());
    }

    #[test]
    fn cached_page_is_read_from_disk() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join(US_HIGHPOINTS_FILE);
        fs::write(&dest, "<table></table>").unwrap();
        let html = Fetcher::new().unwrap().fetch_html("http://127.0.0.1:9/none", &dest).unwrap();
        assert_eq!(html, "<table></table>");
    }

    #[test]
    fn cached_download_is_not_refetched() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let dest = dir.join("x.geojson");
        fs::write(&dest, "{}").unwrap();
        // Unroutable URL: reaching the network would fail the test.
        let fetched = Fetcher::new().unwrap().download("http://127.0.0.1:9/none", &dest).unwrap();
        assert!(!fetched);
    }

    #[test]
    fn first_tiff_member_is_extracted() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let zip_path = dir.join("bundle.zip");
        {
            let mut zip = ZipWriter::new(File::create(&zip_path).unwrap());
            let opts = SimpleFileOptions::default();
            zip.start_file("readme.txt", opts).unwrap();
            zip.write_all(b"notes").unwrap();
            zip.start_file("nested/ETOPO1_Bed_g_geotiff.TIF", opts).unwrap();
            zip.write_all(b"tiff-bytes").unwrap();
            zip.finish().unwrap();
        }
        let dest = dir.join("out.tif");
        extract_first_tiff(&zip_path, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"tiff-bytes");

        let empty = dir.join("empty.zip");
        ZipWriter::new(File::create(&empty).unwrap()).finish().unwrap();
        assert!(matches!(
            extract_first_tiff(&empty, &dir.join("none.tif")),
            Err(MapPackError::ArchiveWithoutTiff(_))
        ));
    }
}
