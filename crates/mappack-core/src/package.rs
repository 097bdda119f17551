//! Writing the map directory: layer PNGs, JSON documents, template assets,
//! thumbnail and README.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::THUMBNAIL_SIZE;
use crate::error::{MapPackError, Result};
use crate::grid::{Grid, Layer};

const README: &str = "# North America Sample Map\n\n\
Synthetic 4096x4096 terrain built from Natural Earth boundaries.\n\
Biomes and mountain ranges are procedurally generated for editor testing.\n\
State/province overlays and locations are generated from admin boundaries; \
geological feature markers are representative placeholders for now.\n";

/// Directory layout of a built map.
#[derive(Debug, Clone)]
pub struct MapLayout {
    pub root: PathBuf,
    pub layers: PathBuf,
    pub icons: PathBuf,
    pub thumbnails: PathBuf,
    /// Every layer written through this layout must sit on this grid.
    pub grid: Grid,
}

impl MapLayout {
    pub fn new(root: &Path, grid: Grid) -> Self {
        Self {
            root: root.to_path_buf(),
            layers: root.join("layers"),
            icons: root.join("icons"),
            thumbnails: root.join("thumbnails"),
            grid,
        }
    }

    /// Create the output tree. When the map has no `icons/` yet, the
    /// template's icon set is copied in.
    pub fn ensure_dirs(&self, template_dir: &Path) -> Result<()> {
        fs::create_dir_all(&self.layers)?;
        fs::create_dir_all(&self.thumbnails)?;
        if !self.icons.exists() {
            let source = template_dir.join("icons");
            if source.is_dir() {
                let copied = copy_tree(&source, &self.icons)?;
                log::info!("copied {copied} template icons from {}", source.display());
            }
        }
        Ok(())
    }

    /// Write `layer` as `layers/{file_name}` (8-bit grayscale PNG).
    pub fn save_layer(&self, file_name: &str, layer: &Layer) -> Result<PathBuf> {
        let mismatch = || MapPackError::GridMismatch {
            layer: file_name.to_string(),
            expected_w: self.grid.width,
            expected_h: self.grid.height,
            found_w: layer.grid.width,
            found_h: layer.grid.height,
        };
        if layer.grid != self.grid {
            return Err(mismatch());
        }
        let img = GrayImage::from_raw(layer.grid.width as u32, layer.grid.height as u32, layer.data.clone())
            .ok_or_else(mismatch)?;
        let path = self.layers.join(file_name);
        img.save(&path)?;
        log::debug!("wrote {}", path.display());
        Ok(path)
    }

    /// Serialize `value` to `{root}/{file_name}`.
    pub fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.root.join(file_name);
        fs::write(&path, serde_json::to_string(value)?)?;
        Ok(path)
    }

    /// Copy `theme.json` from the template, if it has one.
    pub fn copy_theme(&self, template_dir: &Path) -> Result<bool> {
        let source = template_dir.join("theme.json");
        if !source.is_file() {
            log::debug!("no template theme at {}", source.display());
            return Ok(false);
        }
        fs::copy(&source, self.root.join("theme.json"))?;
        Ok(true)
    }

    /// `thumbnails/thumbnail.png`: the land mask scaled to 512×512, as RGB.
    pub fn write_thumbnail(&self, land: &Layer) -> Result<PathBuf> {
        let gray = GrayImage::from_raw(land.grid.width as u32, land.grid.height as u32, land.data.clone())
            .ok_or_else(|| MapPackError::GridMismatch {
                layer: "thumbnail".into(),
                expected_w: land.grid.width,
                expected_h: land.grid.height,
                found_w: land.data.len(),
                found_h: 1,
            })?;
        let small = image::imageops::resize(&gray, THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::CatmullRom);
        let path = self.thumbnails.join("thumbnail.png");
        DynamicImage::ImageLuma8(small).to_rgb8().save(&path)?;
        Ok(path)
    }

    pub fn write_readme(&self) -> Result<PathBuf> {
        let path = self.root.join("README.md");
        fs::write(&path, README)?;
        Ok(path)
    }
}

/// Recursively copy `from` into `to`; returns the number of files copied.
fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BBox;
    use tempfile::tempdir;

    fn grid(w: usize, h: usize) -> Grid {
        Grid::new(BBox { min_lon: 0.0, min_lat: 0.0, max_lon: 1.0, max_lat: 1.0 }, w, h)
    }

    #[test]
    fn template_icons_copied_only_when_missing() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let template = dir.join("template");
        fs::create_dir_all(template.join("icons/sub")).unwrap();
        fs::write(template.join("icons/icon_city.png"), b"city").unwrap();
        fs::write(template.join("icons/sub/extra.png"), b"extra").unwrap();

        let layout = MapLayout::new(&dir.join("map"), grid(2, 2));
        layout.ensure_dirs(&template).unwrap();
        assert!(layout.layers.is_dir());
        assert!(layout.thumbnails.is_dir());
        assert_eq!(fs::read(layout.icons.join("icon_city.png")).unwrap(), b"city");
        assert!(layout.icons.join("sub/extra.png").is_file());

        // Existing icons are left alone.
        fs::write(layout.icons.join("icon_city.png"), b"edited").unwrap();
        layout.ensure_dirs(&template).unwrap();
        assert_eq!(fs::read(layout.icons.join("icon_city.png")).unwrap(), b"edited");
    }

    #[test]
    fn layer_on_foreign_grid_is_refused() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let layout = MapLayout::new(dir, grid(4, 4));
        layout.ensure_dirs(&dir.join("none")).unwrap();

        let ok = layout.save_layer("land.png", &Layer::filled(grid(4, 4), 255)).unwrap();
        assert_eq!(image::image_dimensions(&ok).unwrap(), (4, 4));

        let err = layout.save_layer("bad.png", &Layer::empty(grid(4, 2))).unwrap_err();
        assert!(matches!(err, MapPackError::GridMismatch { found_h: 2, .. }));
        assert!(!layout.layers.join("bad.png").exists());
    }

    #[test]
    fn thumbnail_is_rgb_and_fixed_size() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let layout = MapLayout::new(dir, grid(64, 32));
        layout.ensure_dirs(dir).unwrap();
        let path = layout.write_thumbnail(&Layer::filled(grid(64, 32), 255)).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
        assert_eq!(img.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn theme_copied_when_present() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        let layout = MapLayout::new(&dir.join("map"), grid(1, 1));
        fs::create_dir_all(&layout.root).unwrap();
        assert!(!layout.copy_theme(dir).unwrap());
        fs::write(dir.join("theme.json"), "{\"accent\":\"#fff\"}").unwrap();
        assert!(layout.copy_theme(dir).unwrap());
        assert_eq!(fs::read_to_string(layout.root.join("theme.json")).unwrap(), "{\"accent\":\"#fff\"}");
        layout.write_readme().unwrap();
        assert!(fs::read_to_string(layout.root.join("README.md")).unwrap().starts_with("# North America Sample Map"));
    }
}
