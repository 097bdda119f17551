//! `.wyn` map archives: a plain ZIP of the editor-facing files of a map
//! directory.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Top-level entries packed, in archive order. Missing ones are skipped.
pub const PACKED_ENTRIES: [&str; 7] = [
    "legend.json",
    "locations.json",
    "theme.json",
    "metadata.json",
    "icons",
    "layers",
    "thumbnails",
];

/// Zip `map_dir` into `out`, replacing any existing archive. Returns the
/// number of files stored.
pub fn pack_map(map_dir: &Path, out: &Path) -> Result<usize> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut zip = ZipWriter::new(BufWriter::new(File::create(out)?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;

    for entry in PACKED_ENTRIES {
        let top = map_dir.join(entry);
        if !top.exists() {
            log::warn!("packmap: {} missing, skipped", top.display());
            continue;
        }
        for item in WalkDir::new(&top).sort_by_file_name() {
            let item = item?;
            let rel = item.path().strip_prefix(map_dir).unwrap_or(item.path());
            let name = archive_name(rel);
            if item.file_type().is_dir() {
                zip.add_directory(format!("{name}/"), options)?;
            } else {
                zip.start_file(name, options)?;
                io::copy(&mut File::open(item.path())?, &mut zip)?;
                files += 1;
            }
        }
    }

    zip.finish()?;
    log::info!("packed {files} files into {}", out.display());
    Ok(files)
}

/// Forward-slash path inside the archive.
fn archive_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
