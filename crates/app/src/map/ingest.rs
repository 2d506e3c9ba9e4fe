//! Upload persistence and startup rescans of the photo directory.
//!
//! Uploads are written straight under the configured directory; there is no
//! database. A rescan walks that directory on startup so photos from
//! earlier runs reappear on the map.

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded};
use geotag::GeotagError;
use tracing::debug;
use walkdir::WalkDir;

use crate::map::data::{MarkerRecord, UploadOutcome};

const MEDIA_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "heic", "mov", "mp4"];

/// Spawn a background thread that walks `dir` and forwards a marker record
/// for every geotagged media file found.
///
/// Extraction failures are forwarded as errors so the consumer can log
/// them. The buffer is intentionally small to backpressure the walk when
/// the consumer falls behind.
pub(crate) fn spawn_rescan(dir: PathBuf) -> Receiver<Result<MarkerRecord, GeotagError>> {
    let (tx, rx) = bounded(16);

    thread::spawn(move || {
        for entry in WalkDir::new(&dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !has_media_extension(path) {
                continue;
            }

            let message = match geotag::extract_coordinates(path) {
                Ok(Some(coords)) => Ok(marker_record(path, coords.latitude, coords.longitude)),
                Ok(None) => {
                    debug!("No GPS metadata in {}", path.display());
                    continue;
                }
                Err(err) => Err(err),
            };
            if tx.send(message).is_err() {
                break;
            }
        }
    });

    rx
}

/// Persist one uploaded file under `dir` and extract its coordinates.
///
/// Mirrors the upload contract: extraction misses and failures are reported
/// per file rather than failing the whole request, and out-of-range
/// coordinates are rejected.
pub(crate) fn store_and_extract(dir: &Path, filename: &str, bytes: &[u8]) -> Result<UploadOutcome> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create upload directory {}", dir.display()))?;
    let path = dir.join(filename);
    fs::write(&path, bytes)
        .with_context(|| format!("failed to store upload {}", path.display()))?;

    let outcome = match geotag::extract_coordinates(&path) {
        Ok(Some(coords)) if coords.in_range() => UploadOutcome {
            filename: filename.to_string(),
            latitude: Some(coords.latitude),
            longitude: Some(coords.longitude),
            message: Some("File uploaded and geotagging data extracted successfully!".to_string()),
            error: None,
        },
        Ok(Some(coords)) => UploadOutcome {
            filename: filename.to_string(),
            latitude: None,
            longitude: None,
            message: None,
            error: Some(format!(
                "coordinates ({}, {}) outside WGS84 range",
                coords.latitude, coords.longitude
            )),
        },
        Ok(None) => UploadOutcome {
            filename: filename.to_string(),
            latitude: None,
            longitude: None,
            message: Some("File uploaded, but no geotagging data found.".to_string()),
            error: None,
        },
        Err(err) => UploadOutcome {
            filename: filename.to_string(),
            latitude: None,
            longitude: None,
            message: None,
            error: Some(err.to_string()),
        },
    };
    Ok(outcome)
}

/// Reduce a client-supplied filename to a bare, non-empty file name so
/// uploads cannot escape the photo directory.
pub(crate) fn sanitize_filename(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
}

fn has_media_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}

fn marker_record(path: &Path, latitude: f64, longitude: f64) -> MarkerRecord {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    MarkerRecord {
        filename,
        latitude,
        longitude,
    }
}
