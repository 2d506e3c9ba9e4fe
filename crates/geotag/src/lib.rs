//! GPS metadata extraction from photo and video files.
//!
//! Media files are dispatched on extension: JPEG and HEIC carry their
//! location in Exif GPS tags, QuickTime/MP4 containers carry an ISO 6709
//! string in their format metadata. Both paths normalise to signed decimal
//! degrees.

use std::path::Path;

use anyhow::Error;
use thiserror::Error;

mod photo;
mod video;

pub use video::parse_iso6709;

/// Decimal-degree coordinate pair read from media metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    /// Whether the pair lies inside the WGS84 range.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Error)]
pub enum GeotagError {
    #[error("unsupported media format {extension:?}")]
    Unsupported { extension: String },
    #[error(transparent)]
    Other(#[from] Error),
}

/// Extract coordinates from a media file, dispatching on its extension.
///
/// Returns `Ok(None)` when the file is a supported format but carries no
/// location metadata; that miss is distinct from a parse or I/O failure.
pub fn extract_coordinates(path: &Path) -> Result<Option<GpsCoordinates>, GeotagError> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" | "heic" => photo::read_exif_coordinates(path),
        "mov" | "mp4" => video::read_probe_coordinates(path),
        _ => Err(GeotagError::Unsupported { extension }),
    }
}
