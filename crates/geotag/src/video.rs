//! QuickTime/MP4 location metadata probed with `ffprobe`.
//!
//! Apple devices write an ISO 6709 annex-H string such as
//! `+40.7685-073.9868+033.150/` into the container's format tags. The probe
//! output is requested as JSON and the tag parsed sign-by-sign, so negative
//! longitudes and the optional altitude suffix are handled.

use std::{path::Path, process::Command};

use anyhow::anyhow;
use tracing::debug;

use crate::{GeotagError, GpsCoordinates};

const APPLE_LOCATION_TAG: &str = "com.apple.quicktime.location.ISO6709";

pub(crate) fn read_probe_coordinates(
    path: &Path,
) -> Result<Option<GpsCoordinates>, GeotagError> {
    let output = Command::new("ffprobe")
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .map_err(|err| GeotagError::Other(err.into()))?;

    if !output.status.success() {
        return Err(GeotagError::Other(anyhow!(
            "ffprobe exited with {} for {}",
            output.status,
            path.display()
        )));
    }

    let probe: serde_json::Value =
        serde_json::from_slice(&output.stdout).map_err(|err| GeotagError::Other(err.into()))?;
    let tags = &probe["format"]["tags"];
    let location = tags[APPLE_LOCATION_TAG]
        .as_str()
        .or_else(|| tags["location"].as_str());

    match location {
        Some(raw) => Ok(parse_iso6709(raw)),
        None => {
            debug!("No location tags in {}", path.display());
            Ok(None)
        }
    }
}

/// Parse an ISO 6709 annex-H point string into decimal degrees.
///
/// The string carries sign-prefixed latitude then longitude, an optional
/// sign-prefixed altitude, and an optional trailing `/`. Returns `None`
/// when fewer than two coordinate fields parse.
pub fn parse_iso6709(raw: &str) -> Option<GpsCoordinates> {
    let trimmed = raw.trim().trim_end_matches('/');

    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    for (index, ch) in trimmed.char_indices() {
        if (ch == '+' || ch == '-') && index > 0 {
            fields.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        fields.push(current);
    }

    let latitude = fields.first()?.parse::<f64>().ok()?;
    let longitude = fields.get(1)?.parse::<f64>().ok()?;
    Some(GpsCoordinates {
        latitude,
        longitude,
    })
}
