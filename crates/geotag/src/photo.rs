//! Exif GPS tag parsing for JPEG and HEIC photos.
//!
//! Exif stores each axis as three degree/minute/second rationals plus a
//! hemisphere reference letter. Both are required; a photo missing either
//! is treated as carrying no location.

use std::{fs::File, io::BufReader, path::Path};

use exif::{Exif, In, Tag, Value};
use tracing::debug;

use crate::{GeotagError, GpsCoordinates};

pub(crate) fn read_exif_coordinates(
    path: &Path,
) -> Result<Option<GpsCoordinates>, GeotagError> {
    let file = File::open(path).map_err(|err| GeotagError::Other(err.into()))?;
    let mut reader = BufReader::new(file);
    let parsed = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(parsed) => parsed,
        Err(exif::Error::NotFound(_)) => {
            debug!("No Exif segment in {}", path.display());
            return Ok(None);
        }
        Err(err) => return Err(GeotagError::Other(err.into())),
    };

    let latitude = read_axis(&parsed, Tag::GPSLatitude, Tag::GPSLatitudeRef);
    let longitude = read_axis(&parsed, Tag::GPSLongitude, Tag::GPSLongitudeRef);

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(Some(GpsCoordinates {
            latitude,
            longitude,
        })),
        _ => Ok(None),
    }
}

/// Read one axis as signed decimal degrees, or `None` when the value or its
/// hemisphere reference is absent or has an unexpected shape.
fn read_axis(parsed: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let reference = parsed
        .get_field(ref_tag, In::PRIMARY)?
        .display_value()
        .to_string();
    let degrees = match &parsed.get_field(value_tag, In::PRIMARY)?.value {
        Value::Rational(parts) => {
            dms_to_degrees(parts.iter().map(|part| part.to_f64()))
        }
        Value::SRational(parts) => {
            dms_to_degrees(parts.iter().map(|part| part.to_f64()))
        }
        _ => None,
    }?;
    Some(apply_reference(degrees, &reference))
}

/// Collapse degree/minute/second components into decimal degrees.
fn dms_to_degrees(mut parts: impl Iterator<Item = f64>) -> Option<f64> {
    let degrees = parts.next()?;
    let minutes = parts.next()?;
    let seconds = parts.next()?;
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

/// Southern and western hemispheres negate the decimal value.
fn apply_reference(degrees: f64, reference: &str) -> f64 {
    if reference == "S" || reference == "W" {
        -degrees
    } else {
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_collapses_to_decimal() {
        let decimal = dms_to_degrees([51.0, 30.0, 18.0].into_iter()).unwrap();
        assert!((decimal - 51.505).abs() < 1e-9);
    }

    #[test]
    fn dms_requires_three_components() {
        assert_eq!(dms_to_degrees([51.0, 30.0].into_iter()), None);
    }

    #[test]
    fn reference_negates_south_and_west() {
        assert_eq!(apply_reference(33.9, "S"), -33.9);
        assert_eq!(apply_reference(0.09, "W"), -0.09);
        assert_eq!(apply_reference(51.5, "N"), 51.5);
        assert_eq!(apply_reference(151.2, "E"), 151.2);
    }

    #[test]
    fn plain_file_has_no_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jpg");
        // SOI followed immediately by EOI: a valid JPEG shell without an
        // APP1 segment, which the reader reports as Exif-not-found.
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        assert_eq!(read_exif_coordinates(&path).unwrap(), None);
    }
}
