use std::path::Path;

use anyhow::{Result, bail};

const EXTRACT_USAGE: &str =
    "Usage: memory-map extract <file> [<file>...]\n\nSupported formats: jpg, jpeg, heic, mov, mp4";

/// Print decimal GPS coordinates for each media file given on the command
/// line. Files without location metadata are reported rather than skipped.
pub fn run(args: &[String]) -> Result<()> {
    let paths = &args[2..];
    if paths.is_empty() {
        bail!("{EXTRACT_USAGE}");
    }

    let mut failures = 0usize;
    for raw in paths {
        match geotag::extract_coordinates(Path::new(raw)) {
            Ok(Some(coords)) => {
                println!("{raw}\t{}, {}", coords.latitude, coords.longitude);
            }
            Ok(None) => {
                println!("{raw}\tno GPS metadata");
            }
            Err(err) => {
                eprintln!("{raw}\t{err}");
                failures += 1;
            }
        }
    }

    if failures == paths.len() {
        bail!("Failed to extract coordinates from every input file");
    }
    Ok(())
}
