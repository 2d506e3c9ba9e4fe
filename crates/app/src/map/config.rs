//! Configuration parsing for the map server.
//!
//! This module owns translation of CLI arguments into a `MapConfig` struct
//! which the server, ingest, and page bootstrap use without re-parsing
//! flags.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use geotag::GpsCoordinates;

/// Canonical configuration shared by the server and its background work.
#[derive(Clone, Debug)]
pub struct MapConfig {
    /// Bind address for the HTTP server.
    pub host: String,
    /// TCP port for the HTTP server.
    pub port: u16,
    /// Initial map centre in decimal degrees.
    pub center: (f64, f64),
    /// Initial zoom level.
    pub zoom: u32,
    /// Tile server URL template with `{s}`/`{z}`/`{x}`/`{y}` placeholders.
    pub tile_url: String,
    /// Attribution line shown on the tile layer.
    pub tile_attribution: String,
    /// Directory where uploaded photos are stored and rescanned on startup.
    pub upload_dir: PathBuf,
    /// Endpoint path the page polls for the newest marker.
    pub marker_source: String,
    /// Optional coordinate provider fetched once at startup.
    pub source_url: Option<String>,
    /// Emit verbose logging (uploads, extraction misses).
    pub verbose: bool,
}

/// CLI arguments accepted by the `serve` subcommand.
#[derive(Debug, Parser)]
#[command(name = "serve", about = "Start the map server")]
pub struct ServeArgs {
    /// Bind address for the HTTP server.
    #[arg(long = "host", value_name = "ADDR", default_value = "127.0.0.1")]
    pub host: String,
    /// TCP port for the HTTP server.
    #[arg(long = "port", value_name = "PORT", default_value_t = 8080)]
    pub port: u16,
    /// Initial map centre as `lat,lon`.
    #[arg(
        long = "center",
        value_name = "LAT,LON",
        default_value = "51.505,-0.09",
        allow_hyphen_values = true
    )]
    pub center: String,
    /// Initial zoom level.
    #[arg(long = "zoom", value_name = "LEVEL", default_value_t = 13)]
    pub zoom: u32,
    /// Tile server URL template.
    #[arg(
        long = "tiles",
        value_name = "URL",
        default_value = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png"
    )]
    pub tiles: String,
    /// Attribution shown on the tile layer.
    #[arg(
        long = "attribution",
        value_name = "TEXT",
        default_value = "&copy; OpenStreetMap contributors"
    )]
    pub attribution: String,
    /// Directory for uploaded photos.
    #[arg(long = "images", value_name = "DIR", default_value = "images")]
    pub images: PathBuf,
    /// Endpoint path the page polls for the newest marker.
    #[arg(long = "marker-source", value_name = "PATH", default_value = "/markers/latest")]
    pub marker_source: String,
    /// Coordinate provider URL fetched once at startup.
    #[arg(long = "source-url", value_name = "URL")]
    pub source_url: Option<String>,
    /// Emit verbose logging (uploads, extraction misses).
    #[arg(long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

impl TryFrom<ServeArgs> for MapConfig {
    type Error = anyhow::Error;

    fn try_from(args: ServeArgs) -> Result<Self> {
        let center = parse_center(&args.center)?;

        if args.tiles.is_empty() {
            bail!("--tiles must not be empty");
        }

        if !args.marker_source.starts_with('/') {
            bail!("--marker-source must be an absolute path such as /markers/latest");
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            center,
            zoom: args.zoom,
            tile_url: args.tiles,
            tile_attribution: args.attribution,
            upload_dir: args.images,
            marker_source: args.marker_source,
            source_url: args.source_url,
            verbose: args.verbose,
        })
    }
}

impl MapConfig {
    /// Configuration produced when `serve` runs without flags.
    pub fn from_defaults() -> Result<Self> {
        Self::try_from(ServeArgs::parse_from(["serve"]))
    }
}

/// Parse a `lat,lon` pair and validate it against the WGS84 range.
fn parse_center(raw: &str) -> Result<(f64, f64)> {
    let (lat_raw, lon_raw) = raw
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("--center must be formatted as lat,lon"))?;
    let latitude = lat_raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid centre latitude {lat_raw:?}"))?;
    let longitude = lon_raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid centre longitude {lon_raw:?}"))?;

    let coords = GpsCoordinates {
        latitude,
        longitude,
    };
    if !coords.in_range() {
        bail!("--center ({latitude}, {longitude}) is outside the WGS84 range");
    }
    Ok((latitude, longitude))
}
