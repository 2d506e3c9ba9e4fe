//! Photo map server: geotags uploaded media and renders the results as
//! markers on an embedded map page.
//!
//! The module is split into focused submodules:
//! - `config`: CLI configuration parsing.
//! - `data`: Shared structs passed between handlers and the page.
//! - `view`: Map widget state and the fetch-then-place marker flow.
//! - `cluster`: Zoom-aware density grouping for the markers endpoint.
//! - `ingest`: Upload persistence and startup rescans of the photo directory.
//! - `server`: Actix Web endpoints backing the embedded page.

use clap::Parser;

/// Re-export the configuration types so callers can start the server
/// without reaching into submodules.
pub use config::{MapConfig, ServeArgs};
/// Launch the map server with a ready-made configuration.
pub use server::run;

mod cluster;
mod config;
mod data;
mod ingest;
mod server;
mod view;

/// Parse `serve` subcommand arguments and run the server.
pub fn run_from_args(args: &[String]) -> anyhow::Result<()> {
    let cli = ServeArgs::parse_from(&args[1..]);
    run(MapConfig::try_from(cli)?)
}
