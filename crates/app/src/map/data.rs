use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::map::{
    cluster::MarkerCluster,
    view::{MapView, Marker},
};

/// Marker payload served by the coordinate endpoints and consumed by the
/// page: where to pin a marker and which file it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct MarkerRecord {
    pub(crate) filename: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
}

/// Per-file outcome reported by the upload endpoint.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct UploadOutcome {
    pub(crate) filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

/// Bootstrap payload the page fetches before building the map.
#[derive(Serialize)]
pub(crate) struct MapBootstrap<'a> {
    pub(crate) center: [f64; 2],
    pub(crate) zoom: u32,
    pub(crate) tile_url: &'a str,
    pub(crate) attribution: &'a str,
    pub(crate) marker_source: &'a str,
}

/// Flat form of the markers feed.
#[derive(Serialize)]
pub(crate) struct MarkersResponse {
    pub(crate) count: usize,
    pub(crate) markers: Vec<Marker>,
}

/// Zoom-grouped form of the markers feed.
#[derive(Serialize)]
pub(crate) struct ClustersResponse {
    pub(crate) count: usize,
    pub(crate) clusters: Vec<MarkerCluster>,
}

pub(crate) type SharedView = Arc<Mutex<MapView>>;
