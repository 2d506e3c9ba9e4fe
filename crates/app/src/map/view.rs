//! Map widget state and the fetch-then-place marker flow.
//!
//! A `MapView` owns one tile layer and the markers pinned on top of it. The
//! widget is created fully initialised, so the surface is renderable before
//! any marker load is attempted; a failed load leaves it untouched.

use geotag::GpsCoordinates;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::map::data::MarkerRecord;

/// Raster tile source composited under the markers.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct TileLayer {
    pub(crate) url_template: String,
    pub(crate) attribution: String,
}

/// Point annotation pinned to the map with a pre-rendered popup body.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct Marker {
    #[serde(flatten)]
    pub(crate) record: MarkerRecord,
    pub(crate) popup_html: String,
}

/// Errors surfaced while loading a marker from a coordinate provider.
#[derive(Debug, Error)]
pub(crate) enum MarkerError {
    #[error("coordinate request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("coordinate response malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("coordinates ({latitude}, {longitude}) outside WGS84 range")]
    OutOfRange { latitude: f64, longitude: f64 },
}

/// Single map widget instance: centre, zoom, one tile layer, markers.
#[derive(Debug)]
pub(crate) struct MapView {
    center: (f64, f64),
    zoom: u32,
    tile_layer: TileLayer,
    markers: Vec<Marker>,
}

impl MapView {
    /// Create the map surface centred on `center` at `zoom` with its tile
    /// layer attached. No markers are present until one is placed.
    pub(crate) fn initialize(center: (f64, f64), zoom: u32, tile_layer: TileLayer) -> Self {
        Self {
            center,
            zoom,
            tile_layer,
            markers: Vec::new(),
        }
    }

    pub(crate) fn center(&self) -> (f64, f64) {
        self.center
    }

    pub(crate) fn zoom(&self) -> u32 {
        self.zoom
    }

    pub(crate) fn tile_layer(&self) -> &TileLayer {
        &self.tile_layer
    }

    pub(crate) fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// The most recently placed marker record, if any.
    pub(crate) fn latest_record(&self) -> Option<&MarkerRecord> {
        self.markers.last().map(|marker| &marker.record)
    }

    /// Pin a marker, rejecting coordinates outside the WGS84 range.
    pub(crate) fn place_marker(&mut self, record: MarkerRecord) -> Result<(), MarkerError> {
        let coords = GpsCoordinates {
            latitude: record.latitude,
            longitude: record.longitude,
        };
        if !coords.in_range() {
            return Err(MarkerError::OutOfRange {
                latitude: record.latitude,
                longitude: record.longitude,
            });
        }

        debug!(
            "Placing marker {} at ({}, {})",
            record.filename, record.latitude, record.longitude
        );
        let popup_html = popup_html(&record);
        self.markers.push(Marker { record, popup_html });
        Ok(())
    }

    /// Fetch a marker record from `source_url` and pin it to the map.
    ///
    /// Issues exactly one request; on any failure no marker is placed and
    /// the map keeps its current state.
    pub(crate) async fn load_marker(
        &mut self,
        source_url: &str,
    ) -> Result<MarkerRecord, MarkerError> {
        let record = fetch_marker(source_url).await?;
        self.place_marker(record.clone())?;
        Ok(record)
    }
}

/// GET `source_url` and decode the body as a single marker record.
///
/// Transport failures and non-success statuses map to `Network`; bodies
/// that are not JSON or lack a required field map to `Malformed`.
pub(crate) async fn fetch_marker(source_url: &str) -> Result<MarkerRecord, MarkerError> {
    let body = reqwest::get(source_url)
        .await?
        .error_for_status()?
        .text()
        .await?;
    let record: MarkerRecord = serde_json::from_str(&body)?;
    Ok(record)
}

/// Popup body carrying the filename and the raw coordinate pair.
pub(crate) fn popup_html(record: &MarkerRecord) -> String {
    format!(
        "<b>{}</b><br>{}, {}",
        record.filename, record.latitude, record.longitude
    )
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use super::*;

    fn test_view() -> MapView {
        MapView::initialize(
            (51.505, -0.09),
            13,
            TileLayer {
                url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                attribution: "&copy; OpenStreetMap contributors".to_string(),
            },
        )
    }

    /// Serve a single canned HTTP response on an ephemeral port and return
    /// the URL to request.
    fn spawn_stub(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let response = format!(
                    "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/marker")
    }

    #[test]
    fn initialization_precedes_marker_placement() {
        let view = test_view();
        assert_eq!(view.center(), (51.505, -0.09));
        assert_eq!(view.zoom(), 13);
        assert!(view.tile_layer().url_template.contains("{z}/{x}/{y}"));
        assert!(view.markers().is_empty());
        assert!(view.latest_record().is_none());
    }

    #[test]
    fn placed_marker_popup_names_the_file_and_coordinates() {
        let mut view = test_view();
        view.place_marker(MarkerRecord {
            filename: "a.jpg".to_string(),
            latitude: 51.5,
            longitude: -0.09,
        })
        .unwrap();

        assert_eq!(view.markers().len(), 1);
        let marker = &view.markers()[0];
        assert_eq!(marker.record.latitude, 51.5);
        assert_eq!(marker.record.longitude, -0.09);
        assert!(marker.popup_html.contains("a.jpg"));
        assert!(marker.popup_html.contains("51.5"));
        assert!(marker.popup_html.contains("-0.09"));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut view = test_view();
        let result = view.place_marker(MarkerRecord {
            filename: "poles.jpg".to_string(),
            latitude: 120.0,
            longitude: 0.0,
        });

        assert!(matches!(result, Err(MarkerError::OutOfRange { .. })));
        assert!(view.markers().is_empty());
    }

    #[actix_web::test]
    async fn load_marker_places_exactly_one_marker() {
        let url = spawn_stub(
            "HTTP/1.1 200 OK",
            r#"{"filename": "a.jpg", "latitude": 51.5, "longitude": -0.09}"#,
        );

        let mut view = test_view();
        let record = view.load_marker(&url).await.unwrap();

        assert_eq!(record.filename, "a.jpg");
        assert_eq!(view.markers().len(), 1);
        let marker = &view.markers()[0];
        assert_eq!(
            (marker.record.latitude, marker.record.longitude),
            (51.5, -0.09)
        );
        assert!(marker.popup_html.contains("a.jpg"));
    }

    #[actix_web::test]
    async fn non_json_body_places_no_marker() {
        let url = spawn_stub("HTTP/1.1 200 OK", "<html>not json</html>");

        let mut view = test_view();
        let result = view.load_marker(&url).await;

        assert!(matches!(result, Err(MarkerError::Malformed(_))));
        assert!(view.markers().is_empty());
    }

    #[actix_web::test]
    async fn missing_fields_place_no_marker() {
        let url = spawn_stub("HTTP/1.1 200 OK", r#"{"filename": "a.jpg"}"#);

        let mut view = test_view();
        let result = view.load_marker(&url).await;

        assert!(matches!(result, Err(MarkerError::Malformed(_))));
        assert!(view.markers().is_empty());
    }

    #[actix_web::test]
    async fn error_status_is_a_network_failure() {
        let url = spawn_stub("HTTP/1.1 500 Internal Server Error", "boom");

        let mut view = test_view();
        let result = view.load_marker(&url).await;

        assert!(matches!(result, Err(MarkerError::Network(_))));
        assert!(view.markers().is_empty());
    }

    #[actix_web::test]
    async fn unreachable_provider_is_a_network_failure() {
        // Bind then drop so the port is very likely unoccupied.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{port}/marker");

        let mut view = test_view();
        let result = view.load_marker(&url).await;

        assert!(matches!(result, Err(MarkerError::Network(_))));
        assert!(view.markers().is_empty());
    }

    #[actix_web::test]
    async fn fetched_out_of_range_coordinates_are_rejected() {
        let url = spawn_stub(
            "HTTP/1.1 200 OK",
            r#"{"filename": "bad.jpg", "latitude": -91.0, "longitude": 10.0}"#,
        );

        let mut view = test_view();
        let result = view.load_marker(&url).await;

        assert!(matches!(result, Err(MarkerError::OutOfRange { .. })));
        assert!(view.markers().is_empty());
    }
}
