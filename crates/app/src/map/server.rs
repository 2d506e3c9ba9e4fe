//! Actix Web endpoints serving the map page, marker feeds, and photo
//! uploads.
//!
//! The server owns a single shared `MapView`: the startup rescan and the
//! upload handler mutate it behind a lock, while the page reads bootstrap
//! state and the marker feeds.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    thread,
};

use actix_multipart::Multipart;
use actix_web::{App, HttpResponse, HttpServer, web};
use anyhow::{Context, Result};
use futures_util::StreamExt as _;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::html;
use crate::map::{
    MapConfig, cluster,
    data::{ClustersResponse, MapBootstrap, MarkerRecord, MarkersResponse, SharedView, UploadOutcome},
    ingest,
    view::{MapView, TileLayer},
};

/// Shared state backing HTTP handlers.
pub(crate) struct ServerState {
    pub(crate) view: SharedView,
    pub(crate) config: MapConfig,
}

#[derive(Deserialize)]
struct MarkersQuery {
    zoom: Option<u32>,
}

/// Run the map server until it is shut down.
pub fn run(config: MapConfig) -> Result<()> {
    actix_web::rt::System::new().block_on(serve(config))
}

async fn serve(config: MapConfig) -> Result<()> {
    // The surface always comes up before any marker is loaded; a failed
    // initial fetch leaves the map empty but reachable.
    let mut map_view = MapView::initialize(
        config.center,
        config.zoom,
        TileLayer {
            url_template: config.tile_url.clone(),
            attribution: config.tile_attribution.clone(),
        },
    );
    if let Some(source_url) = &config.source_url {
        match map_view.load_marker(source_url).await {
            Ok(record) => {
                debug!(
                    "Loaded initial marker {} at ({}, {})",
                    record.filename, record.latitude, record.longitude
                );
            }
            Err(err) => warn!("Initial marker load failed: {err}"),
        }
    }
    let view: SharedView = Arc::new(Mutex::new(map_view));

    spawn_rescan_consumer(config.upload_dir.clone(), view.clone());

    let bind_addr = (config.host.clone(), config.port);
    debug!("Map available at http://{}:{}/", config.host, config.port);
    println!("Map available at http://{}:{}/", config.host, config.port);
    if config.verbose {
        debug!("Storing uploads under {}", config.upload_dir.display());
        println!("Storing uploads under {}", config.upload_dir.display());
    }

    let server_view = view.clone();
    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ServerState {
                view: server_view.clone(),
                config: server_config.clone(),
            }))
            .configure(routes)
    })
    .bind(bind_addr)
    .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("Map server terminated abnormally")?;

    Ok(())
}

/// Register every route; shared by `run` and the handler tests.
pub(crate) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_route))
        .route("/mapconfig", web::get().to(bootstrap_handler))
        .route("/markers", web::get().to(markers_handler))
        .route("/markers/latest", web::get().to(latest_marker_handler))
        .route("/upload", web::post().to(upload_handler));
}

/// Drain the startup rescan into the shared view on a background thread.
fn spawn_rescan_consumer(dir: PathBuf, view: SharedView) {
    let rx = ingest::spawn_rescan(dir);
    thread::spawn(move || {
        for message in rx {
            match message {
                Ok(record) => {
                    let Ok(mut guard) = view.lock() else { break };
                    if let Err(err) = guard.place_marker(record) {
                        warn!("Skipping rescanned marker: {err}");
                    }
                }
                Err(err) => warn!("Rescan extraction failed: {err}"),
            }
        }
    });
}

/// Serve the embedded map page.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html::map_page::MAP_INDEX_HTML)
}

/// Bootstrap payload the page uses to build the map before any marker
/// fetch.
async fn bootstrap_handler(state: web::Data<ServerState>) -> HttpResponse {
    let guard = match state.view.lock() {
        Ok(guard) => guard,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    let (latitude, longitude) = guard.center();
    HttpResponse::Ok().json(MapBootstrap {
        center: [latitude, longitude],
        zoom: guard.zoom(),
        tile_url: &guard.tile_layer().url_template,
        attribution: &guard.tile_layer().attribution,
        marker_source: &state.config.marker_source,
    })
}

/// Return every placed marker; with `?zoom=N` the markers are grouped for
/// that zoom level.
async fn markers_handler(
    query: web::Query<MarkersQuery>,
    state: web::Data<ServerState>,
) -> HttpResponse {
    let guard = match state.view.lock() {
        Ok(guard) => guard,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    let markers = guard.markers().to_vec();
    drop(guard);

    match query.zoom {
        Some(zoom) => {
            let records: Vec<MarkerRecord> = markers
                .iter()
                .map(|marker| marker.record.clone())
                .collect();
            HttpResponse::Ok().json(ClustersResponse {
                count: records.len(),
                clusters: cluster::cluster_markers(&records, zoom),
            })
        }
        None => HttpResponse::Ok().json(MarkersResponse {
            count: markers.len(),
            markers,
        }),
    }
}

/// The coordinate provider: the most recently placed marker as a single
/// JSON object, or `204 No Content` before the first marker exists.
async fn latest_marker_handler(state: web::Data<ServerState>) -> HttpResponse {
    let guard = match state.view.lock() {
        Ok(guard) => guard,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    match guard.latest_record() {
        Some(record) => HttpResponse::Ok().json(record),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Accept multipart photo uploads, geotag them, and pin a marker for every
/// in-range hit. Each file gets its own result entry; a request without a
/// file part is rejected.
async fn upload_handler(state: web::Data<ServerState>, mut payload: Multipart) -> HttpResponse {
    let mut outcomes: Vec<UploadOutcome> = Vec::new();
    let mut saw_file = false;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(err) => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({ "error": err.to_string() }));
            }
        };

        let raw_name = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
            .map(str::to_owned);
        let Some(raw_name) = raw_name else {
            continue;
        };
        saw_file = true;
        let Some(filename) = ingest::sanitize_filename(&raw_name) else {
            continue;
        };

        let mut bytes = web::BytesMut::new();
        let mut field_error: Option<String> = None;
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(data) => bytes.extend_from_slice(&data),
                Err(err) => {
                    field_error = Some(err.to_string());
                    break;
                }
            }
        }
        if let Some(err) = field_error {
            outcomes.push(UploadOutcome {
                filename,
                latitude: None,
                longitude: None,
                message: None,
                error: Some(err),
            });
            continue;
        }

        // File and Exif work is blocking; keep it off the reactor.
        let dir = state.config.upload_dir.clone();
        let stored_name = filename.clone();
        let stored =
            web::block(move || ingest::store_and_extract(&dir, &stored_name, &bytes)).await;
        let outcome = match stored {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => UploadOutcome {
                filename,
                latitude: None,
                longitude: None,
                message: None,
                error: Some(format!("{err:#}")),
            },
            Err(err) => UploadOutcome {
                filename,
                latitude: None,
                longitude: None,
                message: None,
                error: Some(err.to_string()),
            },
        };

        if let (Some(latitude), Some(longitude)) = (outcome.latitude, outcome.longitude) {
            match state.view.lock() {
                Ok(mut guard) => {
                    if let Err(err) = guard.place_marker(MarkerRecord {
                        filename: outcome.filename.clone(),
                        latitude,
                        longitude,
                    }) {
                        warn!("Upload {} extracted but not placed: {err}", outcome.filename);
                    }
                }
                Err(err) => error!("Map view lock poisoned: {err}"),
            }
        }
        outcomes.push(outcome);
    }

    if !saw_file {
        return HttpResponse::BadRequest().json(serde_json::json!({ "error": "No file part" }));
    }
    HttpResponse::Ok().json(outcomes)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use actix_web::test;

    use super::*;

    const BOUNDARY: &str = "map-test-boundary";

    fn test_state(upload_dir: &Path) -> ServerState {
        let mut config = MapConfig::from_defaults().unwrap();
        config.upload_dir = upload_dir.to_path_buf();
        let view: SharedView = Arc::new(Mutex::new(MapView::initialize(
            config.center,
            config.zoom,
            TileLayer {
                url_template: config.tile_url.clone(),
                attribution: config.tile_attribution.clone(),
            },
        )));
        ServerState { view, config }
    }

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn place(state: &ServerState, filename: &str, latitude: f64, longitude: f64) {
        state
            .view
            .lock()
            .unwrap()
            .place_marker(MarkerRecord {
                filename: filename.to_string(),
                latitude,
                longitude,
            })
            .unwrap();
    }

    #[actix_web::test]
    async fn page_is_served_with_the_map_element() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(dir.path())))
                .configure(routes),
        )
        .await;

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(response.status().is_success());
        let body = test::read_body(response).await;
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains("leaflet"));
        assert!(body.contains(r#"id="map""#));
    }

    #[actix_web::test]
    async fn bootstrap_reports_the_configured_surface() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(dir.path())))
                .configure(routes),
        )
        .await;

        let payload: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/mapconfig").to_request(),
        )
        .await;

        assert_eq!(payload["center"][0], 51.505);
        assert_eq!(payload["center"][1], -0.09);
        assert_eq!(payload["zoom"], 13);
        assert_eq!(payload["marker_source"], "/markers/latest");
        assert!(
            payload["tile_url"]
                .as_str()
                .unwrap()
                .contains("{z}/{x}/{y}")
        );
    }

    #[actix_web::test]
    async fn latest_marker_is_empty_then_serves_the_newest_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let view = state.view.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/markers/latest").to_request(),
        )
        .await;
        assert_eq!(response.status(), actix_web::http::StatusCode::NO_CONTENT);

        view.lock()
            .unwrap()
            .place_marker(MarkerRecord {
                filename: "a.jpg".to_string(),
                latitude: 51.5,
                longitude: -0.09,
            })
            .unwrap();

        let record: MarkerRecord = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/markers/latest").to_request(),
        )
        .await;
        assert_eq!(record.filename, "a.jpg");
        assert_eq!((record.latitude, record.longitude), (51.5, -0.09));
    }

    #[actix_web::test]
    async fn markers_feed_serves_flat_and_clustered_forms() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        place(&state, "a.jpg", 51.5005, -0.0900);
        place(&state, "b.jpg", 51.5007, -0.0902);
        place(&state, "c.jpg", 40.7000, -74.0000);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let flat: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/markers").to_request(),
        )
        .await;
        assert_eq!(flat["count"], 3);
        assert_eq!(flat["markers"].as_array().unwrap().len(), 3);
        assert!(
            flat["markers"][0]["popup_html"]
                .as_str()
                .unwrap()
                .contains("a.jpg")
        );

        let clustered: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/markers?zoom=13").to_request(),
        )
        .await;
        assert_eq!(clustered["count"], 3);
        let clusters = clustered["clusters"].as_array().unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0]["count"], 2);
        assert_eq!(clusters[1]["count"], 1);
    }

    #[actix_web::test]
    async fn upload_without_a_file_part_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(dir.path())))
                .configure(routes),
        )
        .await;

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/upload")
                .insert_header((
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ))
                .set_payload(format!("--{BOUNDARY}--\r\n"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn upload_without_gps_reports_a_miss_and_places_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let view = state.view.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let outcomes: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/upload")
                .insert_header((
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ))
                .set_payload(multipart_body("empty.jpg", &[0xFF, 0xD8, 0xFF, 0xD9]))
                .to_request(),
        )
        .await;

        let entries = outcomes.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["filename"], "empty.jpg");
        assert!(
            entries[0]["message"]
                .as_str()
                .unwrap()
                .contains("no geotagging data")
        );
        assert!(view.lock().unwrap().markers().is_empty());
        assert!(dir.path().join("empty.jpg").exists());
    }

    #[actix_web::test]
    async fn unsupported_upload_reports_a_per_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(dir.path())))
                .configure(routes),
        )
        .await;

        let outcomes: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/upload")
                .insert_header((
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ))
                .set_payload(multipart_body("notes.txt", b"hello"))
                .to_request(),
        )
        .await;

        let entries = outcomes.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(
            entries[0]["error"]
                .as_str()
                .unwrap()
                .contains("unsupported media format")
        );
    }
}
