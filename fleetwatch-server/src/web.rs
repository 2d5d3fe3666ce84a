use axum::{
    debug_handler,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_graceful_shutdown::SubsystemHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use fleetwatch_core::{AlertRecord, GeoPoint, StartRejected, TrackError};

use crate::{
    weather::{OceanQuery, WeatherProxy},
    Session, SharedEngine,
};

// Zones
const ZONES_URI: &str = "/api/zones";
const ZONE_URI: &str = "/api/zones/{zone_id}";
// Vessels
const VESSELS_URI: &str = "/api/vessels";
const VESSEL_URI: &str = "/api/vessels/{vessel_id}";
const VESSEL_START_URI: &str = "/api/vessels/{vessel_id}/start";
const VESSEL_PAUSE_URI: &str = "/api/vessels/{vessel_id}/pause";
const VESSEL_RESET_URI: &str = "/api/vessels/{vessel_id}/reset";
// Fleet-wide playback
const PLAYBACK_START_URI: &str = "/api/playback/start";
const PLAYBACK_PAUSE_URI: &str = "/api/playback/pause";
const PLAYBACK_RESET_URI: &str = "/api/playback/reset";
// Alerts
const ALERTS_URI: &str = "/api/alerts";
const ALERTS_HOURLY_URI: &str = "/api/alerts/hourly";
const ALERTS_STREAM_URI: &str = "/api/alerts/stream";
// Weather
const OCEAN_URI: &str = "/api/ocean";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
pub struct Web {
    session: Session,
    shutdown_tx: broadcast::Sender<()>,
    /// Monitor engine shared with the scheduler
    engine: SharedEngine,
    weather: WeatherProxy,
}

impl Web {
    pub fn new(session: Session) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let engine = session.engine();
        let weather = WeatherProxy::new(&session.config());

        Web {
            session,
            shutdown_tx,
            engine,
            weather,
        }
    }

    /// All API routes with state, CORS and no-cache headers applied
    pub fn router(self) -> Router {
        let cors_origin = self.session.config().cors_origin;

        let app = Router::new()
            // Zones
            .route(ZONES_URI, get(get_zones).post(create_zone))
            .route(ZONE_URI, get(get_zone).put(update_zone).delete(delete_zone))
            // Vessels
            .route(VESSELS_URI, get(get_vessels).post(upload_vessel))
            .route(VESSEL_URI, get(get_vessel).delete(delete_vessel))
            .route(VESSEL_START_URI, post(start_vessel))
            .route(VESSEL_PAUSE_URI, post(pause_vessel))
            .route(VESSEL_RESET_URI, post(reset_vessel))
            // Fleet-wide playback
            .route(PLAYBACK_START_URI, post(start_all))
            .route(PLAYBACK_PAUSE_URI, post(pause_all))
            .route(PLAYBACK_RESET_URI, post(reset_all))
            // Alerts
            .route(ALERTS_URI, get(get_alerts).delete(clear_alerts))
            .route(ALERTS_HOURLY_URI, get(get_hourly_alerts))
            .route(ALERTS_STREAM_URI, get(alerts_stream_handler))
            // Weather
            .route(OCEAN_URI, get(get_ocean))
            .layer(middleware::from_fn(no_cache_middleware));

        let app = match cors_layer(&cors_origin) {
            Some(cors) => app.layer(cors),
            None => app,
        };

        app.with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let port = self.session.config().port;
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await
                .map_err(|e| WebError::Io(e))?;

        if !self.weather.has_api_key() {
            log::warn!("No StormGlass API key set, /api/ocean will return errors");
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone(); // Clone as self is moved into the router below

        let app = self.router();

        log::info!("Starting HTTP web server on port {}", port);

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(|e| WebError::Io(e));
            }
        }
        Ok(())
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods(Any)
                .allow_headers(Any),
        ),
        Err(_) => {
            log::warn!("Ignoring invalid CORS origin '{}'", origin);
            None
        }
    }
}

/// Middleware to add no-cache headers to API responses
async fn no_cache_middleware(request: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

/// `{"error": message}` with the given status
fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(serde_json::json!({ "error": message.to_string() }))).into_response()
}

#[derive(Deserialize)]
struct ZoneIdParam {
    zone_id: u32,
}

#[derive(Deserialize)]
struct VesselIdParam {
    vessel_id: u32,
}

// =============================================================================
// Zones
// =============================================================================

fn default_restricted() -> bool {
    true
}

#[derive(Deserialize)]
struct CreateZoneRequest {
    #[serde(default)]
    name: Option<String>,
    vertices: Vec<GeoPoint>,
    #[serde(default = "default_restricted")]
    restricted: bool,
}

#[derive(Deserialize)]
struct UpdateZoneRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    restricted: Option<bool>,
}

/// GET /api/zones
#[debug_handler]
async fn get_zones(State(state): State<Web>) -> Response {
    debug!("GET zones");

    let engine = state.engine.read().unwrap();
    Json(engine.get_zones()).into_response()
}

/// POST /api/zones - Create a zone from a completed polygon draw
#[debug_handler]
async fn create_zone(State(state): State<Web>, Json(request): Json<CreateZoneRequest>) -> Response {
    debug!("POST create zone with {} vertices", request.vertices.len());

    let mut engine = state.engine.write().unwrap();
    match engine.add_zone(request.name.as_deref(), request.vertices, request.restricted) {
        Ok(zone) => {
            log::info!("Created zone {} '{}'", zone.id, zone.name);
            (StatusCode::CREATED, Json(zone)).into_response()
        }
        Err(e) => {
            debug!("Rejected zone: {}", e);
            error_response(StatusCode::BAD_REQUEST, e)
        }
    }
}

/// GET /api/zones/{zone_id}
#[debug_handler]
async fn get_zone(State(state): State<Web>, Path(params): Path<ZoneIdParam>) -> Response {
    debug!("GET zone {}", params.zone_id);

    let engine = state.engine.read().unwrap();
    if let Some(zone) = engine.get_zone(params.zone_id) {
        return Json(zone).into_response();
    }

    (StatusCode::NOT_FOUND, "Zone not found").into_response()
}

/// PUT /api/zones/{zone_id} - Toggle restriction and/or rename
#[debug_handler]
async fn update_zone(
    State(state): State<Web>,
    Path(params): Path<ZoneIdParam>,
    Json(request): Json<UpdateZoneRequest>,
) -> Response {
    debug!("PUT update zone {}", params.zone_id);

    let mut engine = state.engine.write().unwrap();
    if engine.get_zone(params.zone_id).is_none() {
        return (StatusCode::NOT_FOUND, "Zone not found").into_response();
    }

    if let Some(restricted) = request.restricted {
        engine.set_zone_restricted(params.zone_id, restricted);
    }
    if let Some(name) = request.name.as_deref() {
        engine.rename_zone(params.zone_id, name);
    }

    match engine.get_zone(params.zone_id) {
        Some(zone) => Json(zone).into_response(),
        None => (StatusCode::NOT_FOUND, "Zone not found").into_response(),
    }
}

/// DELETE /api/zones/{zone_id}
#[debug_handler]
async fn delete_zone(State(state): State<Web>, Path(params): Path<ZoneIdParam>) -> Response {
    debug!("DELETE zone {}", params.zone_id);

    let mut engine = state.engine.write().unwrap();
    if engine.remove_zone(params.zone_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Zone not found").into_response()
    }
}

// =============================================================================
// Vessels
// =============================================================================

#[derive(Deserialize)]
struct UploadQuery {
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
    count: usize,
}

/// GET /api/vessels
#[debug_handler]
async fn get_vessels(State(state): State<Web>) -> Response {
    debug!("GET vessels");

    let engine = state.engine.read().unwrap();
    Json(engine.vessel_statuses()).into_response()
}

/// POST /api/vessels?name=.. - Upload a CSV track (latitude,longitude,type)
#[debug_handler]
async fn upload_vessel(
    State(state): State<Web>,
    Query(query): Query<UploadQuery>,
    body: String,
) -> Response {
    debug!("POST upload vessel track, {} bytes", body.len());

    let mut engine = state.engine.write().unwrap();
    match engine.add_vessel_csv(query.name.as_deref(), &body) {
        Ok(import) => match engine.vessel_status(import.vessel_id) {
            Some(status) => {
                debug!(
                    "Track upload: {} rows accepted, {} dropped",
                    import.accepted, import.dropped
                );
                log::info!(
                    "Added vessel {} '{}' with {} points",
                    import.vessel_id,
                    status.name,
                    status.track_len
                );
                (StatusCode::CREATED, Json(status)).into_response()
            }
            None => (StatusCode::NOT_FOUND, "Vessel not found").into_response(),
        },
        Err(e @ TrackError::NoRows { .. }) => {
            debug!("Rejected track upload: {}", e);
            error_response(StatusCode::BAD_REQUEST, e)
        }
    }
}

/// GET /api/vessels/{vessel_id} - Status plus full track geometry
#[debug_handler]
async fn get_vessel(State(state): State<Web>, Path(params): Path<VesselIdParam>) -> Response {
    debug!("GET vessel {}", params.vessel_id);

    let engine = state.engine.read().unwrap();
    match engine.vessel_detail(params.vessel_id) {
        Some(detail) => Json(detail).into_response(),
        None => (StatusCode::NOT_FOUND, "Vessel not found").into_response(),
    }
}

/// DELETE /api/vessels/{vessel_id}
#[debug_handler]
async fn delete_vessel(State(state): State<Web>, Path(params): Path<VesselIdParam>) -> Response {
    debug!("DELETE vessel {}", params.vessel_id);

    let mut engine = state.engine.write().unwrap();
    if engine.remove_vessel(params.vessel_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "Vessel not found").into_response()
    }
}

/// POST /api/vessels/{vessel_id}/start
#[debug_handler]
async fn start_vessel(State(state): State<Web>, Path(params): Path<VesselIdParam>) -> Response {
    debug!("POST start vessel {}", params.vessel_id);

    let mut engine = state.engine.write().unwrap();
    match engine.start(params.vessel_id) {
        Ok(()) => {}
        Err(StartRejected::UnknownVessel) => {
            return (StatusCode::NOT_FOUND, "Vessel not found").into_response();
        }
        Err(rejected) => return error_response(StatusCode::CONFLICT, rejected),
    }

    match engine.vessel_status(params.vessel_id) {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::NOT_FOUND, "Vessel not found").into_response(),
    }
}

/// POST /api/vessels/{vessel_id}/pause
#[debug_handler]
async fn pause_vessel(State(state): State<Web>, Path(params): Path<VesselIdParam>) -> Response {
    debug!("POST pause vessel {}", params.vessel_id);

    let mut engine = state.engine.write().unwrap();
    engine.pause(params.vessel_id);

    match engine.vessel_status(params.vessel_id) {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::NOT_FOUND, "Vessel not found").into_response(),
    }
}

/// POST /api/vessels/{vessel_id}/reset
#[debug_handler]
async fn reset_vessel(State(state): State<Web>, Path(params): Path<VesselIdParam>) -> Response {
    debug!("POST reset vessel {}", params.vessel_id);

    let mut engine = state.engine.write().unwrap();
    if !engine.reset(params.vessel_id) {
        return (StatusCode::NOT_FOUND, "Vessel not found").into_response();
    }

    match engine.vessel_status(params.vessel_id) {
        Some(status) => Json(status).into_response(),
        None => (StatusCode::NOT_FOUND, "Vessel not found").into_response(),
    }
}

// =============================================================================
// Fleet-wide playback
// =============================================================================

/// POST /api/playback/start - Returns how many vessels started
#[debug_handler]
async fn start_all(State(state): State<Web>) -> Response {
    let count = state.engine.write().unwrap().start_all();
    debug!("POST start all: {} started", count);
    Json(CountResponse { count }).into_response()
}

/// POST /api/playback/pause - Returns how many vessels were playing
#[debug_handler]
async fn pause_all(State(state): State<Web>) -> Response {
    let count = state.engine.write().unwrap().pause_all();
    debug!("POST pause all: {} paused", count);
    Json(CountResponse { count }).into_response()
}

/// POST /api/playback/reset - Returns how many vessels were reset
#[debug_handler]
async fn reset_all(State(state): State<Web>) -> Response {
    let mut engine = state.engine.write().unwrap();
    engine.reset_all();
    let count = engine.vessel_count();
    debug!("POST reset all: {} reset", count);
    Json(CountResponse { count }).into_response()
}

// =============================================================================
// Alerts
// =============================================================================

#[derive(Deserialize)]
struct AlertsQuery {
    /// Only alerts with an id greater than this
    since: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HourlyAlerts {
    hour_start: u64,
    /// UTC hour, e.g. "2024-05-10 14:00"
    label: String,
    count: usize,
}

fn hour_label(hour_start: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(hour_start as i64)
        .map(|t| t.format("%Y-%m-%d %H:00").to_string())
        .unwrap_or_default()
}

/// GET /api/alerts[?since=id]
#[debug_handler]
async fn get_alerts(State(state): State<Web>, Query(query): Query<AlertsQuery>) -> Response {
    debug!("GET alerts since {:?}", query.since);

    let engine = state.engine.read().unwrap();
    match query.since {
        Some(after) => Json(engine.alerts_since(after)).into_response(),
        None => Json(engine.alerts()).into_response(),
    }
}

/// DELETE /api/alerts
#[debug_handler]
async fn clear_alerts(State(state): State<Web>) -> Response {
    let count = state.engine.write().unwrap().clear_alerts();
    log::info!("Cleared {} alerts", count);
    Json(CountResponse { count }).into_response()
}

/// GET /api/alerts/hourly - Alert counts per UTC hour, oldest first
#[debug_handler]
async fn get_hourly_alerts(State(state): State<Web>) -> Response {
    debug!("GET hourly alerts");

    let engine = state.engine.read().unwrap();
    let hourly: Vec<HourlyAlerts> = engine
        .hourly_alert_counts()
        .into_iter()
        .map(|h| HourlyAlerts {
            hour_start: h.hour_start,
            label: hour_label(h.hour_start),
            count: h.count,
        })
        .collect();
    Json(hourly).into_response()
}

/// WS /api/alerts/stream - Each new alert as one JSON text frame
#[debug_handler]
async fn alerts_stream_handler(State(state): State<Web>, ws: WebSocketUpgrade) -> Response {
    debug!("alerts stream request");

    let alert_rx = state.session.subscribe_alerts();
    let shutdown_rx = state.shutdown_tx.subscribe();
    ws.on_upgrade(move |socket| alerts_stream(socket, alert_rx, shutdown_rx))
}

/// Actual websocket statemachine (one will be spawned per connection)
async fn alerts_stream(
    mut socket: WebSocket,
    mut alert_rx: broadcast::Receiver<AlertRecord>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Shutdown of websocket");
                break;
            },
            r = alert_rx.recv() => {
                match r {
                    Ok(alert) => {
                        let json = match serde_json::to_string(&alert) {
                            Ok(json) => json,
                            Err(e) => {
                                log::warn!("Cannot serialize alert {}: {}", alert.id, e);
                                continue;
                            }
                        };
                        if let Err(e) = socket.send(Message::Text(json.into())).await {
                            log::warn!("Error on send to websocket: {}", e);
                            break;
                        }
                        trace!("Sent alert {}", alert.id);
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Receiver fell behind; the alerts are still in the log
                        log::warn!("Websocket receiver lagged, skipped {} alerts", n);
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Alert channel closed");
                        break;
                    }
                }
            },
            r = socket.recv() => {
                match r {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Websocket closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("Websocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {
                        // Client messages are ignored
                    }
                }
            }
        }
    }
}

// =============================================================================
// Weather
// =============================================================================

/// GET /api/ocean?lat=..&lng=.. - StormGlass water temperature relay
#[debug_handler]
async fn get_ocean(State(state): State<Web>, Query(query): Query<OceanQuery>) -> Response {
    debug!("GET ocean lat={:?} lng={:?}", query.lat, query.lng);

    match state.weather.fetch(&query).await {
        Ok(upstream) => upstream.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const TRACK: &str = "latitude,longitude,type\n32.18,124.35,0\n32.22,124.42,0\n32.22,124.48,0\n";
    const SQUARE: &str = r#"{"name":"Closed area","vertices":[
        {"lon":124.40,"lat":32.20},{"lon":124.45,"lat":32.20},
        {"lon":124.45,"lat":32.25},{"lon":124.40,"lat":32.25}]}"#;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn upload(app: &Router, name: &str, csv: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("{}?name={}", VESSELS_URI, name))
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(csv.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn app() -> (Session, Router) {
        let session = Session::new_fake();
        let router = Web::new(session.clone()).router();
        (session, router)
    }

    #[tokio::test]
    async fn test_zone_lifecycle() {
        let (_session, app) = app();

        let (status, zone) = send(&app, "POST", ZONES_URI, Some(SQUARE)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(zone["id"], 1);
        assert_eq!(zone["name"], "Closed area");
        assert_eq!(zone["restricted"], true);

        let (status, zones) = send(&app, "GET", ZONES_URI, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(zones.as_array().unwrap().len(), 1);

        let (status, zone) =
            send(&app, "PUT", "/api/zones/1", Some(r#"{"restricted":false}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(zone["restricted"], false);
        assert_eq!(zone["name"], "Closed area");

        let (status, _) = send(&app, "DELETE", "/api/zones/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", "/api/zones/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", "/api/zones/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_zone_validation() {
        let (session, app) = app();

        let body = r#"{"vertices":[{"lon":124.40,"lat":32.20},{"lon":124.45,"lat":32.20}]}"#;
        let (status, error) = send(&app, "POST", ZONES_URI, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("at least 3"));
        assert_eq!(session.engine().read().unwrap().get_zones().len(), 0);
    }

    #[tokio::test]
    async fn test_vessel_upload_and_commands() {
        let (session, app) = app();

        let (status, vessel) = upload(&app, "Lu%20Yu%20118", TRACK).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(vessel["id"], 1);
        assert_eq!(vessel["name"], "Lu Yu 118");
        assert_eq!(vessel["trackLen"], 3);
        assert_eq!(vessel["state"], "stopped");

        let (status, vessel) = send(&app, "POST", "/api/vessels/1/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(vessel["state"], "playing");

        let (status, error) = send(&app, "POST", "/api/vessels/1/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "already playing");

        let (status, vessel) = send(&app, "POST", "/api/vessels/1/pause", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(vessel["state"], "stopped");

        let (status, detail) = send(&app, "GET", "/api/vessels/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["tracks"]["actual"].as_array().unwrap().len(), 3);

        let (status, _) = send(&app, "DELETE", "/api/vessels/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(session.engine().read().unwrap().vessel_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_vessel_is_404() {
        let (_session, app) = app();

        for uri in [
            "/api/vessels/42/start",
            "/api/vessels/42/pause",
            "/api/vessels/42/reset",
        ] {
            let (status, _) = send(&app, "POST", uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        }
        let (status, _) = send(&app, "GET", "/api/vessels/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let (session, app) = app();

        let (status, error) = upload(&app, "Ghost", "latitude,longitude,type\nx,y,z\n").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("No valid track rows"));
        assert_eq!(session.engine().read().unwrap().vessel_count(), 0);
    }

    #[tokio::test]
    async fn test_alerts_and_clear() {
        let (session, app) = app();
        send(&app, "POST", ZONES_URI, Some(SQUARE)).await;
        upload(&app, "Lu%20Yu%20118", TRACK).await;

        let (status, started) = send(&app, "POST", PLAYBACK_START_URI, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["count"], 1);

        // Drive the engine directly instead of waiting for the scheduler
        session.engine().write().unwrap().tick(3_600_000 * 5 + 42);

        let (status, alerts) = send(&app, "GET", ALERTS_URI, None).await;
        assert_eq!(status, StatusCode::OK);
        let alerts = alerts.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["vesselName"], "Lu Yu 118");
        assert_eq!(alerts[0]["zoneName"], "Closed area");

        let (_, newer) = send(&app, "GET", "/api/alerts?since=1", None).await;
        assert!(newer.as_array().unwrap().is_empty());

        let (status, hourly) = send(&app, "GET", ALERTS_HOURLY_URI, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hourly[0]["hourStart"], 3_600_000 * 5);
        assert_eq!(hourly[0]["label"], "1970-01-01 05:00");
        assert_eq!(hourly[0]["count"], 1);

        let (status, cleared) = send(&app, "DELETE", ALERTS_URI, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["count"], 1);
        let (_, alerts) = send(&app, "GET", ALERTS_URI, None).await;
        assert!(alerts.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fleet_reset() {
        let (_session, app) = app();
        upload(&app, "A", TRACK).await;
        upload(&app, "B", TRACK).await;

        let (_, started) = send(&app, "POST", PLAYBACK_START_URI, None).await;
        assert_eq!(started["count"], 2);
        let (_, paused) = send(&app, "POST", PLAYBACK_PAUSE_URI, None).await;
        assert_eq!(paused["count"], 2);
        let (_, reset) = send(&app, "POST", PLAYBACK_RESET_URI, None).await;
        assert_eq!(reset["count"], 2);
    }

    #[tokio::test]
    async fn test_ocean_validation() {
        let (_session, app) = app();

        let (status, error) = send(&app, "GET", "/api/ocean?lat=abc&lng=124.4", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "Invalid lat/lng");

        let (status, error) = send(&app, "GET", "/api/ocean?lng=124.4", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "Invalid lat/lng");

        // Test sessions never carry an API key
        let (status, error) = send(&app, "GET", "/api/ocean?lat=32.2&lng=124.4", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error["error"], "Missing STORMGLASS_API_KEY");
    }

    #[tokio::test]
    async fn test_no_cache_header() {
        let (_session, app) = app();
        let request = Request::builder().uri(ZONES_URI).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
    }

    #[tokio::test]
    async fn test_alert_stream_delivers_once_per_subscriber() {
        use futures_util::StreamExt;
        use std::time::Duration;
        use tokio_tungstenite::connect_async;

        let (session, app) = app();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        // Each client is subscribed once its upgrade completes
        let url = format!("ws://{}{}", addr, ALERTS_STREAM_URI);
        let (mut first, _) = connect_async(url.as_str()).await.unwrap();
        let (mut second, _) = connect_async(url.as_str()).await.unwrap();

        {
            let engine = session.engine();
            let mut engine = engine.write().unwrap();
            engine
                .add_zone(
                    Some("Closed area"),
                    vec![
                        GeoPoint::new(124.40, 32.20),
                        GeoPoint::new(124.45, 32.20),
                        GeoPoint::new(124.45, 32.25),
                        GeoPoint::new(124.40, 32.25),
                    ],
                    true,
                )
                .unwrap();
            let import = engine.add_vessel_csv(Some("Lu Yu 118"), TRACK).unwrap();
            engine.start(import.vessel_id).unwrap();
        }

        let scheduler = crate::scheduler::Scheduler::new(&session);
        let alerts = scheduler.tick_once();
        assert_eq!(alerts.len(), 1);
        // Leaving the zone adds nothing to the stream
        assert!(scheduler.tick_once().is_empty());

        for socket in [&mut first, &mut second] {
            let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
                .await
                .expect("alert not delivered")
                .unwrap()
                .unwrap();
            let alert: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
            assert_eq!(alert["id"], alerts[0].id);
            assert_eq!(alert["vesselName"], "Lu Yu 118");
            assert_eq!(alert["zoneName"], "Closed area");

            // Delivered exactly once
            let again = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
            assert!(again.is_err());
        }
    }

    #[test]
    fn test_hour_label() {
        assert_eq!(hour_label(0), "1970-01-01 00:00");
        assert_eq!(hour_label(1_715_349_600_000), "2024-05-10 14:00");
    }
}
