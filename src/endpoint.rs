/// HTTP endpoint for sensor ingestion and risk queries
///
/// The sensor node posts readings here; the dashboard and external tools
/// read results back.
///
/// Endpoints:
/// - POST /sensor-data     - Score and persist a reading
/// - POST /calculate-risk  - Score a reading against a supplied window (stateless)
/// - GET  /latest          - Most recent result
/// - GET  /history?limit=N - Most recent N results, newest first
/// - GET  /health          - Service health check
///
/// Requests are served one at a time on the calling thread, which owns the
/// monitor and its store connection.

use serde_json::json;
use std::io::Read;
use tiny_http::Method;

use crate::config::MAX_HISTORY_LIMIT;
use crate::model::{ScoreRequest, SensorPayload};
use crate::monitor::{Monitor, MonitorError};
use crate::store::ResultStore;

/// Request bodies larger than this are truncated and will fail to parse.
const MAX_BODY_BYTES: u64 = 64 * 1024;

const ENDPOINTS: [&str; 5] = [
    "POST /sensor-data",
    "POST /calculate-risk",
    "GET /latest",
    "GET /history?limit=N",
    "GET /health",
];

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("failed to start HTTP server on port {port}: {message}")]
    Bind { port: u16, message: String },
}

/// Status code and JSON body, independent of the HTTP library.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request. Never panics on bad input; every failure becomes a
/// JSON error response.
pub fn handle_request<S: ResultStore>(
    monitor: &mut Monitor<S>,
    method: &Method,
    url: &str,
    body: &str,
    history_limit: usize,
) -> ApiResponse {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    match (method, path) {
        (Method::Options, _) => ApiResponse::new(204, serde_json::Value::Null),
        (Method::Get, "/health") => handle_health(),
        (Method::Post, "/sensor-data") => handle_sensor_data(monitor, body),
        (Method::Post, "/calculate-risk") => handle_calculate(monitor, body),
        (Method::Get, "/latest") => handle_latest(monitor),
        (Method::Get, "/history") => handle_history(monitor, query, history_limit),
        (_, "/health" | "/sensor-data" | "/calculate-risk" | "/latest" | "/history") => ApiResponse::new(
            405,
            json!({ "error": "Method not allowed", "available_endpoints": ENDPOINTS }),
        ),
        _ => ApiResponse::new(
            404,
            json!({ "error": "Not found", "available_endpoints": ENDPOINTS }),
        ),
    }
}

/// Handle /health endpoint
fn handle_health() -> ApiResponse {
    ApiResponse::new(
        200,
        json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }),
    )
}

/// Handle POST /sensor-data
fn handle_sensor_data<S: ResultStore>(monitor: &mut Monitor<S>, body: &str) -> ApiResponse {
    let payload: SensorPayload = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed sensor payload");
            return ApiResponse::new(
                400,
                json!({ "status": "error", "message": format!("Invalid data format: {}", e) }),
            );
        }
    };

    match monitor.ingest(payload.into()) {
        Ok(stored) => ApiResponse::new(
            201,
            json!({
                "status": "success",
                "id": stored.id,
                "message": "Data received",
                "riskState": stored.result.risk_state,
                "riskScore": stored.result.risk_score
            }),
        ),
        Err(MonitorError::Scoring(e)) => ApiResponse::new(
            400,
            json!({ "status": "error", "message": e.to_string() }),
        ),
        Err(e @ MonitorError::Store(_)) => {
            tracing::error!(error = %e, "Failed to process sensor reading");
            ApiResponse::new(500, json!({ "status": "error", "message": e.to_string() }))
        }
    }
}

/// Handle POST /calculate-risk
fn handle_calculate<S: ResultStore>(monitor: &Monitor<S>, body: &str) -> ApiResponse {
    let request: ScoreRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            return ApiResponse::new(
                400,
                json!({ "success": false, "error": format!("Invalid request: {}", e) }),
            );
        }
    };

    match monitor.calculate(&request) {
        Ok(result) => ApiResponse::new(200, json!({ "success": true, "data": result })),
        Err(e) => ApiResponse::new(400, json!({ "success": false, "error": e.to_string() })),
    }
}

/// Handle GET /latest
fn handle_latest<S: ResultStore>(monitor: &mut Monitor<S>) -> ApiResponse {
    match monitor.latest() {
        Ok(Some(stored)) => ApiResponse::new(200, json!(stored)),
        Ok(None) => ApiResponse::new(200, json!({})),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch latest result");
            ApiResponse::new(500, json!({ "error": e.to_string() }))
        }
    }
}

/// Handle GET /history
fn handle_history<S: ResultStore>(
    monitor: &mut Monitor<S>,
    query: Option<&str>,
    default_limit: usize,
) -> ApiResponse {
    let limit = match parse_limit(query, default_limit) {
        Ok(limit) => limit,
        Err(message) => return ApiResponse::new(400, json!({ "error": message })),
    };

    match monitor.history(limit) {
        Ok(results) => ApiResponse::new(200, json!(results)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch result history");
            ApiResponse::new(500, json!({ "error": e.to_string() }))
        }
    }
}

/// Reads `limit` from a query string, capped at `MAX_HISTORY_LIMIT`.
fn parse_limit(query: Option<&str>, default_limit: usize) -> Result<usize, String> {
    let raw = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("limit="));

    match raw {
        None => Ok(default_limit.min(MAX_HISTORY_LIMIT)),
        Some(value) => match value.parse::<usize>() {
            Ok(0) | Err(_) => Err(format!("limit must be a positive integer, got '{}'", value)),
            Ok(n) => Ok(n.min(MAX_HISTORY_LIMIT)),
        },
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port. Blocks forever.
pub fn start_endpoint_server<S: ResultStore>(
    port: u16,
    monitor: &mut Monitor<S>,
    history_limit: usize,
) -> Result<(), EndpointError> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| EndpointError::Bind { port, message: e.to_string() })?;

    tracing::info!(port, "HTTP endpoint listening");
    for endpoint in ENDPOINTS {
        tracing::info!("   {}", endpoint);
    }

    for mut request in server.incoming_requests() {
        let mut body = String::new();
        let response = match request.as_reader().take(MAX_BODY_BYTES).read_to_string(&mut body) {
            Ok(_) => {
                let method = request.method().clone();
                let url = request.url().to_string();
                handle_request(monitor, &method, &url, &body, history_limit)
            }
            Err(e) => ApiResponse::new(
                400,
                json!({ "status": "error", "message": format!("Unreadable request body: {}", e) }),
            ),
        };

        tracing::debug!(method = %request.method(), url = request.url(), status = response.status, "Request served");

        if let Err(e) = request.respond(create_response(&response)) {
            tracing::warn!(error = %e, "Failed to send response");
        }
    }

    Ok(())
}

/// Create HTTP response with JSON body
fn create_response(response: &ApiResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let bytes = if response.body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec_pretty(&response.body).unwrap_or_default()
    };

    let mut http = tiny_http::Response::from_data(bytes)
        .with_status_code(tiny_http::StatusCode::from(response.status));

    let headers: [(&[u8], &[u8]); 4] = [
        (b"Content-Type", b"application/json"),
        (b"Access-Control-Allow-Origin", b"*"),
        (b"Access-Control-Allow-Methods", b"GET, POST, OPTIONS"),
        (b"Access-Control-Allow-Headers", b"Content-Type"),
    ];
    for (name, value) in headers {
        if let Ok(header) = tiny_http::Header::from_bytes(name, value) {
            http.add_header(header);
        }
    }
    http
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
