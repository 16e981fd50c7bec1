use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::booking::{
    BookingError, BookingOrchestrator, BookingRequest, NumberLike, PreparedBooking,
};
use crate::config::Config;
use crate::ontiloo::{BackendError, BookingBackend, OntilooClient};
use crate::validation::secret_matches;

pub const SECRET_HEADER: &str = "x-retell-secret";

pub const CREATE_APPOINTMENT_PATH: &str = "/v1/ontiloo/appointments/create";
pub const CANCEL_APPOINTMENT_PATH: &str = "/v1/ontiloo/appointments/cancel";
pub const PARSE_TIME_PATH: &str = "/v1/ontiloo/time/parse";

// State shared across handlers
pub struct ApiState {
    pub orchestrator: BookingOrchestrator,
    pub webhook_secret: Option<SecretString>,
    /// Source of "now"; swapped out in tests
    pub clock: fn() -> DateTime<Utc>,
}

impl ApiState {
    pub fn new(config: Config, backend: Arc<dyn BookingBackend>) -> Self {
        Self {
            orchestrator: BookingOrchestrator::new(backend, config.booking),
            webhook_secret: config.server.webhook_secret,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub appointment_id: Option<NumberLike>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeParseRequest {
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub ok: bool,
    pub appointment_id: Option<Value>,
    pub message: String,
    pub raw: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub ok: bool,
    pub appointment_id: u64,
    pub message: String,
    pub raw: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeParseResponse {
    pub ok: bool,
    /// Local wall-clock, `MM/DD/YYYY HH:mm`
    pub start_time: String,
    pub end_time: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub ok: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

/// Error body plus the HTTP status it is sent with
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                ok: false,
                code: code.to_string(),
                message: message.into(),
                upstream_status: None,
            },
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        if err.is_validation() {
            return Self::new(StatusCode::BAD_REQUEST, err.code(), err.to_string());
        }

        match err {
            BookingError::Backend(BackendError::Rejected {
                status,
                code,
                message,
                ..
            }) => Self {
                status: StatusCode::BAD_GATEWAY,
                body: ErrorResponse {
                    ok: false,
                    code,
                    message,
                    upstream_status: Some(status),
                },
            },
            failure @ (BookingError::Backend(BackendError::Transport(_))
            | BookingError::CustomerCreateFailed { .. }) => {
                Self::new(StatusCode::BAD_GATEWAY, failure.code(), failure.to_string())
            }
            other => {
                error!("Unexpected booking failure: {}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Voice agent tool calls wrap their arguments under `args`
fn unwrap_args(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("args") {
            Some(args @ Value::Object(_)) => args,
            Some(other) => {
                map.insert("args".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ApiError::invalid_request(format!("Body is not valid JSON: {}", e)))?
    };

    serde_json::from_value(unwrap_args(value))
        .map_err(|e| ApiError::invalid_request(format!("Unexpected request shape: {}", e)))
}

fn log_failure(request_id: Uuid, err: BookingError) -> ApiError {
    if err.is_validation() {
        info!("[{}] rejected: {} ({})", request_id, err, err.code());
    } else {
        warn!("[{}] failed: {} ({})", request_id, err, err.code());
    }
    ApiError::from(err)
}

async fn require_secret(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.webhook_secret.as_ref() else {
        error!("RETELL_FUNCTION_SECRET is not configured, refusing {}", request.uri().path());
        return ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "MISCONFIG",
            "Webhook secret is not configured",
        )
        .into_response();
    };

    let provided = request
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !secret_matches(expected.expose_secret(), provided) {
        warn!("Rejected call to {} with a bad or missing secret", request.uri().path());
        return ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized")
            .into_response();
    }

    next.run(request).await
}

// The thread-local RNG must not be held across an await
fn prepare_booking(
    state: &ApiState,
    request: &BookingRequest,
) -> Result<PreparedBooking, BookingError> {
    let mut rng = rand::thread_rng();
    state.orchestrator.prepare(request, (state.clock)(), &mut rng)
}

async fn create_appointment_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<BookingResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    info!("[{}] create appointment", request_id);

    let request: BookingRequest = decode(&body)?;
    debug!("[{}] request: {:?}", request_id, request);

    let prepared = prepare_booking(&state, &request).map_err(|e| log_failure(request_id, e))?;

    let result = state
        .orchestrator
        .submit(prepared)
        .await
        .map_err(|e| log_failure(request_id, e))?;

    info!("[{}] booked appointment {:?}", request_id, result.appointment_id);
    Ok(Json(BookingResponse {
        ok: true,
        appointment_id: result.appointment_id,
        message: "Appointment created".to_string(),
        raw: result.raw,
    }))
}

async fn cancel_appointment_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<CancelResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    info!("[{}] cancel appointment", request_id);

    let request: CancelRequest = decode(&body)?;
    let appointment_id = request
        .appointment_id
        .map(|id| id.to_string())
        .unwrap_or_default();

    let result = state
        .orchestrator
        .cancel_booking(&appointment_id)
        .await
        .map_err(|e| log_failure(request_id, e))?;

    Ok(Json(CancelResponse {
        ok: true,
        appointment_id: result.appointment_id,
        message: "Appointment cancelled".to_string(),
        raw: result.raw,
    }))
}

async fn parse_time_handler(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<TimeParseResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let request: TimeParseRequest = decode(&body)?;
    let text = request.time.unwrap_or_default();
    debug!("[{}] parse time '{}'", request_id, text);

    let window = state
        .orchestrator
        .preview_window(&text, request.duration_minutes, (state.clock)())
        .map_err(|e| log_failure(request_id, e))?;
    let (start_time, end_time) = window.wire(state.orchestrator.tz_offset());

    Ok(Json(TimeParseResponse {
        ok: true,
        start_time,
        end_time,
        start_utc: window.start,
        end_utc: window.end,
        duration_minutes: window.duration_minutes(),
    }))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Routes with CORS and secret checking applied
pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let webhooks = Router::new()
        .route(CREATE_APPOINTMENT_PATH, post(create_appointment_handler))
        .route(CANCEL_APPOINTMENT_PATH, post(cancel_appointment_handler))
        .route(PARSE_TIME_PATH, post(parse_time_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret));

    Router::new()
        .route("/health", get(health_check))
        .merge(webhooks)
        .layer(cors)
        .with_state(state)
}

// Create and start the API server
pub async fn start_api_server(config: Config) -> Result<()> {
    let client = OntilooClient::new(&config.upstream).context("Failed to create Ontiloo client")?;
    info!("Forwarding bookings to {}", client.base_url());

    if config.server.webhook_secret.is_none() {
        warn!("RETELL_FUNCTION_SECRET is not set; webhook calls will be refused");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(ApiState::new(config, Arc::new(client)));
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow!("Failed to bind to address {}: {}", addr, e))?;

    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow!("Failed to start API server: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unwrap_args() {
        assert_eq!(
            unwrap_args(json!({ "name": "book", "args": { "customerId": 1 } })),
            json!({ "customerId": 1 })
        );
        assert_eq!(unwrap_args(json!({ "customerId": 1 })), json!({ "customerId": 1 }));
        assert_eq!(
            unwrap_args(json!({ "args": "oops", "customerId": 1 })),
            json!({ "args": "oops", "customerId": 1 })
        );
    }

    #[test]
    fn test_decode_rejects_bad_json() {
        let err = decode::<CancelRequest>(&Bytes::from_static(b"{not json")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.code, "INVALID_REQUEST");

        let empty: CancelRequest = decode(&Bytes::new()).unwrap();
        assert!(empty.appointment_id.is_none());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BookingError::MissingCustomerInfo, StatusCode::BAD_REQUEST, "MISSING_CUSTOMER_INFO"),
            (BookingError::MissingAppointmentId, StatusCode::BAD_REQUEST, "MISSING_APPOINTMENT_ID"),
            (
                BookingError::CustomerCreateFailed { payload: json!({}) },
                StatusCode::BAD_GATEWAY,
                "CUSTOMER_CREATE_FAILED",
            ),
            (
                BookingError::Backend(BackendError::Transport("refused".into())),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
            ),
            (
                BookingError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.body.code, code);
            assert_eq!(api.body.upstream_status, None);
        }
    }

    #[test]
    fn test_upstream_rejection_keeps_status_and_message() {
        let api = ApiError::from(BookingError::Backend(BackendError::Rejected {
            status: 422,
            code: "INVALID_SLOT".into(),
            message: "Slot closed".into(),
            payload: json!({}),
        }));
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.body.code, "INVALID_SLOT");
        assert_eq!(api.body.message, "Slot closed");
        assert_eq!(api.body.upstream_status, Some(422));
    }

    #[test]
    fn test_internal_error_hides_details() {
        let api = ApiError::from(BookingError::Internal("db password wrong".into()));
        assert_eq!(api.body.message, "Internal server error");
    }
}
