use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use perilmail_core::Config;
use perilmail_gemini::GeminiClient;
use perilmail_sendgrid::SendGridClient;
use perilmail_usgs::UsgsClient;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

mod campaigns;
mod earthquakes;
mod emails;
mod targets;
mod weather;
mod webhooks;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub usgs: Arc<UsgsClient>,
    pub gemini: Option<GeminiClient>,
    pub mailer: Option<SendGridClient>,
}

/// Metadata block attached to every response envelope.
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub generated_at: DateTime<Utc>,
}

impl ResponseMeta {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            generated_at: Utc::now(),
        }
    }
}

/// Success envelope: `{ "data": ..., "meta": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ResponseMeta,
}

/// Error envelope: `{ "error": { "code", "message" }, "meta": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(request_id: String, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id),
        }
    }

    pub fn bad_request(request_id: String, message: impl Into<String>) -> Self {
        Self::new(request_id, "bad_request", message)
    }

    pub fn not_found(request_id: String, message: impl Into<String>) -> Self {
        Self::new(request_id, "not_found", message)
    }

    pub fn conflict(request_id: String, message: impl Into<String>) -> Self {
        Self::new(request_id, "conflict", message)
    }

    pub fn internal(request_id: String, message: impl Into<String>) -> Self {
        Self::new(request_id, "internal_error", message)
    }

    pub fn not_implemented(request_id: String, message: impl Into<String>) -> Self {
        Self::new(request_id, "not_implemented", message)
    }

    pub fn config(request_id: String, message: impl Into<String>) -> Self {
        Self::new(request_id, "configuration_error", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    fn status(&self) -> StatusCode {
        match self.error.code {
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "not_implemented" => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Clamps an optional `limit` query parameter into the allowed range.
pub(crate) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

/// Requires a non-blank string field, trimming surrounding whitespace.
pub(crate) fn require_field(
    req_id: &RequestId,
    value: Option<String>,
    name: &str,
) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(
            req_id.0.clone(),
            format!("{name} is required"),
        )),
    }
}

pub(crate) fn map_db_error(request_id: String, error: &sqlx::Error) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    match error {
        sqlx::Error::RowNotFound => ApiError::not_found(request_id, "resource not found"),
        _ => ApiError::internal(request_id, "database query failed"),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Routes reachable without a bearer token: health and the provider
/// webhook (SendGrid cannot attach our auth header).
fn public_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/webhooks/sendgrid",
            get(webhooks::describe_webhook).post(webhooks::receive_events),
        )
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/earthquakes",
            get(earthquakes::list_earthquakes)
                .post(earthquakes::ingest_earthquakes)
                .delete(earthquakes::purge_earthquakes),
        )
        .route(
            "/api/weather-events",
            get(weather::list_weather_events).post(weather::store_weather_events),
        )
        .route(
            "/api/targets/earthquakes",
            axum::routing::post(targets::earthquake_targets),
        )
        .route(
            "/api/targets/weather",
            axum::routing::post(targets::weather_targets),
        )
        .route("/api/emails/generate", axum::routing::post(emails::generate_email))
        .route("/api/emails/send", axum::routing::post(emails::send_emails))
        .route("/api/emails/stats", get(emails::email_stats))
        .route(
            "/api/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

/// Assembles the full application router with shared layers applied.
pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .merge(public_router())
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(CompressionLayer::new())
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-api-version"),
                    HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
                ))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    environment: String,
    database: &'static str,
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<ApiResponse<HealthData>>) {
    let environment = state.config.env.to_string();
    match perilmail_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    service: "perilmail",
                    version: env!("CARGO_PKG_VERSION"),
                    environment,
                    database: "ok",
                },
                meta: ResponseMeta::new(req_id.0),
            }),
        ),
        Err(error) => {
            tracing::error!(error = %error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        service: "perilmail",
                        version: env!("CARGO_PKG_VERSION"),
                        environment,
                        database: "unavailable",
                    },
                    meta: ResponseMeta::new(req_id.0),
                }),
            )
        }
    }
}

#[cfg(test)]
pub(crate) fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, std::time::Duration::from_secs(60))
}
