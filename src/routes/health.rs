use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_latency: Option<u64>,
    strategy: &'static str,
    llm: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/ready", get(ready))
}

async fn root(State(state): State<AppState>) -> Response {
    let check = state.db().check_health(DB_CHECK_TIMEOUT).await;

    let response = HealthResponse {
        status: if check.healthy { "ok" } else { "degraded" },
        database: if check.healthy { "connected" } else { "disconnected" },
        timestamp: now_iso(),
    };

    let status_code = if check.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    let check = state.db().check_health(DB_CHECK_TIMEOUT).await;
    if let Some(error) = check.error.as_deref() {
        tracing::warn!(error, "readiness check failed");
    }

    let response = ReadinessResponse {
        status: if check.healthy { "healthy" } else { "unhealthy" },
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        database: if check.healthy { "connected" } else { "disconnected" },
        database_latency: check.latency_ms,
        strategy: state.engine().grader().strategy_name(),
        llm: state.hints().is_remote(),
    };

    let status_code = if check.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
