mod health;
mod progress;
mod sessions;
mod verbs;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::auth::{self, AuthError, AuthUser};
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/sessions", sessions::router())
        .nest("/api/verbs", verbs::router())
        .nest("/api/progress", progress::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found").into_response()
}

pub(crate) async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    auth::authenticate(state.db().pool(), state.jwt_secret(), headers)
        .await
        .map_err(|err| match err {
            AuthError::MissingToken => AppError::unauthorized("Authentication token missing"),
            AuthError::InvalidToken => {
                AppError::unauthorized("Authentication failed, please sign in again")
            }
            AuthError::MissingSecret => {
                tracing::error!("JWT_SECRET is not configured, rejecting authenticated request");
                json_error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Authentication is not configured",
                )
            }
            AuthError::Database(err) => AppError::internal(err.to_string()),
        })
}
