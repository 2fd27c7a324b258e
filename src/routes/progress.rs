use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::db::operations::{catalog, mastery};
use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::progress::compute_stats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_progress))
}

async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let pool = state.db().pool();

    let items = catalog::list_items(pool).await?;
    let records = mastery::records_by_item(pool, &user.id).await?;
    Ok(ok(compute_stats(&items, &records)))
}
