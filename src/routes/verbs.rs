use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::db::operations::{catalog, mastery};
use crate::response::{ok, AppError};
use crate::routes::require_user;
use crate::services::progress::{catalog_view, VerbProgress};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_verbs))
        .route("/:id", get(get_verb))
}

async fn list_verbs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let pool = state.db().pool();

    let items = catalog::list_items(pool).await?;
    let records = mastery::records_by_item(pool, &user.id).await?;
    Ok(ok(catalog_view(items, &records)))
}

async fn get_verb(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(&state, &headers).await?;
    let pool = state.db().pool();

    let item = catalog::find_item(pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Verb not found: {id}")))?;
    let record = mastery::find_record(pool, &user.id, &item.id).await?;
    Ok(ok(VerbProgress::new(item, record.as_ref())))
}
