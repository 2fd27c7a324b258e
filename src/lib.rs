pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::operations::catalog;
use crate::db::{Database, DbInitError};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database initialization failed: {0}")]
    Database(#[from] DbInitError),
    #[error("catalog query failed: {0}")]
    Catalog(#[from] sqlx::Error),
    #[error("verb catalog is empty; enable SEED_CATALOG or load verbs before starting")]
    EmptyCatalog,
}

/// Connects, migrates, optionally seeds, and refuses to continue with an
/// empty catalog.
pub async fn prepare_database(
    db_config: db::config::DbConfig,
    seed_catalog: bool,
) -> Result<Database, StartupError> {
    let db = Database::connect(db_config).await?;
    if seed_catalog {
        seed::seed_catalog(&db).await?;
    }

    let verbs = catalog::count_items(db.pool()).await?;
    if verbs == 0 {
        return Err(StartupError::EmptyCatalog);
    }
    tracing::info!(verbs, "verb catalog loaded");
    Ok(db)
}

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
