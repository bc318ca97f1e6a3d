//! Shared application state carried by the router.

use crate::services::ingest_service::IngestService;
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// State handed to every handler.
///
/// The ingest pipeline only sees its injected capabilities; the pool and
/// storage root are exposed separately so readiness probes can check the
/// concrete backends.
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub db: Arc<SqlitePool>,
    pub storage_dir: PathBuf,
}
