//! Defines routes for the image ingest service.
//!
//! ## Structure
//! - `POST /images` — fetch a remote image by URL, validate it, store it
//! - `GET  /healthz` — liveness probe
//! - `GET  /readyz`  — readiness probe (SQLite + disk round trip)
//!
//! All handlers share `AppState`.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        ingest_handlers::ingest_image,
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all service routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // the fetch-validate-store pipeline
        .route("/images", post(ingest_image))
}
