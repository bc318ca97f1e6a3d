//! HTTP handler for the fetch-validate-store pipeline.
//!
//! The invocation contract encodes success and failure in the body only:
//! every outcome is HTTP 200 with `{"success": true, "key": ...}` or
//! `{"success": false, "errorCode": ...}`.

use crate::state::AppState;
use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};

/// Request body for `POST /images`.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response body for `POST /images`.
///
/// Exactly one of `error_code` or `key` is present alongside `success`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl IngestResponse {
    fn stored(key: String) -> Self {
        Self {
            success: true,
            error_code: None,
            key: Some(key),
        }
    }

    fn failed(code: &'static str) -> Self {
        Self {
            success: false,
            error_code: Some(code),
            key: None,
        }
    }
}

/// POST `/images` — fetch the image at `url` and persist it.
///
/// The body is parsed here rather than through the `Json` extractor so a
/// malformed or absent body degrades to `missing_url_param` instead of an
/// extractor rejection; no fault crosses the handler boundary.
pub async fn ingest_image(State(state): State<AppState>, body: Bytes) -> Json<IngestResponse> {
    let url = serde_json::from_slice::<IngestRequest>(&body)
        .ok()
        .and_then(|req| req.url);

    match state.ingest.ingest(url.as_deref()).await {
        Ok(key) => Json(IngestResponse::stored(key)),
        Err(err) => Json(IngestResponse::failed(err.code())),
    }
}
