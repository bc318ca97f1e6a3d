//! The fixed error vocabulary of the ingest pipeline.
//!
//! Every failure path is caught at the point of detection and converted to
//! one of these variants; the handler serializes the wire code into the
//! response body. Nothing here maps to an HTTP status — all outcomes,
//! success or failure, are returned as 200 with the result in the body.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("request body did not include a url")]
    MissingUrlParam,
    #[error("fetching the source url failed")]
    FetchFailed,
    #[error("payload exceeds the configured size limit")]
    TooBig,
    #[error("payload has no recognizable image signature")]
    NotImage,
    #[error("image format is not in the allow-list")]
    NotSupportedFiletype,
    #[error("object store did not acknowledge the write")]
    SavingFailed,
}

impl IngestError {
    /// Wire code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::MissingUrlParam => "missing_url_param",
            IngestError::FetchFailed => "fetch_failed",
            IngestError::TooBig => "too_big",
            IngestError::NotImage => "not_image",
            IngestError::NotSupportedFiletype => "not_supported_filetype",
            IngestError::SavingFailed => "saving_failed",
        }
    }
}
