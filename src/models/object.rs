//! Represents an object (file) persisted by the ingest pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for a single stored object.
///
/// The struct holds the metadata row only; payload bytes live on disk under
/// the sharded object path.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Object {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Bucket the object was written into.
    pub bucket: String,

    /// Object key (upload prefix + generated identifier + extension).
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum acknowledging the write.
    pub etag: Option<String>,

    /// Timestamp when the object was stored.
    pub created_at: DateTime<Utc>,
}
