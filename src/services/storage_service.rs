//! src/services/storage_service.rs
//!
//! Object storage for fetched image payloads: durable metadata in SQLite and
//! payload bytes on local disk, sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`. The `ObjectStore` trait is the
//! narrow capability the ingest pipeline sees; tests substitute in-memory
//! fakes for it.

use crate::models::object::Object;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Acknowledgment returned by a successful write.
///
/// `etag` is the content-integrity token; a backend that completes the write
/// without producing one makes the invocation fail with `saving_failed`.
#[derive(Debug, Clone)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
    pub size_bytes: i64,
}

/// Narrow object-storage capability consumed by the ingest pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` under `key` in `bucket`, supplying no metadata beyond
    /// the raw bytes.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> StorageResult<PutObjectOutput>;
}

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Disk-backed object store with SQLite metadata.
///
/// - Writes bytes to a temporary file, fsyncs, then renames into place.
/// - Computes the MD5 digest of the payload as the etag.
/// - Upserts the metadata row with overwrite semantics for repeated keys.
#[derive(Clone)]
pub struct DiskObjectStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl DiskObjectStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects keys that begin with `/` or contain `..`, plus control bytes
    /// and backslashes. Generated keys always pass; the check guards the
    /// trait surface, not the generator.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(bucket/key) and returns the first two bytes as lowercase
    /// hexadecimal strings (00–ff). Reduces file count per directory.
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified object payload path.
    ///
    /// Combines base_path/bucket/{shard}/{shard}/{key}.
    /// Parent directories may not exist yet.
    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket, key);
        let mut path = self.base_path.clone();
        path.push(bucket);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Write the payload file and upsert its metadata row.
    async fn write_object(&self, bucket: &str, key: &str, body: &Bytes) -> StorageResult<Object> {
        let file_path = self.object_path(bucket, key);
        let parent = file_path
            .parent()
            .map(PathBuf::from)
            .ok_or_else(|| StorageError::Io(io::Error::other("object path missing parent")))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(body).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        let etag = format!("{:x}", md5::compute(body));
        let insert_result = sqlx::query_as::<_, Object>(
            r#"
            INSERT INTO objects (id, bucket, key, size_bytes, etag, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(bucket, key) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                created_at = excluded.created_at
            RETURNING id, bucket, key, size_bytes, etag, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bucket)
        .bind(key)
        .bind(body.len() as i64)
        .bind(&etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(obj) => Ok(obj),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StorageError::Sqlx(err))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> StorageResult<PutObjectOutput> {
        self.ensure_key_safe(key)?;
        let object = self.write_object(bucket, key, &body).await?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = object.size_bytes,
            "stored object payload"
        );

        Ok(PutObjectOutput {
            etag: object.etag,
            size_bytes: object.size_bytes,
        })
    }
}
