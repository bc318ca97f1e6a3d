//! The fetch-validate-store pipeline.
//!
//! One invocation is strictly sequential: fetch the URL, check the size,
//! sniff the content, check the allow-list, generate a key, store the bytes,
//! check the acknowledgment. Every failure is converted to an `IngestError`
//! where it is detected; nothing is retried and nothing escapes the service
//! boundary as a fault.

use crate::clients::fetcher::Fetcher;
use crate::config::{ALLOWED_EXTENSIONS, AppConfig, UPLOAD_PREFIX};
use crate::errors::IngestError;
use crate::services::storage_service::ObjectStore;
use crate::sniff;
use std::sync::Arc;
use uuid::Uuid;

/// Pipeline service owning the injected fetch and storage capabilities plus
/// the policy portion of the configuration.
#[derive(Clone)]
pub struct IngestService {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_file_size: u64,
}

impl IngestService {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn ObjectStore>, cfg: &AppConfig) -> Self {
        Self {
            fetcher,
            store,
            bucket: cfg.bucket.clone(),
            max_file_size: cfg.max_file_size,
        }
    }

    /// Run the pipeline for one request.
    ///
    /// Returns the generated storage key on success. Each call with the same
    /// URL produces a distinct key; the operation is deliberately not
    /// idempotent.
    pub async fn ingest(&self, url: Option<&str>) -> Result<String, IngestError> {
        let url = match url {
            Some(u) if !u.is_empty() => u,
            _ => return Err(IngestError::MissingUrlParam),
        };

        let payload = match self.fetcher.fetch(url).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "fetch transport failure");
                return Err(IngestError::FetchFailed);
            }
        };
        if !payload.is_success() {
            tracing::warn!(url = %url, status = payload.status, "fetch returned non-success status");
            return Err(IngestError::FetchFailed);
        }

        if payload.body.len() as u64 > self.max_file_size {
            return Err(IngestError::TooBig);
        }

        let format = sniff::detect(&payload.body).ok_or(IngestError::NotImage)?;
        let ext = format.ext();
        if !ALLOWED_EXTENSIONS.contains(&ext) {
            return Err(IngestError::NotSupportedFiletype);
        }

        let key = format!("{}{}.{}", UPLOAD_PREFIX, Uuid::new_v4(), ext);

        let output = match self.store.put_object(&self.bucket, &key, payload.body).await {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(key = %key, error = %err, "object store write failed");
                return Err(IngestError::SavingFailed);
            }
        };
        if output.etag.is_none() {
            tracing::error!(key = %key, "object store returned no integrity token");
            return Err(IngestError::SavingFailed);
        }

        tracing::info!(url = %url, key = %key, size_bytes = output.size_bytes, "image stored");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::IngestService;
    use crate::clients::fetcher::{FetchedPayload, Fetcher};
    use crate::config::{AppConfig, DEFAULT_MAX_FILE_SIZE, UPLOAD_PREFIX};
    use crate::errors::IngestError;
    use crate::services::storage_service::{ObjectStore, PutObjectOutput, StorageResult};
    use anyhow::Result;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Fetcher that always returns a canned response.
    struct StaticFetcher {
        status: u16,
        body: Bytes,
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedPayload> {
            Ok(FetchedPayload {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    /// Fetcher that fails at the transport level.
    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedPayload> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    /// In-memory object store recording every put.
    #[derive(Default)]
    struct MemStore {
        objects: Mutex<HashMap<(String, String), Bytes>>,
        withhold_etag: bool,
    }

    impl MemStore {
        fn without_etag() -> Self {
            Self {
                objects: Mutex::new(HashMap::new()),
                withhold_etag: true,
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MemStore {
        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            body: Bytes,
        ) -> StorageResult<PutObjectOutput> {
            let size_bytes = body.len() as i64;
            self.objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), key.to_string()), body);
            let etag = if self.withhold_etag {
                None
            } else {
                Some("d41d8cd98f00b204e9800998ecf8427e".to_string())
            };
            Ok(PutObjectOutput { etag, size_bytes })
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            storage_dir: "./ignored".into(),
            database_url: "sqlite::memory:".into(),
            bucket: "images".into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    fn service_with(fetcher: Arc<dyn Fetcher>, store: Arc<dyn ObjectStore>) -> IngestService {
        IngestService::new(fetcher, store, &test_config())
    }

    fn png_bytes(total_len: usize) -> Bytes {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(total_len, 0);
        Bytes::from(bytes)
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        let svc = service_with(Arc::new(FailingFetcher), Arc::new(MemStore::default()));
        assert_eq!(svc.ingest(None).await, Err(IngestError::MissingUrlParam));
        assert_eq!(
            svc.ingest(Some("")).await,
            Err(IngestError::MissingUrlParam)
        );
    }

    #[tokio::test]
    async fn transport_failure_maps_to_fetch_failed() {
        let svc = service_with(Arc::new(FailingFetcher), Arc::new(MemStore::default()));
        assert_eq!(
            svc.ingest(Some("http://example.com/a.png")).await,
            Err(IngestError::FetchFailed)
        );
    }

    #[tokio::test]
    async fn non_success_status_maps_to_fetch_failed() {
        let fetcher = StaticFetcher {
            status: 404,
            body: png_bytes(64),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::default()));
        assert_eq!(
            svc.ingest(Some("http://example.com/a.png")).await,
            Err(IngestError::FetchFailed)
        );
    }

    #[tokio::test]
    async fn oversized_payload_is_too_big() {
        let fetcher = StaticFetcher {
            status: 200,
            body: png_bytes(DEFAULT_MAX_FILE_SIZE as usize + 1),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::default()));
        assert_eq!(
            svc.ingest(Some("http://example.com/big.png")).await,
            Err(IngestError::TooBig)
        );
    }

    #[tokio::test]
    async fn payload_at_exact_limit_passes_size_check() {
        let fetcher = StaticFetcher {
            status: 200,
            body: png_bytes(DEFAULT_MAX_FILE_SIZE as usize),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::default()));
        let key = svc.ingest(Some("http://example.com/max.png")).await.unwrap();
        assert!(key.ends_with(".png"));
    }

    #[tokio::test]
    async fn unrecognized_bytes_are_not_image() {
        let fetcher = StaticFetcher {
            status: 200,
            body: Bytes::from_static(b"<!DOCTYPE html><html></html>"),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::default()));
        assert_eq!(
            svc.ingest(Some("http://example.com/page")).await,
            Err(IngestError::NotImage)
        );
    }

    #[tokio::test]
    async fn gif_is_recognized_but_not_supported() {
        let fetcher = StaticFetcher {
            status: 200,
            body: Bytes::from_static(b"GIF89a rest of a gif"),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::default()));
        assert_eq!(
            svc.ingest(Some("http://example.com/anim.gif")).await,
            Err(IngestError::NotSupportedFiletype)
        );
    }

    #[tokio::test]
    async fn missing_integrity_token_is_saving_failed() {
        let fetcher = StaticFetcher {
            status: 200,
            body: png_bytes(512),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::without_etag()));
        assert_eq!(
            svc.ingest(Some("http://example.com/a.png")).await,
            Err(IngestError::SavingFailed)
        );
    }

    #[tokio::test]
    async fn success_returns_prefixed_key_and_stores_bytes() {
        let body = png_bytes(500 * 1024);
        let fetcher = Arc::new(StaticFetcher {
            status: 200,
            body: body.clone(),
        });
        let store = Arc::new(MemStore::default());
        let svc = service_with(fetcher, store.clone());

        let key = svc.ingest(Some("http://example.com/a.png")).await.unwrap();
        assert!(key.starts_with(UPLOAD_PREFIX));
        assert!(key.ends_with(".png"));

        let objects = store.objects.lock().unwrap();
        let stored = objects.get(&("images".to_string(), key.clone())).unwrap();
        assert_eq!(stored, &body);
    }

    #[tokio::test]
    async fn repeated_ingest_generates_distinct_keys() {
        let fetcher = Arc::new(StaticFetcher {
            status: 200,
            body: png_bytes(128),
        });
        let store = Arc::new(MemStore::default());
        let svc = service_with(fetcher, store.clone());

        let first = svc.ingest(Some("http://example.com/a.png")).await.unwrap();
        let second = svc.ingest(Some("http://example.com/a.png")).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.objects.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bmp_passes_allow_list() {
        let fetcher = StaticFetcher {
            status: 200,
            body: Bytes::from_static(b"BM\x3a\x00\x00\x00 bitmap data"),
        };
        let svc = service_with(Arc::new(fetcher), Arc::new(MemStore::default()));
        let key = svc.ingest(Some("http://example.com/b.bmp")).await.unwrap();
        assert!(key.ends_with(".bmp"));
    }
}
