use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Folder inside the bucket under which fetched images are stored.
pub const UPLOAD_PREFIX: &str = "original/";

/// Image extensions the pipeline accepts after sniffing.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "png", "bmp"];

/// Default cap on a fetched payload, in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 12;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, built once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub bucket: String,
    pub max_file_size: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch-validate-store image ingest service")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_INGEST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_INGEST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides IMAGE_INGEST_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides IMAGE_INGEST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Target bucket for stored images (overrides IMAGE_INGEST_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Max accepted payload size in bytes (overrides IMAGE_INGEST_MAX_FILE_SIZE)
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGE_INGEST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMAGE_INGEST_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMAGE_INGEST_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading IMAGE_INGEST_PORT"),
        };
        let env_storage =
            env::var("IMAGE_INGEST_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("IMAGE_INGEST_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/image_ingest.db".into());
        let env_bucket = env::var("IMAGE_INGEST_BUCKET").unwrap_or_else(|_| "images".into());
        let env_max_size = match env::var("IMAGE_INGEST_MAX_FILE_SIZE") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing IMAGE_INGEST_MAX_FILE_SIZE value `{}`", value))?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_FILE_SIZE,
            Err(err) => return Err(err).context("reading IMAGE_INGEST_MAX_FILE_SIZE"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            bucket: args.bucket.unwrap_or(env_bucket),
            max_file_size: args.max_file_size.unwrap_or(env_max_size),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
