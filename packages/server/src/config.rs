use common::StorageConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Ingress policy for uploaded documents.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Maximum document size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_upload_size")]
    pub max_size: u64,
    /// Accepted media types. Default: `["application/pdf"]`.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

fn default_max_upload_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec!["application/pdf".into()]
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_upload_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

/// Background orphan sweep settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    /// Seconds between sweeps. 0 disables the sweeper. Default: 3600.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    /// Unreferenced blobs younger than this are left alone, since they may
    /// belong to an upload that has not been indexed yet. Default: 3600.
    #[serde(default = "default_sweep_grace_secs")]
    pub grace_secs: u64,
    /// Remove index rows whose blob is gone. Default: true.
    #[serde(default = "default_prune_dangling")]
    pub prune_dangling: bool,
}

fn default_sweep_interval_secs() -> u64 {
    3600
}
fn default_sweep_grace_secs() -> u64 {
    3600
}
fn default_prune_dangling() -> bool {
    true
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            grace_secs: default_sweep_grace_secs(),
            prune_dangling: default_prune_dangling(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("database.url", "sqlite://data/portal.sqlite?mode=rwc")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., PORTAL__UPLOAD__MAX_SIZE)
            .add_source(
                Environment::with_prefix("PORTAL")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("upload.allowed_types")
                    .with_list_parse_key("server.cors.allow_origins"),
            )
            .build()?;

        s.try_deserialize()
    }
}
