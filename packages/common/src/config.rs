use std::path::PathBuf;

use serde::Deserialize;

/// Blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding the blob shards. Default: "data/blobs".
    #[serde(default = "default_blob_dir")]
    pub blob_dir: PathBuf,
}

fn default_blob_dir() -> PathBuf {
    PathBuf::from("data/blobs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_dir: default_blob_dir(),
        }
    }
}
