mod error;
mod location;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use location::BlobLocation;
pub use traits::{BlobEntry, BlobStore, BoxReader, StoredBlob};
