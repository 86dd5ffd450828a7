//! Catalog ingestion: staged blob storage, the bulk upsert engine, item
//! deletion and image lookup.

pub mod delete;
pub mod engine;
pub mod lookup;
pub mod storage;
pub mod store;

use std::sync::Arc;

use partsdb_core::{AppConfig, KeyError};
use partsdb_db::DbError;
use thiserror::Error;

pub use delete::DeleteReport;
pub use lookup::LookupHit;
pub use storage::{content_sha256, LocalBlobStore, StagedBlob, StorageError};
pub use store::{CatalogStore, PgCatalogStore};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("batch of {count} items exceeds the limit of {limit}")]
    BatchTooLarge { count: usize, limit: usize },
    #[error("batch rolled back: {0}")]
    RolledBack(#[source] DbError),
    #[error("catalog item not found")]
    NotFound,
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Limits and URLs the catalog service needs from the application config.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub max_batch_items: usize,
    pub max_payload_bytes: usize,
    /// Public URL prefix the storage root is served under, without a
    /// trailing `/`.
    pub public_base_url: String,
}

impl CatalogSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_batch_items: config.max_batch_items,
            max_payload_bytes: config.max_payload_bytes,
            public_base_url: config.public_base_url.clone(),
        }
    }
}

/// Catalog item operations spanning the record store and the blob store.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    blobs: LocalBlobStore,
    settings: CatalogSettings,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, blobs: LocalBlobStore, settings: CatalogSettings) -> Self {
        Self {
            store,
            blobs,
            settings,
        }
    }

    #[must_use]
    pub fn blobs(&self) -> &LocalBlobStore {
        &self.blobs
    }

    #[must_use]
    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }
}
