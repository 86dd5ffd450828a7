use partsdb_db::DbError;
use serde::Serialize;

use crate::{CatalogService, IngestError};

/// Outcome of a multi-item delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<i64>,
    pub failed: Vec<i64>,
}

impl CatalogService {
    /// Delete a catalog item and its stored image.
    ///
    /// The record is deleted first. The image is removed afterwards; a missing
    /// image or a failed removal is logged and leaves an orphaned file rather
    /// than a record pointing at nothing.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::NotFound`] for an unknown id, or
    /// [`IngestError::Db`] if the record delete fails.
    pub async fn delete_item(&self, id: i64) -> Result<(), IngestError> {
        let item = self
            .store
            .items_by_id(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or(IngestError::NotFound)?;

        self.store.delete_item(id).await.map_err(|e| match e {
            DbError::NotFound => IngestError::NotFound,
            other => IngestError::Db(other),
        })?;

        // The record is gone, so a file left behind here is only an orphan.
        if let Some(path) = item.image_path.as_deref() {
            match self.blobs.remove(path).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(id, path, "image was already missing"),
                Err(error) => {
                    tracing::warn!(id, path, error = %error, "record deleted but image removal failed");
                }
            }
        }

        tracing::info!(id, brand = %item.brand, article = %item.article, "catalog item deleted");
        Ok(())
    }

    /// Delete every item in `ids`, continuing past failures.
    pub async fn delete_items(&self, ids: &[i64]) -> DeleteReport {
        let mut report = DeleteReport::default();
        for &id in ids {
            match self.delete_item(id).await {
                Ok(()) => report.deleted.push(id),
                Err(error) => {
                    tracing::warn!(id, error = %error, "catalog item delete failed");
                    report.failed.push(id);
                }
            }
        }
        report
    }
}
