//! Bulk upsert of catalog items with their images.
//!
//! A batch runs in three phases:
//!
//! 1. **stage**: each valid payload is written to the staging area;
//! 2. **commit**: every staged or payload-less item is upserted in one
//!    database transaction;
//! 3. **promote**: staged files are renamed into place in input order and
//!    files superseded under a different name are removed.
//!
//! Validation and staging failures are reported on their item and the batch
//! continues. A database failure rolls back the whole batch, discards every
//! staged file and surfaces as [`IngestError::RolledBack`].

use std::collections::HashMap;

use partsdb_core::{
    decode_payload, normalize_brand, normalize_key, BatchReport, ItemInput, ItemOutcome,
    NormalizedKey, ALLOWED_EXTENSIONS,
};
use partsdb_db::{AppliedCatalogWrite, CatalogWrite, ImageFields};

use crate::{CatalogService, IngestError, StagedBlob};

/// An item that passed validation and takes part in the commit.
struct Prepared {
    index: usize,
    write: CatalogWrite,
    staged: Option<StagedBlob>,
}

impl CatalogService {
    /// Create or update every item of `items`, returning per-item outcomes
    /// keyed by input index.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::BatchTooLarge`] before doing any work when the
    /// batch exceeds the configured limit, and [`IngestError::RolledBack`]
    /// when the record transaction fails.
    pub async fn bulk_upsert(&self, items: &[ItemInput]) -> Result<BatchReport, IngestError> {
        let limit = self.settings.max_batch_items;
        if items.len() > limit {
            return Err(IngestError::BatchTooLarge {
                count: items.len(),
                limit,
            });
        }

        tracing::info!(items = items.len(), "bulk upsert started");
        let mut report = BatchReport::default();

        // Phase 1: validate and stage.
        let mut prepared = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.prepare(index, item).await {
                Ok(p) => prepared.push(p),
                Err(message) => {
                    tracing::warn!(index, brand = %item.brand, key = %item.key, %message, "item rejected");
                    report.record(index, ItemOutcome::Failure(message));
                }
            }
        }

        if prepared.is_empty() {
            tracing::info!(failed = report.failed, "bulk upsert finished, nothing to commit");
            return Ok(report);
        }

        // Phase 2: commit all records at once.
        let writes: Vec<CatalogWrite> = prepared.iter().map(|p| p.write.clone()).collect();
        let applied = match self.store.apply_writes(&writes).await {
            Ok(applied) => applied,
            Err(error) => {
                tracing::error!(error = %error, items = writes.len(), "catalog transaction failed, batch rolled back");
                for staged in prepared.iter().filter_map(|p| p.staged.as_ref()) {
                    self.blobs.discard(staged).await;
                }
                return Err(IngestError::RolledBack(error));
            }
        };

        // Phase 3: put files in place.
        let final_paths = final_image_paths(&prepared);
        for (item, applied) in prepared.iter().zip(&applied) {
            let outcome = self.promote(item, applied, &final_paths).await;
            if outcome.is_success() {
                if applied.created {
                    report.created += 1;
                } else {
                    report.updated += 1;
                }
            }
            report.record(item.index, outcome);
        }

        tracing::info!(
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "bulk upsert finished"
        );
        Ok(report)
    }

    async fn prepare(&self, index: usize, item: &ItemInput) -> Result<Prepared, String> {
        let brand = normalize_brand(&item.brand).map_err(|e| e.to_string())?;
        let key = normalize_key(&item.key).map_err(|e| e.to_string())?;

        let Some(raw_payload) = item.payload.as_deref() else {
            return Ok(Prepared {
                index,
                write: CatalogWrite {
                    brand,
                    article: key.stem,
                    image: None,
                },
                staged: None,
            });
        };

        check_extension(&key)?;
        let payload = decode_payload(raw_payload, self.settings.max_payload_bytes)
            .map_err(|e| e.to_string())?;

        let image_path = key.storage_path(&brand);
        let staged = self
            .blobs
            .stage(&image_path, &payload.bytes)
            .await
            .map_err(|e| format!("failed to store image: {e}"))?;

        Ok(Prepared {
            index,
            write: CatalogWrite {
                brand,
                article: key.stem,
                image: Some(ImageFields {
                    image_path,
                    content_sha256: staged.content_sha256.clone(),
                    byte_size: i64::try_from(staged.byte_size).unwrap_or(i64::MAX),
                }),
            },
            staged: Some(staged),
        })
    }

    async fn promote(
        &self,
        item: &Prepared,
        applied: &AppliedCatalogWrite,
        final_paths: &HashMap<(&str, &str), &str>,
    ) -> ItemOutcome {
        let verb = if applied.created { "created" } else { "updated" };

        let Some(staged) = item.staged.as_ref() else {
            return ItemOutcome::Success(format!("record {verb}"));
        };

        if let Err(error) = self.blobs.promote(staged).await {
            tracing::error!(
                index = item.index,
                path = %staged.relative_path,
                error = %error,
                "record committed but image could not be placed"
            );
            self.blobs.discard(staged).await;
            return ItemOutcome::Failure(format!("record {verb} but image was not stored: {error}"));
        }

        if let Some(previous) = applied.previous_image_path.as_deref() {
            let owned = final_paths
                .get(&(item.write.brand.as_str(), item.write.article.as_str()))
                .is_some_and(|path| *path == previous);
            if previous != staged.relative_path && !owned {
                self.remove_superseded(previous).await;
            }
        }

        ItemOutcome::Success(format!("image {verb}"))
    }

    async fn remove_superseded(&self, path: &str) {
        match self.blobs.remove(path).await {
            Ok(true) => tracing::debug!(path, "superseded image removed"),
            Ok(false) => {}
            Err(error) => tracing::warn!(path, error = %error, "failed to remove superseded image"),
        }
    }
}

fn check_extension(key: &NormalizedKey) -> Result<(), String> {
    match key.extension.as_deref() {
        None => Err("file extension is missing".to_string()),
        Some(_) if key.has_allowed_extension() => Ok(()),
        Some(ext) => Err(format!(
            "extension '{ext}' is not allowed (expected one of {})",
            ALLOWED_EXTENSIONS.join(", ")
        )),
    }
}

/// Image path each `(brand, article)` ends the batch with; later items win.
fn final_image_paths(prepared: &[Prepared]) -> HashMap<(&str, &str), &str> {
    let mut paths = HashMap::new();
    for item in prepared {
        if let Some(image) = &item.write.image {
            paths.insert(
                (item.write.brand.as_str(), item.write.article.as_str()),
                image.image_path.as_str(),
            );
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(brand: &str, article: &str, path: Option<&str>) -> Prepared {
        Prepared {
            index: 0,
            write: CatalogWrite {
                brand: brand.to_string(),
                article: article.to_string(),
                image: path.map(|p| ImageFields {
                    image_path: p.to_string(),
                    content_sha256: String::new(),
                    byte_size: 0,
                }),
            },
            staged: None,
        }
    }

    #[test]
    fn last_image_for_a_key_wins() {
        let items = vec![
            prepared("bosch", "k", Some("bosch/k.png")),
            prepared("bosch", "k", Some("bosch/k.jpg")),
            prepared("bosch", "k", None),
        ];
        let paths = final_image_paths(&items);
        assert_eq!(paths.get(&("bosch", "k")), Some(&"bosch/k.jpg"));
    }

    #[test]
    fn extension_checks() {
        let key = normalize_key("ab12.PNG").unwrap();
        assert!(check_extension(&key).is_ok());

        let missing = normalize_key("ab12").unwrap();
        assert_eq!(
            check_extension(&missing).unwrap_err(),
            "file extension is missing"
        );

        let exe = normalize_key("ab12.exe").unwrap();
        assert!(check_extension(&exe).unwrap_err().contains("'exe'"));
    }
}
