//! Catalog import for the CLI.
//!
//! The input file is split into batches of at most `max_batch_items`; each
//! batch goes through the bulk upsert engine on its own, so a rolled-back
//! batch does not undo the ones before it.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use partsdb_core::{AppConfig, BatchReport, ItemInput, ItemOutcome};
use partsdb_ingest::{CatalogService, CatalogSettings, LocalBlobStore, PgCatalogStore};

/// Totals across every batch of one import.
#[derive(Debug, Default, PartialEq, Eq)]
struct ImportSummary {
    created: usize,
    updated: usize,
    /// `(input index, message)` of every failed item.
    failures: Vec<(usize, String)>,
}

impl ImportSummary {
    fn absorb(&mut self, offset: usize, report: &BatchReport) {
        self.created += report.created;
        self.updated += report.updated;
        for (index, outcome) in &report.items {
            if let ItemOutcome::Failure(message) = outcome {
                self.failures.push((offset + index, message.clone()));
            }
        }
    }
}

fn parse_items(raw: &str) -> anyhow::Result<Vec<ItemInput>> {
    serde_json::from_str(raw).context("expected a JSON array of {brand, key, payload} objects")
}

/// Import catalog items from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a batch is rolled
/// back, or any item failed.
pub(crate) async fn run_import(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    file: &Path,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let items = parse_items(&raw)?;

    let service = CatalogService::new(
        Arc::new(PgCatalogStore::new(pool.clone())),
        LocalBlobStore::new(&config.storage_root),
        CatalogSettings::from_app_config(config),
    );

    let batch_size = config.max_batch_items;
    let mut summary = ImportSummary::default();
    for (batch_no, batch) in items.chunks(batch_size).enumerate() {
        let offset = batch_no * batch_size;
        let report = service
            .bulk_upsert(batch)
            .await
            .with_context(|| format!("batch starting at item {offset} failed"))?;
        tracing::info!(
            offset,
            created = report.created,
            updated = report.updated,
            failed = report.failed,
            "batch imported"
        );
        summary.absorb(offset, &report);
    }

    println!(
        "imported {} items: {} created, {} updated, {} failed",
        items.len(),
        summary.created,
        summary.updated,
        summary.failures.len()
    );
    for (index, message) in &summary.failures {
        eprintln!("item {index}: {message}");
    }

    if !summary.failures.is_empty() {
        anyhow::bail!("{} items failed", summary.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_items_accepts_missing_payload() {
        let items = parse_items(r#"[{"brand": "Bosch", "key": "0986.png"}]"#).expect("valid");
        assert_eq!(items.len(), 1);
        assert!(items[0].payload.is_none());
    }

    #[test]
    fn parse_items_rejects_objects() {
        let err = parse_items(r#"{"brand": "Bosch"}"#).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn summary_offsets_failure_indexes() {
        let mut report = BatchReport::default();
        report.record(0, ItemOutcome::Success("image created".to_string()));
        report.record(1, ItemOutcome::Failure("invalid payload".to_string()));
        report.created = 1;

        let mut summary = ImportSummary::default();
        summary.absorb(500, &report);

        assert_eq!(summary.created, 1);
        assert_eq!(summary.failures, vec![(501, "invalid payload".to_string())]);
    }
}
