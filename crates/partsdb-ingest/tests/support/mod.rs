//! In-memory [`CatalogStore`] with failure injection for engine tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use partsdb_core::{resolve, BrandMatch};
use partsdb_db::{AppliedCatalogWrite, CatalogItemRow, CatalogWrite, DbError};
use partsdb_ingest::{CatalogService, CatalogSettings, CatalogStore, LocalBlobStore};
use tempfile::TempDir;

#[derive(Default)]
struct State {
    next_id: i64,
    items: BTreeMap<(String, String), CatalogItemRow>,
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    state: Mutex<State>,
    aliases: Vec<(String, String)>,
    fail_next_apply: AtomicBool,
    fail_next_delete: AtomicBool,
}

impl MemoryCatalogStore {
    pub fn with_aliases(aliases: &[(&str, &str)]) -> Self {
        Self {
            aliases: aliases
                .iter()
                .map(|(c, b)| ((*c).to_string(), (*b).to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Make the next `apply_writes` call fail without changing anything.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    /// Make the next `delete_item` call fail without changing anything.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    pub fn items(&self) -> Vec<CatalogItemRow> {
        self.state.lock().unwrap().items.values().cloned().collect()
    }

    pub fn item(&self, brand: &str, article: &str) -> Option<CatalogItemRow> {
        self.state
            .lock()
            .unwrap()
            .items
            .get(&(brand.to_string(), article.to_string()))
            .cloned()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn apply_writes(
        &self,
        writes: &[CatalogWrite],
    ) -> Result<Vec<AppliedCatalogWrite>, DbError> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }

        let mut state = self.state.lock().unwrap();
        let mut applied = Vec::with_capacity(writes.len());
        for write in writes {
            let key = (write.brand.clone(), write.article.clone());
            let now = Utc::now();
            if let Some(row) = state.items.get_mut(&key) {
                let previous_image_path = row.image_path.clone();
                if let Some(image) = &write.image {
                    row.image_path = Some(image.image_path.clone());
                    row.content_sha256 = Some(image.content_sha256.clone());
                    row.byte_size = Some(image.byte_size);
                }
                row.updated_at = now;
                applied.push(AppliedCatalogWrite {
                    id: row.id,
                    created: false,
                    previous_image_path,
                });
            } else {
                state.next_id += 1;
                let id = state.next_id;
                state.items.insert(
                    key,
                    CatalogItemRow {
                        id,
                        brand: write.brand.clone(),
                        article: write.article.clone(),
                        image_path: write.image.as_ref().map(|i| i.image_path.clone()),
                        content_sha256: write.image.as_ref().map(|i| i.content_sha256.clone()),
                        byte_size: write.image.as_ref().map(|i| i.byte_size),
                        created_at: now,
                        updated_at: now,
                    },
                );
                applied.push(AppliedCatalogWrite {
                    id,
                    created: true,
                    previous_image_path: None,
                });
            }
        }
        Ok(applied)
    }

    async fn items_by_id(&self, ids: &[i64]) -> Result<Vec<CatalogItemRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .values()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn delete_item(&self, id: i64) -> Result<(), DbError> {
        if self.fail_next_delete.swap(false, Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        let mut state = self.state.lock().unwrap();
        let before = state.items.len();
        state.items.retain(|_, row| row.id != id);
        if state.items.len() == before {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn resolve_brand(&self, query: &str) -> Result<Vec<BrandMatch>, DbError> {
        Ok(resolve(
            self.aliases.iter().map(|(c, b)| (c.as_str(), b.as_str())),
            query,
        ))
    }

    async fn find_by_prefix(
        &self,
        brand: &str,
        article_prefix: &str,
    ) -> Result<Vec<CatalogItemRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .values()
            .filter(|row| row.brand == brand && row.article.starts_with(article_prefix))
            .cloned()
            .collect())
    }
}

pub struct Harness {
    pub store: Arc<MemoryCatalogStore>,
    pub service: CatalogService,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryCatalogStore::default())
    }

    pub fn with_store(store: MemoryCatalogStore) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store);
        let service = CatalogService::new(
            store.clone(),
            LocalBlobStore::new(dir.path()),
            CatalogSettings {
                max_batch_items: 10,
                max_payload_bytes: 64,
                public_base_url: "http://cdn.local/uploads".to_string(),
            },
        );
        Self {
            store,
            service,
            dir,
        }
    }

    pub fn file(&self, relative: &str) -> Option<Vec<u8>> {
        std::fs::read(self.dir.path().join(relative)).ok()
    }

    pub fn staging_is_empty(&self) -> bool {
        let staging = self.dir.path().join(".staging");
        std::fs::read_dir(staging).map_or(true, |mut entries| entries.next().is_none())
    }
}
