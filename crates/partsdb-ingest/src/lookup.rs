//! Image lookup by brand and article prefix.

use partsdb_core::{normalize_article, normalize_brand, pick_canonical};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

use crate::{CatalogService, IngestError};

/// Characters escaped inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupHit {
    pub id: i64,
    pub brand: String,
    pub article: String,
    pub url: String,
}

impl CatalogService {
    /// Find stored images for `brand` whose article starts with `article`.
    ///
    /// The brand goes through the resolver first; when nothing matches the
    /// raw lowercase brand is used. Items whose image file is missing are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Key`] for a blank brand or article,
    /// [`IngestError::NotFound`] when nothing is found, or a store error.
    pub async fn lookup(&self, brand: &str, article: &str) -> Result<Vec<LookupHit>, IngestError> {
        let raw_brand = normalize_brand(brand)?;
        let prefix = normalize_article(article)?;

        let matches = self.store.resolve_brand(brand).await?;
        let brand = pick_canonical(&matches)
            .map_or(raw_brand, |m| m.canonical_brand.trim().to_lowercase());

        let mut hits = Vec::new();
        for item in self.store.find_by_prefix(&brand, &prefix).await? {
            let Some(path) = item.image_path.as_deref() else {
                continue;
            };
            if !self.blobs.exists(path).await? {
                tracing::debug!(id = item.id, path, "lookup skipped item with missing image");
                continue;
            }
            hits.push(LookupHit {
                id: item.id,
                url: public_url(&self.settings.public_base_url, path),
                brand: item.brand,
                article: item.article,
            });
        }

        if hits.is_empty() {
            return Err(IngestError::NotFound);
        }
        Ok(hits)
    }
}

/// `<base>/<segment>/<segment>` with each segment percent-encoded.
fn public_url(base: &str, relative_path: &str) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in relative_path.split('/') {
        url.push('/');
        url.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }
    url
}
