//! Catalog item keys and the shapes exchanged with the bulk upsert engine.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image extensions accepted for stored binaries.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "svg", "webp"];

/// Directory under the storage root that holds uncommitted uploads. No brand
/// may normalize to it.
pub const STAGING_DIR: &str = ".staging";

static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_\s]+").expect("valid separator regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("brand is empty")]
    EmptyBrand,
    #[error("article key is empty")]
    EmptyKey,
    #[error("'{0}' contains a path separator or is a relative path component")]
    UnsafePathSegment(String),
    #[error("'{0}' is a reserved storage directory")]
    ReservedName(String),
}

/// An article key split into its catalog stem and optional file extension.
///
/// `"AB-12_34.PNG"` normalizes to stem `"ab1234"` and extension `"png"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    pub stem: String,
    pub extension: Option<String>,
}

impl NormalizedKey {
    /// File name under the brand directory, e.g. `"ab1234.png"`.
    #[must_use]
    pub fn file_name(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}.{ext}", self.stem),
            None => self.stem.clone(),
        }
    }

    /// Relative storage path `<brand>/<stem>.<ext>`.
    #[must_use]
    pub fn storage_path(&self, brand: &str) -> String {
        format!("{brand}/{}", self.file_name())
    }

    #[must_use]
    pub fn has_allowed_extension(&self) -> bool {
        self.extension
            .as_deref()
            .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext))
    }
}

/// Trim and lowercase a brand name.
///
/// # Errors
///
/// Returns [`KeyError::EmptyBrand`] for a blank brand, or
/// [`KeyError::UnsafePathSegment`] if the brand could escape its storage
/// directory.
pub fn normalize_brand(raw: &str) -> Result<String, KeyError> {
    let brand = raw.trim().to_lowercase();
    if brand.is_empty() {
        return Err(KeyError::EmptyBrand);
    }
    ensure_path_segment(&brand)?;
    Ok(brand)
}

/// Normalize a filename-like article key.
///
/// Runs of whitespace, `-` and `_` are stripped, every `.` except the last
/// is dropped, and the result is trimmed and lowercased.
///
/// # Errors
///
/// Returns [`KeyError::EmptyKey`] if nothing is left of the stem, or
/// [`KeyError::UnsafePathSegment`] if the key contains a path separator.
pub fn normalize_key(raw: &str) -> Result<NormalizedKey, KeyError> {
    let stripped = SEPARATOR_RUNS.replace_all(raw, "");

    let collapsed = match stripped.rfind('.') {
        Some(last_dot) => {
            let (head, tail) = stripped.split_at(last_dot);
            format!("{}{tail}", head.replace('.', ""))
        }
        None => stripped.into_owned(),
    };

    let lowered = collapsed.trim().to_lowercase();
    if lowered.contains(['/', '\\', '\0']) {
        return Err(KeyError::UnsafePathSegment(lowered));
    }

    let (stem, extension) = match lowered.rsplit_once('.') {
        Some((stem, ext)) => (
            stem.to_string(),
            Some(ext.to_string()).filter(|e| !e.is_empty()),
        ),
        None => (lowered.clone(), None),
    };

    if stem.is_empty() {
        return Err(KeyError::EmptyKey);
    }

    Ok(NormalizedKey { stem, extension })
}

/// Normalize an article number for a prefix lookup.
///
/// Separator runs and every `.` are dropped, so the result lines up with the
/// stems [`normalize_key`] stores. A trailing segment is treated as a file
/// extension only when it is one of [`ALLOWED_EXTENSIONS`].
///
/// # Errors
///
/// Returns [`KeyError::EmptyKey`] if nothing is left, or
/// [`KeyError::UnsafePathSegment`] if the article contains a path separator.
pub fn normalize_article(raw: &str) -> Result<String, KeyError> {
    let lowered = SEPARATOR_RUNS.replace_all(raw, "").to_lowercase();
    if lowered.contains(['/', '\\', '\0']) {
        return Err(KeyError::UnsafePathSegment(lowered));
    }

    let body = match lowered.rsplit_once('.') {
        Some((head, ext)) if ALLOWED_EXTENSIONS.contains(&ext) => head,
        _ => lowered.as_str(),
    };
    let article = body.replace('.', "");
    if article.is_empty() {
        return Err(KeyError::EmptyKey);
    }
    Ok(article)
}

fn ensure_path_segment(segment: &str) -> Result<(), KeyError> {
    if segment.contains(['/', '\\', '\0']) || segment == "." || segment == ".." {
        return Err(KeyError::UnsafePathSegment(segment.to_string()));
    }
    if segment == STAGING_DIR {
        return Err(KeyError::ReservedName(segment.to_string()));
    }
    Ok(())
}

/// One entry of a bulk upsert batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInput {
    pub brand: String,
    /// Filename-like article source, e.g. `"AB-12_34.png"`.
    pub key: String,
    /// Base64 image data, optionally as a `data:` URL.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Per-item result, serialized as `{"success": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOutcome {
    #[serde(rename = "success")]
    Success(String),
    #[serde(rename = "error")]
    Failure(String),
}

impl ItemOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success(_))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ItemOutcome::Success(m) | ItemOutcome::Failure(m) => m,
        }
    }
}

/// Outcome of a committed batch, keyed by input index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub items: BTreeMap<usize, ItemOutcome>,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn record(&mut self, index: usize, outcome: ItemOutcome) {
        if !outcome.is_success() {
            self.failed += 1;
        }
        self.items.insert(index, outcome);
    }

    #[must_use]
    pub fn outcome(&self, index: usize) -> Option<&ItemOutcome> {
        self.items.get(&index)
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
