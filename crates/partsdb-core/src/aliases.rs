use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Separator used when an alias list is rendered into a single alias blob.
pub const ALIAS_DELIMITER: &str = " | ";

/// One canonical brand and its alternate spellings, as written in the seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandAliasConfig {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl BrandAliasConfig {
    /// The alias list rendered as a blob, ready for storage.
    #[must_use]
    pub fn alias_blob(&self) -> String {
        render_alias_blob(&self.aliases)
    }
}

#[derive(Debug, Deserialize)]
pub struct AliasesFile {
    pub brands: Vec<BrandAliasConfig>,
}

/// Trim alias entries, drop blanks, and collapse case-insensitive duplicates.
///
/// The first spelling of a duplicate wins and input order is preserved.
#[must_use]
pub fn clean_aliases<I, S>(aliases: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    aliases
        .into_iter()
        .filter_map(|alias| {
            let trimmed = alias.as_ref().trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Split a stored alias blob back into its entries.
///
/// Accepts both `" | "` and bare `"|"` separators.
#[must_use]
pub fn parse_alias_blob(blob: &str) -> Vec<String> {
    clean_aliases(blob.split('|'))
}

/// Render an alias list as a `" | "`-joined blob.
#[must_use]
pub fn render_alias_blob<S: AsRef<str>>(aliases: &[S]) -> String {
    clean_aliases(aliases).join(ALIAS_DELIMITER)
}

/// Load and validate the brand alias seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_aliases(path: &Path) -> Result<AliasesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AliasesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let aliases_file: AliasesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::AliasesFileParse)?;

    validate_aliases(&aliases_file)?;

    Ok(aliases_file)
}

fn validate_aliases(aliases_file: &AliasesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for brand in &aliases_file.brands {
        let canonical = brand.canonical.trim();
        if canonical.is_empty() {
            return Err(ConfigError::Validation(
                "canonical brand name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(canonical.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate canonical brand: '{canonical}'"
            )));
        }

        if brand.aliases.iter().any(|a| a.contains('|')) {
            return Err(ConfigError::Validation(format!(
                "brand '{canonical}' has an alias containing the '|' delimiter"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "aliases_test.rs"]
mod tests;
