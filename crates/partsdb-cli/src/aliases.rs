//! Brand alias command handlers for the CLI.

use std::path::Path;

use partsdb_core::{pick_canonical, BrandMatch};

/// Load the YAML seed file and upsert every brand in it.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or the upsert fails.
pub(crate) async fn run_seed_aliases(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let file = partsdb_core::load_aliases(path)?;
    let written = partsdb_db::seed_brand_aliases(pool, &file.brands).await?;
    println!("seeded {written} brands from {}", path.display());
    Ok(())
}

/// Print every match for `query` and the canonical brand a lookup would use.
///
/// # Errors
///
/// Returns an error if the alias query fails.
pub(crate) async fn run_resolve(pool: &sqlx::PgPool, query: &str) -> anyhow::Result<()> {
    let matches = partsdb_db::resolve_brand(pool, query).await?;
    print!("{}", render_matches(query, &matches));
    Ok(())
}

fn render_matches(query: &str, matches: &[BrandMatch]) -> String {
    if matches.is_empty() {
        return format!("no brand matches '{query}'; lookups fall back to the name as given\n");
    }

    let mut out = String::new();
    for m in matches {
        out.push_str(&format!("{:<16} {}\n", m.kind.as_str(), m.canonical_brand));
    }
    if let Some(chosen) = pick_canonical(matches) {
        out.push_str(&format!("chosen: {}\n", chosen.canonical_brand));
    }
    out
}

#[cfg(test)]
mod tests {
    use partsdb_core::{BrandMatch, MatchKind};

    use super::render_matches;

    #[test]
    fn empty_result_mentions_fallback() {
        let out = render_matches("nobody", &[]);
        assert!(out.contains("no brand matches 'nobody'"));
    }

    #[test]
    fn chosen_brand_is_printed_last() {
        let matches = vec![BrandMatch {
            canonical_brand: "Bosch".to_string(),
            kind: MatchKind::Exact,
        }];
        let out = render_matches("bosch", &matches);
        assert!(out.ends_with("chosen: Bosch\n"));
    }
}
