//! Brand resolution against canonical names and their alias blobs.
//!
//! A query matches a brand when any of four case-insensitive predicates
//! holds: the canonical name equals the query, one alias entry equals the
//! query, the whole alias blob equals the query, or the blob contains the
//! query as a raw substring. The predicates form a union; every matching
//! brand is returned, tagged with the strongest predicate it satisfied.
//!
//! Substring containment deliberately over-matches (`"oil"` matches a brand
//! whose aliases include `"foil"`). Callers that need a single answer use
//! [`pick_canonical`], which prefers the strongest match and breaks ties by
//! canonical name.

use std::cmp::Ordering;

use serde::Serialize;

use crate::aliases::parse_alias_blob;

/// How a brand matched a query, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Substring,
    AliasBlob,
    AliasToken,
    Exact,
}

impl MatchKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Substring => "substring",
            MatchKind::AliasBlob => "alias_blob",
            MatchKind::AliasToken => "alias_token",
            MatchKind::Exact => "exact",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandMatch {
    pub canonical_brand: String,
    pub kind: MatchKind,
}

/// Classify how `query` matches one brand, returning the strongest predicate
/// that holds or `None`.
///
/// The query is trimmed; a blank query never matches.
#[must_use]
pub fn classify(canonical: &str, alias_blob: &str, query: &str) -> Option<MatchKind> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    if canonical.trim().to_lowercase() == query {
        return Some(MatchKind::Exact);
    }

    let blob = alias_blob.to_lowercase();

    if parse_alias_blob(&blob).iter().any(|alias| *alias == query) {
        return Some(MatchKind::AliasToken);
    }

    if blob.trim() == query {
        return Some(MatchKind::AliasBlob);
    }

    if blob.contains(&query) {
        return Some(MatchKind::Substring);
    }

    None
}

/// Resolve `query` against `(canonical, alias_blob)` candidates.
///
/// Returns every matching brand, strongest match first, then by canonical
/// name (case-insensitive). An empty result means "no match"; callers fall
/// back to the raw query.
#[must_use]
pub fn resolve<'a, I>(candidates: I, query: &str) -> Vec<BrandMatch>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut matches: Vec<BrandMatch> = candidates
        .into_iter()
        .filter_map(|(canonical, blob)| {
            classify(canonical, blob, query).map(|kind| BrandMatch {
                canonical_brand: canonical.to_string(),
                kind,
            })
        })
        .collect();

    matches.sort_by(rank);
    matches.dedup_by(|a, b| fold(&a.canonical_brand) == fold(&b.canonical_brand));
    matches
}

/// The single brand a caller should use for an ambiguous result.
///
/// Expects `matches` in the order produced by [`resolve`]; the strongest
/// match wins and equal-strength matches fall to the lowest canonical name.
#[must_use]
pub fn pick_canonical(matches: &[BrandMatch]) -> Option<&BrandMatch> {
    matches.iter().min_by(|a, b| rank(a, b))
}

/// Case-insensitive form of a canonical name, Unicode aware.
fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn rank(a: &BrandMatch, b: &BrandMatch) -> Ordering {
    b.kind
        .cmp(&a.kind)
        .then_with(|| fold(&a.canonical_brand).cmp(&fold(&b.canonical_brand)))
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
