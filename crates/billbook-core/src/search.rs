use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Prefix,
    Substring,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Suggestion<T> {
    pub item: T,
    pub kind: MatchKind,
}

/// Incremental lookup behind a search box: better matches first, ties in
/// source order.
pub trait Typeahead {
    type Item: Clone;

    fn search(&self, query: &str, limit: usize) -> Vec<Suggestion<Self::Item>>;
}

/// Case-insensitive match of one candidate against an already lowercased query.
pub fn match_kind(candidate: &str, query_lower: &str) -> Option<MatchKind> {
    if query_lower.is_empty() {
        return None;
    }

    let candidate = candidate.trim().to_lowercase();
    if candidate == query_lower {
        Some(MatchKind::Exact)
    } else if candidate.starts_with(query_lower) {
        Some(MatchKind::Prefix)
    } else if candidate.contains(query_lower) {
        Some(MatchKind::Substring)
    } else {
        None
    }
}

pub fn best_match<'a>(
    fields: impl IntoIterator<Item = &'a str>,
    query_lower: &str,
) -> Option<MatchKind> {
    fields
        .into_iter()
        .filter_map(|field| match_kind(field, query_lower))
        .min()
}

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Stable-sorts by match quality and truncates to `limit`.
pub fn rank<T>(mut hits: Vec<Suggestion<T>>, limit: usize) -> Vec<Suggestion<T>> {
    hits.sort_by_key(|hit| hit.kind);
    hits.truncate(limit);
    hits
}
