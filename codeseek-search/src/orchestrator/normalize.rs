//! Request normalization and cache keys.
//!
//! Every `search` call is first reduced to a [`NormalizedRequest`]. The
//! cache key, the provider over-fetch size and the logged record are all
//! derived from it, so two requests that normalize alike are the same
//! request.

use url::form_urlencoded;

use crate::types::SortMode;

/// Upper bound on candidates requested from each provider.
pub const MAX_FETCH: usize = 50;

/// Over-fetch multiplier compensating for duplicates lost in dedup.
const FETCH_MULTIPLIER: usize = 3;

/// Cache key namespace. Bump when the response shape changes.
const KEY_PREFIX: &str = "search:v3";

/// A search request after trimming, clamping and tag cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub sort: SortMode,
    pub tags: Vec<String>,
}

impl NormalizedRequest {
    /// Normalize raw request parameters.
    ///
    /// Negative offsets clamp to zero. Unknown sort values fall back to
    /// [`SortMode::Relevance`].
    pub fn new<S: AsRef<str>>(
        query: &str,
        limit: usize,
        offset: i64,
        sort: &str,
        tags: &[S],
    ) -> Self {
        Self {
            query: query.trim().to_owned(),
            limit,
            offset: usize::try_from(offset.max(0)).unwrap_or(usize::MAX),
            sort: SortMode::parse(sort),
            tags: normalize_tags(tags),
        }
    }

    /// Deterministic cache key covering every normalized field.
    ///
    /// Layout: `search:v3:{limit}:{offset}:{sort}:{tags}:{query}`. Tags are
    /// sorted and form-urlencoded so commas or colons inside a tag cannot
    /// collide with the separators; `*` stands for "no tags". The query
    /// goes last and is kept verbatim.
    pub fn cache_key(&self) -> String {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|tag| form_urlencoded::byte_serialize(tag.as_bytes()).collect())
            .collect();
        tags.sort();
        let tags = if tags.is_empty() {
            "*".to_owned()
        } else {
            tags.join(",")
        };
        format!(
            "{KEY_PREFIX}:{}:{}:{}:{tags}:{}",
            self.limit,
            self.offset,
            self.sort.as_str(),
            self.query
        )
    }

    /// Number of candidates to request from each provider.
    pub fn fetch_size(&self) -> usize {
        fetch_size(self.limit)
    }
}

/// `min(MAX_FETCH, limit * 3)`, never below one.
pub fn fetch_size(limit: usize) -> usize {
    limit.max(1).saturating_mul(FETCH_MULTIPLIER).min(MAX_FETCH)
}

/// Lower-case, trim, drop blanks and duplicates, keep first-seen order.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        query: &str,
        limit: usize,
        offset: i64,
        sort: &str,
        tags: &[&str],
    ) -> NormalizedRequest {
        NormalizedRequest::new(query, limit, offset, sort, tags)
    }

    #[test]
    fn normalizes_every_field() {
        let req = request(
            "  borrow checker  ",
            10,
            -5,
            "creation",
            &[" Rust", "rust", "", "Tokio"],
        );
        assert_eq!(req.query, "borrow checker");
        assert_eq!(req.offset, 0);
        assert_eq!(req.sort, SortMode::New);
        assert_eq!(req.tags, vec!["rust", "tokio"]);
    }

    #[test]
    fn fetch_size_scenarios() {
        assert_eq!(fetch_size(10), 30);
        assert_eq!(fetch_size(16), 48);
        assert_eq!(fetch_size(17), MAX_FETCH);
        assert_eq!(fetch_size(1_000), MAX_FETCH);
        assert_eq!(fetch_size(0), 3);
        assert_eq!(request("foo", 10, 0, "", &[]).fetch_size(), 30);
    }

    #[test]
    fn cache_key_layout() {
        let key = request("async rust", 10, 20, "new", &["tokio", "Async"]).cache_key();
        assert_eq!(key, "search:v3:10:20:new:async,tokio:async rust");

        let untagged = request("x", 5, 0, "relevance", &[]).cache_key();
        assert_eq!(untagged, "search:v3:5:0:relevance:*:x");
    }

    #[test]
    fn equivalent_requests_share_a_key() {
        let a = request(" rust ", 10, 0, "bogus", &["b", "a"]);
        let b = request("rust", 10, -3, "relevance", &["A", "b", "a"]);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn every_field_changes_the_key() {
        let base = request("rust", 10, 0, "relevance", &["a"]).cache_key();
        assert_ne!(base, request("go", 10, 0, "relevance", &["a"]).cache_key());
        assert_ne!(base, request("rust", 11, 0, "relevance", &["a"]).cache_key());
        assert_ne!(base, request("rust", 10, 1, "relevance", &["a"]).cache_key());
        assert_ne!(base, request("rust", 10, 0, "new", &["a"]).cache_key());
        assert_ne!(base, request("rust", 10, 0, "relevance", &["b"]).cache_key());
        assert_ne!(base, request("rust", 10, 0, "relevance", &[]).cache_key());
    }

    #[test]
    fn separators_inside_tags_cannot_collide() {
        let joined = request("q", 1, 0, "", &["a,b"]).cache_key();
        let split = request("q", 1, 0, "", &["a", "b"]).cache_key();
        assert_ne!(joined, split);

        let colon = request("q", 1, 0, "", &["x:y"]).cache_key();
        assert!(colon.contains("x%3Ay"));
    }

    #[test]
    fn query_case_is_preserved() {
        let upper = request("Rust", 1, 0, "", &[]).cache_key();
        let lower = request("rust", 1, 0, "", &[]).cache_key();
        assert_ne!(upper, lower);
    }
}
