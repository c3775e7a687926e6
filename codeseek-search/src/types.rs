//! Core types flowing through the query pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::content::normalize_text;

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// Stack Overflow via the Stack Exchange API. The only enrichable source.
    #[serde(rename = "STACKOVERFLOW")]
    StackOverflow,
    /// Generic web result with no deeper detail endpoint.
    #[serde(rename = "WEB")]
    Web,
}

impl SourceType {
    /// Returns the stable name stored on documents and responses.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StackOverflow => "STACKOVERFLOW",
            Self::Web => "WEB",
        }
    }

    /// Whether the enrichment pipeline knows how to deepen this source.
    pub fn is_enrichable(&self) -> bool {
        matches!(self, Self::StackOverflow)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed set of sort modes accepted by [`crate::orchestrator::search::QueryOrchestrator`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Best match first.
    #[default]
    Relevance,
    /// Newest first.
    New,
}

impl SortMode {
    /// Parse a user-supplied sort value.
    ///
    /// `new` and `creation` select [`SortMode::New`]; anything else,
    /// including blank input, falls back to [`SortMode::Relevance`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "new" | "creation" => Self::New,
            _ => Self::Relevance,
        }
    }

    /// Stable lowercase name, used in cache keys and query logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::New => "new",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider hit, before deduplication and ranking.
///
/// `url` is the identity key across the whole pipeline: two candidates
/// with the same url are the same logical item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Provider-side numeric id, if the provider has one.
    pub question_id: Option<u64>,
    /// Canonical link to the item.
    pub url: String,
    /// Item title, plain text.
    pub title: String,
    /// Short excerpt shown in results.
    pub snippet: String,
    /// Which provider produced this candidate.
    pub source: SourceType,
    /// Upstream popularity (votes, stars, ...). May be negative.
    pub popularity: i64,
    /// Whether the item has at least one answer the provider considers useful.
    pub answered: bool,
    /// Id of the accepted answer, if any.
    pub accepted_answer_id: Option<u64>,
    /// Provider-declared quality weight (>= 0).
    pub quality: f64,
    /// Publication time, if known.
    pub published_at: Option<DateTime<Utc>>,
    /// Ordered, unique topic tags.
    pub tags: Vec<String>,
    /// Opaque provider metadata.
    pub metadata: serde_json::Value,
}

/// Collect tags keeping first-seen order and dropping duplicates and blanks.
pub fn unique_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

/// One page of candidates from a single provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderPage {
    pub items: Vec<Candidate>,
    /// Whether the provider reports more results past this page.
    pub has_more: bool,
}

impl ProviderPage {
    /// The page every provider fault collapses to.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A ranked result: candidate fields plus the computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Final relevance + quality + freshness score (higher is better).
    pub score: f64,
}

/// The full answer to a search request. This is the cached unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub sort: SortMode,
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: usize,
    /// More ranked results are available past this page.
    pub has_more: bool,
    /// Raw upstream availability, OR-ed across providers.
    pub provider_has_more: bool,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub items: Vec<RankedItem>,
}

/// Persisted enrichment target, keyed by url.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub url: String,
    pub question_id: Option<u64>,
    pub source: SourceType,
    pub title: String,
    /// Lower-cased, whitespace-collapsed searchable text.
    pub normalized_text: String,
    /// Tags joined with `,`.
    pub tags: String,
    pub metadata: serde_json::Value,
    /// Deep question body, empty until enriched.
    pub question_text: String,
    /// Deep accepted-answer body, empty until enriched.
    pub best_answer_text: String,
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    /// Shallow document written at search time from a candidate.
    pub fn shallow(candidate: &Candidate, now: DateTime<Utc>) -> Self {
        Self {
            url: candidate.url.clone(),
            question_id: candidate.question_id,
            source: candidate.source,
            title: candidate.title.clone(),
            normalized_text: normalize_text(&format!("{} {}", candidate.title, candidate.snippet)),
            tags: candidate.tags.join(","),
            metadata: candidate.metadata.clone(),
            question_text: String::new(),
            best_answer_text: String::new(),
            fetched_at: now,
        }
    }

    /// Tags split back out of the joined column, blanks dropped.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Append-only fact describing one search invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogRecord {
    pub query: String,
    pub sort: SortMode,
    pub tags: Vec<String>,
    pub limit: usize,
    pub offset: usize,
    pub result_count: usize,
    pub cache_hit: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(url: &str) -> Candidate {
        Candidate {
            question_id: Some(42),
            url: url.to_string(),
            title: "How to   Borrow".into(),
            snippet: "Use a Reference".into(),
            source: SourceType::StackOverflow,
            popularity: 3,
            answered: true,
            accepted_answer_id: None,
            quality: 1.0,
            published_at: None,
            tags: vec!["rust".into(), "borrow-checker".into()],
            metadata: serde_json::json!({"score": 3}),
        }
    }

    #[test]
    fn sort_mode_parse_falls_back_to_relevance() {
        assert_eq!(SortMode::parse("new"), SortMode::New);
        assert_eq!(SortMode::parse(" Creation "), SortMode::New);
        assert_eq!(SortMode::parse("relevance"), SortMode::Relevance);
        assert_eq!(SortMode::parse("votes"), SortMode::Relevance);
        assert_eq!(SortMode::parse(""), SortMode::Relevance);
    }

    #[test]
    fn sort_mode_display() {
        assert_eq!(SortMode::Relevance.to_string(), "relevance");
        assert_eq!(SortMode::New.to_string(), "new");
    }

    #[test]
    fn source_type_names_and_enrichability() {
        assert_eq!(SourceType::StackOverflow.to_string(), "STACKOVERFLOW");
        assert!(SourceType::StackOverflow.is_enrichable());
        assert!(!SourceType::Web.is_enrichable());
    }

    #[test]
    fn unique_tags_keeps_first_seen_order() {
        let tags = unique_tags(["rust", " tokio ", "rust", "", "async"]);
        assert_eq!(tags, vec!["rust", "tokio", "async"]);
    }

    #[test]
    fn ranked_item_serializes_flat() {
        let item = RankedItem {
            candidate: make_candidate("https://stackoverflow.com/questions/42/x"),
            score: 2.5,
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["url"], "https://stackoverflow.com/questions/42/x");
        assert_eq!(json["questionId"], 42);
        assert_eq!(json["score"], 2.5);
        assert!(json.get("candidate").is_none());
    }

    #[test]
    fn shallow_document_normalizes_text_and_joins_tags() {
        let now = Utc::now();
        let doc = Document::shallow(&make_candidate("https://a.com"), now);
        assert_eq!(doc.normalized_text, "how to borrow use a reference");
        assert_eq!(doc.tags, "rust,borrow-checker");
        assert!(doc.question_text.is_empty());
        assert_eq!(doc.fetched_at, now);
    }

    #[test]
    fn tag_list_splits_and_drops_blanks() {
        let mut doc = Document::shallow(&make_candidate("https://a.com"), Utc::now());
        doc.tags = "rust,, tokio ,".into();
        assert_eq!(doc.tag_list(), vec!["rust", "tokio"]);
        doc.tags.clear();
        assert!(doc.tag_list().is_empty());
    }

    #[test]
    fn stored_records_serialize_camel_case() {
        let doc = Document::shallow(&make_candidate("https://a.com"), Utc::now());
        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["questionId"], 42);
        assert!(json.get("normalizedText").is_some());
        assert!(json.get("bestAnswerText").is_some());
        assert!(json.get("normalized_text").is_none());

        let record = QueryLogRecord {
            query: "rust".into(),
            sort: SortMode::New,
            tags: vec![],
            limit: 10,
            offset: 0,
            result_count: 3,
            cache_hit: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["cacheHit"], true);
        assert_eq!(json["resultCount"], 3);
        assert!(json.get("cache_hit").is_none());
    }
}
