//! Stack Overflow provider backed by the Stack Exchange API (v2.3).
//!
//! [`StackExchangeApi`] owns the HTTP plumbing: URL construction, optional
//! application key, JSON decoding and forwarding of `backoff` hints to the
//! shared [`BackoffTracker`]. [`StackOverflowProvider`] maps search results
//! into candidates, and the enrichment pipeline reuses the same API client
//! for question and answer detail fetches.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::backoff::BackoffTracker;
use crate::config::StackOverflowConfig;
use crate::content::strip_markup;
use crate::error::{Result, SearchError};
use crate::provider::ProviderClient;
use crate::types::{unique_tags, Candidate, ProviderPage, SortMode, SourceType};

/// Snippet attached to every search hit. The search endpoint returns no
/// body text; enrichment replaces it later with question and answer text.
const SEARCH_SNIPPET: &str = "Stack Overflow question relevant to query.";

/// Common envelope of every Stack Exchange API response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    has_more: bool,
    /// Seconds the client must wait before hitting the same method again.
    backoff: Option<u64>,
    error_name: Option<String>,
    error_message: Option<String>,
}

impl<T> Envelope<T> {
    fn is_error(&self) -> bool {
        self.error_name.is_some() || self.error_message.is_some()
    }

    /// Whether the API rejected the request because of the application key.
    fn is_invalid_key(&self) -> bool {
        let name_matches = self
            .error_name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case("key_invalid"));
        let message_matches = self
            .error_message
            .as_deref()
            .is_some_and(|message| message.to_lowercase().contains("key"));
        name_matches || message_matches
    }
}

/// One hit from `/search/advanced`.
#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    question_id: Option<u64>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    is_answered: bool,
    accepted_answer_id: Option<u64>,
    creation_date: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Body-bearing item from `/questions/{id}` or `/answers/{id}`.
#[derive(Debug, Deserialize)]
struct BodyItem {
    #[serde(default)]
    body: String,
    accepted_answer_id: Option<u64>,
}

/// Question detail used by enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDetail {
    /// Raw HTML body.
    pub body: String,
    pub accepted_answer_id: Option<u64>,
}

/// Thin Stack Exchange API client shared by search and enrichment.
#[derive(Debug, Clone)]
pub struct StackExchangeApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    site: String,
    backoff: Arc<BackoffTracker>,
}

impl StackExchangeApi {
    pub fn new(
        client: reqwest::Client,
        config: &StackOverflowConfig,
        backoff: Arc<BackoffTracker>,
    ) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.trim().to_owned(),
            site: config.site.clone(),
            backoff,
        }
    }

    /// The shared backoff tracker this client reports to.
    pub fn backoff(&self) -> &Arc<BackoffTracker> {
        &self.backoff
    }

    fn has_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Fetch the question with `id`, including its HTML body.
    ///
    /// Returns `Ok(None)` when the API knows no such question.
    pub async fn question_detail(&self, id: u64) -> Result<Option<QuestionDetail>> {
        let envelope: Envelope<BodyItem> = self.detail("questions", id).await?;
        Ok(envelope.items.into_iter().next().map(|item| QuestionDetail {
            body: item.body,
            accepted_answer_id: item.accepted_answer_id.filter(|id| *id > 0),
        }))
    }

    /// Fetch the HTML body of the answer with `id`.
    pub async fn answer_body(&self, id: u64) -> Result<Option<String>> {
        let envelope: Envelope<BodyItem> = self.detail("answers", id).await?;
        Ok(envelope.items.into_iter().next().map(|item| item.body))
    }

    async fn detail(&self, kind: &str, id: u64) -> Result<Envelope<BodyItem>> {
        let url = format!("{}/2.3/{kind}/{id}", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("order", "desc".to_owned()),
            ("sort", "activity".to_owned()),
            ("site", self.site.clone()),
            ("filter", "withbody".to_owned()),
        ];
        if self.has_key() {
            params.push(("key", self.api_key.clone()));
        }
        let envelope: Envelope<BodyItem> = self.get_json(&url, &params).await?;
        if envelope.is_error() {
            return Err(SearchError::Http(format!(
                "{kind} detail rejected: {}",
                envelope.error_name.as_deref().unwrap_or("unknown error")
            )));
        }
        Ok(envelope)
    }

    async fn search_advanced(
        &self,
        query: &str,
        page_size: usize,
        page: usize,
        sort: &str,
        tags: &[String],
        with_key: bool,
    ) -> Result<Envelope<SearchItem>> {
        let url = format!("{}/2.3/search/advanced", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("order", "desc".to_owned()),
            ("sort", sort.to_owned()),
            ("site", self.site.clone()),
            ("q", query.to_owned()),
            ("pagesize", page_size.to_string()),
            ("page", page.to_string()),
        ];
        let tagged = tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>()
            .join(";");
        if !tagged.is_empty() {
            params.push(("tagged", tagged));
        }
        if with_key && self.has_key() {
            params.push(("key", self.api_key.clone()));
        }
        self.get_json(&url, &params).await
    }

    /// GET `url` and decode the JSON envelope, forwarding any backoff hint.
    ///
    /// Error envelopes (HTTP 400 with `error_name`) decode successfully so
    /// callers can inspect them; other non-2xx statuses are errors.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope<T>> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Stack Exchange request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("Stack Exchange response read failed: {e}")))?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(SearchError::Parse(format!(
                    "invalid Stack Exchange response: {e}"
                )))
            }
            Err(_) => {
                return Err(SearchError::Http(format!(
                    "Stack Exchange HTTP error: {status}"
                )))
            }
        };

        if let Some(seconds) = envelope.backoff {
            self.backoff.register_hint(seconds);
        }
        if !status.is_success() && !envelope.is_error() {
            return Err(SearchError::Http(format!(
                "Stack Exchange HTTP error: {status}"
            )));
        }
        Ok(envelope)
    }
}

/// Stack Overflow search provider.
pub struct StackOverflowProvider {
    api: Arc<StackExchangeApi>,
}

impl StackOverflowProvider {
    pub fn new(api: Arc<StackExchangeApi>) -> Self {
        Self { api }
    }

    async fn fetch_page(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        sort: SortMode,
        tags: &[String],
    ) -> Result<ProviderPage> {
        let page_size = limit.max(1);
        let page = offset / page_size + 1;
        let sort = api_sort(sort);

        let mut envelope = self
            .api
            .search_advanced(query, page_size, page, sort, tags, true)
            .await?;

        if envelope.is_invalid_key() && self.api.has_key() {
            tracing::warn!("Stack Exchange rejected the application key, retrying without it");
            envelope = self
                .api
                .search_advanced(query, page_size, page, sort, tags, false)
                .await?;
        }

        if envelope.is_error() {
            return Err(SearchError::Http(format!(
                "Stack Exchange search rejected: {}",
                envelope.error_name.as_deref().unwrap_or("unknown error")
            )));
        }

        let items = envelope
            .items
            .into_iter()
            .filter_map(into_candidate)
            .collect();

        Ok(ProviderPage {
            items,
            has_more: envelope.has_more,
        })
    }
}

#[async_trait]
impl ProviderClient for StackOverflowProvider {
    fn name(&self) -> &'static str {
        "stackoverflow"
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        sort: SortMode,
        tags: &[String],
    ) -> ProviderPage {
        if self.api.backoff().is_active() {
            tracing::debug!(
                remaining_ms = self.api.backoff().remaining().as_millis() as u64,
                "Stack Overflow search skipped during backoff"
            );
            return ProviderPage::empty();
        }

        tracing::trace!(query, limit, offset, "Stack Overflow search");
        match self.fetch_page(query, limit, offset, sort, tags).await {
            Ok(page) => {
                tracing::debug!(
                    count = page.items.len(),
                    has_more = page.has_more,
                    "Stack Overflow results parsed"
                );
                page
            }
            Err(err) => {
                tracing::warn!(error = %err, "Stack Overflow search failed");
                ProviderPage::empty()
            }
        }
    }
}

/// Map a sort mode onto the API's `sort` parameter.
fn api_sort(sort: SortMode) -> &'static str {
    match sort {
        SortMode::Relevance => "relevance",
        SortMode::New => "creation",
    }
}

fn into_candidate(item: SearchItem) -> Option<Candidate> {
    let url = item.link.trim().to_owned();
    if url.is_empty() {
        return None;
    }
    let quality = ((item.score as f64 / 40.0).min(1.25)
        + if item.is_answered { 0.5 } else { 0.0 })
    .max(0.0);

    Some(Candidate {
        question_id: item.question_id.filter(|id| *id > 0),
        url,
        title: strip_markup(&item.title),
        snippet: SEARCH_SNIPPET.to_owned(),
        source: SourceType::StackOverflow,
        popularity: item.score,
        answered: item.is_answered,
        accepted_answer_id: item.accepted_answer_id.filter(|id| *id > 0),
        quality,
        published_at: item.creation_date.and_then(epoch_to_utc),
        tags: unique_tags(&item.tags),
        metadata: serde_json::json!({ "score": item.score, "answered": item.is_answered }),
    })
}

fn epoch_to_utc(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    Utc.timestamp_opt(seconds, 0).single()
}

/// Extract the numeric question id from a `/questions/{id}/...` url.
pub fn question_id_from_url(raw: &str) -> Option<u64> {
    let parsed = Url::parse(raw).ok()?;
    let mut segments = parsed.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "questions" {
            return segments.next().and_then(|id| id.parse().ok());
        }
    }
    None
}
