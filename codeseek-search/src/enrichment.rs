//! Background enrichment of top-ranked results.
//!
//! After a search, the best candidates are handed to [`EnrichmentPipeline`]
//! which deepens them in the background and upserts the result into the
//! [`DocumentStore`]. The request path never waits for it.
//!
//! ```text
//! enqueue(top N) ──► spawn task per candidate (TaskTracker)
//!                        │
//!                        ├─ try global permit ─┐
//!                        ├─ try host permit  ──┴─ unavailable? drop task
//!                        ├─ fetch question, then accepted answer (each timed)
//!                        └─ upsert enriched Document
//! ```
//!
//! Concurrency is bounded by one global semaphore and one lazily-created
//! semaphore per host. Permits are taken with non-blocking attempts only:
//! a task that cannot get both is dropped, never queued or retried. Every
//! fault (network, timeout, parse, store) ends the task quietly.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::backoff::BackoffTracker;
use crate::config::EnrichmentConfig;
use crate::content::{normalize_text, strip_markup, truncate_with_ellipsis};
use crate::error::{Result, SearchError};
use crate::providers::stackoverflow::{question_id_from_url, StackExchangeApi};
use crate::store::DocumentStore;
use crate::types::{Candidate, Document};

/// Longest combined `Q: ... A: ...` snippet kept on a document.
pub const MAX_ENRICHED_CHARS: usize = 900;

/// Host key used when a url has no host component.
const UNKNOWN_HOST: &str = "unknown";

/// Deep content gathered for one candidate.
#[derive(Debug, Clone, PartialEq)]
struct EnrichedContent {
    question_text: String,
    answer_text: String,
    snippet: String,
}

/// Bounded-concurrency background enrichment.
///
/// Cheap to clone; clones share permits, host pools and the task tracker.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    inner: Arc<Inner>,
    tasks: TaskTracker,
}

struct Inner {
    config: EnrichmentConfig,
    api: Arc<StackExchangeApi>,
    backoff: Arc<BackoffTracker>,
    documents: Arc<dyn DocumentStore>,
    global: Semaphore,
    hosts: DashMap<String, Arc<Semaphore>>,
}

impl EnrichmentPipeline {
    pub fn new(
        config: EnrichmentConfig,
        api: Arc<StackExchangeApi>,
        backoff: Arc<BackoffTracker>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let global = Semaphore::new(config.max_concurrent_fetches.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                api,
                backoff,
                documents,
                global,
                hosts: DashMap::new(),
            }),
            tasks: TaskTracker::new(),
        }
    }

    /// Dispatch one background task per candidate, for the first `top_n`.
    ///
    /// Returns immediately. A no-op when enrichment is disabled or
    /// `candidates` is empty. Must be called from within a tokio runtime.
    pub fn enqueue(&self, candidates: Vec<Candidate>) {
        if !self.inner.config.enabled || candidates.is_empty() {
            return;
        }
        let top_n = self.inner.config.top_n.max(1);
        for candidate in candidates.into_iter().take(top_n) {
            let inner = Arc::clone(&self.inner);
            self.tasks.spawn(async move { inner.run(candidate).await });
        }
    }

    /// Number of enrichment tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every task spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Number of distinct hosts that have a permit pool.
    pub fn host_pool_count(&self) -> usize {
        self.inner.hosts.len()
    }
}

impl Inner {
    async fn run(&self, candidate: Candidate) {
        match self.enrich(&candidate).await {
            Ok(true) => tracing::debug!(url = %candidate.url, "document enriched"),
            Ok(false) => tracing::trace!(url = %candidate.url, "enrichment skipped"),
            Err(err) => tracing::debug!(url = %candidate.url, error = %err, "enrichment aborted"),
        }
    }

    /// Returns whether a document was written.
    async fn enrich(&self, candidate: &Candidate) -> Result<bool> {
        let host = host_of(&candidate.url)?;
        let host_pool = self.host_pool(&host);

        let Ok(_global) = self.global.try_acquire() else {
            tracing::trace!("global enrichment permits exhausted");
            return Ok(false);
        };
        let Ok(_host) = host_pool.try_acquire() else {
            tracing::trace!(host = %host, "host enrichment permits exhausted");
            return Ok(false);
        };

        let Some(content) = self.fetch(candidate).await? else {
            return Ok(false);
        };
        if content.snippet.trim().is_empty() {
            return Ok(false);
        }

        self.documents
            .upsert(enriched_document(candidate, content, Utc::now()))
            .await?;
        Ok(true)
    }

    /// Atomic get-or-create of the permit pool for `host`.
    fn host_pool(&self, host: &str) -> Arc<Semaphore> {
        self.hosts
            .entry(host.to_owned())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.per_host_limit.max(1))))
            .value()
            .clone()
    }

    async fn fetch(&self, candidate: &Candidate) -> Result<Option<EnrichedContent>> {
        if !candidate.source.is_enrichable() {
            return Ok(Some(EnrichedContent {
                question_text: String::new(),
                answer_text: String::new(),
                snippet: candidate.snippet.clone(),
            }));
        }
        if self.backoff.is_active() {
            return Ok(None);
        }
        let Some(question_id) = question_id_from_url(&candidate.url) else {
            return Ok(None);
        };

        let Some(question) = self.timed(self.api.question_detail(question_id)).await? else {
            return Ok(None);
        };
        let question_text = strip_markup(&question.body);

        let answer_text = match question.accepted_answer_id {
            Some(answer_id) => self
                .timed(self.api.answer_body(answer_id))
                .await?
                .map(|body| strip_markup(&body))
                .unwrap_or_default(),
            None => String::new(),
        };

        let snippet = combine(&question_text, &answer_text);
        Ok(Some(EnrichedContent {
            question_text,
            answer_text,
            snippet,
        }))
    }

    async fn timed<T>(&self, fetch: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.config.fetch_timeout();
        tokio::time::timeout(limit, fetch).await.map_err(|_| {
            SearchError::Timeout(format!("detail fetch exceeded {}ms", limit.as_millis()))
        })?
    }
}

fn host_of(raw: &str) -> Result<String> {
    let parsed =
        Url::parse(raw).map_err(|e| SearchError::Parse(format!("invalid url {raw:?}: {e}")))?;
    Ok(parsed
        .host_str()
        .map(str::to_lowercase)
        .unwrap_or_else(|| UNKNOWN_HOST.to_owned()))
}

/// `Q: <question> A: <answer>`, omitting empty halves, truncated.
fn combine(question: &str, answer: &str) -> String {
    let mut parts = Vec::with_capacity(2);
    if !question.is_empty() {
        parts.push(format!("Q: {question}"));
    }
    if !answer.is_empty() {
        parts.push(format!("A: {answer}"));
    }
    truncate_with_ellipsis(&parts.join(" "), MAX_ENRICHED_CHARS)
}

fn enriched_document(
    candidate: &Candidate,
    content: EnrichedContent,
    now: DateTime<Utc>,
) -> Document {
    let mut metadata = Map::new();
    if !candidate.metadata.is_null() {
        metadata.insert("base".into(), candidate.metadata.clone());
    }
    metadata.insert("enriched".into(), Value::Bool(true));
    metadata.insert("enriched_at".into(), Value::String(now.to_rfc3339()));

    Document {
        url: candidate.url.clone(),
        question_id: candidate.question_id,
        source: candidate.source,
        title: candidate.title.clone(),
        normalized_text: normalize_text(&format!("{} {}", candidate.title, content.snippet)),
        tags: candidate.tags.join(","),
        metadata: Value::Object(metadata),
        question_text: content.question_text,
        best_answer_text: content.answer_text,
        fetched_at: now,
    }
}
