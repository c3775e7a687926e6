//! The `search` operation: cache, fan-out, dedup, rank, side effects.
//!
//! # Pipeline
//!
//! 1. Normalize the request and derive its cache key
//! 2. Cache hit: log it and return the cached response verbatim
//! 3. Fan out to every provider concurrently with an over-fetched page size
//!    and wait for all of them
//! 4. Deduplicate by url, rank, truncate to `limit`
//! 5. Build the response
//! 6. Side effects: shallow document upserts, enrichment hand-off, cache
//!    write, query log. None of them can alter the response.

use std::sync::Arc;

use chrono::Utc;

use crate::cache::ResponseCache;
use crate::enrichment::EnrichmentPipeline;
use crate::provider::ProviderClient;
use crate::store::{DocumentStore, QueryLogSink};
use crate::types::{Candidate, Document, ProviderPage, QueryLogRecord, SearchResponse};

use super::dedup::deduplicate;
use super::normalize::NormalizedRequest;
use super::ranking::rank;

/// Composes providers, ranking, cache, stores and enrichment.
pub struct QueryOrchestrator {
    providers: Vec<Arc<dyn ProviderClient>>,
    cache: ResponseCache,
    documents: Arc<dyn DocumentStore>,
    query_log: Arc<dyn QueryLogSink>,
    enrichment: EnrichmentPipeline,
}

impl QueryOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        cache: ResponseCache,
        documents: Arc<dyn DocumentStore>,
        query_log: Arc<dyn QueryLogSink>,
        enrichment: EnrichmentPipeline,
    ) -> Self {
        Self {
            providers,
            cache,
            documents,
            query_log,
            enrichment,
        }
    }

    /// The enrichment pipeline fed by this orchestrator.
    pub fn enrichment(&self) -> &EnrichmentPipeline {
        &self.enrichment
    }

    /// Run a search.
    ///
    /// Never fails: provider, cache and store faults are logged and
    /// degrade to fewer results or skipped side effects.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: i64,
        sort: &str,
        tags: &[String],
    ) -> SearchResponse {
        let request = NormalizedRequest::new(query, limit, offset, sort, tags);
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(total = cached.total, "serving search from cache");
            self.log_query(&request, cached.total, true).await;
            return cached;
        }

        let page = self.fan_out(&request).await;
        let deduped = deduplicate(page.items);
        let deduped_count = deduped.len();
        let ranked = rank(&request.query, deduped.clone(), request.limit);
        let has_more = has_more(deduped_count, ranked.len(), request.limit, page.has_more);

        tracing::debug!(
            deduped = deduped_count,
            ranked = ranked.len(),
            has_more,
            provider_has_more = page.has_more,
            "search computed"
        );

        let response = SearchResponse {
            query: request.query.clone(),
            sort: request.sort,
            tags: request.tags.clone(),
            limit: request.limit,
            offset: request.offset,
            has_more,
            provider_has_more: page.has_more,
            generated_at: Utc::now(),
            total: ranked.len(),
            items: ranked,
        };

        self.persist_shallow(&deduped).await;
        self.enrichment
            .enqueue(response.items.iter().map(|item| item.candidate.clone()).collect());
        self.cache.put(&key, &response).await;
        self.log_query(&request, response.total, false).await;

        response
    }

    /// Query every provider concurrently and merge their pages.
    ///
    /// A provider task that panics contributes an empty page.
    async fn fan_out(&self, request: &NormalizedRequest) -> ProviderPage {
        let fetch_size = request.fetch_size();
        let handles: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let query = request.query.clone();
                let tags = request.tags.clone();
                let offset = request.offset;
                let sort = request.sort;
                tokio::spawn(async move {
                    let page = provider.search(&query, fetch_size, offset, sort, &tags).await;
                    (provider.name(), page)
                })
            })
            .collect();

        let mut merged = ProviderPage::empty();
        for outcome in futures::future::join_all(handles).await {
            match outcome {
                Ok((name, page)) => {
                    tracing::debug!(
                        provider = name,
                        count = page.items.len(),
                        has_more = page.has_more,
                        "provider returned results"
                    );
                    merged.has_more |= page.has_more;
                    merged.items.extend(page.items);
                }
                Err(err) => tracing::warn!(error = %err, "provider task failed"),
            }
        }
        merged
    }

    async fn persist_shallow(&self, candidates: &[Candidate]) {
        let now = Utc::now();
        for candidate in candidates {
            if let Err(err) = self.documents.upsert(Document::shallow(candidate, now)).await {
                tracing::warn!(
                    url = %candidate.url,
                    error = %err,
                    "shallow document upsert failed"
                );
            }
        }
    }

    async fn log_query(&self, request: &NormalizedRequest, result_count: usize, cache_hit: bool) {
        let record = QueryLogRecord {
            query: request.query.clone(),
            sort: request.sort,
            tags: request.tags.clone(),
            limit: request.limit,
            offset: request.offset,
            result_count,
            cache_hit,
            created_at: Utc::now(),
        };
        if let Err(err) = self.query_log.append(record).await {
            tracing::warn!(error = %err, "query log append failed");
        }
    }
}

/// More ranked results exist when dedup left some unranked, or when the
/// page is full and an upstream reports more.
fn has_more(deduped: usize, ranked: usize, limit: usize, provider_has_more: bool) -> bool {
    deduped > ranked || (ranked == limit && provider_has_more)
}
