//! # codeseek-search
//!
//! Query orchestration for codeseek: aggregate developer Q&A results from
//! external providers, rank them, and deepen the best ones in the
//! background.
//!
//! ## Design
//!
//! - Providers implement [`ProviderClient`] and are queried concurrently
//! - Candidates are deduplicated by url and ranked on relevance, quality
//!   and freshness
//! - Whole responses are cached under a normalized request key
//! - A shared [`BackoffTracker`] honours upstream throttle hints across
//!   every provider and the enrichment pipeline
//! - Top results are enriched in the background under global and per-host
//!   concurrency bounds, and written to a [`DocumentStore`]
//! - Graceful degradation: provider, cache and store faults never fail a
//!   search, they only shrink it
//!
//! ## Security
//!
//! - No network listeners, this is a library
//! - Search queries are logged only at trace level
//! - The optional Stack Exchange key is only sent to the configured API root

pub mod backoff;
pub mod cache;
pub mod config;
pub mod content;
pub mod enrichment;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod store;
pub mod types;

use std::sync::Arc;

pub use backoff::BackoffTracker;
pub use cache::{CacheStore, MokaCacheStore, ResponseCache};
pub use config::SearchConfig;
pub use enrichment::EnrichmentPipeline;
pub use error::{Result, SearchError};
pub use orchestrator::QueryOrchestrator;
pub use provider::ProviderClient;
pub use providers::{StackExchangeApi, StackOverflowProvider};
pub use store::{DocumentStore, MemoryDocumentStore, MemoryQueryLog, QueryLogSink};
pub use types::{
    Candidate, Document, ProviderPage, QueryLogRecord, RankedItem, SearchResponse, SortMode,
    SourceType,
};

/// Wire a [`QueryOrchestrator`] from configuration.
///
/// Builds one HTTP client, one [`BackoffTracker`] shared by the Stack
/// Overflow provider and the enrichment pipeline, and an in-process
/// response cache. Documents and query logs go to the given stores.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` fails validation, or
/// [`SearchError::Http`] if the HTTP client cannot be built.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> codeseek_search::Result<()> {
/// use std::sync::Arc;
/// use codeseek_search::{MemoryDocumentStore, MemoryQueryLog, SearchConfig};
///
/// let orchestrator = codeseek_search::build_orchestrator(
///     &SearchConfig::default(),
///     Arc::new(MemoryDocumentStore::new()),
///     Arc::new(MemoryQueryLog::new()),
/// )?;
/// let response = orchestrator.search("borrow checker", 10, 0, "relevance", &[]).await;
/// for item in &response.items {
///     println!("{:.2} {}", item.score, item.candidate.url);
/// }
/// # Ok(())
/// # }
/// ```
pub fn build_orchestrator(
    config: &SearchConfig,
    documents: Arc<dyn DocumentStore>,
    query_log: Arc<dyn QueryLogSink>,
) -> Result<QueryOrchestrator> {
    config.validate()?;

    let client = http::build_client(config)?;
    let backoff = Arc::new(BackoffTracker::new());
    let api = Arc::new(StackExchangeApi::new(
        client,
        &config.providers.stackoverflow,
        Arc::clone(&backoff),
    ));

    let providers: Vec<Arc<dyn ProviderClient>> =
        vec![Arc::new(StackOverflowProvider::new(Arc::clone(&api)))];
    let cache = ResponseCache::new(
        Arc::new(MokaCacheStore::new(config.cache.max_entries)),
        config.cache.ttl(),
    );
    let enrichment = EnrichmentPipeline::new(
        config.enrichment.clone(),
        api,
        backoff,
        Arc::clone(&documents),
    );

    Ok(QueryOrchestrator::new(
        providers, cache, documents, query_log, enrichment,
    ))
}
