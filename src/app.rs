//! Application bootstrap.
//!
//! [`App`] builds every search component from an [`AppConfig`] and owns the
//! in-memory stores so analytics can be computed over them.

use std::sync::Arc;

use chrono::Utc;
use codeseek_search::{
    DocumentStore, MemoryDocumentStore, MemoryQueryLog, QueryOrchestrator, SearchResponse,
};

use crate::analytics::{AnalyticsSummary, summarize};
use crate::config::AppConfig;
use crate::documents::DocumentView;
use crate::error::Result;

/// A wired search application.
pub struct App {
    orchestrator: QueryOrchestrator,
    documents: Arc<MemoryDocumentStore>,
    query_log: Arc<MemoryQueryLog>,
}

impl App {
    /// Build the orchestrator and stores from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Search`] if the search configuration is invalid.
    pub fn bootstrap(config: &AppConfig) -> Result<Self> {
        let documents = Arc::new(MemoryDocumentStore::new());
        let query_log = Arc::new(MemoryQueryLog::new());
        let orchestrator = codeseek_search::build_orchestrator(
            &config.search,
            documents.clone(),
            query_log.clone(),
        )?;

        tracing::info!(
            enrichment = config.search.enrichment.enabled,
            authenticated = !config.search.providers.stackoverflow.api_key.is_empty(),
            "codeseek ready"
        );

        Ok(Self {
            orchestrator,
            documents,
            query_log,
        })
    }

    /// Run one search. See [`QueryOrchestrator::search`].
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: i64,
        sort: &str,
        tags: &[String],
    ) -> SearchResponse {
        self.orchestrator.search(query, limit, offset, sort, tags).await
    }

    /// Persisted document store, for lookups after enrichment.
    pub fn documents(&self) -> &Arc<MemoryDocumentStore> {
        &self.documents
    }

    /// Look up a stored document by its question id.
    ///
    /// Returns `None` until a search has surfaced the question. Deep
    /// question and answer text appears once enrichment has finished.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store cannot be read.
    pub async fn document(&self, question_id: u64) -> Result<Option<DocumentView>> {
        let document = self.documents.find_by_question_id(question_id).await?;
        Ok(document.map(DocumentView::from))
    }

    /// Summarize the query log and document store.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be read.
    pub async fn analytics(&self) -> Result<AnalyticsSummary> {
        let records = self.query_log.records()?;
        let total_documents = self.documents.count().await?;
        Ok(summarize(&records, total_documents, Utc::now()))
    }

    /// Wait for outstanding background enrichment to finish.
    pub async fn shutdown(&self) {
        let pending = self.orchestrator.enrichment().in_flight();
        if pending > 0 {
            tracing::debug!(pending, "waiting for enrichment tasks");
        }
        self.orchestrator.enrichment().wait_idle().await;
    }
}
