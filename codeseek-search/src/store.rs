//! Persistence contracts for documents and the query log.
//!
//! The pipeline treats both stores as best-effort collaborators: every
//! write failure is logged by the caller and never reaches the response.
//! In-memory implementations back the host binary and the tests.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Result, SearchError};
use crate::types::{Document, QueryLogRecord};

/// Url-keyed document persistence.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or fully replace the document stored under `document.url`.
    async fn upsert(&self, document: Document) -> Result<()>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Document>>;

    /// Most recently upserted document carrying `question_id`.
    async fn find_by_question_id(&self, question_id: u64) -> Result<Option<Document>>;

    async fn count(&self) -> Result<usize>;
}

/// Append-only sink for query log records.
#[async_trait]
pub trait QueryLogSink: Send + Sync {
    async fn append(&self, record: QueryLogRecord) -> Result<()>;
}

/// [`DocumentStore`] on a concurrent map, with a question id index.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, Document>,
    by_question: DashMap<u64, String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert(&self, document: Document) -> Result<()> {
        if document.url.trim().is_empty() {
            return Err(SearchError::Store("document url must not be empty".into()));
        }
        let url = document.url.clone();
        let question_id = document.question_id;
        let previous = self.documents.insert(url.clone(), document);

        if let Some(old_id) = previous.and_then(|doc| doc.question_id) {
            if Some(old_id) != question_id {
                self.by_question.remove_if(&old_id, |_, indexed| *indexed == url);
            }
        }
        if let Some(id) = question_id {
            self.by_question.insert(id, url);
        }
        Ok(())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Document>> {
        Ok(self.documents.get(url).map(|entry| entry.value().clone()))
    }

    async fn find_by_question_id(&self, question_id: u64) -> Result<Option<Document>> {
        let url = match self.by_question.get(&question_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        Ok(self
            .documents
            .get(&url)
            .map(|entry| entry.value().clone())
            .filter(|doc| doc.question_id == Some(question_id)))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.len())
    }
}

/// [`QueryLogSink`] that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryQueryLog {
    records: Mutex<Vec<QueryLogRecord>>,
}

impl MemoryQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record appended so far, oldest first.
    pub fn records(&self) -> Result<Vec<QueryLogRecord>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| SearchError::Store("query log lock poisoned".into()))
    }
}

#[async_trait]
impl QueryLogSink for MemoryQueryLog {
    async fn append(&self, record: QueryLogRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| SearchError::Store("query log lock poisoned".into()))?
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SortMode, SourceType};
    use chrono::Utc;

    fn make_document(url: &str, title: &str) -> Document {
        Document {
            url: url.to_string(),
            question_id: None,
            source: SourceType::Web,
            title: title.to_string(),
            normalized_text: title.to_lowercase(),
            tags: String::new(),
            metadata: serde_json::Value::Null,
            question_text: String::new(),
            best_answer_text: String::new(),
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_url() {
        let store = MemoryDocumentStore::new();
        store.upsert(make_document("https://a.com", "first")).await.expect("upsert");
        store.upsert(make_document("https://a.com", "second")).await.expect("upsert");
        store.upsert(make_document("https://b.com", "other")).await.expect("upsert");

        assert_eq!(store.count().await.expect("count"), 2);
        let found = store.find_by_url("https://a.com").await.expect("find");
        assert_eq!(found.map(|d| d.title), Some("second".to_string()));
    }

    #[tokio::test]
    async fn find_missing_is_none() {
        let store = MemoryDocumentStore::new();
        assert!(store.find_by_url("https://nope.com").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn find_by_question_id_follows_latest_upsert() {
        let store = MemoryDocumentStore::new();
        let mut doc = make_document("https://stackoverflow.com/questions/7/a", "first");
        doc.question_id = Some(7);
        store.upsert(doc.clone()).await.expect("upsert");
        store
            .upsert(make_document("https://b.com", "unrelated"))
            .await
            .expect("upsert");

        let found = store.find_by_question_id(7).await.expect("find");
        assert_eq!(found.map(|d| d.title), Some("first".to_string()));
        assert!(store.find_by_question_id(8).await.expect("find").is_none());

        doc.title = "enriched".into();
        store.upsert(doc.clone()).await.expect("upsert");
        let found = store.find_by_question_id(7).await.expect("find");
        assert_eq!(found.map(|d| d.title), Some("enriched".to_string()));
    }

    #[tokio::test]
    async fn question_index_drops_stale_ids() {
        let store = MemoryDocumentStore::new();
        let mut doc = make_document("https://stackoverflow.com/questions/7/a", "first");
        doc.question_id = Some(7);
        store.upsert(doc.clone()).await.expect("upsert");

        doc.question_id = None;
        store.upsert(doc).await.expect("upsert");

        assert!(store.find_by_question_id(7).await.expect("find").is_none());
        assert_eq!(store.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn blank_url_rejected() {
        let store = MemoryDocumentStore::new();
        let err = store.upsert(make_document(" ", "x")).await.unwrap_err();
        assert!(matches!(err, SearchError::Store(_)));
    }

    #[tokio::test]
    async fn query_log_appends_in_order() {
        let log = MemoryQueryLog::new();
        for (i, query) in ["rust", "tokio"].iter().enumerate() {
            log.append(QueryLogRecord {
                query: query.to_string(),
                sort: SortMode::Relevance,
                tags: vec![],
                limit: 10,
                offset: 0,
                result_count: i,
                cache_hit: i > 0,
                created_at: Utc::now(),
            })
            .await
            .expect("append");
        }
        let records = log.records().expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].query, "rust");
        assert!(records[1].cache_hit);
    }
}
