//! Host view of stored documents.
//!
//! Stored documents keep their tags as one joined column. The view splits
//! them back into a list for display.

use chrono::{DateTime, Utc};
use codeseek_search::{Document, SourceType};
use serde::Serialize;

/// A stored document with its tags as a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub url: String,
    pub question_id: Option<u64>,
    pub source: SourceType,
    pub title: String,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub question_text: String,
    pub best_answer_text: String,
    pub fetched_at: DateTime<Utc>,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self {
            tags: document.tag_list(),
            url: document.url,
            question_id: document.question_id,
            source: document.source,
            title: document.title,
            metadata: document.metadata,
            question_text: document.question_text,
            best_answer_text: document.best_answer_text,
            fetched_at: document.fetched_at,
        }
    }
}
