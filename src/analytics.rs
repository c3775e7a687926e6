//! Query-log analytics.
//!
//! Summarizes the records produced by the search pipeline: totals, recent
//! volume and the most frequent queries.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use codeseek_search::QueryLogRecord;
use serde::Serialize;

/// Number of entries in [`AnalyticsSummary::top_queries`].
pub const TOP_QUERY_LIMIT: usize = 10;

/// Snapshot of search activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub generated_at: DateTime<Utc>,
    pub total_queries: usize,
    pub queries_last_24_hours: usize,
    pub total_documents: usize,
    pub top_queries: Vec<TopQuery>,
}

/// A query text and how often it was searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopQuery {
    pub query: String,
    pub hits: usize,
}

/// Summarize `records` as of `now`.
///
/// Top queries are grouped by exact query text, ordered by hits
/// descending then query ascending.
pub fn summarize(
    records: &[QueryLogRecord],
    total_documents: usize,
    now: DateTime<Utc>,
) -> AnalyticsSummary {
    let since = now - Duration::hours(24);
    let queries_last_24_hours = records.iter().filter(|r| r.created_at > since).count();

    let mut hits: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *hits.entry(record.query.as_str()).or_default() += 1;
    }
    let mut top_queries: Vec<TopQuery> = hits
        .into_iter()
        .map(|(query, hits)| TopQuery {
            query: query.to_owned(),
            hits,
        })
        .collect();
    top_queries.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.query.cmp(&b.query)));
    top_queries.truncate(TOP_QUERY_LIMIT);

    AnalyticsSummary {
        generated_at: now,
        total_queries: records.len(),
        queries_last_24_hours,
        total_documents,
        top_queries,
    }
}
