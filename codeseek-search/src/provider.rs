//! Trait definition for pluggable search providers.
//!
//! Each upstream source (Stack Overflow, ...) implements [`ProviderClient`]
//! to provide a uniform, infallible interface for fetching one page of
//! candidates.

use async_trait::async_trait;

use crate::types::{ProviderPage, SortMode};

/// A pluggable search provider.
///
/// Implementors talk to one external source and map its results into
/// [`crate::types::Candidate`] values. Each provider handles its own:
///
/// - Request construction, including sort and tag parameter mapping
/// - Checking the shared [`crate::backoff::BackoffTracker`] before any call
///   and forwarding throttle hints found in responses
/// - Bounding its own latency (the orchestrator applies no timeout)
///
/// `search` never fails: every internal fault collapses to
/// [`ProviderPage::empty`]. All implementations must be `Send + Sync` so
/// the orchestrator can fan out across them concurrently.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch one page of candidates.
    ///
    /// `limit` is the page size to request, `offset` the number of results
    /// to skip, `tags` the normalized tag filter.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        offset: usize,
        sort: SortMode,
        tags: &[String],
    ) -> ProviderPage;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candidate, SourceType};

    /// A provider that replays a fixed page.
    struct FixedProvider {
        page: ProviderPage,
    }

    #[async_trait]
    impl ProviderClient for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn search(
            &self,
            _query: &str,
            limit: usize,
            _offset: usize,
            _sort: SortMode,
            _tags: &[String],
        ) -> ProviderPage {
            let mut page = self.page.clone();
            page.items.truncate(limit);
            page
        }
    }

    fn make_candidate(url: &str) -> Candidate {
        Candidate {
            question_id: None,
            url: url.to_string(),
            title: "Title".into(),
            snippet: "Snippet".into(),
            source: SourceType::Web,
            popularity: 0,
            answered: false,
            accepted_answer_id: None,
            quality: 0.0,
            published_at: None,
            tags: vec![],
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn provider_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ProviderClient>();
    }

    #[tokio::test]
    async fn dyn_provider_returns_page() {
        let provider: Box<dyn ProviderClient> = Box::new(FixedProvider {
            page: ProviderPage {
                items: vec![make_candidate("https://a.com"), make_candidate("https://b.com")],
                has_more: true,
            },
        });

        let page = provider.search("q", 1, 0, SortMode::Relevance, &[]).await;
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
        assert_eq!(provider.name(), "fixed");
    }

    #[test]
    fn empty_page_has_no_more() {
        let page = ProviderPage::empty();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }
}
