//! Per-group memoizing layer in front of the knowledge-base client.
//!
//! Scope: one [`DescriptionCache`] lives exactly as long as one name-group's
//! processing and is never shared across groups. Within that scope, at most
//! one underlying fetch happens per identifier — concurrent callers for the
//! same id coalesce on a [`OnceCell`] and wait for the first caller's result.
//! Negative outcomes (not found, throttled, upstream failure) are cached too,
//! so a failing id is not retried for the remainder of the group.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::fetcher::{DescriptionSource, FetchOutcome};

/// Group-scoped description cache with in-flight coalescing.
#[derive(Default)]
pub struct DescriptionCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Option<String>>>>>,
}

impl DescriptionCache {
    /// Create an empty cache for one group's scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the description for `id`, fetching it through `source` at most
    /// once per cache lifetime.
    ///
    /// The map lock is held only to find or insert the id's cell; the fetch
    /// itself runs outside it, so distinct ids resolve concurrently while
    /// same-id callers wait on one shared initialization.
    pub async fn get_or_fetch(&self, id: &str, source: &dyn DescriptionSource) -> Option<String> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(id.to_string()).or_default())
        };

        cell.get_or_init(|| async {
            match source.describe(id).await {
                FetchOutcome::Found(description) => Some(description),
                outcome => {
                    debug!(id, ?outcome, "no description; caching negative result");
                    None
                }
            }
        })
        .await
        .clone()
    }

    /// Number of distinct ids this cache has seen.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache has seen no ids yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    /// Test double counting underlying fetches.
    struct CountingSource {
        calls: AtomicUsize,
        outcome: FetchOutcome,
        delay: Duration,
    }

    impl CountingSource {
        fn new(outcome: FetchOutcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
                delay: Duration::ZERO,
            }
        }

        fn slow(outcome: FetchOutcome, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DescriptionSource for CountingSource {
        async fn describe(&self, _id: &str) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn repeated_lookups_fetch_once() {
        let cache = DescriptionCache::new();
        let source = CountingSource::new(FetchOutcome::Found("écrivain".into()));

        assert_eq!(
            cache.get_or_fetch("Q42", &source).await.as_deref(),
            Some("écrivain")
        );
        assert_eq!(
            cache.get_or_fetch("Q42", &source).await.as_deref(),
            Some("écrivain")
        );
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_same_id_callers_coalesce() {
        let cache = Arc::new(DescriptionCache::new());
        let source = Arc::new(CountingSource::slow(
            FetchOutcome::Found("peintre".into()),
            Duration::from_millis(50),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            handles.push(tokio::spawn(async move {
                cache.get_or_fetch("Q7", source.as_ref()).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Some("peintre"));
        }
        assert_eq!(source.calls(), 1, "same-id callers must share one fetch");
    }

    #[tokio::test]
    async fn negative_outcomes_are_cached() {
        for outcome in [
            FetchOutcome::NotFound,
            FetchOutcome::Throttled,
            FetchOutcome::ServiceError("boom".into()),
        ] {
            let cache = DescriptionCache::new();
            let failing = CountingSource::new(outcome);
            assert!(cache.get_or_fetch("Q13", &failing).await.is_none());
            assert_eq!(failing.calls(), 1);

            // Later callers reuse the negative entry for the rest of the
            // scope, even against a now-healthy source.
            let healthy = CountingSource::new(FetchOutcome::Found("maire".into()));
            assert!(cache.get_or_fetch("Q13", &healthy).await.is_none());
            assert_eq!(healthy.calls(), 0);
            assert_eq!(cache.len().await, 1);
        }
    }

    #[tokio::test]
    async fn distinct_ids_fetch_independently() {
        let cache = DescriptionCache::new();
        let source = CountingSource::new(FetchOutcome::Found("historien".into()));

        cache.get_or_fetch("Q1", &source).await;
        cache.get_or_fetch("Q2", &source).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.len().await, 2);
    }
}
