use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::NetworkError,
    model::{FetchOutcome, FetchResult},
    provider::DataSource,
    store::CacheSlot,
};

/// Prefix of the banner shown when a cached payload stands in for a failed fetch.
pub const CACHED_PREFIX: &str = "using cached data: ";

/// Fetches the primary resource and mirrors every fresh payload into the cache slot.
#[derive(Debug, Clone)]
pub struct PrimaryFetcher {
    source: Arc<dyn DataSource>,
    cache: CacheSlot,
}

impl PrimaryFetcher {
    pub fn new(source: Arc<dyn DataSource>, cache: CacheSlot) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &CacheSlot {
        &self.cache
    }

    /// One live request. A cache write failure is logged and does not fail the fetch.
    pub async fn fetch(&self) -> Result<FetchResult, NetworkError> {
        let payload = self.source.fetch_payload().await?;

        if let Err(e) = self.cache.write(&payload) {
            tracing::warn!(key = %self.cache.key(), "Failed to persist fetched payload: {}", e);
        }

        Ok(FetchResult::fresh(payload, Utc::now()))
    }

    /// `fetch` plus the failure policy: fall back to the cache slot when it holds a payload.
    pub async fn fetch_or_cached(&self) -> FetchOutcome {
        let cause = match self.fetch().await {
            Ok(result) => return FetchOutcome::Fresh(result),
            Err(e) => e.to_string(),
        };

        match self.cache.read() {
            Some(payload) => {
                tracing::warn!("Primary fetch failed, serving cached payload: {}", cause);
                FetchOutcome::Cached {
                    result: FetchResult::cached(payload, Utc::now()),
                    cause,
                }
            }
            None => {
                tracing::warn!("Primary fetch failed with nothing cached: {}", cause);
                FetchOutcome::Failed { cause }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::HelloPayload, store::MemoryStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Serves queued results in order.
    #[derive(Debug, Default)]
    struct ScriptedSource {
        script: Mutex<Vec<Result<HelloPayload, u16>>>,
    }

    impl ScriptedSource {
        fn new(mut script: Vec<Result<HelloPayload, u16>>) -> Self {
            script.reverse();
            Self { script: Mutex::new(script) }
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn fetch_payload(&self) -> Result<HelloPayload, NetworkError> {
            match self.script.lock().pop() {
                Some(Ok(payload)) => Ok(payload),
                Some(Err(status)) => Err(NetworkError::Status { status, body: String::new() }),
                None => Err(NetworkError::Status { status: 503, body: String::new() }),
            }
        }
    }

    fn payload(message: &str) -> HelloPayload {
        HelloPayload {
            message: message.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            environment: Some("test".to_string()),
        }
    }

    fn fetcher(script: Vec<Result<HelloPayload, u16>>) -> PrimaryFetcher {
        let cache = CacheSlot::new(Arc::new(MemoryStore::new()), "slot");
        PrimaryFetcher::new(Arc::new(ScriptedSource::new(script)), cache)
    }

    #[tokio::test]
    async fn success_overwrites_cache() {
        let fetcher = fetcher(vec![Ok(payload("one")), Ok(payload("two"))]);

        fetcher.fetch().await.unwrap();
        let second = fetcher.fetch().await.unwrap();

        assert!(!second.is_stale);
        assert_eq!(fetcher.cache().read(), Some(payload("two")));
    }

    #[tokio::test]
    async fn failure_after_success_serves_last_payload_as_stale() {
        let fetcher = fetcher(vec![Ok(payload("good")), Err(500)]);

        assert!(matches!(fetcher.fetch_or_cached().await, FetchOutcome::Fresh(_)));

        match fetcher.fetch_or_cached().await {
            FetchOutcome::Cached { result, cause } => {
                assert!(result.is_stale);
                assert_eq!(result.payload, payload("good"));
                assert!(cause.contains("500"));
            }
            other => panic!("expected cached outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_without_cache_has_no_payload() {
        let fetcher = fetcher(vec![Err(502)]);

        match fetcher.fetch_or_cached().await {
            FetchOutcome::Failed { cause } => assert!(cause.contains("502")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(fetcher.cache().read(), None);
    }

    #[tokio::test]
    async fn failures_never_clear_the_cache() {
        let fetcher = fetcher(vec![Ok(payload("keep")), Err(500), Err(500)]);

        fetcher.fetch_or_cached().await;
        fetcher.fetch_or_cached().await;
        fetcher.fetch_or_cached().await;

        assert_eq!(fetcher.cache().read(), Some(payload("keep")));
    }
}
