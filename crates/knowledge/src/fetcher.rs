//! Rate-limited client for the external knowledge base.
//!
//! All calls funnel through one shared [`Semaphore`]: at most
//! `max_concurrent_fetches` requests are in flight at any moment, and excess
//! callers queue on the permit rather than failing. Upstream conditions come
//! back as [`FetchOutcome`] values — a throttled or failed call degrades the
//! description to absent at the call site, it never aborts a resolution.
//!
//! This layer performs no retry or backoff. Callers own retry policy; keeping
//! the client single-shot keeps the shared rate budget predictable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use biograph_shared::config::KnowledgeConfig;
use biograph_shared::{BiographError, Result};

/// User-Agent string for knowledge-base requests.
const USER_AGENT: &str = concat!("biograph/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FetchOutcome
// ---------------------------------------------------------------------------

/// Typed result of one knowledge-base call.
///
/// `Throttled` is distinct from `NotFound` and from `ServiceError` so callers
/// can tell a rate-limited call from an absent entity from a broken upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A description in the best-matching preferred language.
    Found(String),
    /// The entity does not exist, or carries no description in any
    /// preferred language.
    NotFound,
    /// The upstream rejected the call due to rate limiting.
    Throttled,
    /// Upstream failure: server error, transport error, malformed response.
    ServiceError(String),
}

// ---------------------------------------------------------------------------
// DescriptionSource
// ---------------------------------------------------------------------------

/// The capability the enrichment pipeline needs from the knowledge base:
/// given an external identifier, produce a short description.
#[async_trait]
pub trait DescriptionSource: Send + Sync {
    /// Look up `id` and return its description outcome.
    async fn describe(&self, id: &str) -> FetchOutcome;
}

// ---------------------------------------------------------------------------
// KnowledgeClient
// ---------------------------------------------------------------------------

/// HTTP client for a `wbgetentities`-style knowledge-base endpoint.
#[derive(Debug)]
pub struct KnowledgeClient {
    client: Client,
    endpoint: Url,
    languages: Vec<String>,
    permits: Arc<Semaphore>,
}

impl KnowledgeClient {
    /// Build a client from the `[knowledge]` config section.
    ///
    /// The connection pool and the permit counter are owned by the returned
    /// value; dropping it releases both on every exit path.
    pub fn new(config: &KnowledgeConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            BiographError::config(format!("invalid knowledge endpoint {:?}: {e}", config.endpoint))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BiographError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            languages: config.languages.clone(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
        })
    }

    /// Permits currently free (equals the configured bound when idle).
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Perform the actual entity fetch. Holds one permit for the full
    /// request/response cycle.
    async fn fetch_entity(&self, id: &str) -> FetchOutcome {
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("fetch semaphore closed");

        debug!(id, "fetching entity description");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("action", "wbgetentities"),
                ("ids", id),
                ("props", "descriptions"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return FetchOutcome::ServiceError(format!("{id}: {e}")),
        };

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(id, "knowledge base throttled the call");
                return FetchOutcome::Throttled;
            }
            status if status.is_server_error() => {
                return FetchOutcome::ServiceError(format!("{id}: HTTP {status}"));
            }
            status if !status.is_success() => {
                return FetchOutcome::ServiceError(format!("{id}: HTTP {status}"));
            }
            _ => {}
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return FetchOutcome::ServiceError(format!("{id}: malformed response: {e}")),
        };

        self.pick_description(id, &body)
    }

    /// Extract the first description matching the language preference order.
    /// A missing entity or an empty description map is `NotFound`.
    fn pick_description(&self, id: &str, body: &serde_json::Value) -> FetchOutcome {
        let entity = &body["entities"][id];

        if entity.is_null() || entity.get("missing").is_some() {
            return FetchOutcome::NotFound;
        }

        let descriptions = &entity["descriptions"];
        for lang in &self.languages {
            if let Some(value) = descriptions[lang.as_str()]["value"].as_str() {
                return FetchOutcome::Found(value.to_string());
            }
        }

        FetchOutcome::NotFound
    }
}

#[async_trait]
impl DescriptionSource for KnowledgeClient {
    async fn describe(&self, id: &str) -> FetchOutcome {
        self.fetch_entity(id).await
    }
}
