//! External knowledge-base access for biograph.
//!
//! Two layers:
//! - [`KnowledgeClient`] — bounded-concurrency HTTP client returning typed
//!   [`FetchOutcome`]s instead of raising on upstream conditions
//! - [`DescriptionCache`] — group-scoped memoization with in-flight
//!   coalescing, so one group never spends more than one call per identifier

pub mod cache;
pub mod fetcher;

pub use cache::DescriptionCache;
pub use fetcher::{DescriptionSource, FetchOutcome, KnowledgeClient};
