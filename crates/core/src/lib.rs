//! Enrichment pipeline and domain logic for biograph.
//!
//! This crate ties the corpus store and the knowledge layer together:
//! - [`extract`] — pluggable signal-extraction strategies and reducers
//! - [`resolver`] — name → person resolution and per-group orchestration,
//!   including the last-name short-circuit
//! - [`assembler`] — group acceptance and disambiguation-page rendering
//! - [`pipeline`] — the concurrent cross-group run driver

pub mod assembler;
pub mod extract;
pub mod pipeline;
pub mod resolver;

pub use extract::{ExtractionProfile, PatternExtractor, Reducer, SignalExtractor};
pub use pipeline::{ProgressReporter, RunOutcome, RunSummary, SilentProgress, run_groups};
pub use resolver::Resolver;
