//! Indexed, read-only corpus store for biograph.
//!
//! This crate covers the offline side of the system:
//! - [`build::build_index`] — sort a raw dump and emit the data file +
//!   byte-offset index pair
//! - [`CorpusStore`] — load that pair and answer exact-title lookups by
//!   binary search, with a bounded shallow-probe cache
//! - [`text::normalize`] — wikitext → plain text for the extractors
//!
//! The store is immutable after load and safe to share across tasks.

pub mod build;
pub mod store;
pub mod text;

pub use build::{BuildReport, build_index};
pub use store::{CorpusRecord, CorpusStore, TitleLookup};
