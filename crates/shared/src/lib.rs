//! Shared types, error model, and configuration for biograph.
//!
//! This crate is the foundation depended on by all other biograph crates.
//! It provides:
//! - [`BiographError`] — the unified error type
//! - Domain types ([`Person`], [`HomonymGroup`], [`NameGroup`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CorpusConfig, KnowledgeConfig, PublisherConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, publisher_credentials,
};
pub use error::{BiographError, Result};
pub use types::{HomonymGroup, NameGroup, Person};
