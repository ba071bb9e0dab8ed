//! Application configuration for biograph.
//!
//! User config lives at `~/.biograph/biograph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BiographError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "biograph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".biograph";

// ---------------------------------------------------------------------------
// Config structs (matching biograph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus store settings.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// External knowledge-base settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Destination-wiki publisher settings.
    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// `[corpus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the sorted line-delimited data file.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Path to the byte-offset index file.
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Capacity of the shallow-probe cache (0 disables it).
    #[serde(default = "default_probe_cache_capacity")]
    pub probe_cache_capacity: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            index_path: default_index_path(),
            probe_cache_capacity: default_probe_cache_capacity(),
        }
    }
}

fn default_data_path() -> String {
    "dump.dat".into()
}
fn default_index_path() -> String {
    "dump_offsets.json".into()
}
fn default_probe_cache_capacity() -> usize {
    1024
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Knowledge-base API endpoint.
    #[serde(default = "default_knowledge_endpoint")]
    pub endpoint: String,

    /// Maximum simultaneous external calls across the whole run.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Description language preference, first match wins.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_knowledge_endpoint(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            languages: default_languages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_knowledge_endpoint() -> String {
    "https://www.wikidata.org/w/api.php".into()
}
fn default_max_concurrent_fetches() -> usize {
    30
}
fn default_languages() -> Vec<String> {
    vec!["fr".into(), "en".into()]
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[publisher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Destination-wiki API endpoint.
    #[serde(default = "default_publisher_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the bot username (never the value itself).
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Name of the env var holding the bot password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Overwrite existing pages instead of create-only.
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_publisher_endpoint(),
            username_env: default_username_env(),
            password_env: default_password_env(),
            overwrite: false,
        }
    }
}

fn default_publisher_endpoint() -> String {
    "http://wikipast.epfl.ch/w/api.php".into()
}
fn default_username_env() -> String {
    "BIOGRAPH_WIKI_USER".into()
}
fn default_password_env() -> String {
    "BIOGRAPH_WIKI_PASSWORD".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.biograph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BiographError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.biograph/biograph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BiographError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BiographError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BiographError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BiographError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BiographError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the publisher credentials from the configured env vars.
pub fn publisher_credentials(config: &AppConfig) -> Result<(String, String)> {
    let read = |var_name: &str| match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BiographError::config(format!(
            "publisher credentials not found. Set the {var_name} environment variable."
        ))),
    };

    Ok((
        read(&config.publisher.username_env)?,
        read(&config.publisher.password_env)?,
    ))
}
