//! Saved listings of accepted groups.
//!
//! A run's accepted groups can be written to a JSON file and re-published
//! later without recomputing the enrichment — useful when a publish phase
//! fails after the expensive work already succeeded.

use std::path::Path;

use tracing::info;

use biograph_shared::{BiographError, HomonymGroup, Result};

/// Write accepted groups to `path` as pretty-printed JSON.
pub fn save_listing(path: &Path, groups: &[HomonymGroup]) -> Result<()> {
    let json = serde_json::to_string_pretty(groups)
        .map_err(|e| BiographError::parse(format!("unserializable listing: {e}")))?;
    std::fs::write(path, json).map_err(|e| BiographError::io(path, e))?;

    info!(groups = groups.len(), path = %path.display(), "listing saved");
    Ok(())
}

/// Load a previously saved listing.
pub fn load_listing(path: &Path) -> Result<Vec<HomonymGroup>> {
    let content = std::fs::read_to_string(path).map_err(|e| BiographError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| BiographError::parse(format!("invalid listing {}: {e}", path.display())))
}
