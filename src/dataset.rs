//! Episode dataset loaded at startup for the guest selector.

use crate::error::{PodqueryError, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// One podcast episode record.
#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    pub guest: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub episode_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Load a JSON array of episode records.
pub fn load_episodes(path: &Path) -> Result<Vec<Episode>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PodqueryError::Dataset(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let episodes: Vec<Episode> = serde_json::from_str(&content).map_err(|e| {
        PodqueryError::Dataset(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    info!("Loaded {} episodes from {}", episodes.len(), path.display());
    Ok(episodes)
}

/// Distinct guest names in sorted order.
pub fn guest_list(episodes: &[Episode]) -> Vec<String> {
    episodes
        .iter()
        .map(|e| e.guest.trim())
        .filter(|g| !g.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Load the dataset at `path` and return its guest list.
pub fn load_guest_list(path: &Path) -> Result<Vec<String>> {
    Ok(guest_list(&load_episodes(path)?))
}
