use crate::models::Play;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Save any serializable value to a JSON cache file, creating its directory
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, cache_file: impl AsRef<Path>) -> Result<()> {
    let cache_file = cache_file.as_ref();
    if let Some(dir) = cache_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    std::fs::write(cache_file, json)
        .with_context(|| format!("Failed to write cache file {}", cache_file.display()))?;
    Ok(())
}

/// Load a value from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: impl AsRef<Path>) -> Result<T> {
    let cache_file = cache_file.as_ref();
    let json = std::fs::read_to_string(cache_file)
        .with_context(|| format!("Failed to read cache file {}", cache_file.display()))?;
    serde_json::from_str(&json).context("Failed to deserialize cache data")
}

/// Save the highlighted plays to CSV
pub fn save_top_plays_to_csv(plays: &[Play], filename: impl AsRef<Path>) -> Result<()> {
    let filename = filename.as_ref();
    let mut writer = csv::Writer::from_path(filename)
        .with_context(|| format!("Failed to create CSV file {}", filename.display()))?;

    writer.write_record([
        "Matchup",
        "Market",
        "Pick",
        "Confidence (%)",
        "Odds",
        "Implied Probability (%)",
        "Edge (%)",
    ])?;

    for play in plays {
        writer.write_record([
            play.matchup.clone(),
            play.market.to_string(),
            play.pick.clone(),
            format!("{:.1}", play.confidence),
            play.odds.map(|o| format!("{:+}", o)).unwrap_or_default(),
            play.implied_prob.map(|p| format!("{:.1}", p)).unwrap_or_default(),
            play.edge.map(|e| format!("{:.1}", e)).unwrap_or_default(),
        ])?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}
