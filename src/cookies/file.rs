//! JSON cookie files.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::StoredCookie;

/// Writes `cookies` to `path` as a JSON array, replacing any existing file.
#[tracing::instrument(skip(cookies))]
pub fn save_cookies(path: &Path, cookies: &[StoredCookie]) -> Result<()> {
    let data = serde_json::to_vec_pretty(cookies).context("Failed to serialize cookies")?;
    fs::write(path, data)
        .with_context(|| format!("Failed to write cookie file {}", path.display()))?;
    Ok(())
}

/// Reads every cookie record from `path`. Fails on the first malformed record.
#[tracing::instrument]
pub fn load_cookies(path: &Path) -> Result<Vec<StoredCookie>> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read cookie file {}", path.display()))?;
    serde_json::from_slice(&data)
        .with_context(|| format!("Failed to parse cookie file {}", path.display()))
}
