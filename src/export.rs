use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

/// Dump any report shape (batch summary, single player report, rankings) to
/// pretty JSON for inspection or downstream tooling.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("serialize report")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}
