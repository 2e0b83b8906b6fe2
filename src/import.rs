//! `vlk import`: load a local workbook into the cache.
//!
//! The file is decoded with the same reader as the spreadsheet source and
//! written to the cache as a regular entry, so later sessions render it with
//! provenance `cache` until a remote refresh replaces it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use vehicle_lookup_core::cache::{CacheStore, SaveOutcome};

use crate::spreadsheet;

/// Import `path` into `cache`, returning the number of records stored.
pub async fn import_file(cache: &CacheStore, path: &Path) -> Result<usize> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read spreadsheet: {}", path.display()))?;
    let records = spreadsheet::read_records(&bytes)
        .with_context(|| format!("Failed to decode spreadsheet: {}", path.display()))?;
    if records.is_empty() {
        bail!("{} is empty", path.display());
    }

    match cache.save(&records).await {
        SaveOutcome::Saved => {
            info!(count = records.len(), path = %path.display(), "imported spreadsheet");
            Ok(records.len())
        }
        SaveOutcome::Failed(reason) => bail!("Could not store imported data: {}", reason),
    }
}
