//! Case number lists for lookup mode.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

const HEADER: &str = "case_id";

/// Read case numbers from the first column of a CSV or plain text file.
///
/// A `case_id` header, blank lines and repeated numbers are skipped. Extra
/// columns are ignored, so a previous run's output file can be fed back in.
pub fn read_case_ids(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open case id list {:?}", path))?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Line {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };

        let Some(id) = record.get(0).map(str::trim) else { continue };
        if id.is_empty() || id.eq_ignore_ascii_case(HEADER) {
            continue;
        }
        if !seen.insert(id.to_string()) {
            debug!("Case {} listed twice in {:?}", id, path);
            continue;
        }
        ids.push(id.to_string());
    }

    info!("{} case numbers read from {:?}", ids.len(), path);
    Ok(ids)
}
