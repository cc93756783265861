use crate::models::{CaseRow, EvictionCase};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ── Paths ─────────────────────────────────────────────────────────────────────

/// `cases.csv` → `cases.csv.failed.txt`
pub fn sidecar_path(output: &Path, suffix: &str) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    Ok(())
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// `header` is only written by hand for an empty file; otherwise serde
/// derives it from the first record.
fn write_records<T: Serialize>(path: &Path, header: &[&str], records: &[T]) -> Result<usize> {
    create_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create {:?}", path))?;

    if records.is_empty() {
        writer
            .write_record(header)
            .with_context(|| format!("write header to {:?}", path))?;
    }

    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("write row to {:?}", path))?;
    }
    writer.flush().with_context(|| format!("flush {:?}", path))?;
    Ok(records.len())
}

/// Normalized cases, one row each, header included. Empty fields are nulls.
pub fn write_cases(path: &Path, cases: &[EvictionCase]) -> Result<usize> {
    let n = write_records(path, &EvictionCase::COLUMNS, cases)?;
    info!("{} cases written to {:?}", n, path);
    Ok(n)
}

/// Rows exactly as scraped, for when normalization refuses them.
pub fn write_raw_rows(path: &Path, rows: &[CaseRow]) -> Result<usize> {
    let n = write_records(path, &CaseRow::COLUMNS, rows)?;
    info!("{} raw rows written to {:?}", n, path);
    Ok(n)
}

/// One case number per line; the format `lookup --ids-file` reads.
pub fn write_case_ids(path: &Path, ids: &[String]) -> Result<usize> {
    create_parent(path)?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {:?}", path))?;
    for id in ids {
        writeln!(file, "{}", id).with_context(|| format!("write {:?}", path))?;
    }
    info!("{} case numbers written to {:?}", ids.len(), path);
    Ok(ids.len())
}
