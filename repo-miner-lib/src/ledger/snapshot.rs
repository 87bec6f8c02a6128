use super::LOG_TARGET;
use crate::Result;
use crate::hosting::RepositoryDescriptor;
use crate::retrieval::PermanentFailure;
use ohno::IntoAppError;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CatalogEntry<'a> {
    name: &'a str,
    stargazers_count: u64,
    forks_count: u64,
    clone_url: &'a str,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
    name: &'a str,
    clone_url: &'a str,
    attempts: u32,
    error: String,
}

/// Overwrite `path` with the fetched catalog, in catalog order.
pub fn write_catalog_snapshot(path: &Path, descriptors: &[RepositoryDescriptor]) -> Result<()> {
    write_table(
        path,
        &["name", "stargazers_count", "forks_count", "clone_url"],
        descriptors.iter().map(|d| CatalogEntry {
            name: &d.name,
            stargazers_count: d.stargazers_count,
            forks_count: d.forks_count,
            clone_url: d.clone_url.as_str(),
        }),
    )?;

    log::info!(target: LOG_TARGET, "Wrote {} catalog entries to '{}'", descriptors.len(), path.display());
    Ok(())
}

/// Overwrite `path` with this run's permanent retrieval failures.
///
/// An empty failure list still produces a header-only file, so a stale table
/// from a previous run never lingers.
pub fn write_failures(path: &Path, failures: &[PermanentFailure]) -> Result<()> {
    write_table(
        path,
        &["name", "clone_url", "attempts", "error"],
        failures.iter().map(|f| FailureEntry {
            name: &f.descriptor.name,
            clone_url: f.descriptor.clone_url.as_str(),
            attempts: f.attempts,
            error: f.error.to_string(),
        }),
    )?;

    if !failures.is_empty() {
        log::warn!(
            target: LOG_TARGET,
            "Recorded {} repositories that could not be retrieved in '{}'",
            failures.len(),
            path.display()
        );
    }
    Ok(())
}

fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: impl Iterator<Item = T>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .into_app_err_with(|| format!("creating '{}'", path.display()))?;

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush().into_app_err_with(|| format!("writing '{}'", path.display()))?;
    Ok(())
}
