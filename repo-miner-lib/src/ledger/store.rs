use super::LOG_TARGET;
use super::ledger_lock::{LedgerLockGuard, acquire_ledger_lock};
use super::result_row::ResultRow;
use crate::Result;
use crate::analysis::ClassMetric;
use chrono::{DateTime, Utc};
use ohno::{IntoAppError, bail};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// The append-only table of per-repository results.
///
/// The ledger is also the resume index: a repository whose name appears in the
/// first column of any row is considered processed and is never analyzed again.
/// Each row reaches the file through a single write followed by a sync, so a
/// crash leaves at most one torn trailing line, which the next open discards.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    file: File,
    header: Vec<String>,
    tracked: Vec<ClassMetric>,
    names: HashSet<String>,
    has_header: bool,
    _lock: LedgerLockGuard,
}

impl Ledger {
    /// Open or create the ledger at `path` for the given tracked metrics.
    ///
    /// Fails if the destination cannot be written, or if an existing ledger was
    /// produced with a different column set.
    pub async fn open(path: impl AsRef<Path>, tracked: &[ClassMetric]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .into_app_err_with(|| format!("creating ledger directory '{}'", parent.display()))?;
        }

        let lock = acquire_ledger_lock(&path).await?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .into_app_err_with(|| format!("opening ledger '{}' for appending", path.display()))?;

        let mut contents = Vec::new();
        let _ = file
            .read_to_end(&mut contents)
            .into_app_err_with(|| format!("reading ledger '{}'", path.display()))?;

        if !contents.is_empty() && !contents.ends_with(b"\n") {
            let keep = contents.iter().rposition(|&b| b == b'\n').map_or(0, |pos| pos + 1);
            log::warn!(
                target: LOG_TARGET,
                "Discarding incomplete trailing row ({} bytes) in ledger '{}'",
                contents.len() - keep,
                path.display()
            );
            file.set_len(keep as u64)
                .into_app_err_with(|| format!("truncating torn row in ledger '{}'", path.display()))?;
            file.sync_data()
                .into_app_err_with(|| format!("syncing ledger '{}'", path.display()))?;
            contents.truncate(keep);
        }

        let header = ResultRow::header(tracked);
        let (has_header, names) = read_existing(&path, &contents, &header)?;

        if has_header {
            log::info!(
                target: LOG_TARGET,
                "Ledger '{}' already records {} repositories",
                path.display(),
                names.len()
            );
        } else {
            log::debug!(target: LOG_TARGET, "Starting a new ledger at '{}'", path.display());
        }

        Ok(Self {
            path,
            file,
            header,
            tracked: tracked.to_vec(),
            names,
            has_header,
            _lock: lock,
        })
    }

    /// Whether a row for `name` is already present.
    #[must_use]
    pub fn is_processed(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of distinct repositories recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Durably append one row.
    ///
    /// The header is written first when the ledger is empty. The row is
    /// serialized in memory and handed to the file in a single write, then
    /// synced before returning, so it survives a crash right after.
    pub fn append_result(&mut self, row: &ResultRow) -> Result<()> {
        if self.is_processed(&row.name) {
            bail!("repository '{}' is already recorded in ledger '{}'", row.name, self.path.display());
        }

        if row.tracked() != self.tracked {
            bail!(
                "row for '{}' carries metrics {:?} but ledger '{}' tracks {:?}",
                row.name,
                row.tracked(),
                self.path.display(),
                self.tracked
            );
        }

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        if !self.has_header {
            writer.write_record(&self.header)?;
        }
        writer.write_record(row.fields())?;
        let buffer = writer.into_inner().map_err(csv::IntoInnerError::into_error)?;

        self.file
            .write_all(&buffer)
            .into_app_err_with(|| format!("appending to ledger '{}'", self.path.display()))?;
        self.file
            .sync_data()
            .into_app_err_with(|| format!("syncing ledger '{}'", self.path.display()))?;

        self.has_header = true;
        let _ = self.names.insert(row.name.clone());

        log::debug!(target: LOG_TARGET, "Recorded '{}' in ledger", row.name);
        Ok(())
    }
}

fn read_existing(path: &Path, contents: &[u8], expected: &[String]) -> Result<(bool, HashSet<String>)> {
    let mut names = HashSet::new();
    if contents.is_empty() {
        return Ok((false, names));
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(contents);

    let found: Vec<String> = reader
        .headers()
        .into_app_err_with(|| format!("reading header of ledger '{}'", path.display()))?
        .iter()
        .map(String::from)
        .collect();

    if found != expected {
        bail!(
            "ledger '{}' has columns [{}] but the current configuration produces [{}]; use a different ledger path or start over with --no-resume",
            path.display(),
            found.join(","),
            expected.join(",")
        );
    }

    let mut duplicates = 0;
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Skipping unreadable ledger row {}: {e}", index + 2);
                continue;
            }
        };

        if record.len() != expected.len() {
            log::warn!(
                target: LOG_TARGET,
                "Ledger row {} has {} fields instead of {}",
                index + 2,
                record.len(),
                expected.len()
            );
        }

        match record.get(0) {
            Some(name) if !name.is_empty() => {
                if !names.insert(name.to_string()) {
                    duplicates += 1;
                }
            }
            _ => log::warn!(target: LOG_TARGET, "Ledger row {} has no repository name", index + 2),
        }
    }

    if duplicates > 0 {
        log::warn!(target: LOG_TARGET, "Ledger '{}' contains {duplicates} duplicate rows", path.display());
    }

    Ok((true, names))
}

/// Move an existing ledger out of the way so a run can start from scratch.
///
/// Returns the backup path, or `None` if there was nothing to move.
pub fn archive_ledger(path: &Path, now: DateTime<Utc>) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(format!(".{}.bak", now.format("%Y%m%dT%H%M%SZ")));
    let backup = path.with_file_name(name);

    std::fs::rename(path, &backup)
        .into_app_err_with(|| format!("moving ledger '{}' to '{}'", path.display(), backup.display()))?;

    log::info!(target: LOG_TARGET, "Moved previous ledger to '{}'", backup.display());
    Ok(Some(backup))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::stats::{AggregateMetrics, MetricSummary, summarize};

    const TRACKED: &[ClassMetric] = &[ClassMetric::Cbo, ClassMetric::Dit];

    fn row(name: &str) -> ResultRow {
        ResultRow {
            name: name.to_string(),
            stargazers_count: 10,
            releases_count: 2,
            age_years: 3,
            metrics: AggregateMetrics {
                class_count: 3,
                total_loc: Some(120),
                metrics: vec![
                    MetricSummary {
                        metric: ClassMetric::Cbo,
                        summary: summarize(&[1.0, 2.0, 3.0]),
                    },
                    MetricSummary {
                        metric: ClassMetric::Dit,
                        summary: None,
                    },
                ],
            },
            analyzed_at: "2024-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_new_ledger_gets_header_and_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.csv");

        let mut ledger = Ledger::open(&path, TRACKED).await.unwrap();
        assert!(ledger.is_empty());
        ledger.append_result(&row("alpha")).unwrap();
        ledger.append_result(&row("beta")).unwrap();
        assert!(ledger.is_processed("alpha"));
        assert!(!ledger.is_processed("gamma"));
        assert_eq!(ledger.len(), 2);
        drop(ledger);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "name,stargazers_count,loc,releases_count,age_years,cbo_mean,cbo_median,cbo_stddev,dit_mean,dit_median,dit_stddev,class_count,analyzed_at"
        );
        assert!(lines[1].starts_with("alpha,10,120,2,3,2.00,2,"));
        assert!(lines[1].ends_with(",,,,3,2024-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_reopen_resumes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.csv");

        let mut ledger = Ledger::open(&path, TRACKED).await.unwrap();
        ledger.append_result(&row("alpha")).unwrap();
        drop(ledger);

        let mut ledger = Ledger::open(&path, TRACKED).await.unwrap();
        assert!(ledger.is_processed("alpha"));
        ledger.append_result(&row("beta")).unwrap();
        drop(ledger);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with("name,")).count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_append_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(temp_dir.path().join("results.csv"), TRACKED).await.unwrap();
        ledger.append_result(&row("alpha")).unwrap();
        let _ = ledger.append_result(&row("alpha")).unwrap_err();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_mismatched_row_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(temp_dir.path().join("results.csv"), &[ClassMetric::Lcom])
            .await
            .unwrap();
        let _ = ledger.append_result(&row("alpha")).unwrap_err();
        assert!(!ledger.is_processed("alpha"));
    }

    #[tokio::test]
    async fn test_torn_trailing_row_is_discarded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.csv");

        let mut ledger = Ledger::open(&path, TRACKED).await.unwrap();
        ledger.append_result(&row("alpha")).unwrap();
        drop(ledger);

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"beta,10,12").unwrap();
        drop(file);

        let mut ledger = Ledger::open(&path, TRACKED).await.unwrap();
        assert!(ledger.is_processed("alpha"));
        assert!(!ledger.is_processed("beta"));
        ledger.append_result(&row("beta")).unwrap();
        drop(ledger);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(2).unwrap().starts_with("beta,10,120,"));
    }

    #[tokio::test]
    async fn test_header_mismatch_is_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.csv");
        std::fs::write(&path, "name,stars\nalpha,1\n").unwrap();

        let err = Ledger::open(&path, TRACKED).await.unwrap_err();
        assert!(err.to_string().contains("has columns"));
    }

    #[tokio::test]
    async fn test_existing_names_are_indexed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.csv");
        let header = ResultRow::header(TRACKED).join(",");
        std::fs::write(&path, format!("{header}\nalpha,1\nbeta\nalpha,1\n")).unwrap();

        let ledger = Ledger::open(&path, TRACKED).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.is_processed("alpha"));
        assert!(ledger.is_processed("beta"));
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("results.csv");
        let ledger = Ledger::open(&path, TRACKED).await.unwrap();
        assert_eq!(ledger.path(), path);
        assert_eq!(ledger.header().len(), 13);
    }

    #[test]
    fn test_archive_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.csv");
        let now = "2024-03-04T05:06:07Z".parse().unwrap();

        assert_eq!(archive_ledger(&path, now).unwrap(), None);

        std::fs::write(&path, "name\n").unwrap();
        let backup = archive_ledger(&path, now).unwrap().unwrap();
        assert_eq!(backup, temp_dir.path().join("results.csv.20240304T050607Z.bak"));
        assert!(!path.exists());
        assert!(backup.exists());
    }
}
