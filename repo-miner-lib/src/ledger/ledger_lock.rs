use super::LOG_TARGET;
use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Guard that releases the ledger lock when dropped
#[derive(Debug)]
pub struct LedgerLockGuard(File);

impl Drop for LedgerLockGuard {
    fn drop(&mut self) {
        // Lock is released when the file is closed anyway
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not unlock ledger: {e:#}");
        }
    }
}

/// The lock file that guards a given ledger.
#[must_use]
pub fn lock_path_for(ledger: &Path) -> PathBuf {
    let mut name = ledger.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".lock");
    ledger.with_file_name(name)
}

/// Acquire an exclusive advisory lock for the ledger at `ledger`.
///
/// Blocks until any other miner working on the same ledger exits.
pub async fn acquire_ledger_lock(ledger: &Path) -> Result<LedgerLockGuard> {
    let lock_path = lock_path_for(ledger);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening ledger lock file at '{}'", lock_path.display()))?;

    let file = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on '{}'", lock_path.display()))?;
        log::debug!(target: LOG_TARGET, "Acquired ledger lock at '{}'", lock_path.display());
        Ok::<_, ohno::AppError>(file)
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(LedgerLockGuard(file))
}
