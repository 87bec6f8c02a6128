use super::path_utils::sanitize_path_component;
use super::{LOG_TARGET, git};
use crate::Result;
use crate::hosting::RepositoryDescriptor;
use crate::progress::Progress;
use core::time::Duration;
use std::collections::HashMap;
use std::path::PathBuf;

/// How failed clones are retried.
///
/// The whole batch is attempted once; the failed subset is then retried as a
/// new batch, waiting `base_backoff * 2^(n-2)` (capped at `max_backoff`) before
/// attempt `n`, until `max_attempts` attempts have been made.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Wait before the 1-based `attempt`. The first attempt starts immediately.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(attempt - 2);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// A local clone used as the analysis target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub path: PathBuf,
}

/// A repository that could not be cloned within the retry budget.
#[derive(Debug)]
pub struct PermanentFailure {
    pub descriptor: RepositoryDescriptor,
    pub attempts: u32,
    pub error: ohno::AppError,
}

/// Outcome of retrieving a batch of repositories.
#[derive(Debug, Default)]
pub struct RetrievalReport {
    /// Working copies keyed by repository name.
    pub ready: HashMap<String, WorkingCopy>,
    pub failures: Vec<PermanentFailure>,
}

/// Keeps one working copy per repository name under a work directory.
#[derive(Debug, Clone)]
pub struct RetrievalManager {
    work_dir: PathBuf,
    clone_depth: u32,
    clone_timeout: Duration,
    retry: RetryPolicy,
}

impl RetrievalManager {
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>, clone_depth: u32, clone_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            work_dir: work_dir.into(),
            clone_depth: clone_depth.max(1),
            clone_timeout,
            retry,
        }
    }

    #[must_use]
    pub fn working_copy_path(&self, descriptor: &RepositoryDescriptor) -> PathBuf {
        self.work_dir.join(sanitize_path_component(&descriptor.name))
    }

    /// Make sure a working copy exists, cloning it if needed.
    ///
    /// An existing directory is taken as-is; it is never refreshed or removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the clone fails.
    pub async fn ensure_local_copy(&self, descriptor: &RepositoryDescriptor) -> Result<WorkingCopy> {
        let path = self.working_copy_path(descriptor);

        if path.exists() {
            log::debug!(target: LOG_TARGET, "Working copy for '{}' already exists", descriptor.name);
        } else {
            git::shallow_clone(&path, &descriptor.clone_url, self.clone_depth, self.clone_timeout).await?;
        }

        Ok(WorkingCopy { path })
    }

    /// Retrieve every descriptor, retrying failures as a batch under the retry policy.
    ///
    /// Repositories still failing when the attempts run out are reported as
    /// permanent failures for this run.
    pub async fn retrieve_all(&self, descriptors: &[RepositoryDescriptor], progress: &dyn Progress) -> RetrievalReport {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut report = RetrievalReport::default();
        let mut pending: Vec<&RepositoryDescriptor> = descriptors.iter().collect();

        for attempt in 1..=max_attempts {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                let line = retry_notice(pending.len(), delay, attempt, max_attempts);
                log::info!(target: LOG_TARGET, "{line}");
                if !log::log_enabled!(log::Level::Info) {
                    progress.println(&line);
                }
                tokio::time::sleep(delay).await;
            }

            progress.set_phase(if attempt == 1 { "Cloning" } else { "Retrying" });
            let total = pending.len() as u64;
            let mut failed = Vec::new();

            for (index, descriptor) in pending.into_iter().enumerate() {
                progress.set_position(index as u64, total, &descriptor.name);
                match self.ensure_local_copy(descriptor).await {
                    Ok(copy) => {
                        let _ = report.ready.insert(descriptor.name.clone(), copy);
                    }
                    Err(e) => {
                        log::warn!(target: LOG_TARGET, "Could not clone '{}' (attempt {attempt}): {e:#}", descriptor.name);
                        failed.push((descriptor, e));
                    }
                }
            }

            if failed.is_empty() {
                break;
            }

            if attempt == max_attempts {
                for (descriptor, error) in failed {
                    log::error!(target: LOG_TARGET, "Giving up on '{}' after {attempt} attempt(s)", descriptor.name);
                    report.failures.push(PermanentFailure {
                        descriptor: descriptor.clone(),
                        attempts: attempt,
                        error,
                    });
                }
                break;
            }

            pending = failed.into_iter().map(|(descriptor, _)| descriptor).collect();
        }

        report
    }
}

fn retry_notice(pending: usize, delay: Duration, attempt: u32, max_attempts: u32) -> String {
    format!("Retrying {pending} failed clone(s) in {delay:?} (attempt {attempt} of {max_attempts})")
}
