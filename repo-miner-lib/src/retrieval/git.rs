use super::LOG_TARGET;
use crate::Result;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use url::Url;

/// Shallow-clone `repo_url` into `repo_path`.
///
/// The clone lands in a sibling `.partial` directory and is renamed into place
/// only once git succeeds, so `repo_path` never exists in a half-written state.
pub async fn shallow_clone(repo_path: &Path, repo_url: &Url, depth: u32, timeout: Duration) -> Result<()> {
    let start_time = std::time::Instant::now();
    let staging = staging_path(repo_path);

    if staging.exists() {
        log::debug!(target: LOG_TARGET, "Removing leftover partial clone '{}'", staging.display());
        fs::remove_dir_all(&staging).into_app_err_with(|| format!("could not remove partial clone '{}'", staging.display()))?;
    }

    if let Some(parent) = repo_path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{}'", parent.display()))?;
    }

    let staging_str = staging.to_str().into_app_err("invalid UTF-8 in repository path")?;
    let depth = depth.to_string();

    log::info!(target: LOG_TARGET, "Cloning '{repo_url}'");
    let result = run_git_with_timeout(
        &["clone", "--depth", &depth, "--single-branch", "--no-tags", repo_url.as_str(), staging_str],
        timeout,
    )
    .await
    .and_then(|output| check_git_output(&output, "git clone"));

    if let Err(e) = result {
        if staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }
        return Err(e);
    }

    fs::rename(&staging, repo_path).into_app_err_with(|| {
        format!("could not move '{}' to '{}'", staging.display(), repo_path.display())
    })?;

    log::debug!(target: LOG_TARGET, "Cloned '{repo_url}' in {:.3}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

fn staging_path(repo_path: &Path) -> PathBuf {
    let mut name = repo_path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    repo_path.with_file_name(name)
}

fn check_git_output(output: &std::process::Output, operation: &str) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{operation} failed: {}", stderr.trim());
    }
    Ok(())
}

async fn run_git_with_timeout(args: &[&str], timeout: Duration) -> Result<std::process::Output> {
    let child = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .into_app_err("could not spawn git command")?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(e).into_app_err_with(|| format!("'git {}' failed to run", args.join(" "))),
        Err(_) => {
            bail!("'git {}' timed out after {} seconds", args.join(" "), timeout.as_secs());
        }
    }
}
