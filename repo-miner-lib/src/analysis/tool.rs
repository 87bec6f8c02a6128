use super::{ClassMetric, ClassTable, LOG_TARGET, parse_class_table};
use crate::Result;
use core::time::Duration;
use ohno::{EnrichableExt, IntoAppError, app_err, bail};
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use walkdir::WalkDir;

/// Lines of tool output kept when reporting a failure.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// How to launch the analysis tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Executable name (looked up on `PATH`) or path.
    pub program: String,

    /// Arguments placed before the working copy path.
    pub args: Vec<String>,

    /// Location of the class table, relative to the directory the tool is started in.
    pub artifact: PathBuf,

    /// Parent of the per-repository directories the tool is started in.
    pub output_dir: PathBuf,

    /// When set, working copies without a single file of this extension are not analyzed.
    pub source_extension: Option<String>,

    pub timeout: Duration,
}

/// Where the tool left its class table for one working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub path: PathBuf,
}

impl ArtifactLocation {
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Result of analyzing one working copy.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The tool produced at least one class row.
    Found(ClassTable),

    /// Nothing to analyze: no sources, no artifact, or an artifact without rows.
    NoData(String),

    /// The tool could not be run to completion. The repository's metrics are skipped.
    Failed(ohno::AppError),
}

/// Runs the external analysis tool against working copies.
#[derive(Debug, Clone)]
pub struct AnalysisTool {
    program: PathBuf,
    args: Vec<OsString>,
    artifact: PathBuf,
    output_dir: PathBuf,
    source_extension: Option<String>,
    timeout: Duration,
    columns: Vec<ClassMetric>,
}

impl AnalysisTool {
    /// Prepare the tool for use.
    ///
    /// `tracked` lists the metrics to read from the class table in addition to
    /// lines of code.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool's executable cannot be found or is not executable.
    pub fn new(spec: ToolSpec, tracked: &[ClassMetric]) -> Result<Self> {
        let program = resolve_program(&spec.program)?;
        let output_dir = std::path::absolute(&spec.output_dir)
            .into_app_err_with(|| format!("resolving analysis output directory '{}'", spec.output_dir.display()))?;

        // the tool runs in a directory of its own, so relative file arguments must be pinned first
        let args = spec
            .args
            .iter()
            .map(|arg| {
                let path = Path::new(arg);
                if path.is_relative() && path.is_file() {
                    path.canonicalize()
                        .map(PathBuf::into_os_string)
                        .into_app_err_with(|| format!("resolving analysis tool argument '{arg}'"))
                } else {
                    Ok(OsString::from(arg))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut columns = vec![ClassMetric::Loc];
        columns.extend(tracked.iter().copied().filter(|m| *m != ClassMetric::Loc));

        log::debug!(target: LOG_TARGET, "Using analysis tool '{}'", program.display());

        Ok(Self {
            program,
            args,
            artifact: spec.artifact,
            output_dir,
            source_extension: spec.source_extension,
            timeout: spec.timeout,
            columns,
        })
    }

    /// Analyze a working copy and read back the tool's class table.
    ///
    /// Never fails outright: tool problems are reported as [`AnalysisOutcome::Failed`]
    /// so the caller can move on to the next repository.
    pub async fn run_analysis(&self, working_copy: &Path) -> AnalysisOutcome {
        if let Some(ext) = &self.source_extension {
            match has_source_files(working_copy, ext).await {
                Ok(true) => {}
                Ok(false) => return AnalysisOutcome::NoData(format!("no .{ext} source files")),
                Err(e) => return AnalysisOutcome::Failed(e),
            }
        }

        let location = match self.invoke(working_copy).await {
            Ok(location) => location,
            Err(e) => return AnalysisOutcome::Failed(e),
        };

        if !location.exists() {
            return AnalysisOutcome::NoData(format!("tool wrote no artifact at '{}'", location.path.display()));
        }

        let table = fs::File::open(&location.path)
            .into_app_err_with(|| format!("opening class table '{}'", location.path.display()))
            .and_then(|file| parse_class_table(file, &self.columns));

        match table {
            Ok(table) if table.is_empty() => AnalysisOutcome::NoData("class table has no rows".to_string()),
            Ok(table) => {
                if table.skipped_cells > 0 || table.skipped_rows > 0 {
                    log::info!(
                        target: LOG_TARGET,
                        "Dropped {} unreadable cell(s) and {} unreadable row(s) from '{}'",
                        table.skipped_cells,
                        table.skipped_rows,
                        location.path.display()
                    );
                }
                AnalysisOutcome::Found(table)
            }
            Err(e) => AnalysisOutcome::Failed(e),
        }
    }

    /// Run the tool against `working_copy` and report where its artifact is expected.
    ///
    /// The tool is started in a directory of its own under the output directory,
    /// named after the working copy. Any artifact left there by an earlier run is
    /// removed first, so an existing file at the returned location was written by
    /// this invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot be started, exits unsuccessfully, or times out.
    pub async fn invoke(&self, working_copy: &Path) -> Result<ArtifactLocation> {
        let working_copy = &std::path::absolute(working_copy)
            .into_app_err_with(|| format!("resolving working copy '{}'", working_copy.display()))?;

        let Some(name) = working_copy.file_name() else {
            bail!("working copy '{}' has no directory name", working_copy.display());
        };
        let run_dir = self.output_dir.join(name);
        fs::create_dir_all(&run_dir).into_app_err_with(|| format!("creating analysis directory '{}'", run_dir.display()))?;

        let location = ArtifactLocation {
            path: run_dir.join(&self.artifact),
        };

        if location.path.exists() {
            fs::remove_file(&location.path)
                .into_app_err_with(|| format!("removing stale class table '{}'", location.path.display()))?;
        }

        log::info!(target: LOG_TARGET, "Analyzing '{}'", working_copy.display());
        let start_time = std::time::Instant::now();

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(working_copy)
            .current_dir(&run_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .into_app_err_with(|| format!("could not start analysis tool '{}'", self.program.display()))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(e).into_app_err("analysis tool failed to run"),
            Err(_) => bail!("analysis tool timed out after {} seconds", self.timeout.as_secs()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::trace!(target: LOG_TARGET, "Analysis tool output:\n{stdout}");

        if !output.status.success() {
            let error = ohno::app_err!(
                "analysis tool exited with {}\nstdout:\n{}\nstderr:\n{}",
                output.status,
                tail(&stdout, DIAGNOSTIC_TAIL_LINES),
                tail(&stderr, DIAGNOSTIC_TAIL_LINES)
            );
            return Err(error.enrich_with(|| format!("analyzing '{}'", working_copy.display())));
        }

        log::debug!(
            target: LOG_TARGET,
            "Analysis of '{}' finished in {:.3}s",
            working_copy.display(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(location)
    }
}

/// Find the tool's executable the way a shell would.
fn resolve_program(program: &str) -> Result<PathBuf> {
    let cwd = env::current_dir().into_app_err("reading the current directory")?;
    find_program(program, env::var_os("PATH"), &cwd)
}

fn find_program(program: &str, search_path: Option<impl AsRef<OsStr>>, cwd: &Path) -> Result<PathBuf> {
    which::which_in(program, search_path, cwd).map_err(|e| app_err!("analysis tool '{program}' was not found as an executable file: {e}"))
}

async fn has_source_files(root: &Path, extension: &str) -> Result<bool> {
    let root = root.to_path_buf();
    let extension = extension.to_string();

    let found = tokio::task::spawn_blocking(move || {
        WalkDir::new(&root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(core::result::Result::ok)
            .any(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case(extension.as_str())))
    })
    .await?;

    Ok(found)
}

fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail("a\nb", 5), "a\nb");
        assert_eq!(tail("", 3), "");
    }

    #[test]
    fn test_resolve_missing_program() {
        let result = resolve_program("definitely-not-an-installed-tool-31337");
        assert!(result.unwrap_err().to_string().contains("not found as an executable file"));
    }

    #[test]
    fn test_resolve_missing_program_path() {
        let _ = resolve_program("./no/such/tool").unwrap_err();
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_on_path_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("metrics-tool");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();

        let result = find_program("metrics-tool", Some(dir.path()), dir.path());
        assert!(result.unwrap_err().to_string().contains("metrics-tool"));

        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_program("metrics-tool", Some(dir.path()), dir.path()).unwrap(), tool);
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_program_path_resolves_against_cwd() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let tool = dir.path().join("bin").join("ck");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let found = find_program("./bin/ck", None::<&OsStr>, dir.path()).unwrap();
        assert_eq!(found.canonicalize().unwrap(), tool.canonicalize().unwrap());
    }

    #[cfg(unix)]
    fn script_tool(output_dir: &Path, script: &str, source_extension: Option<&str>, timeout: Duration) -> AnalysisTool {
        let spec = ToolSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            artifact: PathBuf::from("class.csv"),
            output_dir: output_dir.to_path_buf(),
            source_extension: source_extension.map(ToString::to_string),
            timeout,
        };
        AnalysisTool::new(spec, &[ClassMetric::Cbo, ClassMetric::Dit, ClassMetric::Lcom]).unwrap()
    }

    #[cfg(unix)]
    fn repo_dir(tmp: &tempfile::TempDir) -> PathBuf {
        let dir = tmp.path().join("repos").join("project");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_found_when_tool_writes_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        fs::write(repo.join("A.java"), "class A {}").unwrap();
        let tool = script_tool(
            &tmp.path().join("analysis"),
            "printf 'class,cbo,dit,lcom,loc\\nA,1,2,3,10\\nB,3,1,x,5\\n' > class.csv",
            Some("java"),
            Duration::from_secs(30),
        );

        let AnalysisOutcome::Found(table) = tool.run_analysis(&repo).await else {
            panic!("expected class rows");
        };
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.values(ClassMetric::Cbo), vec![1.0, 3.0]);
        assert_eq!(table.values(ClassMetric::Lcom), vec![3.0]);
        assert_eq!(table.values(ClassMetric::Loc), vec![10.0, 5.0]);
        assert!(!repo.join("class.csv").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_data_without_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        fs::write(repo.join("README.md"), "docs").unwrap();
        let tool = script_tool(&tmp.path().join("analysis"), "exit 1", Some("java"), Duration::from_secs(30));

        assert!(matches!(tool.run_analysis(&repo).await, AnalysisOutcome::NoData(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sources_inside_git_dir_do_not_count() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        fs::create_dir(repo.join(".git")).unwrap();
        fs::write(repo.join(".git").join("A.java"), "class A {}").unwrap();
        let tool = script_tool(&tmp.path().join("analysis"), "exit 1", Some("java"), Duration::from_secs(30));

        assert!(matches!(tool.run_analysis(&repo).await, AnalysisOutcome::NoData(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_data_when_artifact_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        let tool = script_tool(&tmp.path().join("analysis"), "true", None, Duration::from_secs(30));

        assert!(matches!(tool.run_analysis(&repo).await, AnalysisOutcome::NoData(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_data_when_artifact_header_only() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        let tool = script_tool(
            &tmp.path().join("analysis"),
            "printf 'class,cbo,dit,lcom\\n' > class.csv",
            None,
            Duration::from_secs(30),
        );

        assert!(matches!(tool.run_analysis(&repo).await, AnalysisOutcome::NoData(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_on_non_zero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        let tool = script_tool(&tmp.path().join("analysis"), "echo boom >&2; exit 3", None, Duration::from_secs(30));

        let AnalysisOutcome::Failed(e) = tool.run_analysis(&repo).await else {
            panic!("expected a tool failure");
        };
        assert!(format!("{e:#}").contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_on_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        let tool = script_tool(&tmp.path().join("analysis"), "sleep 5", None, Duration::from_millis(100));

        let AnalysisOutcome::Failed(e) = tool.run_analysis(&repo).await else {
            panic!("expected a timeout");
        };
        assert!(e.to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_artifact_is_not_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        let run_dir = tmp.path().join("analysis").join("project");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("class.csv"), "class,cbo\nOld,9\n").unwrap();
        let tool = script_tool(&tmp.path().join("analysis"), "true", None, Duration::from_secs(30));

        assert!(matches!(tool.run_analysis(&repo).await, AnalysisOutcome::NoData(_)));
        assert!(!run_dir.join("class.csv").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_class_table_shipped_by_repository_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        fs::write(repo.join("class.csv"), "class,cbo\nShipped,9\n").unwrap();
        let tool = script_tool(&tmp.path().join("analysis"), "true", None, Duration::from_secs(30));

        assert!(matches!(tool.run_analysis(&repo).await, AnalysisOutcome::NoData(_)));
        assert_eq!(fs::read_to_string(repo.join("class.csv")).unwrap(), "class,cbo\nShipped,9\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_reports_artifact_location() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = repo_dir(&tmp);
        let tool = script_tool(&tmp.path().join("analysis"), "printf 'class\\n' > class.csv", None, Duration::from_secs(30));

        let location = tool.invoke(&repo).await.unwrap();
        assert_eq!(location.path, tmp.path().join("analysis").join("project").join("class.csv"));
        assert!(location.exists());
    }
}
