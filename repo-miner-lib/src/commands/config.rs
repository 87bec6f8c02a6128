use crate::Result;
use crate::analysis::ClassMetric;
use crate::hosting::MAX_PAGE_SIZE;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "miner.toml";

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the ranked catalog comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Base URL of the hosting API
    pub api_base_url: String,

    /// Primary language the search is restricted to
    pub language: String,

    /// Number of search result pages to fetch
    pub page_count: u32,

    /// Repositories per page (at most 100)
    pub page_size: u32,

    /// Timeout for each API request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            language: "Java".to_string(),
            page_count: 10,
            page_size: MAX_PAGE_SIZE,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// How working copies are obtained
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Directory holding one working copy per repository
    pub work_dir: Utf8PathBuf,

    /// History depth of each clone
    pub clone_depth: u32,

    /// Total clone attempts per repository within one run
    pub max_attempts: u32,

    /// Wait before the first retry round; doubled for each further round
    #[serde(with = "humantime_serde")]
    pub base_backoff: Duration,

    /// Upper bound on the wait between retry rounds
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,

    /// Timeout for a single clone
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            work_dir: Utf8PathBuf::from("repos"),
            clone_depth: 1,
            max_attempts: 3,
            base_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// How the class-metrics tool is run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Executable to start
    pub program: String,

    /// Arguments placed before the working copy path
    pub args: Vec<String>,

    /// Class table written by the tool, relative to the directory it is started in
    pub artifact: Utf8PathBuf,

    /// The tool is started in `<output_dir>/<repository>`, never inside the working copy
    pub output_dir: Utf8PathBuf,

    /// Repositories without a file of this extension are recorded without metrics
    pub source_extension: Option<String>,

    /// Timeout for a single analysis
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Metrics summarized into the ledger, in column order
    pub tracked_metrics: Vec<ClassMetric>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            program: "java".to_string(),
            args: vec!["-jar".to_string(), "ck-0.7.1-SNAPSHOT-jar-with-dependencies.jar".to_string()],
            artifact: Utf8PathBuf::from("class.csv"),
            output_dir: Utf8PathBuf::from("analysis"),
            source_extension: Some("java".to_string()),
            timeout: Duration::from_secs(30 * 60),
            tracked_metrics: vec![ClassMetric::Cbo, ClassMetric::Dit, ClassMetric::Lcom],
        }
    }
}

/// Where the tables go
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// The append-only result ledger
    pub ledger: Utf8PathBuf,

    /// Snapshot of the fetched catalog; not written when absent
    pub catalog_snapshot: Option<Utf8PathBuf>,

    /// Repositories that could not be cloned in the last run; not written when absent
    pub failures: Option<Utf8PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ledger: Utf8PathBuf::from("repositories.csv"),
            catalog_snapshot: Some(Utf8PathBuf::from("catalog.csv")),
            failures: Some(Utf8PathBuf::from("clone_failures.csv")),
        }
    }
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `miner.toml` in `base_dir` is used if it exists.
    /// Values are not validated here; command-line overrides may still replace them.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading repo-miner configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(DEFAULT_CONFIG_FILE);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("No '{path}' found, using the default configuration");
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading repo-miner configuration file '{path}'")),
            }
        };

        toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range or inconsistent
    pub fn validate(&self) -> Result<()> {
        if self.catalog.page_size == 0 || self.catalog.page_size > MAX_PAGE_SIZE {
            return Err(app_err!(
                "catalog.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.catalog.page_size
            ));
        }

        if self.catalog.language.trim().is_empty() {
            return Err(app_err!("catalog.language must not be empty"));
        }

        if url::Url::parse(&self.catalog.api_base_url).is_err() {
            return Err(app_err!("catalog.api_base_url is not a valid URL: '{}'", self.catalog.api_base_url));
        }

        if self.retrieval.clone_depth == 0 {
            return Err(app_err!("retrieval.clone_depth must be at least 1"));
        }

        if self.retrieval.max_attempts == 0 {
            return Err(app_err!("retrieval.max_attempts must be at least 1"));
        }

        if self.retrieval.base_backoff > self.retrieval.max_backoff {
            return Err(app_err!(
                "retrieval.base_backoff ({:?}) must not exceed retrieval.max_backoff ({:?})",
                self.retrieval.base_backoff,
                self.retrieval.max_backoff
            ));
        }

        for (name, timeout) in [
            ("catalog.request_timeout", self.catalog.request_timeout),
            ("retrieval.timeout", self.retrieval.timeout),
            ("analysis.timeout", self.analysis.timeout),
        ] {
            if timeout.is_zero() {
                return Err(app_err!("{name} must be greater than zero"));
            }
        }

        if self.analysis.program.trim().is_empty() {
            return Err(app_err!("analysis.program must not be empty"));
        }

        if self.analysis.artifact.as_str().is_empty() || self.analysis.artifact.is_absolute() {
            return Err(app_err!(
                "analysis.artifact must be a relative path, got '{}'",
                self.analysis.artifact
            ));
        }

        if self.analysis.output_dir.as_str().is_empty() {
            return Err(app_err!("analysis.output_dir must not be empty"));
        }

        if self.analysis.tracked_metrics.is_empty() {
            return Err(app_err!("analysis.tracked_metrics must name at least one metric"));
        }

        let mut seen = HashSet::new();
        for metric in &self.analysis.tracked_metrics {
            if !seen.insert(metric) {
                return Err(app_err!("analysis.tracked_metrics lists '{metric}' more than once"));
            }
        }

        if self.output.ledger.as_str().is_empty() {
            return Err(app_err!("output.ledger must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_default_config_toml_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let parsed: Config = toml::from_str("[catalog]\npage_count = 2\n").unwrap();
        assert_eq!(parsed.catalog.page_count, 2);
        assert_eq!(parsed.catalog.page_size, 100);
        assert_eq!(parsed.retrieval, RetrievalConfig::default());
    }

    #[test]
    fn test_durations_are_humantime() {
        let parsed: Config = toml::from_str("[retrieval]\nbase_backoff = \"2s\"\nmax_backoff = \"1m\"\n").unwrap();
        assert_eq!(parsed.retrieval.base_backoff, Duration::from_secs(2));
        assert_eq!(parsed.retrieval.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: core::result::Result<Config, _> = toml::from_str("[catalog]\nstars = 5\n");
        let _ = result.unwrap_err();
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let result: core::result::Result<Config, _> = toml::from_str("[analysis]\ntracked_metrics = [\"cbo\", \"nope\"]\n");
        let _ = result.unwrap_err();
    }

    #[test]
    fn test_validate_page_size_out_of_range() {
        let mut config = Config::default();
        config.catalog.page_size = 0;
        let _ = config.validate().unwrap_err();

        config.catalog.page_size = 101;
        let _ = config.validate().unwrap_err();

        config.catalog.page_size = 1;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = Config::default();
        config.retrieval.max_attempts = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_attempts"));
    }

    #[test]
    fn test_validate_backoff_order() {
        let mut config = Config::default();
        config.retrieval.base_backoff = Duration::from_secs(120);
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.analysis.timeout = Duration::ZERO;
        assert!(config.validate().unwrap_err().to_string().contains("analysis.timeout"));
    }

    #[test]
    fn test_validate_tracked_metrics() {
        let mut config = Config::default();
        config.analysis.tracked_metrics.clear();
        let _ = config.validate().unwrap_err();

        config.analysis.tracked_metrics = vec![ClassMetric::Cbo, ClassMetric::Cbo];
        assert!(config.validate().unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_absolute_artifact() {
        let mut config = Config::default();
        config.analysis.artifact = Utf8PathBuf::from("/tmp/class.csv");
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = Config::default();
        config.catalog.api_base_url = "not a url".to_string();
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_save_default_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let output_path = Utf8PathBuf::try_from(tmp.path().join("miner.toml")).unwrap();
        Config::save_default(&output_path).unwrap();
        let loaded = Config::load(Utf8Path::new("."), Some(&output_path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_from_base_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(base.join(DEFAULT_CONFIG_FILE), "[catalog]\nlanguage = \"Kotlin\"\n").unwrap();
        let loaded = Config::load(&base, None).unwrap();
        assert_eq!(loaded.catalog.language, "Kotlin");
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        assert_eq!(Config::load(&base, None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_leaves_validation_to_the_caller() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("bad.toml")).unwrap();
        fs::write(&path, "[retrieval]\nmax_attempts = 0\n").unwrap();

        let mut config = Config::load(Utf8Path::new("."), Some(&path)).unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("max_attempts"));

        config.retrieval.max_attempts = 3;
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_empty_output_dir() {
        let mut config = Config::default();
        config.analysis.output_dir = Utf8PathBuf::new();
        assert!(config.validate().unwrap_err().to_string().contains("output_dir"));
    }
}
