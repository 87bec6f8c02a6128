//! Setup shared between the catalog and mine commands.

use super::ProgressReporter;
use super::config::Config;
use crate::Result;
use crate::hosting::{CatalogFetcher, Client, RepositoryDescriptor};
use crate::ledger::write_catalog_snapshot;
use crate::progress::Progress;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use core::time::Duration;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    #[must_use]
    pub fn for_stdout(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stdout};
                stdout().is_terminal()
            }
        }
    }

    #[must_use]
    pub fn for_stderr(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments shared between the catalog and mine commands
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Path to configuration file (default is `miner.toml` in the current directory)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Number of catalog pages to fetch
    #[arg(long, value_name = "COUNT")]
    pub pages: Option<u32>,

    /// Where to write the catalog snapshot
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

#[derive(Debug)]
pub struct Common {
    pub config: Config,
    pub client: Client,
    color: ColorMode,
    log_level: LogLevel,
}

impl Common {
    /// Set up logging, load the configuration and build the API client
    ///
    /// `adjust` applies command-specific overrides before the configuration is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the client cannot be built
    pub fn new(args: &CommonArgs, adjust: impl FnOnce(&mut Config)) -> Result<Self> {
        Self::init_logging(args.log_level);

        let mut config = Config::load(Utf8Path::new("."), args.config.as_ref())?;
        if let Some(pages) = args.pages {
            config.catalog.page_count = pages;
        }
        if let Some(catalog) = &args.catalog {
            config.output.catalog_snapshot = Some(catalog.clone());
        }
        adjust(&mut config);
        config.validate()?;

        let client = Client::new(
            args.github_token.as_deref(),
            config.catalog.api_base_url.as_str(),
            config.catalog.request_timeout,
        )?;

        Ok(Self {
            config,
            client,
            color: args.color,
            log_level: args.log_level,
        })
    }

    /// Initialize logger based on log level
    fn init_logging(log_level: LogLevel) {
        let level = match log_level {
            LogLevel::None => return,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        let env = env_logger::Env::default().filter_or("RUST_LOG", level);

        // A logger may already be installed when commands run more than once in-process
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
            .try_init();
    }

    /// A progress bar, shown only when logging is off and the run takes a while
    #[must_use]
    pub fn progress_reporter(&self) -> ProgressReporter {
        let delay = if self.log_level == LogLevel::None {
            Duration::from_millis(300)
        } else {
            Duration::from_hours(365 * 24)
        };

        ProgressReporter::new(delay, self.color.for_stderr())
    }

    #[must_use]
    pub fn use_colors(&self) -> bool {
        self.color.for_stdout()
    }

    /// Fetch the ranked catalog and refresh the snapshot table when one is configured
    ///
    /// An empty catalog leaves an existing snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written
    pub async fn fetch_catalog(&self, progress: &dyn Progress) -> Result<Vec<RepositoryDescriptor>> {
        let catalog = &self.config.catalog;
        progress.set_phase("Searching");
        progress.set_position(0, u64::from(catalog.page_count), &catalog.language);

        let fetcher = CatalogFetcher::new(self.client.clone(), catalog.language.as_str(), catalog.page_size);
        let descriptors = fetcher.fetch_catalog(catalog.page_count).await;

        if let Some(path) = &self.config.output.catalog_snapshot {
            if descriptors.is_empty() {
                log::warn!("No repositories were fetched, leaving '{path}' unchanged");
            } else {
                write_catalog_snapshot(path.as_std_path(), &descriptors)?;
            }
        }

        Ok(descriptors)
    }
}
