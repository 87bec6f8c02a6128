use super::Host;
use super::common::{Common, CommonArgs};
use super::report::write_summary;
use crate::Result;
use crate::analysis::{AnalysisTool, ToolSpec};
use crate::hosting::ReleasesCounter;
use crate::ledger::{Ledger, archive_ledger, write_failures};
use crate::pipeline::Pipeline;
use crate::retrieval::{RetrievalManager, RetryPolicy};
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct MineArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Where to append results
    #[arg(long, value_name = "PATH")]
    pub ledger: Option<Utf8PathBuf>,

    /// Directory holding the working copies
    #[arg(long, value_name = "PATH")]
    pub work_dir: Option<Utf8PathBuf>,

    /// Total clone attempts per repository
    #[arg(long, value_name = "COUNT")]
    pub clone_attempts: Option<u32>,

    /// Move the existing ledger aside and start from an empty one
    #[arg(long)]
    pub no_resume: bool,
}

/// Run the full pipeline over the ranked catalog
pub async fn process_mine<H: Host>(host: &mut H, args: &MineArgs) -> Result<()> {
    let common = Common::new(&args.common, |config| {
        if let Some(ledger) = &args.ledger {
            config.output.ledger.clone_from(ledger);
        }
        if let Some(work_dir) = &args.work_dir {
            config.retrieval.work_dir.clone_from(work_dir);
        }
        if let Some(attempts) = args.clone_attempts {
            config.retrieval.max_attempts = attempts;
        }
    })?;

    let config = &common.config;
    let tracked = config.analysis.tracked_metrics.clone();

    let tool = AnalysisTool::new(
        ToolSpec {
            program: config.analysis.program.clone(),
            args: config.analysis.args.clone(),
            artifact: config.analysis.artifact.clone().into_std_path_buf(),
            output_dir: config.analysis.output_dir.clone().into_std_path_buf(),
            source_extension: config.analysis.source_extension.clone(),
            timeout: config.analysis.timeout,
        },
        &tracked,
    )?;

    let ledger_path = config.output.ledger.as_std_path();
    if args.no_resume && let Some(backup) = archive_ledger(ledger_path, Utc::now())? {
        let _ = writeln!(host.error(), "Moved previous ledger to {}", backup.display());
    }
    let mut ledger = Ledger::open(ledger_path, &tracked).await?;

    let retrieval = RetrievalManager::new(
        config.retrieval.work_dir.as_std_path(),
        config.retrieval.clone_depth,
        config.retrieval.timeout,
        RetryPolicy {
            max_attempts: config.retrieval.max_attempts,
            base_backoff: config.retrieval.base_backoff,
            max_backoff: config.retrieval.max_backoff,
        },
    );

    let progress = common.progress_reporter();
    let catalog = common.fetch_catalog(&progress).await?;

    let pipeline = Pipeline::new(ReleasesCounter::new(common.client.clone()), retrieval, tool, &tracked);
    let summary = pipeline.run(&catalog, &mut ledger, &progress).await?;

    if let Some(path) = &config.output.failures {
        write_failures(path.as_std_path(), &summary.retrieval_failures)?;
    }

    let mut text = String::new();
    let _ = write_summary(&summary, ledger.path(), ledger.len(), common.use_colors(), &mut text);
    let _ = write!(host.output(), "{text}");

    Ok(())
}
