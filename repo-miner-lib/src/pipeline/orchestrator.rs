use super::LOG_TARGET;
use super::age::age_years;
use super::run_summary::RunSummary;
use crate::Result;
use crate::analysis::{AnalysisOutcome, AnalysisTool, ClassMetric};
use crate::hosting::{ReleasesCounter, RepositoryDescriptor};
use crate::ledger::{Ledger, ResultRow};
use crate::progress::Progress;
use crate::retrieval::{RetrievalManager, WorkingCopy};
use crate::stats::AggregateMetrics;
use chrono::Utc;
use std::collections::HashSet;

/// How one repository left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepositoryOutcome {
    Scored,
    Unscored,
    AnalysisFailed,
}

/// Sequences retrieval, analysis, aggregation and persistence over a catalog.
///
/// Repositories are handled strictly one at a time in catalog order. Every
/// per-repository problem is contained at the repository boundary; only a
/// failure to write the ledger ends the run.
#[derive(Debug)]
pub struct Pipeline {
    releases: ReleasesCounter,
    retrieval: RetrievalManager,
    tool: AnalysisTool,
    tracked: Vec<ClassMetric>,
}

impl Pipeline {
    #[must_use]
    pub fn new(releases: ReleasesCounter, retrieval: RetrievalManager, tool: AnalysisTool, tracked: &[ClassMetric]) -> Self {
        Self {
            releases,
            retrieval,
            tool,
            tracked: tracked.to_vec(),
        }
    }

    /// Process every catalog entry the ledger doesn't yet record.
    ///
    /// # Errors
    ///
    /// Returns an error only if a row cannot be appended to the ledger.
    pub async fn run(&self, catalog: &[RepositoryDescriptor], ledger: &mut Ledger, progress: &dyn Progress) -> Result<RunSummary> {
        let mut summary = RunSummary {
            catalog_size: catalog.len(),
            ..RunSummary::default()
        };

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for descriptor in catalog {
            if ledger.is_processed(&descriptor.name) {
                log::debug!(target: LOG_TARGET, "Skipping '{}', already in the ledger", descriptor.name);
                summary.already_recorded += 1;
            } else if !seen.insert(descriptor.name.as_str()) {
                log::warn!(
                    target: LOG_TARGET,
                    "Skipping '{}', its name was already taken by an earlier catalog entry",
                    descriptor.full_name
                );
                summary.duplicate_names += 1;
            } else {
                pending.push(descriptor.clone());
            }
        }

        log::info!(
            target: LOG_TARGET,
            "{} of {} catalog entries need processing",
            pending.len(),
            catalog.len()
        );

        if pending.is_empty() {
            progress.done();
            return Ok(summary);
        }

        let mut report = self.retrieval.retrieve_all(&pending, progress).await;
        summary.retrieval_failures = core::mem::take(&mut report.failures);

        progress.set_phase("Analyzing");
        let total = pending.len() as u64;
        for (index, descriptor) in pending.iter().enumerate() {
            progress.set_position(index as u64, total, &descriptor.name);

            let Some(copy) = report.ready.get(&descriptor.name) else {
                continue;
            };

            match self.process(descriptor, copy, ledger).await? {
                RepositoryOutcome::Scored => summary.scored += 1,
                RepositoryOutcome::Unscored => summary.unscored += 1,
                RepositoryOutcome::AnalysisFailed => summary.analysis_failures.push(descriptor.name.clone()),
            }
        }

        progress.done();
        Ok(summary)
    }

    async fn process(&self, descriptor: &RepositoryDescriptor, copy: &WorkingCopy, ledger: &mut Ledger) -> Result<RepositoryOutcome> {
        let releases_count = self.releases.count_releases(&descriptor.full_name).await;
        let age_years = age_years(descriptor.created_at, Utc::now());

        let (metrics, outcome) = match self.tool.run_analysis(&copy.path).await {
            AnalysisOutcome::Found(table) => {
                let metrics = AggregateMetrics::from_table(&table, &self.tracked);
                log::info!(
                    target: LOG_TARGET,
                    "Analyzed '{}': {} classes",
                    descriptor.name,
                    metrics.class_count
                );
                (metrics, RepositoryOutcome::Scored)
            }
            AnalysisOutcome::NoData(reason) => {
                log::info!(target: LOG_TARGET, "No metrics for '{}': {reason}", descriptor.name);
                (AggregateMetrics::unscored(&self.tracked), RepositoryOutcome::Unscored)
            }
            AnalysisOutcome::Failed(e) => {
                log::warn!(target: LOG_TARGET, "Analysis of '{}' failed, will retry next run: {e:#}", descriptor.name);
                return Ok(RepositoryOutcome::AnalysisFailed);
            }
        };

        let row = ResultRow {
            name: descriptor.name.clone(),
            stargazers_count: descriptor.stargazers_count,
            releases_count,
            age_years,
            metrics,
            analyzed_at: Utc::now(),
        };

        ledger.append_result(&row)?;
        Ok(outcome)
    }
}
