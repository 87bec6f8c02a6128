use crate::retrieval::PermanentFailure;

/// What happened to each catalog entry during one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Entries in the fetched catalog.
    pub catalog_size: usize,

    /// Entries skipped because the ledger already had them.
    pub already_recorded: usize,

    /// Entries skipped because an earlier entry in the same catalog had the same name.
    pub duplicate_names: usize,

    /// Rows appended with metrics.
    pub scored: usize,

    /// Rows appended with empty metric fields.
    pub unscored: usize,

    /// Repositories whose analysis failed; they are retried on the next run.
    pub analysis_failures: Vec<String>,

    /// Repositories that could not be retrieved within the retry budget.
    pub retrieval_failures: Vec<PermanentFailure>,
}

impl RunSummary {
    /// Rows appended to the ledger during the run.
    #[must_use]
    pub const fn appended(&self) -> usize {
        self.scored + self.unscored
    }

    /// Whether every catalog entry ended up in the ledger.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.analysis_failures.is_empty() && self.retrieval_failures.is_empty()
    }
}
