//! The resumable mining pipeline.
//!
//! For each catalog entry in order: skip it if the ledger already has it,
//! make sure a working copy exists, count releases, compute the age, run the
//! analysis tool, aggregate, and append one row.

mod age;
mod orchestrator;
mod run_summary;

pub use age::age_years;
pub use orchestrator::Pipeline;
pub use run_summary::RunSummary;

/// Log target for the pipeline
const LOG_TARGET: &str = "  pipeline";
