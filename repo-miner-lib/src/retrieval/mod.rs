//! Local working copies of catalog repositories.
//!
//! A working copy is a directory named after the repository; its existence is
//! the "retrieved" state, so retrieval is idempotent across runs. Clones that
//! fail are retried as a batch a bounded number of times with exponential
//! backoff, then reported as permanent failures for the run.

mod git;
mod manager;
mod path_utils;

pub use manager::{PermanentFailure, RetrievalManager, RetrievalReport, RetryPolicy, WorkingCopy};
pub use path_utils::sanitize_path_component;

const LOG_TARGET: &str = " retrieval";
