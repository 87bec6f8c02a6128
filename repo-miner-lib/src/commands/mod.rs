//! Command-line interface and orchestration for repo-miner
//!
//! ## Commands
//!
//! - **mine**: Fetch the ranked catalog, retrieve working copies, analyze each
//!   repository not yet in the ledger, and append one row per repository
//! - **catalog**: Fetch the ranked catalog and write it to a snapshot table
//! - **init**: Generate a default configuration file
//!
//! The `common` module loads configuration, applies command-line overrides,
//! sets up logging and builds the API client shared by the network commands.

mod catalog;
mod common;
mod config;
mod host;
mod init;
mod mine;
mod progress_reporter;
mod report;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use catalog::{CatalogArgs, process_catalog};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use mine::{MineArgs, process_mine};
pub use progress_reporter::ProgressReporter;
pub use run::run;
