#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for repo-miner
//!
//! This library holds all functionality for the repo-miner tool, which walks a
//! star-ranked catalog of repositories, clones each one, runs a class-level
//! design metrics tool against it, and appends repository-level summaries to
//! a resumable ledger.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface, configuration and orchestration entry points
//! - [`hosting`]: Catalog search and release counting against the hosting API
//! - [`retrieval`]: Local working copies and bounded clone retry
//! - [`analysis`]: External tool invocation and tolerant parsing of its class table
//! - [`stats`]: Mean, median and population standard deviation per metric
//! - [`ledger`]: Append-only result table that doubles as the "already done" index
//! - [`pipeline`]: Sequencing of fetch, retrieve, ledger check, extract, aggregate, append

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod analysis;
pub mod hosting;
pub mod ledger;
pub mod pipeline;
pub mod progress;
pub mod retrieval;
pub mod stats;

pub use crate::commands::{Host, run};
