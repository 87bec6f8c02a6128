//! Access to the code-hosting API: the star-ranked repository catalog and
//! per-repository release counts.
//!
//! Authentication is an explicit value handed to [`Client::new`]; every
//! collaborator built from that client carries it, and nothing else does.

mod catalog;
mod client;
mod releases;
mod repo_descriptor;

pub use catalog::{CatalogFetcher, MAX_PAGE_SIZE};
pub use client::{Client, HostingApiResult, RateLimitInfo};
pub use releases::ReleasesCounter;
pub use repo_descriptor::RepositoryDescriptor;

#[cfg(test)]
pub(crate) use repo_descriptor::test_descriptor;

const LOG_TARGET: &str = "   catalog";
