//! Reduction of per-class metric values into per-repository statistics.
//!
//! [`summarize`] is a pure function over one metric's values and reports
//! `None` for an empty input instead of dividing by zero. [`AggregateMetrics`]
//! applies it to every tracked metric in isolation.

mod aggregate_metrics;
mod summary;

pub use aggregate_metrics::{AggregateMetrics, MetricSummary};
pub use summary::{Summary, summarize};
