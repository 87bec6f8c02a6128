//! Invocation of the external class-metrics tool and parsing of its output.
//!
//! The tool's only contract is a filesystem side effect: run against a working
//! copy, it writes a class table to a well-known location relative to the
//! directory it was started in. [`AnalysisTool::invoke`] turns that into an
//! explicit [`ArtifactLocation`], and [`AnalysisTool::run_analysis`] reads the
//! artifact back into [`RawMetricRecord`]s, reporting one of three outcomes:
//! data found, no data, or a soft tool failure.

mod class_metric;
mod class_table;
mod raw_metric_record;
mod tool;

pub use class_metric::ClassMetric;
pub use class_table::{ClassTable, parse_class_table};
pub use raw_metric_record::RawMetricRecord;
pub use tool::{AnalysisOutcome, AnalysisTool, ArtifactLocation, ToolSpec};

const LOG_TARGET: &str = "  analysis";
