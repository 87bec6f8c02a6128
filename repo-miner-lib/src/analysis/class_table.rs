//! Tolerant reader for the per-class table written by the analysis tool.
//!
//! The table is a header line followed by one row per class. Only the columns
//! that map to a [`ClassMetric`] we care about are read; everything else is
//! ignored. Damage is contained as narrowly as possible:
//!
//! - a wanted column missing from the header means the metric is absent for every row
//! - a row too short to reach a column means the metric is absent for that row
//! - a cell that is not a finite number is dropped, the rest of the row is kept
//! - a row the CSV reader cannot decode at all is dropped

use super::{ClassMetric, LOG_TARGET, RawMetricRecord};
use crate::Result;
use ohno::IntoAppError;
use std::io::Read;

/// The rows read from one class table.
#[derive(Debug, Default)]
pub struct ClassTable {
    pub records: Vec<RawMetricRecord>,

    /// Wanted columns that the header did not contain.
    pub missing_columns: Vec<ClassMetric>,

    /// Cells dropped because they were empty or not numeric.
    pub skipped_cells: usize,

    /// Rows dropped because they could not be decoded.
    pub skipped_rows: usize,
}

impl ClassTable {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All values recorded for `metric`, in row order.
    #[must_use]
    pub fn values(&self, metric: ClassMetric) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.get(metric)).collect()
    }
}

/// Parse a class table, keeping only the `wanted` metric columns.
///
/// # Errors
///
/// Returns an error only if the header line itself cannot be read.
pub fn parse_class_table<R: Read>(reader: R, wanted: &[ClassMetric]) -> Result<ClassTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().into_app_err("reading class table header")?.clone();

    let mut table = ClassTable::default();
    let mut columns = Vec::with_capacity(wanted.len());
    for &metric in wanted {
        match headers.iter().position(|h| h.eq_ignore_ascii_case(metric.column())) {
            Some(index) => columns.push((metric, index)),
            None => {
                log::debug!(target: LOG_TARGET, "Class table has no '{metric}' column");
                table.missing_columns.push(metric);
            }
        }
    }

    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Skipping unreadable class table row {}: {e}", row + 1);
                table.skipped_rows += 1;
                continue;
            }
        };

        let mut raw = RawMetricRecord::default();
        for &(metric, index) in &columns {
            let Some(cell) = record.get(index) else {
                continue;
            };

            match cell.parse::<f64>() {
                Ok(value) if value.is_finite() => raw.insert(metric, value),
                _ => {
                    log::trace!(target: LOG_TARGET, "Skipping non-numeric '{metric}' cell '{cell}' in row {}", row + 1);
                    table.skipped_cells += 1;
                }
            }
        }

        table.records.push(raw);
    }

    Ok(table)
}
