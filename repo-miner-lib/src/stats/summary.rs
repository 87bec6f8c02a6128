//! Reduction of one metric's per-class values into mean, median and population standard deviation.

use serde::Serialize;

/// Summary statistics for a single metric across all classes of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl Summary {
    /// The mean as written to the ledger, fixed to two decimal places.
    #[must_use]
    pub fn formatted_mean(&self) -> String {
        format!("{:.2}", self.mean)
    }

    #[must_use]
    pub fn formatted_median(&self) -> String {
        self.median.to_string()
    }

    #[must_use]
    pub fn formatted_std_dev(&self) -> String {
        self.std_dev.to_string()
    }
}

/// Summarize the values recorded for one metric.
///
/// Returns `None` when `values` is empty so that "no data" stays distinguishable
/// from a genuine zero. Non-finite values must be filtered out by the caller.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "class counts are far below 2^52")]
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;

    // population variance: divide by N, not N - 1
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    Some(Summary {
        mean,
        median: median(values),
        std_dev: variance.sqrt(),
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
