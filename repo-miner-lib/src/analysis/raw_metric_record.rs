use super::ClassMetric;
use std::collections::HashMap;

/// The metric values recorded for one analyzed class.
///
/// A metric is absent when the tool did not produce its column or the cell
/// could not be read as a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetricRecord {
    values: HashMap<ClassMetric, f64>,
}

impl RawMetricRecord {
    #[must_use]
    pub fn get(&self, metric: ClassMetric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn insert(&mut self, metric: ClassMetric, value: f64) {
        let _ = self.values.insert(metric, value);
    }
}
