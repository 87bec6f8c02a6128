use super::{Summary, summarize};
use crate::analysis::{ClassMetric, ClassTable};

/// The summary for one tracked metric; `None` when no class reported a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub metric: ClassMetric,
    pub summary: Option<Summary>,
}

/// Repository-level statistics reduced from the per-class table.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateMetrics {
    /// Number of class rows the tool produced.
    pub class_count: usize,

    /// Sum of lines of code over all classes that reported it.
    pub total_loc: Option<u64>,

    /// One entry per tracked metric, in tracking order.
    pub metrics: Vec<MetricSummary>,
}

impl AggregateMetrics {
    /// Aggregate each tracked metric independently of the others.
    #[must_use]
    pub fn from_table(table: &ClassTable, tracked: &[ClassMetric]) -> Self {
        let loc = table.values(ClassMetric::Loc);
        let total_loc = (!loc.is_empty()).then(|| round_to_u64(loc.iter().sum()));

        let metrics = tracked
            .iter()
            .map(|&metric| MetricSummary {
                metric,
                summary: summarize(&table.values(metric)),
            })
            .collect();

        Self {
            class_count: table.records.len(),
            total_loc,
            metrics,
        }
    }

    /// Metrics for a repository with nothing to analyze: every field explicitly empty.
    #[must_use]
    pub fn unscored(tracked: &[ClassMetric]) -> Self {
        Self {
            class_count: 0,
            total_loc: None,
            metrics: tracked.iter().map(|&metric| MetricSummary { metric, summary: None }).collect(),
        }
    }

    #[must_use]
    pub fn summary(&self, metric: ClassMetric) -> Option<&Summary> {
        self.metrics.iter().find(|m| m.metric == metric).and_then(|m| m.summary.as_ref())
    }
}

#[expect(clippy::cast_possible_truncation, reason = "line counts fit comfortably in u64")]
#[expect(clippy::cast_sign_loss, reason = "negative sums are clamped to zero first")]
fn round_to_u64(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse_class_table;

    const TRACKED: &[ClassMetric] = &[ClassMetric::Cbo, ClassMetric::Dit, ClassMetric::Lcom];

    fn table(text: &str) -> ClassTable {
        let wanted = [ClassMetric::Loc, ClassMetric::Cbo, ClassMetric::Dit, ClassMetric::Lcom];
        parse_class_table(text.as_bytes(), &wanted).unwrap()
    }

    #[test]
    fn test_metrics_are_aggregated_independently() {
        let table = table("class,cbo,dit,lcom,loc\nA,1,1,,100\nB,3,x,4,50\nC,2,3,,25\n");
        let metrics = AggregateMetrics::from_table(&table, TRACKED);

        assert_eq!(metrics.class_count, 3);
        assert_eq!(metrics.total_loc, Some(175));

        let cbo = metrics.summary(ClassMetric::Cbo).unwrap();
        assert!((cbo.mean - 2.0).abs() < f64::EPSILON);
        assert!((cbo.median - 2.0).abs() < f64::EPSILON);

        let dit = metrics.summary(ClassMetric::Dit).unwrap();
        assert!((dit.median - 2.0).abs() < f64::EPSILON);
        assert!((dit.std_dev - 1.0).abs() < f64::EPSILON);

        let lcom = metrics.summary(ClassMetric::Lcom).unwrap();
        assert!((lcom.mean - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_without_values_is_undefined_not_zero() {
        let table = table("class,cbo\nA,1\n");
        let metrics = AggregateMetrics::from_table(&table, TRACKED);

        assert!(metrics.summary(ClassMetric::Cbo).is_some());
        assert!(metrics.summary(ClassMetric::Dit).is_none());
        assert!(metrics.summary(ClassMetric::Lcom).is_none());
        assert_eq!(metrics.total_loc, None);
    }

    #[test]
    fn test_tracking_order_is_kept() {
        let table = table("class,cbo,dit,lcom\nA,1,2,3\n");
        let metrics = AggregateMetrics::from_table(&table, &[ClassMetric::Lcom, ClassMetric::Cbo]);
        let order: Vec<_> = metrics.metrics.iter().map(|m| m.metric).collect();
        assert_eq!(order, vec![ClassMetric::Lcom, ClassMetric::Cbo]);
    }

    #[test]
    fn test_unscored_has_no_values() {
        let metrics = AggregateMetrics::unscored(TRACKED);
        assert_eq!(metrics.class_count, 0);
        assert_eq!(metrics.metrics.len(), 3);
        assert!(metrics.metrics.iter().all(|m| m.summary.is_none()));
    }
}
