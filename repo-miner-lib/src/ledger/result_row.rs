use crate::analysis::ClassMetric;
use crate::stats::AggregateMetrics;
use chrono::{DateTime, SecondsFormat, Utc};

/// One persisted ledger row: a subset of the catalog entry, the aggregated
/// metrics, and when the row was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub name: String,
    pub stargazers_count: u64,
    pub releases_count: u64,
    pub age_years: u32,
    pub metrics: AggregateMetrics,
    pub analyzed_at: DateTime<Utc>,
}

impl ResultRow {
    /// The ledger's column names for a given set of tracked metrics.
    #[must_use]
    pub fn header(tracked: &[ClassMetric]) -> Vec<String> {
        let mut header: Vec<String> = ["name", "stargazers_count", "loc", "releases_count", "age_years"]
            .into_iter()
            .map(String::from)
            .collect();

        for metric in tracked {
            header.push(format!("{metric}_mean"));
            header.push(format!("{metric}_median"));
            header.push(format!("{metric}_stddev"));
        }

        header.push("class_count".to_string());
        header.push("analyzed_at".to_string());
        header
    }

    /// The row's cells, aligned with [`ResultRow::header`] for the metrics it carries.
    ///
    /// Metrics without data are written as empty cells, never as zero.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.name.clone(),
            self.stargazers_count.to_string(),
            self.metrics.total_loc.map(|loc| loc.to_string()).unwrap_or_default(),
            self.releases_count.to_string(),
            self.age_years.to_string(),
        ];

        for entry in &self.metrics.metrics {
            match &entry.summary {
                Some(summary) => {
                    fields.push(summary.formatted_mean());
                    fields.push(summary.formatted_median());
                    fields.push(summary.formatted_std_dev());
                }
                None => fields.extend([String::new(), String::new(), String::new()]),
            }
        }

        fields.push(self.metrics.class_count.to_string());
        fields.push(self.analyzed_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        fields
    }

    /// The tracked metrics this row carries, in order.
    #[must_use]
    pub fn tracked(&self) -> Vec<ClassMetric> {
        self.metrics.metrics.iter().map(|m| m.metric).collect()
    }
}
