use serde::{Deserialize, Serialize};

/// Row accounting for one [`Preprocessor::clean_with_report`](crate::Preprocessor::clean_with_report) run.
///
/// Rows are dropped silently from the table, so the counts are the only
/// record of how much data each rule removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Rows whose time text was missing, began with the invalid hour prefix,
    /// or had no separator.
    pub dropped_invalid_time: usize,
    /// Rows with a null or NaN in any column after distance derivation.
    pub dropped_missing_values: usize,
    /// Rows at or beyond the maximum distance.
    pub dropped_distance_outliers: usize,
}

impl CleaningReport {
    pub fn new(rows_before: usize) -> Self {
        Self {
            rows_before,
            rows_after: rows_before,
            ..Default::default()
        }
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before - self.rows_after
    }

    /// Fraction of input rows that survived cleaning.
    pub fn retention(&self) -> f64 {
        if self.rows_before == 0 {
            return 0.0;
        }
        self.rows_after as f64 / self.rows_before as f64
    }

    /// Human-readable lines for CLI output.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!(
                "Rows: {} -> {} ({} removed)",
                self.rows_before,
                self.rows_after,
                self.rows_removed()
            ),
            format!("Invalid time text: {}", self.dropped_invalid_time),
            format!("Missing values: {}", self.dropped_missing_values),
            format!("Distance outliers: {}", self.dropped_distance_outliers),
        ]
    }
}
