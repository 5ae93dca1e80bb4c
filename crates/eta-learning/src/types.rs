//! Metrics and model metadata returned by the model builder.
//!
//! - [`Metrics`]: regression metrics for one set of predictions
//! - [`ModelInfo`]: what a builder was configured and fitted with

use crate::error::{LearningError, Result};
use crate::split::SplitSizes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Regression metrics of predictions against known delivery times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Coefficient of determination. Range: (-∞, 1.0], where 1.0 is perfect.
    pub r2: f64,

    /// Mean squared error, in squared minutes.
    pub mse: f64,

    /// Root mean squared error, in minutes.
    pub rmse: f64,

    /// Mean absolute error, in minutes.
    pub mae: f64,

    /// Number of rows scored.
    pub n_samples: usize,
}

impl Metrics {
    /// Score `predicted` against `actual`.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] if the lengths differ or nothing is scored.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(LearningError::InvalidData(format!(
                "{} targets for {} predictions",
                actual.len(),
                predicted.len()
            )));
        }
        if actual.is_empty() {
            return Err(LearningError::InvalidData(
                "cannot score an empty set".to_string(),
            ));
        }

        let n = actual.len() as f64;
        let mse = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n;
        let mae = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / n;

        Ok(Self {
            r2: r2_score(actual, predicted),
            mse,
            rmse: mse.sqrt(),
            mae,
            n_samples: actual.len(),
        })
    }
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// A constant `actual` has no variance to explain: a perfect prediction
/// scores 1.0 and anything else 0.0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Information about a [`ModelBuilder`](crate::ModelBuilder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Names of the feature columns in the order expected by the model.
    pub features: Vec<String>,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub target_column: String,
    pub random_seed: u64,

    /// Base learners feeding the meta-learner.
    pub base_learners: Vec<String>,
    pub meta_learner: String,

    /// Width of the encoded feature matrix; zero before fitting.
    pub encoded_width: usize,

    pub is_fitted: bool,

    /// Partition sizes; `None` for a builder restored from an artifact.
    pub split: Option<SplitSizes>,

    /// When the artifact was written, for restored builders.
    pub created_at: Option<DateTime<Utc>>,
}
