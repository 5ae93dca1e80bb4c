//! k-nearest-neighbours regressor.

use super::{Regressor, check_training_data, check_width};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnnParams {
    pub n_neighbors: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self { n_neighbors: 6 }
    }
}

/// Predicts the unweighted mean target of the `k` training rows closest in
/// Euclidean distance.
///
/// Distances are computed brute force; ties are broken by training row order.
/// When fewer than `k` training rows exist every row is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    params: KnnParams,
    x_train: Option<Array2<f64>>,
    y_train: Array1<f64>,
}

impl KNeighborsRegressor {
    pub fn new(params: KnnParams) -> Self {
        Self {
            params,
            x_train: None,
            y_train: Array1::zeros(0),
        }
    }

    pub fn params(&self) -> &KnnParams {
        &self.params
    }

    /// Neighbours actually consulted per query.
    pub fn effective_k(&self) -> usize {
        self.params.n_neighbors.min(self.y_train.len())
    }
}

impl Regressor for KNeighborsRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.params.n_neighbors == 0 {
            return Err(LearningError::InvalidConfig(
                "n_neighbors must be at least 1".to_string(),
            ));
        }
        if x.nrows() < self.params.n_neighbors {
            debug!(
                "Only {} training rows for k={}; using all of them",
                x.nrows(),
                self.params.n_neighbors
            );
        }

        self.x_train = Some(x.clone());
        self.y_train = y.clone();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let train = self.x_train.as_ref().ok_or(LearningError::NotFitted)?;
        check_width(x, train.ncols())?;
        let k = self.effective_k();

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let query = x.row(i);
                let mut distances: Vec<(f64, usize)> = train
                    .rows()
                    .into_iter()
                    .enumerate()
                    .map(|(j, row)| {
                        let d: f64 = row.iter().zip(query.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                        (d, j)
                    })
                    .collect();

                let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
                if k < distances.len() {
                    distances.select_nth_unstable_by(k - 1, by_distance);
                    distances.truncate(k);
                }

                distances.iter().map(|&(_, j)| self.y_train[j]).sum::<f64>() / k as f64
            })
            .collect();

        Ok(Array1::from(predictions))
    }

    fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }
}
