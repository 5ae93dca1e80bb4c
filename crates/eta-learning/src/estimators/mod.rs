//! Regression estimators behind the stacked ensemble.
//!
//! Every estimator follows the same lifecycle: construct it from its
//! parameters and a seed, [`fit`](Regressor::fit) it on a dense feature
//! matrix, then [`predict`](Regressor::predict). Fitting replaces all learned
//! state only once it has fully succeeded. Fitted estimators are plain data
//! and serialize with serde, so they travel inside the model artifact.
//!
//! - [`DecisionTreeRegressor`]: CART with squared-error splits
//! - [`RandomForestRegressor`]: bootstrap-aggregated trees, fit in parallel
//! - [`GradientBoostingRegressor`]: least-squares boosting of shallow trees
//! - [`KNeighborsRegressor`]: brute-force Euclidean neighbours
//! - [`StackingRegressor`]: base learners feeding a meta-learner through
//!   out-of-fold predictions

mod boosting;
mod forest;
mod knn;
mod stacking;
mod tree;

pub use boosting::{BoostingParams, GradientBoostingRegressor};
pub use forest::{ForestParams, RandomForestRegressor};
pub use knn::{KNeighborsRegressor, KnnParams};
pub use stacking::{BaseLearner, StackingRegressor};
pub use tree::{DecisionTreeRegressor, TreeParams};

use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};

/// A regressor over dense `f64` feature matrices.
pub trait Regressor: Send + Sync {
    /// Learn from `x` (one row per sample) and targets `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`.
    ///
    /// # Errors
    ///
    /// [`LearningError::NotFitted`] before [`fit`](Self::fit) has succeeded.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;
}

/// Reject empty or misaligned training data.
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(LearningError::InvalidData(
            "cannot fit on an empty training set".to_string(),
        ));
    }
    if x.nrows() != y.len() {
        return Err(LearningError::InvalidData(format!(
            "feature matrix has {} rows but target has {} values",
            x.nrows(),
            y.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(LearningError::InvalidData(
            "target contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Reject a prediction matrix whose width differs from the training one.
pub(crate) fn check_width(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(LearningError::InvalidData(format!(
            "expected {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_data {
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// `y = 3·x0 - 2·x1 + noise` over uniform features in [0, 10).
    pub fn linear(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 2), |_| rng.gen_range(0.0..10.0));
        let y = x
            .rows()
            .into_iter()
            .map(|row| 3.0 * row[0] - 2.0 * row[1] + rng.gen_range(-0.5..0.5))
            .collect();
        (x, y)
    }

    pub fn r2(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
        let mean = y.mean().unwrap_or(0.0);
        let ss_res: f64 = y.iter().zip(pred).map(|(a, b)| (a - b).powi(2)).sum();
        let ss_tot: f64 = y.iter().map(|a| (a - mean).powi(2)).sum();
        1.0 - ss_res / ss_tot
    }
}
