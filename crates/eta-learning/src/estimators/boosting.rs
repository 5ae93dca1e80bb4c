//! Least-squares gradient boosting.

use super::tree::{DecisionTreeRegressor, TreeParams};
use super::{Regressor, check_training_data};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of boosting stages.
    pub n_estimators: usize,
    /// Shrinkage applied to every stage's contribution.
    pub learning_rate: f64,
    /// Depth of each stage's tree.
    pub max_depth: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }
}

/// Additive model of shallow trees, each fit to the residuals of the
/// stages before it.
///
/// Prediction is `init + learning_rate · Σ tree(x)`, where `init` is the
/// training-target mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: BoostingParams,
    seed: u64,
    init: Option<f64>,
    stages: Vec<DecisionTreeRegressor>,
}

impl GradientBoostingRegressor {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            seed: 0,
            init: None,
            stages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let BoostingParams {
            n_estimators,
            learning_rate,
            max_depth,
        } = self.params;
        if n_estimators == 0 || !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(LearningError::InvalidConfig(format!(
                "gradient boosting needs n_estimators >= 1 and a positive learning rate (got {n_estimators}, {learning_rate})"
            )));
        }

        let init = y.mean().unwrap_or(0.0);
        let mut current = Array1::from_elem(y.len(), init);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut stages = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            let residual = y - &current;
            let mut tree = DecisionTreeRegressor::new(TreeParams::with_max_depth(max_depth))
                .with_random_state(rng.r#gen());
            tree.fit(x, &residual)?;
            current.scaled_add(learning_rate, &tree.predict(x)?);
            stages.push(tree);
        }

        debug!(
            "Boosted {} stages, training MSE {:.4}",
            stages.len(),
            (y - &current).mapv(|r| r * r).mean().unwrap_or(0.0)
        );

        self.init = Some(init);
        self.stages = stages;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let init = self.init.ok_or(LearningError::NotFitted)?;
        let mut prediction = Array1::from_elem(x.nrows(), init);
        for tree in &self.stages {
            prediction.scaled_add(self.params.learning_rate, &tree.predict(x)?);
        }
        Ok(prediction)
    }

    fn is_fitted(&self) -> bool {
        self.init.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::test_data;
    use ndarray::array;

    #[test]
    fn test_boosting_fits_linear_signal() {
        let (x, y) = test_data::linear(300, 12);
        let mut model = GradientBoostingRegressor::new(BoostingParams::default());
        model.fit(&x, &y).unwrap();

        assert_eq!(model.n_stages(), 100);
        let (x_test, y_test) = test_data::linear(100, 13);
        assert!(test_data::r2(&y_test, &model.predict(&x_test).unwrap()) > 0.9);
    }

    #[test]
    fn test_more_stages_fit_training_data_better() {
        let (x, y) = test_data::linear(200, 4);
        let mse = |n_estimators| {
            let mut model = GradientBoostingRegressor::new(BoostingParams {
                n_estimators,
                ..BoostingParams::default()
            });
            model.fit(&x, &y).unwrap();
            (&y - &model.predict(&x).unwrap()).mapv(|r| r * r).mean().unwrap()
        };
        assert!(mse(50) < mse(5));
    }

    #[test]
    fn test_single_stage_is_shrunk_towards_mean() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 10.0];
        let mut model = GradientBoostingRegressor::new(BoostingParams {
            n_estimators: 1,
            learning_rate: 0.1,
            max_depth: 1,
        });
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert!((pred[0] - 4.5).abs() < 1e-12);
        assert!((pred[1] - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_learning_rate() {
        let mut model = GradientBoostingRegressor::new(BoostingParams {
            learning_rate: 0.0,
            ..BoostingParams::default()
        });
        let err = model.fit(&array![[1.0]], &array![1.0]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert!(!model.is_fitted());
    }
}
