//! Random forest regressor.

use super::tree::{DecisionTreeRegressor, TreeParams};
use super::{Regressor, check_training_data};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    /// Fit each tree on a bootstrap sample instead of the full training set.
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            bootstrap: true,
        }
    }
}

/// Averages the predictions of independently grown trees.
///
/// A master RNG seeded with the random state draws one seed per tree; each
/// tree then draws its bootstrap sample and feature order from its own seed.
/// Trees are grown in parallel, and the result is the same for any thread
/// count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    seed: u64,
    trees: Vec<DecisionTreeRegressor>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            seed: 0,
            trees: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "random forest needs at least one tree".to_string(),
            ));
        }

        let n = x.nrows();
        let mut master = StdRng::seed_from_u64(self.seed);
        let tree_seeds: Vec<u64> = (0..self.params.n_estimators).map(|_| master.r#gen()).collect();
        let tree_params = TreeParams::with_max_depth(self.params.max_depth);
        let bootstrap = self.params.bootstrap;

        debug!(
            "Growing {} trees (max_depth={}, bootstrap={}) on {} rows",
            tree_seeds.len(),
            self.params.max_depth,
            bootstrap,
            n
        );

        let trees = tree_seeds
            .into_par_iter()
            .map(|tree_seed| -> Result<DecisionTreeRegressor> {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let rows: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut tree = DecisionTreeRegressor::new(tree_params).with_random_state(rng.r#gen());
                tree.fit_rows(x, y, rows)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(LearningError::NotFitted);
        }

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut total = Array1::<f64>::zeros(x.nrows());
        for prediction in &per_tree {
            total += prediction;
        }
        Ok(total / self.trees.len() as f64)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
