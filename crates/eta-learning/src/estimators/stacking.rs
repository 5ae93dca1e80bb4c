//! Stacked generalization.

use super::{
    DecisionTreeRegressor, GradientBoostingRegressor, KNeighborsRegressor, RandomForestRegressor,
    Regressor, check_training_data,
};
use crate::error::{LearningError, Result, ResultExt};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A first-level learner of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaseLearner {
    GradientBoosting(GradientBoostingRegressor),
    DecisionTree(DecisionTreeRegressor),
    Knn(KNeighborsRegressor),
}

impl BaseLearner {
    pub fn name(&self) -> &'static str {
        match self {
            BaseLearner::GradientBoosting(_) => "GradientBoosting",
            BaseLearner::DecisionTree(_) => "DecisionTree",
            BaseLearner::Knn(_) => "Knn",
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            BaseLearner::GradientBoosting(m) => m,
            BaseLearner::DecisionTree(m) => m,
            BaseLearner::Knn(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            BaseLearner::GradientBoosting(m) => m,
            BaseLearner::DecisionTree(m) => m,
            BaseLearner::Knn(m) => m,
        }
    }
}

impl Regressor for BaseLearner {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let name = self.name();
        self.as_regressor_mut().fit(x, y).context(format!("Fitting {name}"))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.as_regressor().is_fitted()
    }
}

/// Base learners whose out-of-fold predictions train a meta-learner.
///
/// Fitting runs in three phases:
/// 1. The training rows are cut into `cv_folds` contiguous folds; for each
///    fold, fresh copies of the base learners are fit on the other folds and
///    predict the held-out one. Folds run in parallel.
/// 2. The meta-learner is fit on those out-of-fold predictions, one column
///    per base learner.
/// 3. The base learners are refit on all training rows.
///
/// At prediction time the refit base learners feed the meta-learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingRegressor {
    base: Vec<BaseLearner>,
    meta: RandomForestRegressor,
    cv_folds: usize,
}

impl StackingRegressor {
    pub fn new(base: Vec<BaseLearner>, meta: RandomForestRegressor, cv_folds: usize) -> Self {
        Self { base, meta, cv_folds }
    }

    pub fn base_learners(&self) -> &[BaseLearner] {
        &self.base
    }

    pub fn meta_learner(&self) -> &RandomForestRegressor {
        &self.meta
    }

    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    /// One column of predictions per base learner.
    fn base_predictions(learners: &[BaseLearner], x: &Array2<f64>) -> Result<Array2<f64>> {
        let columns = learners
            .par_iter()
            .map(|learner| learner.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut out = Array2::zeros((x.nrows(), learners.len()));
        for (j, column) in columns.iter().enumerate() {
            out.column_mut(j).assign(column);
        }
        Ok(out)
    }

    fn out_of_fold_predictions(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array2<f64>> {
        let folds = kfold_bounds(x.nrows(), self.cv_folds);

        let per_fold = folds
            .par_iter()
            .enumerate()
            .map(|(fold, &(start, end))| -> Result<Array2<f64>> {
                let train_rows: Vec<usize> = (0..start).chain(end..x.nrows()).collect();
                let held_out: Vec<usize> = (start..end).collect();

                let x_train = x.select(Axis(0), &train_rows);
                let y_train = y.select(Axis(0), &train_rows);
                let x_held = x.select(Axis(0), &held_out);

                let mut learners = self.base.clone();
                for learner in &mut learners {
                    learner.fit(&x_train, &y_train).context(format!("Stacking fold {fold}"))?;
                }
                debug!("Stacking fold {} fit on {} rows", fold, train_rows.len());
                Self::base_predictions(&learners, &x_held)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut oof = Array2::zeros((x.nrows(), self.base.len()));
        for (&(start, end), predictions) in folds.iter().zip(&per_fold) {
            oof.slice_mut(ndarray::s![start..end, ..]).assign(predictions);
        }
        Ok(oof)
    }
}

impl Regressor for StackingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.base.is_empty() {
            return Err(LearningError::InvalidConfig(
                "stacking needs at least one base learner".to_string(),
            ));
        }
        if self.cv_folds < 2 || x.nrows() < self.cv_folds {
            return Err(LearningError::InvalidData(format!(
                "cannot build {} stacking folds from {} training rows",
                self.cv_folds,
                x.nrows()
            )));
        }

        info!(
            "Fitting stack of {} base learners with {}-fold out-of-fold predictions",
            self.base.len(),
            self.cv_folds
        );
        let oof = self.out_of_fold_predictions(x, y)?;

        let mut meta = self.meta.clone();
        meta.fit(&oof, y).context("Fitting meta-learner")?;

        let mut base = self.base.clone();
        base.par_iter_mut()
            .map(|learner| learner.fit(x, y))
            .collect::<Result<Vec<_>>>()?;

        self.base = base;
        self.meta = meta;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(LearningError::NotFitted);
        }
        let meta_features = Self::base_predictions(&self.base, x)?;
        self.meta.predict(&meta_features)
    }

    fn is_fitted(&self) -> bool {
        self.meta.is_fitted() && self.base.iter().all(|learner| learner.is_fitted())
    }
}

/// `[start, end)` row ranges of `k` contiguous folds over `n` rows. The first
/// `n % k` folds hold one extra row.
pub(crate) fn kfold_bounds(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|fold| {
            let size = base + usize::from(fold < extra);
            let bounds = (start, start + size);
            start += size;
            bounds
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{BoostingParams, ForestParams, KnnParams, TreeParams, test_data};
    use ndarray::array;

    fn small_stack(seed: u64) -> StackingRegressor {
        StackingRegressor::new(
            vec![
                BaseLearner::GradientBoosting(
                    GradientBoostingRegressor::new(BoostingParams {
                        n_estimators: 20,
                        ..BoostingParams::default()
                    })
                    .with_random_state(seed),
                ),
                BaseLearner::DecisionTree(
                    DecisionTreeRegressor::new(TreeParams::with_max_depth(5)).with_random_state(seed),
                ),
                BaseLearner::Knn(KNeighborsRegressor::new(KnnParams::default())),
            ],
            RandomForestRegressor::new(ForestParams {
                n_estimators: 15,
                max_depth: 5,
                bootstrap: true,
            })
            .with_random_state(seed),
            5,
        )
    }

    #[test]
    fn test_kfold_bounds() {
        assert_eq!(kfold_bounds(10, 5), vec![(0, 2), (2, 4), (4, 6), (6, 8), (8, 10)]);
        assert_eq!(kfold_bounds(7, 3), vec![(0, 3), (3, 5), (5, 7)]);
    }

    #[test]
    fn test_stack_fits_linear_signal() {
        let (x, y) = test_data::linear(250, 21);
        let mut stack = small_stack(0);
        stack.fit(&x, &y).unwrap();

        assert!(stack.is_fitted());
        let (x_test, y_test) = test_data::linear(80, 22);
        assert!(test_data::r2(&y_test, &stack.predict(&x_test).unwrap()) > 0.8);
    }

    #[test]
    fn test_stack_is_deterministic() {
        let (x, y) = test_data::linear(100, 3);
        let mut a = small_stack(5);
        let mut b = small_stack(5);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        let mut stack = small_stack(0);
        let err = stack.fit(&array![[1.0], [2.0], [3.0]], &array![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
        assert!(!stack.is_fitted());
    }

    #[test]
    fn test_predict_before_fit() {
        let stack = small_stack(0);
        assert!(matches!(stack.predict(&array![[1.0, 2.0]]), Err(LearningError::NotFitted)));
    }
}
