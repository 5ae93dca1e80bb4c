//! The fitted unit: column transformer followed by the stacked regressor.

use crate::config::ModelConfig;
use crate::error::{LearningError, Result, ResultExt};
use crate::estimators::{
    BaseLearner, DecisionTreeRegressor, GradientBoostingRegressor, KNeighborsRegressor,
    RandomForestRegressor, Regressor, StackingRegressor,
};
use crate::transform::ColumnTransformer;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Column transformer feeding a stacking regressor.
///
/// Built unfit from a [`ModelConfig`]; [`fit`](Self::fit) returns a fitted
/// copy and leaves `self` untouched, so a failed fit never leaves a
/// half-trained pipeline behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    transformer: ColumnTransformer,
    model: StackingRegressor,
}

impl Pipeline {
    /// The unfit pipeline described by `config`. Every randomized learner is
    /// seeded with `config.random_seed`.
    pub fn new(config: &ModelConfig) -> Self {
        let params = &config.ensemble;
        let seed = config.random_seed;

        let base = vec![
            BaseLearner::GradientBoosting(
                GradientBoostingRegressor::new(params.boosting).with_random_state(seed),
            ),
            BaseLearner::DecisionTree(DecisionTreeRegressor::new(params.tree).with_random_state(seed)),
            BaseLearner::Knn(KNeighborsRegressor::new(params.knn)),
        ];
        let meta = RandomForestRegressor::new(params.forest).with_random_state(seed);

        Self {
            transformer: ColumnTransformer::new(
                config.numeric_features.clone(),
                config.categorical_features.clone(),
            ),
            model: StackingRegressor::new(base, meta, params.cv_folds),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.transformer.is_fitted() && self.model.is_fitted()
    }

    pub fn transformer(&self) -> &ColumnTransformer {
        &self.transformer
    }

    pub fn model(&self) -> &StackingRegressor {
        &self.model
    }

    /// Fit a copy of this pipeline on `x` and `y`.
    pub fn fit(&self, x: &DataFrame, y: &Array1<f64>) -> Result<Pipeline> {
        let mut fitted = self.clone();
        fitted.transformer.fit(x).context("Fitting column transformer")?;
        let encoded = fitted.transformer.transform(x)?;
        fitted.model.fit(&encoded, y)?;
        Ok(fitted)
    }

    /// One prediction per row of `x`.
    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(LearningError::NotFitted);
        }
        let encoded = self.transformer.transform(x)?;
        self.model.predict(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnsembleParams;
    use polars::prelude::*;

    fn tiny_config() -> ModelConfig {
        let mut ensemble = EnsembleParams::default();
        ensemble.boosting.n_estimators = 10;
        ensemble.forest.n_estimators = 10;
        ensemble.cv_folds = 3;
        ModelConfig::builder()
            .numeric_features(["distance_miles"])
            .categorical_features(["City"])
            .target_column("minutes")
            .ensemble(ensemble)
            .build()
            .unwrap()
    }

    fn orders(n: usize) -> (DataFrame, Array1<f64>) {
        let distance: Vec<f64> = (0..n).map(|i| (i % 17) as f64).collect();
        let city: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "Urban" } else { "Metropolitian" }).collect();
        let y = distance
            .iter()
            .zip(&city)
            .map(|(d, c)| 10.0 + 2.0 * d + if *c == "Urban" { 5.0 } else { 0.0 })
            .collect();
        (df!("distance_miles" => distance, "City" => city).unwrap(), y)
    }

    #[test]
    fn test_new_pipeline_is_unfit() {
        let pipeline = Pipeline::new(&tiny_config());
        assert!(!pipeline.is_fitted());
        assert_eq!(pipeline.model().base_learners().len(), 3);
        assert_eq!(pipeline.model().cv_folds(), 3);
    }

    #[test]
    fn test_fit_returns_fitted_copy() {
        let (x, y) = orders(60);
        let pipeline = Pipeline::new(&tiny_config());
        let fitted = pipeline.fit(&x, &y).unwrap();

        assert!(!pipeline.is_fitted());
        assert!(fitted.is_fitted());
        assert_eq!(fitted.predict(&x).unwrap().len(), 60);
    }

    #[test]
    fn test_failed_fit_reports_column() {
        let (x, y) = orders(30);
        let x = x.drop("City").unwrap();
        let err = Pipeline::new(&tiny_config()).fit(&x, &y).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = orders(5);
        let err = Pipeline::new(&tiny_config()).predict(&x).unwrap_err();
        assert!(matches!(err, LearningError::NotFitted));
    }
}
