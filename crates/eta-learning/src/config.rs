//! Configuration types for the model builder.
//!
//! This module provides [`ModelConfig`] and its builder, plus the
//! [`EnsembleParams`] describing every learner of the stack.
//!
//! # Example
//!
//! ```
//! use eta_learning::ModelConfig;
//!
//! let config = ModelConfig::builder()
//!     .numeric_features(["distance_miles", "Delivery_person_Age"])
//!     .categorical_features(["City"])
//!     .random_seed(7)
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.features, ["distance_miles", "Delivery_person_Age", "City"]);
//! ```

use crate::error::LearningError;
use crate::estimators::{BoostingParams, ForestParams, KnnParams, TreeParams};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default target column of the delivery data.
pub const DEFAULT_TARGET: &str = "Time_taken (min)";

/// Numeric predictors of the cleaned delivery table.
pub const DELIVERY_NUMERIC_FEATURES: [&str; 5] = [
    "Delivery_person_Age",
    "Delivery_person_Ratings",
    "Vehicle_condition",
    "multiple_deliveries",
    "distance_miles",
];

/// Categorical predictors of the cleaned delivery table.
pub const DELIVERY_CATEGORICAL_FEATURES: [&str; 6] = [
    "Weatherconditions",
    "Road_traffic_density",
    "Type_of_order",
    "Type_of_vehicle",
    "Festival",
    "City",
];

/// Hyperparameters of the stacked ensemble.
///
/// Three base learners (gradient boosting, decision tree, k-nearest
/// neighbours) feed a random forest meta-learner through `cv_folds`-fold
/// out-of-fold predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleParams {
    /// Gradient boosting base learner (default: 100 stages, rate 0.1, depth 3).
    pub boosting: BoostingParams,

    /// Decision tree base learner (default: depth 10).
    pub tree: TreeParams,

    /// k-nearest-neighbours base learner (default: k = 6).
    pub knn: KnnParams,

    /// Random forest meta-learner (default: 100 trees, depth 10).
    pub forest: ForestParams,

    /// Folds used to build the meta-learner's training features (default: 5).
    pub cv_folds: usize,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            boosting: BoostingParams::default(),
            tree: TreeParams::with_max_depth(10),
            knn: KnnParams::default(),
            forest: ForestParams::default(),
            cv_folds: 5,
        }
    }
}

impl EnsembleParams {
    fn validate(&self) -> Result<(), LearningError> {
        let positive = [
            ("boosting.n_estimators", self.boosting.n_estimators),
            ("boosting.max_depth", self.boosting.max_depth),
            ("tree.max_depth", self.tree.max_depth),
            ("knn.n_neighbors", self.knn.n_neighbors),
            ("forest.n_estimators", self.forest.n_estimators),
            ("forest.max_depth", self.forest.max_depth),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(LearningError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }

        if !self.boosting.learning_rate.is_finite() || self.boosting.learning_rate <= 0.0 {
            return Err(LearningError::InvalidConfig(
                "boosting.learning_rate must be a positive number".to_string(),
            ));
        }

        if self.cv_folds < 2 {
            return Err(LearningError::InvalidConfig(
                "cv_folds must be at least 2".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for [`ModelBuilder`](crate::ModelBuilder).
///
/// # Validation
///
/// [`validate()`](Self::validate) (run by the builder and by every
/// `ModelBuilder` factory) checks:
/// - `features` is non-empty and has no duplicates
/// - `numeric_features` and `categorical_features` are disjoint subsets of
///   `features`; a feature in neither list is carried in X but not encoded
/// - `target_column` is not a feature
/// - `holdout_fraction` and `validation_share` are in `(0.0, 1.0)`
/// - every tree count, depth and `k` is at least 1, and `cv_folds` at least 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ordered feature columns.
    pub features: Vec<String>,

    /// Features standardized before modelling.
    pub numeric_features: Vec<String>,

    /// Features one-hot encoded before modelling.
    pub categorical_features: Vec<String>,

    /// Column holding delivery time in minutes (default: "Time_taken (min)").
    pub target_column: String,

    /// Seed shared by both split shuffles and every randomized learner (default: 0).
    pub random_seed: u64,

    /// Fraction of rows held out from training (default: 0.1).
    pub holdout_fraction: f64,

    /// Share of the holdout used for validation; the rest is the test
    /// partition (default: 0.5).
    pub validation_share: f64,

    pub ensemble: EnsembleParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let numeric: Vec<String> = DELIVERY_NUMERIC_FEATURES.iter().map(|s| s.to_string()).collect();
        let categorical: Vec<String> = DELIVERY_CATEGORICAL_FEATURES.iter().map(|s| s.to_string()).collect();
        Self {
            features: numeric.iter().chain(&categorical).cloned().collect(),
            numeric_features: numeric,
            categorical_features: categorical,
            target_column: DEFAULT_TARGET.to_string(),
            random_seed: 0,
            holdout_fraction: 0.1,
            validation_share: 0.5,
            ensemble: EnsembleParams::default(),
        }
    }
}

impl ModelConfig {
    #[must_use]
    pub fn builder() -> ModelConfigBuilder {
        ModelConfigBuilder::default()
    }

    /// Check the feature lists, fractions and ensemble parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.features.is_empty() {
            return Err(LearningError::InvalidConfig(
                "at least one feature is required".to_string(),
            ));
        }

        let mut features = HashSet::new();
        for feature in &self.features {
            if !features.insert(feature.as_str()) {
                return Err(LearningError::InvalidConfig(format!(
                    "feature '{feature}' is listed twice"
                )));
            }
        }

        let numeric: HashSet<&str> = self.numeric_features.iter().map(String::as_str).collect();
        let categorical: HashSet<&str> = self.categorical_features.iter().map(String::as_str).collect();

        if let Some(both) = numeric.intersection(&categorical).next() {
            return Err(LearningError::InvalidConfig(format!(
                "'{both}' is both numeric and categorical"
            )));
        }
        if let Some(stray) = numeric.union(&categorical).find(|c| !features.contains(*c)) {
            return Err(LearningError::InvalidConfig(format!(
                "'{stray}' is typed but not in the feature list"
            )));
        }

        if self.target_column.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "target_column must not be empty".to_string(),
            ));
        }
        if features.contains(self.target_column.as_str()) {
            return Err(LearningError::InvalidConfig(format!(
                "target '{}' cannot also be a feature",
                self.target_column
            )));
        }

        for (name, value) in [
            ("holdout_fraction", self.holdout_fraction),
            ("validation_share", self.validation_share),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(LearningError::InvalidConfig(format!(
                    "{name} must be between 0.0 and 1.0 (exclusive), got {value}"
                )));
            }
        }

        self.ensemble.validate()
    }
}

/// Builder for [`ModelConfig`].
///
/// Starts from [`ModelConfig::default()`]. When only the numeric and
/// categorical lists are set, the feature order is numeric followed by
/// categorical; [`features`](Self::features) overrides that order.
#[derive(Debug, Clone, Default)]
pub struct ModelConfigBuilder {
    config: ModelConfig,
    features: Option<Vec<String>>,
}

impl ModelConfigBuilder {
    /// Set the ordered feature list explicitly.
    #[must_use]
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn numeric_features<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.numeric_features = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn categorical_features<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.categorical_features = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.config.target_column = column.into();
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Fraction of rows held out from training (default: 0.1).
    #[must_use]
    pub fn holdout_fraction(mut self, fraction: f64) -> Self {
        self.config.holdout_fraction = fraction;
        self
    }

    /// Share of the holdout used for validation (default: 0.5).
    #[must_use]
    pub fn validation_share(mut self, share: f64) -> Self {
        self.config.validation_share = share;
        self
    }

    #[must_use]
    pub fn ensemble(mut self, ensemble: EnsembleParams) -> Self {
        self.config.ensemble = ensemble;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any rule listed on
    /// [`ModelConfig`] is violated.
    pub fn build(self) -> Result<ModelConfig, LearningError> {
        let mut config = self.config;
        config.features = match self.features {
            Some(features) => features,
            None => config
                .numeric_features
                .iter()
                .chain(&config.categorical_features)
                .cloned()
                .collect(),
        };
        config.validate()?;
        Ok(config)
    }
}
