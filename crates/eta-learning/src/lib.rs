//! eta-learning: stacked-ensemble delivery time regression.
//!
//! This crate trains, evaluates and persists the model that estimates how many
//! minutes a food delivery takes, from a table cleaned by
//! [`eta_processing`].
//!
//! # Features
//!
//! - **Seeded partitioning**: 90/5/5 train/validation/test in two shuffled stages
//! - **Column transformer**: standardized numeric features, one-hot categorical
//!   features (unseen categories encode as zeros)
//! - **Stacked ensemble**: gradient boosting, decision tree and k-nearest
//!   neighbours feeding a random forest through out-of-fold predictions
//! - **Metrics**: R², MSE, RMSE and MAE on any labelled table
//! - **Persistence**: one self-describing JSON artifact per model
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eta_learning::{ModelBuilder, ModelConfig};
//! use eta_processing::{CleaningConfig, Preprocessor};
//!
//! let cleaned = Preprocessor::from_csv("deliveries.csv", CleaningConfig::default())?.clean()?;
//!
//! let mut builder = ModelBuilder::for_training(&cleaned, ModelConfig::default())?;
//! builder.fit()?;
//!
//! let metrics = builder.evaluate(None)?;
//! println!("test R² {:.3}, MAE {:.2} min", metrics.r2, metrics.mae);
//!
//! builder.save("stacking_model.json")?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! cleaned DataFrame
//!       │
//!       ▼
//! ModelBuilder::for_training ──► DataSplit (train / validation / test)
//!       │
//!       ▼ fit()
//! Pipeline = ColumnTransformer ──► StackingRegressor
//!                                   ├── GradientBoostingRegressor ─┐
//!                                   ├── DecisionTreeRegressor ─────┼──► RandomForestRegressor
//!                                   └── KNeighborsRegressor ───────┘
//!       │
//!       ▼ save() / load()
//! ModelArtifact (JSON)
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError):
//!
//! - [`LearningError::NotFitted`] - predict, score or save before fit
//! - [`LearningError::ColumnNotFound`] - a feature or the target is missing
//! - [`LearningError::NoTrainingData`] - fit on a builder restored from disk
//! - [`LearningError::UnsupportedArtifact`] - artifact from another format version
//!
//! # Thread Safety
//!
//! [`ModelBuilder`] is `Send + Sync`. Forest growing, stacking folds and
//! neighbour queries run on the rayon thread pool; results do not depend on
//! the number of threads.

pub mod config;
pub mod error;
pub mod estimators;
pub mod model;
pub mod pipeline;
pub mod split;
pub mod transform;
pub mod types;

mod utils;

// Re-exports for convenient access
pub use config::{
    DEFAULT_TARGET, DELIVERY_CATEGORICAL_FEATURES, DELIVERY_NUMERIC_FEATURES, EnsembleParams, ModelConfig,
    ModelConfigBuilder,
};
pub use error::{LearningError, Result as LearningResult, ResultExt};
pub use estimators::Regressor;
pub use model::{ARTIFACT_FORMAT_VERSION, ModelArtifact, ModelBuilder};
pub use pipeline::Pipeline;
pub use split::{DataSplit, Partition, SplitSizes};
pub use transform::ColumnTransformer;
pub use types::{Metrics, ModelInfo, r2_score};
