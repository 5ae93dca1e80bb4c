//! The model builder: partitions, fits, evaluates and persists the pipeline.
//!
//! A [`ModelBuilder`] is created in one of two ways:
//!
//! 1. **For training**: [`ModelBuilder::for_training`] takes a cleaned table,
//!    extracts features and target and performs the seeded 90/5/5 split.
//!    Call [`fit()`](ModelBuilder::fit) next.
//! 2. **From an artifact**: [`ModelBuilder::load`] (or
//!    [`from_artifact`](ModelBuilder::from_artifact)) restores a fitted
//!    pipeline. No partitions exist, so `predict`/`score` need explicit data.
//!
//! # Example
//!
//! ```rust,ignore
//! use eta_learning::{ModelBuilder, ModelConfig};
//!
//! let mut builder = ModelBuilder::for_training(&cleaned, ModelConfig::default())?;
//! builder.fit()?;
//! println!("test R² = {:.3}", builder.score(None)?);
//! builder.save("stacking_model.json")?;
//!
//! let restored = ModelBuilder::load("stacking_model.json")?;
//! let minutes = restored.predict(Some(&new_orders))?;
//! ```
//!
//! # Artifact format
//!
//! One JSON document holding the format version, creation time, the full
//! [`ModelConfig`] (feature lists, target, seed, ensemble parameters) and the
//! fitted [`Pipeline`]. Loading rejects any other format version.

use crate::config::ModelConfig;
use crate::error::{LearningError, Result, ResultExt};
use crate::pipeline::Pipeline;
use crate::split::{DataSplit, Partition};
use crate::types::{Metrics, ModelInfo};
use crate::utils::{float_values, require_columns};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Version written into every artifact.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Everything needed to restore a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub config: ModelConfig,
    pub pipeline: Pipeline,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

/// Builds, fits, evaluates and persists the delivery-time model.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    config: ModelConfig,
    partitions: Option<DataSplit>,
    pipeline: Pipeline,
    created_at: Option<DateTime<Utc>>,
}

static_assertions::assert_impl_all!(ModelBuilder: Send, Sync);

impl ModelBuilder {
    /// Prepare training on a cleaned table.
    ///
    /// Checks that every feature and the target exist, takes the feature
    /// columns in configured order as X and the target as `f64` y, and splits
    /// both into train, validation and test partitions with the configured
    /// seed.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidConfig`] if `config` fails validation
    /// - [`LearningError::ColumnNotFound`] if a feature or the target is absent
    /// - [`LearningError::InvalidData`] if the target has missing values or
    ///   the table is too small to split
    pub fn for_training(df: &DataFrame, config: ModelConfig) -> Result<Self> {
        config.validate()?;
        require_columns(df, config.features.iter().chain(std::iter::once(&config.target_column)))?;

        let x = df.select(config.features.iter().map(String::as_str))?;
        let y = Array1::from(float_values(df, &config.target_column).context("Reading target column")?);

        let partitions = DataSplit::new(
            Partition { x, y },
            config.holdout_fraction,
            config.validation_share,
            config.random_seed,
        )?;
        let sizes = partitions.sizes();
        info!(
            "Split {} rows into train={} validation={} test={} (seed {})",
            df.height(),
            sizes.train,
            sizes.validation,
            sizes.test,
            config.random_seed
        );

        Ok(Self {
            pipeline: Pipeline::new(&config),
            config,
            partitions: Some(partitions),
            created_at: None,
        })
    }

    /// Restore a fitted builder from an in-memory artifact.
    ///
    /// # Errors
    ///
    /// - [`LearningError::UnsupportedArtifact`] for another format version
    /// - [`LearningError::InvalidConfig`] if the stored config is invalid
    /// - [`LearningError::InvalidData`] if the stored pipeline is not fitted
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        check_version(artifact.format_version)?;
        artifact.config.validate()?;
        if !artifact.pipeline.is_fitted() {
            return Err(LearningError::InvalidData(
                "artifact holds an unfitted pipeline".to_string(),
            ));
        }

        Ok(Self {
            config: artifact.config,
            partitions: None,
            pipeline: artifact.pipeline,
            created_at: Some(artifact.created_at),
        })
    }

    /// Read an artifact written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`LearningError::FileAccess`] if the file cannot be opened
    /// - [`LearningError::Json`] if it is not a model artifact
    /// - anything [`from_artifact`](Self::from_artifact) rejects
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LearningError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let header: ArtifactHeader = serde_json::from_str(&text)?;
        check_version(header.format_version)?;

        let artifact: ModelArtifact = serde_json::from_str(&text)?;
        let builder = Self::from_artifact(artifact)?;
        info!("Loaded model from {}", path.display());
        Ok(builder)
    }

    /// Fit the pipeline on the training partition.
    ///
    /// All or nothing: on error the builder keeps its previous pipeline.
    ///
    /// # Errors
    ///
    /// - [`LearningError::NoTrainingData`] for a builder restored from an artifact
    /// - [`LearningError::InvalidData`] if a numeric feature has missing values
    pub fn fit(&mut self) -> Result<&mut Self> {
        let train = &self.partitions.as_ref().ok_or(LearningError::NoTrainingData)?.train;

        let start = Instant::now();
        info!("Fitting stacked ensemble on {} rows...", train.len());
        let fitted = self.pipeline.fit(&train.x, &train.y)?;

        self.pipeline = fitted;
        self.created_at = None;
        info!("Model fitted in {:.2}s", start.elapsed().as_secs_f64());
        Ok(self)
    }

    /// Predict delivery minutes, one value per input row.
    ///
    /// `None` predicts the test partition.
    ///
    /// # Errors
    ///
    /// - [`LearningError::NotFitted`] before [`fit`](Self::fit)
    /// - [`LearningError::ColumnNotFound`] if `x` lacks a feature
    /// - [`LearningError::NoTrainingData`] for `None` on a restored builder
    pub fn predict(&self, x: Option<&DataFrame>) -> Result<Vec<f64>> {
        self.ensure_fitted()?;
        let x = match x {
            Some(x) => x,
            None => &self.test_partition()?.x,
        };
        require_columns(x, &self.config.features)?;

        let predictions = self.pipeline.predict(x)?;
        debug!("Predicted {} rows", predictions.len());
        Ok(predictions.to_vec())
    }

    /// R² of the predictions on `data` (features, targets); `None` scores the
    /// test partition. Never exceeds 1.0.
    pub fn score(&self, data: Option<(&DataFrame, &[f64])>) -> Result<f64> {
        self.evaluate(data).map(|metrics| metrics.r2)
    }

    /// R², MSE, RMSE and MAE on `data`; `None` evaluates the test partition.
    ///
    /// # Errors
    ///
    /// [`LearningError::InvalidData`] if the targets and rows differ in number,
    /// plus everything [`predict`](Self::predict) returns.
    pub fn evaluate(&self, data: Option<(&DataFrame, &[f64])>) -> Result<Metrics> {
        match data {
            Some((x, y)) => Metrics::compute(y, &self.predict(Some(x))?),
            None => {
                let test = self.test_partition()?;
                self.evaluate_partition(test)
            }
        }
    }

    /// Metrics on the validation partition.
    pub fn validation_metrics(&self) -> Result<Metrics> {
        let partitions = self.partitions.as_ref().ok_or(LearningError::NoTrainingData)?;
        self.evaluate_partition(&partitions.validation)
    }

    /// The fitted state as an artifact, stamped with the current time.
    pub fn to_artifact(&self) -> Result<ModelArtifact> {
        self.ensure_fitted()?;
        Ok(ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            config: self.config.clone(),
            pipeline: self.pipeline.clone(),
        })
    }

    /// Write the fitted pipeline and its metadata as one JSON artifact.
    ///
    /// # Errors
    ///
    /// - [`LearningError::NotFitted`] before [`fit`](Self::fit)
    /// - [`LearningError::FileAccess`] if `path` cannot be created
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let artifact = self.to_artifact()?;

        let file = File::create(path).map_err(|source| LearningError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &artifact)?;
        writer.flush()?;

        info!("Saved model to {}", path.display());
        Ok(())
    }

    /// `(x_train, x_test, y_train, y_test)`.
    pub fn split(&self) -> Result<(&DataFrame, &DataFrame, &Array1<f64>, &Array1<f64>)> {
        let p = self.partitions.as_ref().ok_or(LearningError::NoTrainingData)?;
        Ok((&p.train.x, &p.test.x, &p.train.y, &p.test.y))
    }

    /// All three partitions; `None` for a restored builder.
    pub fn partitions(&self) -> Option<&DataSplit> {
        self.partitions.as_ref()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn is_fitted(&self) -> bool {
        self.pipeline.is_fitted()
    }

    pub fn info(&self) -> ModelInfo {
        let model = self.pipeline.model();
        ModelInfo {
            features: self.config.features.clone(),
            numeric_features: self.config.numeric_features.clone(),
            categorical_features: self.config.categorical_features.clone(),
            target_column: self.config.target_column.clone(),
            random_seed: self.config.random_seed,
            base_learners: model.base_learners().iter().map(|b| b.name().to_string()).collect(),
            meta_learner: "RandomForest".to_string(),
            encoded_width: self.pipeline.transformer().output_width(),
            is_fitted: self.is_fitted(),
            split: self.partitions.as_ref().map(DataSplit::sizes),
            created_at: self.created_at,
        }
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(LearningError::NotFitted)
        }
    }

    fn test_partition(&self) -> Result<&Partition> {
        self.partitions
            .as_ref()
            .map(|p| &p.test)
            .ok_or(LearningError::NoTrainingData)
    }

    fn evaluate_partition(&self, partition: &Partition) -> Result<Metrics> {
        let predicted = self.predict(Some(&partition.x))?;
        Metrics::compute(&partition.y.to_vec(), &predicted)
    }
}

fn check_version(found: u32) -> Result<()> {
    if found != ARTIFACT_FORMAT_VERSION {
        return Err(LearningError::UnsupportedArtifact {
            found,
            expected: ARTIFACT_FORMAT_VERSION,
        });
    }
    Ok(())
}
