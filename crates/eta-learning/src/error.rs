//! Error types for the eta-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by every
//! public operation of the crate. Nothing is retried internally; a failure
//! aborts the current operation and leaves the [`ModelBuilder`](crate::ModelBuilder)
//! exactly as it was before the call.
//!
//! # Example
//!
//! ```rust,ignore
//! use eta_learning::{LearningError, ModelBuilder};
//!
//! match builder.predict(None) {
//!     Err(LearningError::NotFitted) => builder.fit()?,
//!     other => println!("{:?}", other?),
//! }
//! ```

use eta_processing::PreprocessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for model building, inference and persistence.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// `predict`, `score`, `evaluate` or `save` was called before `fit`.
    #[error("Model has not been fitted; call fit() first")]
    NotFitted,

    /// A feature or target column is absent from the table.
    ///
    /// Column names are case-sensitive.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// An artifact path could not be opened, created or read.
    #[error("Cannot access '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration provided.
    ///
    /// Check the message for the offending setting and its accepted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data that cannot be used for training or scoring.
    ///
    /// Common causes:
    /// - Missing values in the target column
    /// - Too few rows to split or to build the stacking folds
    /// - Targets whose length differs from the feature table
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// `fit` was called on a builder restored from an artifact.
    ///
    /// Restored builders carry no partitions; construct one with
    /// [`ModelBuilder::for_training`](crate::ModelBuilder::for_training) to refit.
    #[error("No training partition available; this model was restored from an artifact")]
    NoTrainingData,

    /// The artifact was written by an incompatible format version.
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedArtifact { found: u32, expected: u32 },

    /// Error raised by the cleaning stage.
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LearningError>,
    },
}

impl LearningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LearningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFitted => "NOT_FITTED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::FileAccess { .. } => "FILE_ACCESS_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::NoTrainingData => "NO_TRAINING_DATA",
            Self::UnsupportedArtifact { .. } => "UNSUPPORTED_ARTIFACT",
            Self::Preprocessing(e) => e.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The innermost error, with every context layer removed.
    pub fn root(&self) -> &LearningError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LearningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(LearningError::NotFitted.error_code(), "NOT_FITTED");
        assert_eq!(LearningError::NoTrainingData.error_code(), "NO_TRAINING_DATA");
        assert_eq!(
            LearningError::ColumnNotFound("City".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            LearningError::UnsupportedArtifact { found: 9, expected: 1 }.error_code(),
            "UNSUPPORTED_ARTIFACT"
        );
    }

    #[test]
    fn test_preprocessing_code_passes_through() {
        let error: LearningError = PreprocessingError::ColumnNotFound("Order_Date".to_string()).into();
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
        assert!(error.to_string().contains("Order_Date"));
    }

    #[test]
    fn test_with_context() {
        let error = LearningError::NotFitted.with_context("Saving model");
        assert!(error.to_string().starts_with("Saving model: "));
        assert_eq!(error.error_code(), "NOT_FITTED");
        assert!(matches!(error.root(), LearningError::NotFitted));
    }

    #[test]
    fn test_error_serialization() {
        let error = LearningError::InvalidData("target has 3 missing values".to_string());
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "INVALID_DATA");
        assert_eq!(json["message"], "Invalid data: target has 3 missing values");
    }
}
