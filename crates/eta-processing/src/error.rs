//! Custom error types for the order-cleaning stage.
//!
//! Errors are never caught or retried inside the cleaner; every failure
//! aborts the current operation and is handed to the caller as a
//! [`PreprocessingError`]. Errors are serializable so a wrapping tool can emit
//! them as `{code, message}` JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleaning stage.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// A date or time value did not match its expected format.
    #[error("Failed to parse '{value}' in column '{column}' with format '{format}'")]
    Parse {
        column: String,
        value: String,
        format: String,
    },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The source file could not be opened or read.
    #[error("Cannot access '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::FileAccess { .. } => "FILE_ACCESS_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was raised while parsing date or time text.
    pub fn is_parse_error(&self) -> bool {
        match self {
            Self::Parse { .. } => true,
            Self::WithContext { source, .. } => source.is_parse_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

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
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> PreprocessingError {
        PreprocessingError::Parse {
            column: "Order_Date".to_string(),
            value: "2022/03/19".to_string(),
            format: "%d-%m-%Y".to_string(),
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(parse_error().error_code(), "PARSE_ERROR");
        assert_eq!(
            PreprocessingError::ColumnNotFound("test".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            PreprocessingError::InvalidConfig("bounds".to_string()).error_code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_polars_errors_convert_with_context() {
        let df = polars::prelude::DataFrame::empty();
        let error = df.column("Order_Date").map(|_| ()).context("Reading order dates").unwrap_err();
        assert_eq!(error.error_code(), "POLARS_ERROR");
        assert!(error.to_string().starts_with("Reading order dates"));
    }

    #[test]
    fn test_parse_error_message() {
        let message = parse_error().to_string();
        assert!(message.contains("2022/03/19"));
        assert!(message.contains("Order_Date"));
    }

    #[test]
    fn test_file_access_message_includes_path() {
        let error = PreprocessingError::FileAccess {
            path: PathBuf::from("missing/orders.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(error.error_code(), "FILE_ACCESS_ERROR");
        assert!(error.to_string().contains("missing/orders.csv"));
    }

    #[test]
    fn test_error_serialization() {
        let error = PreprocessingError::ColumnNotFound("City".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("City"));
    }

    #[test]
    fn test_with_context() {
        let error = parse_error().with_context("While cleaning orders");
        assert!(error.to_string().contains("While cleaning orders"));
        assert_eq!(error.error_code(), "PARSE_ERROR"); // Preserves original code
        assert!(error.is_parse_error());
    }
}
