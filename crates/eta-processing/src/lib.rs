//! Order Cleaning Library
//!
//! Turns raw food-delivery order exports into model-ready tables, built with
//! Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: CSV with configurable null markers; the non-predictive
//!   identifier column is dropped on load
//! - **Temporal parsing**: day-month-year order dates, hour:minute order and
//!   pickup times (invalid `24:xx` and separator-less values discarded)
//! - **Geospatial features**: haversine distance between restaurant and
//!   delivery location, in miles
//! - **Filtering**: incomplete rows and coordinate outliers removed, with a
//!   [`CleaningReport`] counting every dropped row
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eta_processing::{CleaningConfig, Preprocessor};
//!
//! let prep = Preprocessor::from_csv("deliveries.csv", CleaningConfig::default())?;
//! let (cleaned, report) = prep.clean_with_report()?;
//!
//! println!("kept {} of {} rows", report.rows_after, report.rows_before);
//! ```
//!
//! # Errors
//!
//! Nothing is caught or retried internally. Malformed dates and times surface
//! as [`PreprocessingError::Parse`], absent columns as
//! [`PreprocessingError::ColumnNotFound`] and unreadable files as
//! [`PreprocessingError::FileAccess`].

pub mod cleaner;
pub mod config;
pub mod error;
pub mod geo;
pub mod loader;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::Preprocessor;
pub use config::{CleaningConfig, CleaningConfigBuilder, ConfigValidationError, EARTH_RADIUS_MILES};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use geo::{haversine_miles, haversine_miles_with_radius, haversine_series};
pub use loader::{read_csv, write_csv};
pub use types::CleaningReport;
pub use utils::{complete_rows_mask, is_numeric_dtype, is_temporal_dtype, to_float_series};
