//! Order cleaning.
//!
//! [`Preprocessor`] turns a raw order export into a table the model can
//! learn from:
//! - Parsing the order date
//! - Discarding and parsing free-text order/pickup times
//! - Deriving the haversine distance between restaurant and customer
//! - Removing incomplete rows and coordinate outliers

mod temporal;

use crate::config::CleaningConfig;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::geo::haversine_series;
use crate::loader::read_csv;
use crate::types::CleaningReport;
use crate::utils::complete_rows_mask;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Produces a cleaned order table from a raw one.
///
/// The identifier column is dropped when the preprocessor is created; the
/// remaining steps run in [`clean`](Self::clean).
///
/// # Example
///
/// ```rust,ignore
/// use eta_processing::{CleaningConfig, Preprocessor};
///
/// let cleaned = Preprocessor::from_csv("deliveries.csv", CleaningConfig::default())?.clean()?;
/// ```
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: CleaningConfig,
    df: DataFrame,
}

impl Preprocessor {
    /// Load a raw order CSV and drop its identifier column.
    ///
    /// # Errors
    ///
    /// - [`PreprocessingError::FileAccess`] if the file cannot be opened
    /// - [`PreprocessingError::ColumnNotFound`] if the identifier column is absent
    pub fn from_csv(path: impl AsRef<Path>, config: CleaningConfig) -> Result<Self> {
        config.validate()?;
        let df = read_csv(path.as_ref(), &config)?;
        Self::from_dataframe(df, config)
    }

    /// Wrap an in-memory raw order table, dropping its identifier column.
    pub fn from_dataframe(df: DataFrame, config: CleaningConfig) -> Result<Self> {
        config.validate()?;

        let df = match &config.identifier_column {
            Some(identifier) => {
                if df.column(identifier).is_err() {
                    return Err(PreprocessingError::ColumnNotFound(identifier.clone()));
                }
                debug!("Dropping identifier column '{}'", identifier);
                df.drop(identifier)?
            }
            None => df,
        };

        Ok(Self { config, df })
    }

    /// The raw table as loaded (identifier already removed).
    pub fn raw(&self) -> &DataFrame {
        &self.df
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run the cleaning steps and return the cleaned table.
    pub fn clean(&self) -> Result<DataFrame> {
        self.clean_with_report().map(|(df, _)| df)
    }

    /// Run the cleaning steps, also returning how many rows each rule removed.
    ///
    /// # Errors
    ///
    /// - [`PreprocessingError::Parse`] if a date, or a time that passed the
    ///   format checks, does not match its format
    /// - [`PreprocessingError::ColumnNotFound`] if a configured column is absent
    /// - [`PreprocessingError::Polars`] if a coordinate column is not numeric
    pub fn clean_with_report(&self) -> Result<(DataFrame, CleaningReport)> {
        let config = &self.config;
        let mut df = self.df.clone();
        let mut report = CleaningReport::new(df.height());

        info!("Cleaning {} order rows...", df.height());

        // 1. Order date
        let dates = self.column(&df, &config.date_column)?;
        let parsed_dates = temporal::parse_date_column(&dates, &config.date_format)?;
        df.with_column(parsed_dates)?;

        // 2. Time text: drop missing, "24:xx" and separator-less values
        for time_column in &config.time_columns {
            let text = temporal::as_text(&self.column(&df, time_column)?)?;
            df.with_column(text.clone())?;

            let mask = temporal::valid_time_mask(
                &text,
                &config.invalid_hour_prefix,
                config.time_separator,
            )?;
            let before = df.height();
            df = df.filter(&mask)?;
            report.dropped_invalid_time += before - df.height();
        }

        // 3. hh:mm precision, parsed
        for time_column in &config.time_columns {
            let text = self.column(&df, time_column)?;
            let parsed =
                temporal::parse_time_column(&text, config.time_precision_chars, &config.time_format)?;
            df.with_column(parsed)?;
        }

        // 4. Distance
        let [rlat, rlon, dlat, dlon] = config.coordinate_columns();
        let distance = haversine_series(
            &config.distance_column,
            &self.column(&df, rlat)?,
            &self.column(&df, rlon)?,
            &self.column(&df, dlat)?,
            &self.column(&df, dlon)?,
            config.earth_radius_miles,
        )
        .context("Computing delivery distance")?;
        df.with_column(distance)?;

        // 5. Incomplete rows
        let before = df.height();
        df = df.filter(&complete_rows_mask(&df)?)?;
        report.dropped_missing_values = before - df.height();

        // 6. Coordinate outliers
        let before = df.height();
        let max_distance = config.max_distance_miles;
        let in_range: BooleanChunked = self
            .column(&df, &config.distance_column)?
            .f64()?
            .into_iter()
            .map(|d| d.is_some_and(|d| d < max_distance))
            .collect();
        df = df.filter(&in_range)?;
        report.dropped_distance_outliers = before - df.height();

        report.rows_after = df.height();
        info!(
            "Cleaning kept {}/{} rows (invalid time: {}, missing values: {}, distance >= {}: {})",
            report.rows_after,
            report.rows_before,
            report.dropped_invalid_time,
            report.dropped_missing_values,
            max_distance,
            report.dropped_distance_outliers
        );

        Ok((df, report))
    }

    fn column(&self, df: &DataFrame, name: &str) -> Result<Series> {
        df.column(name)
            .map(|column| column.as_materialized_series().clone())
            .map_err(|_| PreprocessingError::ColumnNotFound(name.to_string()))
    }
}
