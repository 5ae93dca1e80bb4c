//! Configuration types for the order-cleaning stage.
//!
//! Column names, parse formats and filtering bounds all live in
//! [`CleaningConfig`]; the defaults describe the food-delivery order export.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in miles used by the haversine distance.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Configuration for [`Preprocessor`](crate::Preprocessor).
///
/// Use [`CleaningConfig::builder()`] to override individual settings.
///
/// # Example
///
/// ```rust,ignore
/// use eta_processing::CleaningConfig;
///
/// let config = CleaningConfig::builder()
///     .identifier_column(None)
///     .max_distance_miles(500.0)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Non-predictive identifier dropped at load time.
    /// Default: "Delivery_person_ID"
    pub identifier_column: Option<String>,

    /// Order date column.
    /// Default: "Order_Date"
    pub date_column: String,

    /// chrono format of the order date.
    /// Default: "%d-%m-%Y"
    pub date_format: String,

    /// Free-text time-of-day columns (order placed, order picked up).
    /// Default: ["Time_Orderd", "Time_Order_picked"]
    pub time_columns: Vec<String>,

    /// chrono format applied after truncation.
    /// Default: "%H:%M"
    pub time_format: String,

    /// Rows whose time text starts with this prefix are discarded.
    /// Default: "24:"
    pub invalid_hour_prefix: String,

    /// Rows whose time text lacks this character are discarded.
    /// Default: ':'
    pub time_separator: char,

    /// Number of leading characters kept from the time text (drops seconds).
    /// Default: 5
    pub time_precision_chars: usize,

    /// Restaurant latitude and longitude columns.
    pub restaurant_latitude_column: String,
    pub restaurant_longitude_column: String,

    /// Delivery location latitude and longitude columns.
    pub delivery_latitude_column: String,
    pub delivery_longitude_column: String,

    /// Name of the derived distance column.
    /// Default: "distance_miles"
    pub distance_column: String,

    /// Sphere radius for the haversine formula.
    /// Default: 3958.8
    pub earth_radius_miles: f64,

    /// Rows at or beyond this distance are treated as bad coordinates.
    /// Default: 1000.0
    pub max_distance_miles: f64,

    /// CSV cell values read as missing.
    pub null_values: Vec<String>,

    /// Rows scanned for CSV schema inference; `None` scans the whole file.
    /// Default: None
    pub infer_schema_length: Option<usize>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            identifier_column: Some("Delivery_person_ID".to_string()),
            date_column: "Order_Date".to_string(),
            date_format: "%d-%m-%Y".to_string(),
            time_columns: vec!["Time_Orderd".to_string(), "Time_Order_picked".to_string()],
            time_format: "%H:%M".to_string(),
            invalid_hour_prefix: "24:".to_string(),
            time_separator: ':',
            time_precision_chars: 5,
            restaurant_latitude_column: "Restaurant_latitude".to_string(),
            restaurant_longitude_column: "Restaurant_longitude".to_string(),
            delivery_latitude_column: "Delivery_location_latitude".to_string(),
            delivery_longitude_column: "Delivery_location_longitude".to_string(),
            distance_column: "distance_miles".to_string(),
            earth_radius_miles: EARTH_RADIUS_MILES,
            max_distance_miles: 1000.0,
            null_values: ["", "NaN", "nan", "NA", "N/A", "NULL", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            infer_schema_length: None,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// The four coordinate columns in haversine argument order.
    pub fn coordinate_columns(&self) -> [&str; 4] {
        [
            &self.restaurant_latitude_column,
            &self.restaurant_longitude_column,
            &self.delivery_latitude_column,
            &self.delivery_longitude_column,
        ]
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.earth_radius_miles.is_finite() || self.earth_radius_miles <= 0.0 {
            return Err(ConfigValidationError::NonPositive {
                field: "earth_radius_miles".to_string(),
                value: self.earth_radius_miles,
            });
        }

        if self.max_distance_miles.is_nan() || self.max_distance_miles <= 0.0 {
            return Err(ConfigValidationError::NonPositive {
                field: "max_distance_miles".to_string(),
                value: self.max_distance_miles,
            });
        }

        if self.time_precision_chars == 0 {
            return Err(ConfigValidationError::ZeroTimePrecision);
        }

        let named = [
            ("date_column", self.date_column.as_str()),
            ("distance_column", self.distance_column.as_str()),
            ("date_format", self.date_format.as_str()),
            ("time_format", self.time_format.as_str()),
        ];
        let coordinates = self.coordinate_columns();
        let time_columns = self.time_columns.iter().map(|c| ("time_columns", c.as_str()));
        let coordinate_fields = coordinates.iter().map(|c| ("coordinate column", *c));

        for (field, value) in named.into_iter().chain(time_columns).chain(coordinate_fields) {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName(field.to_string()));
            }
        }

        if matches!(&self.identifier_column, Some(id) if id.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyName(
                "identifier_column".to_string(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be a positive number)")]
    NonPositive { field: String, value: f64 },

    #[error("time_precision_chars must be at least 1")]
    ZeroTimePrecision,

    #[error("'{0}' must not be empty")]
    EmptyName(String),
}

impl From<ConfigValidationError> for crate::error::PreprocessingError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::PreprocessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    identifier_column: Option<Option<String>>,
    date_column: Option<String>,
    date_format: Option<String>,
    time_columns: Option<Vec<String>>,
    time_format: Option<String>,
    coordinates: Option<[String; 4]>,
    distance_column: Option<String>,
    earth_radius_miles: Option<f64>,
    max_distance_miles: Option<f64>,
    null_values: Option<Vec<String>>,
    infer_schema_length: Option<Option<usize>>,
}

impl CleaningConfigBuilder {
    /// Set the identifier column dropped at load (`None` keeps every column).
    pub fn identifier_column(mut self, column: Option<&str>) -> Self {
        self.identifier_column = Some(column.map(str::to_string));
        self
    }

    /// Set the order date column.
    pub fn date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = Some(column.into());
        self
    }

    /// Set the chrono format of the order date.
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    /// Set the time-of-day columns.
    pub fn time_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the chrono format used for truncated time text.
    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    /// Set the coordinate columns in (restaurant lat, restaurant lon,
    /// delivery lat, delivery lon) order.
    pub fn coordinate_columns(
        mut self,
        restaurant_latitude: impl Into<String>,
        restaurant_longitude: impl Into<String>,
        delivery_latitude: impl Into<String>,
        delivery_longitude: impl Into<String>,
    ) -> Self {
        self.coordinates = Some([
            restaurant_latitude.into(),
            restaurant_longitude.into(),
            delivery_latitude.into(),
            delivery_longitude.into(),
        ]);
        self
    }

    /// Set the derived distance column name.
    pub fn distance_column(mut self, column: impl Into<String>) -> Self {
        self.distance_column = Some(column.into());
        self
    }

    /// Set the sphere radius used by the haversine formula.
    pub fn earth_radius_miles(mut self, radius: f64) -> Self {
        self.earth_radius_miles = Some(radius);
        self
    }

    /// Set the distance at which rows are discarded.
    pub fn max_distance_miles(mut self, distance: f64) -> Self {
        self.max_distance_miles = Some(distance);
        self
    }

    /// Set the CSV cell values read as missing.
    pub fn null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set how many rows are scanned for CSV schema inference.
    pub fn infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let defaults = CleaningConfig::default();
        let [rlat, rlon, dlat, dlon] = self.coordinates.unwrap_or_else(|| {
            defaults
                .coordinate_columns()
                .map(|column| column.to_string())
        });

        let config = CleaningConfig {
            identifier_column: self.identifier_column.unwrap_or(defaults.identifier_column),
            date_column: self.date_column.unwrap_or(defaults.date_column),
            date_format: self.date_format.unwrap_or(defaults.date_format),
            time_columns: self.time_columns.unwrap_or(defaults.time_columns),
            time_format: self.time_format.unwrap_or(defaults.time_format),
            invalid_hour_prefix: defaults.invalid_hour_prefix,
            time_separator: defaults.time_separator,
            time_precision_chars: defaults.time_precision_chars,
            restaurant_latitude_column: rlat,
            restaurant_longitude_column: rlon,
            delivery_latitude_column: dlat,
            delivery_longitude_column: dlon,
            distance_column: self.distance_column.unwrap_or(defaults.distance_column),
            earth_radius_miles: self.earth_radius_miles.unwrap_or(defaults.earth_radius_miles),
            max_distance_miles: self.max_distance_miles.unwrap_or(defaults.max_distance_miles),
            null_values: self.null_values.unwrap_or(defaults.null_values),
            infer_schema_length: self
                .infer_schema_length
                .unwrap_or(defaults.infer_schema_length),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.identifier_column.as_deref(), Some("Delivery_person_ID"));
        assert_eq!(config.date_format, "%d-%m-%Y");
        assert_eq!(config.time_columns, vec!["Time_Orderd", "Time_Order_picked"]);
        assert_eq!(config.earth_radius_miles, 3958.8);
        assert_eq!(config.max_distance_miles, 1000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = CleaningConfig::builder().build().unwrap();
        assert_eq!(config, CleaningConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .identifier_column(None)
            .coordinate_columns("r_lat", "r_lon", "d_lat", "d_lon")
            .max_distance_miles(250.0)
            .infer_schema_length(Some(100))
            .build()
            .unwrap();

        assert!(config.identifier_column.is_none());
        assert_eq!(config.coordinate_columns(), ["r_lat", "r_lon", "d_lat", "d_lon"]);
        assert_eq!(config.max_distance_miles, 250.0);
        assert_eq!(config.infer_schema_length, Some(100));
    }

    #[test]
    fn test_validation_rejects_non_positive_distance() {
        let result = CleaningConfig::builder().max_distance_miles(0.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NonPositive { .. }
        ));
    }

    #[test]
    fn test_validation_rejects_empty_column_name() {
        let result = CleaningConfig::builder().date_column(" ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyName(field) if field == "date_column"
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = CleaningConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CleaningConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
