//! Column-wise feature encoding.
//!
//! [`ColumnTransformer`] turns a feature table into the dense matrix the
//! estimators consume: standardized numeric columns first, followed by the
//! one-hot indicator columns of every categorical feature. Columns not named
//! in either list are ignored.

use crate::error::{LearningError, Result};
use crate::utils::{float_values, require_columns, text_values};
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Per-column standardization: `(x - mean) / std`.
///
/// Uses the population standard deviation. A constant column gets a scale of
/// 1 so its values map to 0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut means = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());

        for name in columns {
            let values = float_values(df, name)?;
            let n = values.len().max(1) as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();

            means.push(mean);
            scales.push(if std > f64::EPSILON * mean.abs().max(1.0) { std } else { 1.0 });
        }

        Ok(Self {
            columns: columns.to_vec(),
            means,
            scales,
        })
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    fn write(&self, df: &DataFrame, out: &mut Array2<f64>, offset: usize) -> Result<()> {
        for (j, name) in self.columns.iter().enumerate() {
            let values = float_values(df, name)?;
            let (mean, scale) = (self.means[j], self.scales[j]);
            for (i, value) in values.into_iter().enumerate() {
                out[[i, offset + j]] = (value - mean) / scale;
            }
        }
        Ok(())
    }
}

/// Indicator encoding with one column per category seen during fitting.
///
/// Categories are kept in sorted order per column. A value that was not seen
/// during fitting, or a missing value, encodes as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let categories = columns
            .iter()
            .map(|name| -> Result<Vec<String>> {
                let seen: BTreeSet<String> = text_values(df, name)?.into_iter().flatten().collect();
                Ok(seen.into_iter().collect())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns: columns.to_vec(),
            categories,
        })
    }

    /// Learned categories of each column, in output order.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    fn write(&self, df: &DataFrame, out: &mut Array2<f64>, offset: usize) -> Result<()> {
        let mut start = offset;
        for (name, categories) in self.columns.iter().zip(&self.categories) {
            let mut unknown = 0usize;
            for (i, value) in text_values(df, name)?.iter().enumerate() {
                let position = value
                    .as_deref()
                    .and_then(|v| categories.binary_search_by(|c| c.as_str().cmp(v)).ok());
                match position {
                    Some(k) => out[[i, start + k]] = 1.0,
                    None => unknown += 1,
                }
            }
            if unknown > 0 {
                debug!("{} unseen or missing value(s) in '{}' encoded as zeros", unknown, name);
            }
            start += categories.len();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedColumns {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

/// Scales numeric features and one-hot encodes categorical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    numeric: Vec<String>,
    categorical: Vec<String>,
    fitted: Option<FittedColumns>,
}

impl ColumnTransformer {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
            fitted: None,
        }
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Learn scaling statistics and category sets from `df`.
    ///
    /// # Errors
    ///
    /// - [`LearningError::ColumnNotFound`] if a numeric or categorical column is absent
    /// - [`LearningError::InvalidData`] if a numeric column has missing values
    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        require_columns(df, self.numeric.iter().chain(&self.categorical))?;
        let scaler = StandardScaler::fit(df, &self.numeric)?;
        let encoder = OneHotEncoder::fit(df, &self.categorical)?;

        debug!(
            "Column transformer: {} scaled + {} one-hot columns",
            self.numeric.len(),
            encoder.width()
        );
        self.fitted = Some(FittedColumns { scaler, encoder });
        Ok(())
    }

    /// Encode `df` into a dense matrix, one row per input row.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let fitted = self.fitted.as_ref().ok_or(LearningError::NotFitted)?;
        require_columns(df, self.numeric.iter().chain(&self.categorical))?;

        let mut out = Array2::zeros((df.height(), self.output_width()));
        fitted.scaler.write(df, &mut out, 0)?;
        fitted.encoder.write(df, &mut out, self.numeric.len())?;
        Ok(out)
    }

    /// Number of output columns; zero before fitting.
    pub fn output_width(&self) -> usize {
        self.fitted
            .as_ref()
            .map_or(0, |f| self.numeric.len() + f.encoder.width())
    }

    /// Output column names: `num__<column>` then `cat__<column>_<category>`.
    pub fn feature_names_out(&self) -> Vec<String> {
        let Some(fitted) = &self.fitted else {
            return Vec::new();
        };
        let numeric = self.numeric.iter().map(|c| format!("num__{c}"));
        let categorical = self
            .categorical
            .iter()
            .zip(&fitted.encoder.categories)
            .flat_map(|(c, cats)| cats.iter().map(move |v| format!("cat__{c}_{v}")));
        numeric.chain(categorical).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn orders() -> DataFrame {
        df!(
            "distance_miles" => &[1.0, 3.0, 5.0, 7.0],
            "Vehicle_condition" => &[2i64, 2, 2, 2],
            "City" => &["Urban", "Metropolitian", "Urban", "Semi-Urban"],
            "ignored" => &["a", "b", "c", "d"]
        )
        .unwrap()
    }

    fn transformer() -> ColumnTransformer {
        ColumnTransformer::new(
            vec!["distance_miles".to_string(), "Vehicle_condition".to_string()],
            vec!["City".to_string()],
        )
    }

    #[test]
    fn test_scaler_statistics() {
        let scaler = StandardScaler::fit(&orders(), &["distance_miles".to_string()]).unwrap();
        assert_eq!(scaler.means(), &[4.0]);
        assert!((scaler.scales()[0] - 5.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let scaler = StandardScaler::fit(&orders(), &["Vehicle_condition".to_string()]).unwrap();
        assert_eq!(scaler.scales(), &[1.0]);
    }

    #[test]
    fn test_transform_layout() {
        let df = orders();
        let mut ct = transformer();
        ct.fit(&df).unwrap();

        assert_eq!(
            ct.feature_names_out(),
            vec![
                "num__distance_miles",
                "num__Vehicle_condition",
                "cat__City_Metropolitian",
                "cat__City_Semi-Urban",
                "cat__City_Urban",
            ]
        );

        let x = ct.transform(&df).unwrap();
        assert_eq!(x.dim(), (4, 5));
        assert_eq!(x.column(1).to_vec(), vec![0.0; 4]);
        assert_eq!(x.row(0).slice(ndarray::s![2..]).to_owned(), array![0.0, 0.0, 1.0]);
        assert_eq!(x.row(3).slice(ndarray::s![2..]).to_owned(), array![0.0, 1.0, 0.0]);
        assert!(x.column(0).sum().abs() < 1e-12);
    }

    #[test]
    fn test_unknown_category_is_all_zeros() {
        let mut ct = transformer();
        ct.fit(&orders()).unwrap();

        let unseen = df!(
            "distance_miles" => &[4.0],
            "Vehicle_condition" => &[2i64],
            "City" => &["Atlantis"]
        )
        .unwrap();
        let x = ct.transform(&unseen).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_column() {
        let mut ct = transformer();
        ct.fit(&orders()).unwrap();

        let df = orders().drop("City").unwrap();
        let err = ct.transform(&df).unwrap_err();
        assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "City"));
    }

    #[test]
    fn test_transform_before_fit() {
        let err = transformer().transform(&orders()).unwrap_err();
        assert!(matches!(err, LearningError::NotFitted));
    }
}
