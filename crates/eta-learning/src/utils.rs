//! DataFrame access helpers shared by the split and the transformer.

use crate::error::{LearningError, Result};
use eta_processing::to_float_series;
use polars::prelude::*;

/// Fail with [`LearningError::ColumnNotFound`] on the first absent column.
pub(crate) fn require_columns<'a>(df: &DataFrame, columns: impl IntoIterator<Item = &'a String>) -> Result<()> {
    for name in columns {
        if df.column(name).is_err() {
            return Err(LearningError::ColumnNotFound(name.clone()));
        }
    }
    Ok(())
}

pub(crate) fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|column| column.as_materialized_series())
        .map_err(|_| LearningError::ColumnNotFound(name.to_string()))
}

/// A column as `f64` values, rejecting missing and non-finite cells.
///
/// Text that is not a number fails the strict cast and propagates as a polars
/// error.
pub(crate) fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let floats = to_float_series(series(df, name)?)?;
    let values = floats.f64()?;

    let missing = values
        .into_iter()
        .filter(|v| !v.is_some_and(f64::is_finite))
        .count();
    if missing > 0 {
        return Err(LearningError::InvalidData(format!(
            "column '{name}' has {missing} missing or non-finite values"
        )));
    }
    Ok(values.into_no_null_iter().collect())
}

/// A column rendered as text; nulls stay `None`.
pub(crate) fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let text = series(df, name)?.cast(&DataType::String)?;
    Ok(text.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_values_casts_integers() {
        let df = df!("a" => &[1i64, 2, 3]).unwrap();
        assert_eq!(float_values(&df, "a").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_float_values_rejects_missing() {
        let df = df!("a" => &[Some(1.0), None, Some(f64::NAN)]).unwrap();
        let err = float_values(&df, "a").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
        assert!(err.to_string().contains("2 missing"));
    }

    #[test]
    fn test_float_values_rejects_text() {
        let df = df!("a" => &["1.5", "fast"]).unwrap();
        assert!(float_values(&df, "a").is_err());
    }

    #[test]
    fn test_require_columns() {
        let df = df!("a" => &[1i64], "b" => &[2i64]).unwrap();
        let wanted = vec!["a".to_string(), "c".to_string()];
        let err = require_columns(&df, &wanted).unwrap_err();
        assert!(matches!(err, LearningError::ColumnNotFound(ref c) if c == "c"));
    }

    #[test]
    fn test_text_values_keeps_nulls() {
        let df = df!("city" => &[Some("Urban"), None]).unwrap();
        assert_eq!(text_values(&df, "city").unwrap(), vec![Some("Urban".to_string()), None]);
    }
}
