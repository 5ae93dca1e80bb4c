//! Shared utilities for the order-cleaning stage.
//!
//! Dtype helpers here are also used by the learning crate when it turns
//! feature columns into matrices.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a floating point type (and may hold NaN).
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is a date, datetime or time-of-day type.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time | DataType::Duration(_)
    )
}

/// Cast a column to `Float64` for numeric work.
///
/// Temporal columns are converted through their physical representation
/// (days, or nanoseconds since midnight). The cast is strict: text that does
/// not parse as a number is an error rather than a silent null.
pub fn to_float_series(series: &Series) -> PolarsResult<Series> {
    if is_temporal_dtype(series.dtype()) {
        series.to_physical_repr().strict_cast(&DataType::Float64)
    } else {
        series.strict_cast(&DataType::Float64)
    }
}

// =============================================================================
// Row Masks
// =============================================================================

/// Mask of rows with no null in any column and no NaN in any float column.
pub fn complete_rows_mask(df: &DataFrame) -> PolarsResult<BooleanChunked> {
    let mut keep = vec![true; df.height()];

    for column in df.get_columns() {
        let series = column.as_materialized_series();

        if is_float_dtype(series.dtype()) {
            let floats = series.cast(&DataType::Float64)?;
            for (flag, value) in keep.iter_mut().zip(floats.f64()?.into_iter()) {
                *flag &= value.is_some_and(|v| !v.is_nan());
            }
        } else if series.null_count() > 0 {
            let nulls = series.is_null();
            for (flag, is_null) in keep.iter_mut().zip(nulls.into_iter()) {
                *flag &= !is_null.unwrap_or(true);
            }
        }
    }

    Ok(keep.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Date));
    }

    #[test]
    fn test_complete_rows_mask_catches_nulls_and_nan() {
        let df = df!(
            "a" => &[Some(1.0), Some(f64::NAN), Some(3.0), Some(4.0)],
            "b" => &[Some("x"), Some("y"), None, Some("z")]
        )
        .unwrap();

        let mask = complete_rows_mask(&df).unwrap();
        let flags: Vec<Option<bool>> = mask.into_iter().collect();
        assert_eq!(flags, vec![Some(true), Some(false), Some(false), Some(true)]);
    }

    #[test]
    fn test_to_float_series_rejects_text() {
        let numeric_text = Series::new("n".into(), &["1.5", "2"]);
        let floats = to_float_series(&numeric_text).unwrap();
        assert_eq!(floats.f64().unwrap().get(0), Some(1.5));

        let words = Series::new("w".into(), &["fast", "slow"]);
        assert!(to_float_series(&words).is_err());
    }
}
