//! Date and time-of-day conversion for order records.

use crate::error::{PreprocessingError, Result};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use polars::prelude::*;

/// `NaiveDate::num_days_from_ce()` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Parse a text column into a polars `Date` column.
///
/// Nulls stay null; any other value that does not match `format` fails the
/// whole column. A column that is already a `Date` is returned unchanged.
pub(crate) fn parse_date_column(series: &Series, format: &str) -> Result<Series> {
    if series.dtype() == &DataType::Date {
        return Ok(series.clone());
    }

    let text = series.cast(&DataType::String)?;
    let mut days: Vec<Option<i32>> = Vec::with_capacity(text.len());

    for value in text.str()?.into_iter() {
        match value {
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw.trim(), format).map_err(|_| {
                    PreprocessingError::Parse {
                        column: series.name().to_string(),
                        value: raw.to_string(),
                        format: format.to_string(),
                    }
                })?;
                days.push(Some(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE));
            }
            None => days.push(None),
        }
    }

    Ok(Series::new(series.name().clone(), days).cast(&DataType::Date)?)
}

/// Render a column as text, the way time-of-day cells are inspected.
///
/// Nulls are kept as nulls; they never look like a valid time.
pub(crate) fn as_text(series: &Series) -> Result<Series> {
    Ok(series.cast(&DataType::String)?)
}

/// Rows whose time text is usable: present, not starting with `invalid_prefix`,
/// and containing `separator`.
pub(crate) fn valid_time_mask(
    text: &Series,
    invalid_prefix: &str,
    separator: char,
) -> Result<BooleanChunked> {
    Ok(text
        .str()?
        .into_iter()
        .map(|value| {
            value.is_some_and(|v| !v.starts_with(invalid_prefix) && v.contains(separator))
        })
        .collect())
}

/// Truncate time text to its first `width` characters and parse it into a
/// polars `Time` column.
///
/// Called after [`valid_time_mask`] filtering; a value that still fails to
/// parse aborts cleaning with [`PreprocessingError::Parse`].
pub(crate) fn parse_time_column(text: &Series, width: usize, format: &str) -> Result<Series> {
    let mut nanos: Vec<Option<i64>> = Vec::with_capacity(text.len());

    for value in text.str()?.into_iter() {
        match value {
            Some(raw) => {
                let truncated: String = raw.chars().take(width).collect();
                let time = NaiveTime::parse_from_str(&truncated, format).map_err(|_| {
                    PreprocessingError::Parse {
                        column: text.name().to_string(),
                        value: raw.to_string(),
                        format: format.to_string(),
                    }
                })?;
                nanos.push(Some(
                    i64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND,
                ));
            }
            None => nanos.push(None),
        }
    }

    Ok(Series::new(text.name().clone(), nanos).cast(&DataType::Time)?)
}
