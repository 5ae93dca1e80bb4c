//! CSV loading for raw order exports.

use crate::config::CleaningConfig;
use crate::error::{PreprocessingError, Result};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions, NullValues};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Read a CSV file with a header row into a DataFrame.
///
/// The file is opened before polars sees it so a missing or unreadable path
/// surfaces as [`PreprocessingError::FileAccess`] instead of a generic polars
/// IO error.
pub fn read_csv(path: impl AsRef<Path>, config: &CleaningConfig) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PreprocessingError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let null_values: Vec<PlSmallStr> = config
        .null_values
        .iter()
        .map(|value| value.as_str().into())
        .collect();

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(config.infer_schema_length)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(NullValues::AllColumns(null_values))),
        )
        .into_reader_with_file_handle(file)
        .finish()?;

    debug!("Loaded {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a DataFrame as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(|source| PreprocessingError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
