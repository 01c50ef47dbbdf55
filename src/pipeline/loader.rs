//! Dataset loader for CSV and Parquet files

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use super::dataset::Dataset;

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataframe(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => {
            let infer = if infer_schema_length == 0 {
                None
            } else {
                Some(infer_schema_length)
            };
            LazyCsvReader::new(path)
                .with_infer_schema_length(infer)
                .finish()
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        }
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Load a dataset file straight into the analysis representation.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<Dataset> {
    let df = load_dataframe(path, infer_schema_length)?;
    Dataset::from_dataframe(&df)
}

/// Column names of a dataset file without materializing the rows.
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let df = load_dataframe(path, 100)?;
    Ok(df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect())
}
