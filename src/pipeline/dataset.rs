//! In-memory dataset representation
//!
//! The analysis core operates on per-column string values, with missing
//! values encoded as the empty string. This module owns the conversion
//! from a polars DataFrame into that representation.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::HashMap;

/// An in-memory tabular dataset: named columns of raw string values.
///
/// Every column has exactly `height` values; nulls are stored as `""`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    names: Vec<String>,
    columns: HashMap<String, Vec<String>>,
    height: usize,
}

impl Dataset {
    /// Build a dataset from named columns. All columns must have equal length.
    pub fn new(columns: Vec<(String, Vec<String>)>) -> Result<Self> {
        let height = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        for (name, values) in &columns {
            if values.len() != height {
                anyhow::bail!(
                    "Column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    height
                );
            }
        }

        let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
        let columns: HashMap<String, Vec<String>> = columns.into_iter().collect();

        Ok(Self {
            names,
            columns,
            height,
        })
    }

    /// Convert a polars DataFrame into the string-valued representation
    /// used by the analysis core.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for col in df.get_columns() {
            let values = column_to_string_values(col)
                .with_context(|| format!("Failed to read column '{}'", col.name()))?;
            columns.push((col.name().to_string(), values));
        }
        Self::new(columns)
    }

    /// Column names in original order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Raw values of a column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }
}

/// Convert a column to per-row strings, nulls becoming `""`.
fn column_to_string_values(col: &Column) -> Result<Vec<String>> {
    let values: Vec<String> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()).unwrap_or_default())
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()).unwrap_or_default())
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()).unwrap_or_default())
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)).unwrap_or_default())
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()).unwrap_or_default())
            .collect(),
        _ => {
            // Remaining dtypes go through a string cast
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()).unwrap_or_default())
                .collect()
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dataframe_nulls_become_empty() {
        let df = df! {
            "age" => [Some(34i64), None, Some(51)],
            "smoker" => [Some("yes"), Some("no"), None],
        }
        .unwrap();

        let dataset = Dataset::from_dataframe(&df).unwrap();

        assert_eq!(dataset.height(), 3);
        assert_eq!(dataset.column("age").unwrap(), &["34", "", "51"]);
        assert_eq!(dataset.column("smoker").unwrap(), &["yes", "no", ""]);
    }

    #[test]
    fn test_from_dataframe_floats_keep_short_form() {
        let df = df! {
            "x" => [1.5f64, 2.0, 0.25],
        }
        .unwrap();

        let dataset = Dataset::from_dataframe(&df).unwrap();
        assert_eq!(dataset.column("x").unwrap(), &["1.5", "2", "0.25"]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Dataset::new(vec![
            ("a".to_string(), vec!["1".to_string(), "2".to_string()]),
            ("b".to_string(), vec!["x".to_string()]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_column_lookup() {
        let dataset = Dataset::new(vec![("a".to_string(), vec!["1".to_string()])]).unwrap();
        assert!(dataset.column("nope").is_none());
    }
}
