//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use riskscan::pipeline::{AnalysisConfig, Dataset, TargetSpec};

/// Number of rows in the standard risk fixture
pub const FIXTURE_ROWS: usize = 400;

/// Create a deterministic "clinical study" style DataFrame:
///
/// - `outcome`: "positive"/"negative", driven by age and smoking
/// - `age`: continuous 20..79
/// - `smoker`: categorical yes/no, every third row smokes
/// - `size`: categorical S/M/L
/// - `bmi`: continuous with every 11th value missing
/// - `patient_id`: high-cardinality text (dropped by classification)
pub fn create_risk_dataframe() -> DataFrame {
    let n = FIXTURE_ROWS;
    let age: Vec<i64> = (0..n).map(|i| 20 + (i as i64 * 37) % 60).collect();
    let smoker: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "yes" } else { "no" }).collect();
    let size: Vec<&str> = (0..n).map(|i| ["S", "M", "L"][i % 3]).collect();
    let bmi: Vec<Option<f64>> = (0..n)
        .map(|i| {
            if i % 11 == 0 {
                None
            } else {
                Some(18.0 + (i as f64 * 13.0) % 20.0)
            }
        })
        .collect();
    let outcome: Vec<&str> = (0..n)
        .map(|i| {
            let old = age[i] >= 50;
            let smoking_and_middle_aged = smoker[i] == "yes" && age[i] >= 35;
            if old || smoking_and_middle_aged {
                "positive"
            } else {
                "negative"
            }
        })
        .collect();
    let patient_id: Vec<String> = (0..n).map(|i| format!("p{:04}", i)).collect();

    df! {
        "outcome" => outcome,
        "age" => age,
        "smoker" => smoker,
        "size" => size,
        "bmi" => bmi,
        "patient_id" => patient_id,
    }
    .unwrap()
}

/// The risk fixture in the analysis representation
pub fn create_risk_dataset() -> Dataset {
    Dataset::from_dataframe(&create_risk_dataframe()).unwrap()
}

/// Analysis configuration targeting `outcome = positive`
pub fn base_config() -> AnalysisConfig {
    let target =
        TargetSpec::from_parts("categorical", "outcome", Some("positive"), None, None).unwrap();
    let mut config = AnalysisConfig::new(target);
    config.min_bin_size = 20;
    config
}

/// Build a string-valued dataset column by column
pub fn dataset_from_columns(columns: Vec<(&str, Vec<String>)>) -> Dataset {
    Dataset::new(
        columns
            .into_iter()
            .map(|(name, values)| (name.to_string(), values))
            .collect(),
    )
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}
