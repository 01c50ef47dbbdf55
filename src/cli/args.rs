//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{AnalysisConfig, ConfigError, TargetSpec};

/// Riskscan - Rank dataset columns by how strongly they relate to a binary target condition
#[derive(Parser, Debug)]
#[command(name = "riskscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Target column name
    #[arg(short, long)]
    pub target: String,

    /// Value of the target column that marks a positive row.
    /// Selects a categorical target; mutually exclusive with --operator/--value.
    #[arg(long, conflicts_with_all = ["operator", "value"])]
    pub target_option: Option<String>,

    /// Comparison operator for a continuous target: '=', '>' or '<'
    #[arg(long, requires = "value")]
    pub operator: Option<String>,

    /// Comparison value for a continuous target
    #[arg(long, requires = "operator")]
    pub value: Option<f64>,

    /// Minimum sample count merged edge buckets must reach.
    /// Larger values trade resolution at distribution tails for statistical power.
    #[arg(long, default_value = "10")]
    pub min_bin_size: u64,

    /// Keep empty and "NA" values as their own buckets instead of
    /// excluding them before rates are computed
    #[arg(long, default_value = "false")]
    pub keep_missing: bool,

    /// Dashboard columns treated as confounders in the regression
    /// baseline (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub dashboard: Vec<String>,

    /// Columns excluded from regression scoring (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Minimum |similarity| for the similar-columns listing (0.0 to 1.0)
    #[arg(long, default_value = "0.7", value_parser = validate_similarity_boundary)]
    pub similarity_boundary: f64,

    /// Number of top-ranked columns to display
    #[arg(long, default_value = "15")]
    pub top: usize,

    /// Write the full analysis as JSON to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for a full table scan (slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Assemble the target condition from the given flags. The target is
    /// categorical when --target-option is present, continuous when
    /// --operator/--value are; anything else is a configuration error.
    pub fn target_spec(&self) -> Result<TargetSpec, ConfigError> {
        let kind = if self.target_option.is_some() {
            "categorical"
        } else {
            "continuous"
        };
        TargetSpec::from_parts(
            kind,
            &self.target,
            self.target_option.as_deref(),
            self.operator.as_deref(),
            self.value,
        )
    }

    /// The full analysis configuration backed by these arguments.
    pub fn analysis_config(&self) -> Result<AnalysisConfig, ConfigError> {
        let mut config = AnalysisConfig::new(self.target_spec()?);
        config.min_bin_size = self.min_bin_size;
        config.exclude_missing = !self.keep_missing;
        config.dashboard_columns = self.dashboard.clone();
        config.excluded_columns = self.exclude.clone();
        config.similarity_boundary = self.similarity_boundary;
        Ok(config)
    }
}

/// Validator for the similarity_boundary parameter
fn validate_similarity_boundary(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "similarity_boundary must be between 0.0 and 1.0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}
