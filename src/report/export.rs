//! Analysis export functionality

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{Analysis, ColumnKind, ColumnSummary, RegressionReport};

/// Metadata about the analysis run
#[derive(Serialize)]
pub struct AnalysisMetadata {
    /// Timestamp of the analysis (ISO 8601 format)
    pub timestamp: String,
    /// Riskscan version
    pub riskscan_version: String,
    /// Input file path
    pub input_file: String,
    /// Human-readable target condition
    pub target: String,
    pub min_bin_size: u64,
    pub exclude_missing: bool,
    pub similarity_boundary: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dashboard_columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_columns: Vec<String>,
}

/// Summary statistics of the analysis
#[derive(Serialize)]
pub struct AnalysisStats {
    pub rows: usize,
    pub rows_matching_target: u64,
    pub columns_analyzed: usize,
    pub categorical_columns: usize,
    pub continuous_columns: usize,
}

/// Complete analysis export with metadata
#[derive(Serialize)]
pub struct AnalysisExport<'a> {
    pub metadata: AnalysisMetadata,
    pub stats: AnalysisStats,
    pub regression: &'a RegressionReport,
    /// Per-column summaries, ranked as in the analysis
    pub columns: &'a [ColumnSummary],
}

/// Parameters for the analysis export
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub row_count: usize,
}

/// Export the analysis results to a JSON file with metadata
pub fn export_analysis(analysis: &Analysis, output_path: &Path, params: &ExportParams) -> Result<()> {
    let categorical = analysis
        .summaries
        .iter()
        .filter(|s| s.kind == ColumnKind::Categorical)
        .count();
    let continuous = analysis
        .summaries
        .iter()
        .filter(|s| s.kind == ColumnKind::Continuous)
        .count();
    let rows_matching_target = analysis
        .target_summary()
        .map(|s| s.totals.occurrence_target)
        .unwrap_or(0);

    let export = AnalysisExport {
        metadata: AnalysisMetadata {
            timestamp: Utc::now().to_rfc3339(),
            riskscan_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            target: analysis.config.target.describe(),
            min_bin_size: analysis.config.min_bin_size,
            exclude_missing: analysis.config.exclude_missing,
            similarity_boundary: analysis.config.similarity_boundary,
            dashboard_columns: analysis.config.dashboard_columns.clone(),
            excluded_columns: analysis.config.excluded_columns.clone(),
        },
        stats: AnalysisStats {
            rows: params.row_count,
            rows_matching_target,
            columns_analyzed: analysis.summaries.len(),
            categorical_columns: categorical,
            continuous_columns: continuous,
        },
        regression: &analysis.regression,
        columns: &analysis.summaries,
    };

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize analysis to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write analysis to {}", output_path.display()))?;

    Ok(())
}
