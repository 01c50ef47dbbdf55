//! Pipeline module - orchestrates the analysis stages
//!
//! Raw rows are bucketed and counted per column, summaries are scored
//! against the target, and the regression trainer ranks columns by the
//! explanatory power they add on top of the dashboard baseline. Every
//! stage reads only the outputs of the previous one; all state lives in
//! the [`Analysis`] value handed back to the caller.

pub mod bucket;
pub mod dataset;
pub mod loader;
pub mod regression;
pub mod score;
pub mod similarity;
pub mod summary;
pub mod target;

pub use bucket::*;
pub use dataset::*;
pub use loader::*;
pub use regression::*;
pub use score::*;
pub use similarity::*;
pub use summary::*;
pub use target::*;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

/// Caller-owned configuration for one analysis pass.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    pub target: TargetSpec,
    /// Minimum sample count a merged edge bucket must reach.
    pub min_bin_size: u64,
    /// Drop `""` and `"NA"` buckets before rates are computed.
    pub exclude_missing: bool,
    /// Confounding columns trained jointly in the regression baseline.
    pub dashboard_columns: Vec<String>,
    /// Columns excluded from regression scoring entirely.
    pub excluded_columns: Vec<String>,
    /// Minimum |similarity| for `similar_columns` queries.
    pub similarity_boundary: f64,
}

impl AnalysisConfig {
    pub fn new(target: TargetSpec) -> Self {
        Self {
            target,
            min_bin_size: 10,
            exclude_missing: true,
            dashboard_columns: Vec::new(),
            excluded_columns: Vec::new(),
            similarity_boundary: SIMILARITY_BOUNDARY,
        }
    }
}

/// Result of a full analysis pass: scored summaries plus the training
/// report, queryable by column name.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Column summaries, ranked by regression score.
    pub summaries: Vec<ColumnSummary>,
    pub regression: RegressionReport,
    #[serde(skip)]
    pub config: AnalysisConfig,
    #[serde(skip)]
    target_mask: Vec<bool>,
}

impl Analysis {
    /// Look up a summary by column name.
    pub fn summary(&self, name: &str) -> Option<&ColumnSummary> {
        self.summaries.iter().find(|s| s.name == name)
    }

    /// Summary of the target column itself.
    pub fn target_summary(&self) -> Option<&ColumnSummary> {
        self.summary(self.config.target.column())
    }

    /// Columns similar to the named one, strongest first, filtered by
    /// the configured similarity boundary.
    pub fn similar_columns(&self, name: &str) -> Vec<SimilarColumn<'_>> {
        match self.summary(name) {
            Some(summary) => {
                similar_columns(summary, &self.summaries, self.config.similarity_boundary)
            }
            None => Vec::new(),
        }
    }

    /// Recompute a column against an edited bucket list with the same
    /// target filter, returning the new summary without touching the
    /// stored one.
    pub fn rebin(&self, name: &str, buckets: Vec<Bucket>) -> Option<ColumnSummary> {
        let summary = self.summary(name)?;
        Some(rebin_summary(
            summary,
            buckets,
            &self.target_mask,
            self.config.exclude_missing,
        ))
    }
}

/// Run the full pipeline over a dataset: summarize every column, score
/// significance and risk, and rank columns with the regression trainer.
///
/// Columns that are neither categorical nor continuous are dropped;
/// a target column that was dropped is a configuration error.
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> Result<Analysis, ConfigError> {
    let target_mask = config.target.row_mask(dataset)?;

    let pb = ProgressBar::new(dataset.names().len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   Summarizing columns [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut summaries: Vec<ColumnSummary> = dataset
        .names()
        .par_iter()
        .filter_map(|name| {
            let result = dataset.column(name).and_then(|values| {
                summarize_column(
                    name,
                    values,
                    &target_mask,
                    config.min_bin_size,
                    config.exclude_missing,
                )
            });
            pb.inc(1);
            result
        })
        .collect();

    pb.finish_and_clear();

    let target_summary = summaries
        .iter()
        .find(|s| s.name == config.target.column())
        .cloned()
        .ok_or_else(|| {
            ConfigError::TargetColumnUnclassifiable(config.target.column().to_string())
        })?;

    // Bucketing is complete for every column; correlations come next,
    // then the significance scores that read them.
    for summary in summaries.iter_mut() {
        summary.correlation_with_target = similarity(&target_summary, summary);
        summary.significance = compute_significance(summary);
    }

    let regression = compute_regression_scores(
        &mut summaries,
        &target_mask,
        config.target.column(),
        &config.dashboard_columns,
        &config.excluded_columns,
    );

    sort_summaries(&mut summaries, ScoreKind::Regression);

    Ok(Analysis {
        summaries,
        regression,
        config: config.clone(),
        target_mask,
    })
}
