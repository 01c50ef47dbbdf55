//! Staged logistic regression for influence ranking
//!
//! Stage 1 trains a joint model over the caller's dashboard columns and
//! keeps its pre-sigmoid predictions as a fixed offset. Stage 2 trains an
//! independent single-column model per remaining column on top of that
//! offset, so each model measures the marginal improvement the column
//! adds beyond the dashboard baseline. The improvement in class-balanced
//! mean error becomes the column's regression score.

use faer::Mat;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::bucket::{parse_numeric, ColumnKind};
use super::summary::ColumnSummary;

/// Fraction of rows held out from weight updates for evaluation.
pub const TEST_RATIO: f64 = 0.1;

/// Rows per gradient-descent mini batch.
pub const BATCH_SIZE: usize = 10;

/// Index of the |correlation| value that sets the selection boundary:
/// at most this many columns pass the feature-selection cutoff.
const CORRELATION_CUTOFF_INDEX: usize = 20;

/// Training hyperparameters derived from the dataset.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrainerParams {
    /// `clamp(1/sqrt(N), 0.001, 0.1)` — decays with dataset size.
    pub learning_rate: f64,
    /// `clamp(floor(10000/N), 1, 50)` — bounds total training cost.
    pub epochs: usize,
    /// Minimum |correlation with target| for a column to be encoded.
    pub correlation_boundary: f64,
}

/// Outcome of the full two-stage scoring pass.
#[derive(Debug, Clone, Serialize)]
pub struct RegressionReport {
    pub learning_rate: f64,
    pub epochs: usize,
    pub correlation_boundary: f64,
    /// Balanced mean error of the dashboard baseline.
    pub dashboard_performance: f64,
    pub dashboard_accuracy: f64,
    pub dashboard_f_score: f64,
    /// Largest error reduction any stage-2 column achieved.
    pub performance_diff: f64,
}

/// One encoded feature traced back to its source column.
#[derive(Debug, Clone)]
struct FeatureInfo {
    column: String,
    #[allow(dead_code)]
    bucket: Option<String>,
}

/// Feature-major encoding of one column.
struct EncodedColumn {
    features: Vec<Vec<f64>>,
    map: Vec<FeatureInfo>,
}

struct TrainOutcome {
    weights: Vec<f64>,
    predictions: Vec<f64>,
    accuracy: f64,
    f_score: f64,
    mean_error: f64,
}

/// Derive learning rate, epoch count and the correlation boundary from
/// the dataset. The boundary is the 21st-largest |correlation| (or the
/// smallest one when fewer columns exist), clamped to [0.05, 0.9].
pub fn trainer_params(row_count: usize, summaries: &[ColumnSummary]) -> TrainerParams {
    let n = row_count.max(1) as f64;
    let learning_rate = (1.0 / n.sqrt()).clamp(0.001, 0.1);
    let epochs = ((10_000.0 / n).floor() as usize).clamp(1, 50);

    let mut correlations: Vec<f64> = summaries
        .iter()
        .map(|s| s.correlation_with_target.abs())
        .collect();
    correlations.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let cutoff_index = CORRELATION_CUTOFF_INDEX.min(summaries.len().saturating_sub(1));
    let cutoff = correlations.get(cutoff_index).copied().unwrap_or(0.0);

    TrainerParams {
        learning_rate,
        epochs,
        correlation_boundary: cutoff.clamp(0.05, 0.9),
    }
}

/// Run both training stages and write each summary's regression score.
///
/// Ordering requirement: every summary's `correlation_with_target` must
/// be computed before this runs.
pub fn compute_regression_scores(
    summaries: &mut [ColumnSummary],
    target_mask: &[bool],
    target_column: &str,
    dashboard_columns: &[String],
    excluded_columns: &[String],
) -> RegressionReport {
    let labels: Vec<f64> = target_mask.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect();
    let params = trainer_params(labels.len(), summaries);
    let encoded = encode_columns(summaries, params.correlation_boundary);

    let dashboard: HashSet<&str> = dashboard_columns.iter().map(|s| s.as_str()).collect();
    let excluded: HashSet<&str> = excluded_columns.iter().map(|s| s.as_str()).collect();

    // Stage 1: joint model over the dashboard's confounding columns
    let confounders: Vec<String> = dashboard_columns
        .iter()
        .filter(|name| name.as_str() != target_column)
        .filter(|name| summaries.iter().any(|s| &s.name == *name))
        .cloned()
        .collect();
    let (map, data) = design_matrix(&confounders, &encoded, labels.len());
    let baseline = train(&data, &vec![0.0; labels.len()], &labels, &params);
    let dashboard_performance = baseline.mean_error;

    for summary in summaries.iter_mut() {
        if dashboard.contains(summary.name.as_str()) {
            // Influence of a dashboard column is its strongest learned weight
            let influence = map
                .iter()
                .zip(baseline.weights.iter())
                .filter(|(info, _)| info.column == summary.name)
                .map(|(_, w)| w.abs())
                .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |m| m.max(w))));
            summary.significance.scores.regression = influence.unwrap_or(0.0);
        }
    }

    // Stage 2: a single-column model per remaining column, offset by the
    // baseline predictions
    let mut performance_diff = 0.0f64;
    for summary in summaries.iter_mut() {
        if dashboard.contains(summary.name.as_str()) || summary.name == target_column {
            continue;
        }
        if excluded.contains(summary.name.as_str()) {
            summary.significance.scores.regression = 0.0;
            continue;
        }
        let (_, data) = design_matrix(&[summary.name.clone()], &encoded, labels.len());
        if data.ncols() == 0 {
            summary.significance.scores.regression = 0.0;
            continue;
        }
        let outcome = train(&data, &baseline.predictions, &labels, &params);
        let score = dashboard_performance - outcome.mean_error;
        summary.significance.scores.regression = score;
        performance_diff = performance_diff.max(score);
    }

    RegressionReport {
        learning_rate: params.learning_rate,
        epochs: params.epochs,
        correlation_boundary: params.correlation_boundary,
        dashboard_performance,
        dashboard_accuracy: baseline.accuracy,
        dashboard_f_score: baseline.f_score,
        performance_diff,
    }
}

/// Encode every column whose |correlation with target| reaches the
/// boundary: one-hot per bucket for categorical columns, z-scores for
/// continuous ones (missing and non-numeric values become 0).
fn encode_columns(
    summaries: &[ColumnSummary],
    correlation_boundary: f64,
) -> HashMap<String, EncodedColumn> {
    let mut encoded = HashMap::new();
    for summary in summaries {
        if summary.correlation_with_target.abs() < correlation_boundary {
            continue;
        }

        let mut features = Vec::new();
        let mut map = Vec::new();
        match summary.kind {
            ColumnKind::Categorical => {
                for bucket in &summary.buckets {
                    features.push(
                        summary
                            .raw_values
                            .iter()
                            .map(|v| if *v == bucket.key { 1.0 } else { 0.0 })
                            .collect(),
                    );
                    map.push(FeatureInfo {
                        column: summary.name.clone(),
                        bucket: Some(bucket.key.clone()),
                    });
                }
            }
            ColumnKind::Continuous => {
                features.push(standardize(&summary.raw_values));
                map.push(FeatureInfo {
                    column: summary.name.clone(),
                    bucket: None,
                });
            }
        }

        if !features.is_empty() {
            encoded.insert(summary.name.clone(), EncodedColumn { features, map });
        }
    }
    encoded
}

/// Z-score a column's numeric values; anything unparsable becomes 0, as
/// does everything when the column has no spread.
fn standardize(raw_values: &[String]) -> Vec<f64> {
    let numeric: Vec<f64> = raw_values.iter().filter_map(|v| parse_numeric(v)).collect();
    if numeric.len() < 2 {
        return vec![0.0; raw_values.len()];
    }
    let mean = numeric.iter().sum::<f64>() / numeric.len() as f64;
    let variance = numeric.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (numeric.len() - 1) as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return vec![0.0; raw_values.len()];
    }

    raw_values
        .iter()
        .map(|v| match parse_numeric(v) {
            Some(n) => (n - mean) / stddev,
            None => 0.0,
        })
        .collect()
}

/// Assemble the row-major design matrix for a set of columns.
fn design_matrix(
    columns: &[String],
    encoded: &HashMap<String, EncodedColumn>,
    row_count: usize,
) -> (Vec<FeatureInfo>, Mat<f64>) {
    let mut map = Vec::new();
    let mut features: Vec<&Vec<f64>> = Vec::new();
    for column in columns {
        if let Some(enc) = encoded.get(column) {
            map.extend(enc.map.iter().cloned());
            features.extend(enc.features.iter());
        }
    }

    let mut data = Mat::zeros(row_count, features.len());
    for (j, feature) in features.iter().enumerate() {
        for (i, &value) in feature.iter().enumerate() {
            data[(i, j)] = value;
        }
    }
    (map, data)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(data: &Mat<f64>, row: usize, weights: &[f64], bias: f64, offset: f64) -> f64 {
    let dot: f64 = weights
        .iter()
        .enumerate()
        .map(|(j, w)| w * data[(row, j)])
        .sum();
    dot + bias + offset
}

/// Mini-batch gradient descent on binary cross-entropy with the given
/// per-row additive offsets. The trailing [`TEST_RATIO`] of rows is
/// excluded from updates and used only for evaluation; predictions are
/// returned for every row as pre-sigmoid logits.
fn train(data: &Mat<f64>, offsets: &[f64], labels: &[f64], params: &TrainerParams) -> TrainOutcome {
    let n = labels.len();
    let n_features = data.ncols();
    let mut weights = vec![0.0; n_features];
    let mut bias = 0.0;

    let train_len = n - (n as f64 * TEST_RATIO).floor() as usize;

    for _ in 0..params.epochs {
        let mut start = 0;
        while start < train_len {
            let end = (start + BATCH_SIZE).min(train_len);
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            for i in start..end {
                let pred = sigmoid(logit(data, i, &weights, bias, offsets[i]));
                let err = pred - labels[i];
                for (j, grad) in grad_w.iter_mut().enumerate() {
                    *grad += err * data[(i, j)];
                }
                grad_b += err;
            }

            let batch = (end - start) as f64;
            for (w, grad) in weights.iter_mut().zip(grad_w.iter()) {
                *w -= params.learning_rate * grad / batch;
            }
            bias -= params.learning_rate * grad_b / batch;
            start = end;
        }
    }

    // Held-out evaluation
    let mut correct = 0usize;
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    let (mut err_pos, mut count_pos) = (0.0f64, 0usize);
    let (mut err_neg, mut count_neg) = (0.0f64, 0usize);
    for i in train_len..n {
        let pred = sigmoid(logit(data, i, &weights, bias, offsets[i]));
        let positive = labels[i] > 0.5;
        if pred > 0.5 && positive {
            correct += 1;
            tp += 1;
        } else if pred < 0.5 && !positive {
            correct += 1;
        }
        if pred > 0.5 && !positive {
            fp += 1;
        }
        if pred < 0.5 && positive {
            fn_ += 1;
        }

        let error = (pred - labels[i]).abs();
        if positive {
            err_pos += error;
            count_pos += 1;
        } else {
            err_neg += error;
            count_neg += 1;
        }
    }

    let test_len = n - train_len;
    let accuracy = if test_len > 0 {
        correct as f64 / test_len as f64
    } else {
        0.0
    };
    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        1.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        1.0
    };
    let f_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    let mean_error = balanced_mean_error(err_pos, count_pos, err_neg, count_neg);

    let predictions = (0..n)
        .map(|i| logit(data, i, &weights, bias, offsets[i]))
        .collect();

    TrainOutcome {
        weights,
        predictions,
        accuracy,
        f_score,
        mean_error,
    }
}

/// Mean absolute error averaged separately over positive- and
/// negative-labeled rows, scaled by 100. The balancing compensates for
/// target-class imbalance; classes absent from the holdout are skipped.
fn balanced_mean_error(err_pos: f64, count_pos: usize, err_neg: f64, count_neg: usize) -> f64 {
    let mut terms = Vec::with_capacity(2);
    if count_pos > 0 {
        terms.push(err_pos / count_pos as f64);
    }
    if count_neg > 0 {
        terms.push(err_neg / count_neg as f64);
    }
    if terms.is_empty() {
        return 0.0;
    }
    terms.iter().sum::<f64>() / terms.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::summary::summarize_column;

    /// 200 rows: `flag` matches the target perfectly, `noise` is unrelated.
    fn fixture() -> (Vec<ColumnSummary>, Vec<bool>) {
        let n = 200;
        let mask: Vec<bool> = (0..n).map(|i| i % 2 == 0).collect();
        let flag: Vec<String> = mask
            .iter()
            .map(|&m| if m { "yes" } else { "no" }.to_string())
            .collect();
        let noise: Vec<String> = (0..n).map(|i| ((i * 7) % 3).to_string()).collect();
        let outcome: Vec<String> = mask
            .iter()
            .map(|&m| if m { "pos" } else { "neg" }.to_string())
            .collect();

        let mut summaries = vec![
            summarize_column("outcome", &outcome, &mask, 0, true).unwrap(),
            summarize_column("flag", &flag, &mask, 0, true).unwrap(),
            summarize_column("noise", &noise, &mask, 0, true).unwrap(),
        ];
        // Correlations the pipeline would have computed
        summaries[0].correlation_with_target = 1.0;
        summaries[1].correlation_with_target = 1.0;
        summaries[2].correlation_with_target = 0.1;
        (summaries, mask)
    }

    #[test]
    fn test_trainer_params_decay_with_size() {
        let (summaries, _) = fixture();

        let small = trainer_params(100, &summaries);
        assert!((small.learning_rate - 0.1).abs() < 1e-12);
        assert_eq!(small.epochs, 50);

        let large = trainer_params(1_000_000, &summaries);
        assert!((large.learning_rate - 0.001).abs() < 1e-12);
        assert_eq!(large.epochs, 1);
    }

    #[test]
    fn test_correlation_boundary_clamped() {
        let (summaries, _) = fixture();
        // Three columns: the cutoff lands on the smallest correlation
        let params = trainer_params(200, &summaries);
        assert!((0.05..=0.9).contains(&params.correlation_boundary));
    }

    #[test]
    fn test_predictive_column_beats_noise() {
        let (mut summaries, mask) = fixture();
        let report =
            compute_regression_scores(&mut summaries, &mask, "outcome", &[], &[]);

        let flag_score = summaries
            .iter()
            .find(|s| s.name == "flag")
            .unwrap()
            .significance
            .scores
            .regression;
        let noise_score = summaries
            .iter()
            .find(|s| s.name == "noise")
            .unwrap()
            .significance
            .scores
            .regression;

        assert!(
            flag_score > noise_score,
            "perfect predictor {} must beat noise {}",
            flag_score,
            noise_score
        );
        assert!(report.performance_diff >= flag_score.max(noise_score).max(0.0) - 1e-9);
    }

    #[test]
    fn test_performance_diff_is_max_over_stage2_scores() {
        let (mut summaries, mask) = fixture();
        let report =
            compute_regression_scores(&mut summaries, &mask, "outcome", &[], &[]);

        let max_score = summaries
            .iter()
            .filter(|s| s.name != "outcome")
            .map(|s| s.significance.scores.regression)
            .fold(0.0f64, f64::max);
        assert!((report.performance_diff - max_score).abs() < 1e-12);
    }

    #[test]
    fn test_excluded_column_scores_zero() {
        let (mut summaries, mask) = fixture();
        compute_regression_scores(
            &mut summaries,
            &mask,
            "outcome",
            &[],
            &["flag".to_string()],
        );
        let flag = summaries.iter().find(|s| s.name == "flag").unwrap();
        assert_eq!(flag.significance.scores.regression, 0.0);
    }

    #[test]
    fn test_below_boundary_column_scores_zero() {
        let (mut summaries, mask) = fixture();
        // noise sits below the correlation boundary, so it has no encoding
        summaries[2].correlation_with_target = 0.0;
        compute_regression_scores(&mut summaries, &mask, "outcome", &[], &[]);
        let noise = summaries.iter().find(|s| s.name == "noise").unwrap();
        assert_eq!(noise.significance.scores.regression, 0.0);
    }

    #[test]
    fn test_dashboard_column_gets_weight_influence() {
        let (mut summaries, mask) = fixture();
        let report = compute_regression_scores(
            &mut summaries,
            &mask,
            "outcome",
            &["flag".to_string()],
            &[],
        );

        let flag = summaries.iter().find(|s| s.name == "flag").unwrap();
        assert!(
            flag.significance.scores.regression > 0.0,
            "dashboard influence should be the strongest learned weight"
        );
        // A perfect confounder leaves little residual signal
        assert!(report.dashboard_performance < 50.0);
    }

    #[test]
    fn test_empty_dashboard_trains_bias_only_baseline() {
        let (mut summaries, mask) = fixture();
        let report =
            compute_regression_scores(&mut summaries, &mask, "outcome", &[], &[]);
        assert!(report.dashboard_performance > 0.0);
        assert!(report.dashboard_accuracy >= 0.0);
    }

    #[test]
    fn test_standardize_handles_missing() {
        let values: Vec<String> = vec!["1", "2", "3", "", "x"]
            .into_iter()
            .map(String::from)
            .collect();
        let encoded = standardize(&values);
        assert_eq!(encoded.len(), 5);
        assert_eq!(encoded[3], 0.0);
        assert_eq!(encoded[4], 0.0);
        assert!((encoded[1]).abs() < 1e-12, "the mean value maps to 0");
    }

    #[test]
    fn test_standardize_constant_column_is_all_zero() {
        let values: Vec<String> = vec!["5"; 10].into_iter().map(String::from).collect();
        assert!(standardize(&values).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_balanced_mean_error_single_class() {
        assert_eq!(balanced_mean_error(0.0, 0, 2.0, 10), 20.0);
        assert_eq!(balanced_mean_error(1.0, 10, 2.0, 10), 15.0);
        assert_eq!(balanced_mean_error(0.0, 0, 0.0, 0), 0.0);
    }
}
