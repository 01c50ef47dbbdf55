//! Pairwise column similarity
//!
//! Pearson correlation for continuous pairs, Cramér's V over a
//! bucket-by-bucket contingency table for everything else. Degenerate
//! inputs (no overlapping rows, single-bucket tables, zero expected
//! counts) score 0 instead of propagating NaN into sort orders.

use std::collections::HashMap;

use super::bucket::{parse_numeric, ColumnKind};
use super::summary::ColumnSummary;

/// Default minimum |similarity| for two columns to count as similar.
pub const SIMILARITY_BOUNDARY: f64 = 0.7;

/// A column scoring above the similarity boundary against some reference.
#[derive(Debug, Clone)]
pub struct SimilarColumn<'a> {
    pub summary: &'a ColumnSummary,
    pub similarity: f64,
}

/// Similarity between two columns: Pearson when both are continuous,
/// Cramér's V otherwise (mixed kinds allowed).
pub fn similarity(x: &ColumnSummary, y: &ColumnSummary) -> f64 {
    if x.kind == ColumnKind::Continuous && y.kind == ColumnKind::Continuous {
        pearson(x, y)
    } else {
        cramers_v(x, y)
    }
}

/// Columns correlating with `summary` at or above `boundary` in absolute
/// value, strongest first. The reference column itself is skipped.
pub fn similar_columns<'a>(
    summary: &ColumnSummary,
    all: &'a [ColumnSummary],
    boundary: f64,
) -> Vec<SimilarColumn<'a>> {
    let mut similar: Vec<SimilarColumn<'a>> = all
        .iter()
        .filter(|item| item.name != summary.name)
        .map(|item| SimilarColumn {
            summary: item,
            similarity: similarity(summary, item),
        })
        .filter(|s| s.similarity.abs() >= boundary)
        .collect();
    similar.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    similar
}

/// Pearson correlation over the rows where both values are numeric
/// (pairwise deletion of missing data).
pub fn pearson(x: &ColumnSummary, y: &ColumnSummary) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .raw_values
        .iter()
        .zip(y.raw_values.iter())
        .filter_map(|(a, b)| parse_numeric(a).zip(parse_numeric(b)))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return 0.0;
    }

    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n as f64;
    let var_x: f64 = pairs.iter().map(|(a, _)| (a - mean_x).powi(2)).sum::<f64>() / (n - 1) as f64;
    let var_y: f64 = pairs.iter().map(|(_, b)| (b - mean_y).powi(2)).sum::<f64>() / (n - 1) as f64;
    let stddev_x = var_x.sqrt();
    let stddev_y = var_y.sqrt();
    if stddev_x == 0.0 || stddev_y == 0.0 {
        return 0.0;
    }

    let covariance: f64 = pairs
        .iter()
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum::<f64>()
        / n as f64;
    covariance / (stddev_x * stddev_y)
}

/// Cramér's V from the bucket contingency table of two columns.
pub fn cramers_v(x: &ColumnSummary, y: &ColumnSummary) -> f64 {
    let matrix = contingency_table(x, y);
    let rows = matrix.len();
    let cols = matrix.first().map(|r| r.len()).unwrap_or(0);
    if rows < 2 || cols < 2 {
        return 0.0;
    }

    let n: u64 = matrix.iter().flatten().sum();
    if n == 0 {
        return 0.0;
    }

    let row_sums: Vec<u64> = matrix.iter().map(|row| row.iter().sum()).collect();
    let col_sums: Vec<u64> = (0..cols)
        .map(|j| matrix.iter().map(|row| row[j]).sum())
        .collect();

    let mut chi_squared = 0.0;
    for (i, row) in matrix.iter().enumerate() {
        for (j, &cell) in row.iter().enumerate() {
            let expected = (row_sums[i] * col_sums[j]) as f64 / n as f64;
            if expected > 0.0 {
                chi_squared += (cell as f64 - expected).powi(2) / expected;
            }
        }
    }

    (chi_squared / (n as f64 * (rows.min(cols) - 1) as f64)).sqrt()
}

/// Co-occurrence counts over both columns' buckets. Continuous columns
/// contribute their binned keys, categorical ones their raw values; rows
/// outside either bucket set are skipped.
fn contingency_table(x: &ColumnSummary, y: &ColumnSummary) -> Vec<Vec<u64>> {
    let x_index: HashMap<&str, usize> = x
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (b.key.as_str(), i))
        .collect();
    let y_index: HashMap<&str, usize> = y
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (b.key.as_str(), i))
        .collect();

    let mut matrix = vec![vec![0u64; y.buckets.len()]; x.buckets.len()];
    let rows = x.raw_values.len().min(y.raw_values.len());
    for row in 0..rows {
        let (Some(x_key), Some(y_key)) = (x.bucketed_value(row), y.bucketed_value(row)) else {
            continue;
        };
        if let (Some(&i), Some(&j)) = (x_index.get(x_key), y_index.get(y_key)) {
            matrix[i][j] += 1;
        }
    }
    matrix
}
