//! Risk grouping and significance scoring
//!
//! Splits a column's buckets into a risk group (target rate above the
//! midpoint threshold) and the rest, derives the comparison metrics from
//! the resulting 2×2 table, and runs a two-proportion z-test per bucket.

use serde::Serialize;
use std::collections::BTreeMap;

use super::bucket::{compare_buckets, format_bound, Bucket, ColumnKind};
use super::summary::ColumnSummary;

/// Two-sided z boundary for the per-bucket proportion test. 1.64485
/// corresponds to ~90% confidence; 1.96 (95%) may have been intended,
/// so treat changes to this value as a semantic decision.
pub const Z_SCORE_BOUNDARY: f64 = 1.64485;

/// Minimum samples required on both sides of the proportion test.
pub const MIN_SAMPLES_PER_SIDE: u64 = 10;

/// Ranking metric for column summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Regression,
    Correlation,
    OddsRatio,
    RelativeRisk,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 4] = [
        ScoreKind::Regression,
        ScoreKind::Correlation,
        ScoreKind::OddsRatio,
        ScoreKind::RelativeRisk,
    ];
}

/// Scores a column can be ranked by. Degenerate metrics rank as -1.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSet {
    /// Marginal explanatory power from the regression trainer; 0 until
    /// training ran.
    pub regression: f64,
    /// Absolute similarity to the target column.
    pub correlation: f64,
    pub odds_ratio: Option<f64>,
    pub relative_risk: Option<f64>,
}

impl ScoreSet {
    /// Score vector for columns without buckets: every metric is -1.
    pub fn degenerate() -> Self {
        Self {
            regression: -1.0,
            correlation: -1.0,
            odds_ratio: Some(-1.0),
            relative_risk: Some(-1.0),
        }
    }

    pub fn get(&self, kind: ScoreKind) -> f64 {
        match kind {
            ScoreKind::Regression => self.regression,
            ScoreKind::Correlation => self.correlation,
            ScoreKind::OddsRatio => self.odds_ratio.unwrap_or(-1.0),
            ScoreKind::RelativeRisk => self.relative_risk.unwrap_or(-1.0),
        }
    }
}

/// Result of testing one bucket against the rest of its column.
#[derive(Debug, Clone, Serialize)]
pub struct SignificanceTuple {
    pub key: String,
    pub significant: bool,
    /// Absolute rate difference between the bucket and the rest.
    pub diff: Option<f64>,
    /// Rate ratio between the bucket and the rest.
    pub increase: Option<f64>,
}

/// Per-column significance results.
#[derive(Debug, Clone, Serialize)]
pub struct Significance {
    pub significant_buckets: Vec<String>,
    pub tuples: Vec<SignificanceTuple>,
    pub scores: ScoreSet,
}

impl Significance {
    /// Empty result carried by a summary until the scorer ran.
    pub fn placeholder() -> Self {
        Self {
            significant_buckets: Vec::new(),
            tuples: Vec::new(),
            scores: ScoreSet::degenerate(),
        }
    }
}

/// Risk-group comparison metrics for one column. Ratios with a zero
/// denominator are `None`, never NaN.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskSummary {
    /// Keys of the buckets above the split threshold.
    pub risk_group_keys: Vec<String>,
    /// Composite label of the risk group, e.g. `"≥60 or smoker"`.
    pub label: String,
    pub risk_difference: Option<f64>,
    /// Above-rate / below-rate; `None` when the below rate is 0.
    pub risk_multiplier: Option<f64>,
    /// Smallest target rate inside the risk group.
    pub min_group_rate: Option<f64>,
    pub odds_ratio: Option<f64>,
    pub relative_risk: Option<f64>,
    /// Target rate of the risk group itself.
    pub absolute_risk: Option<f64>,
    pub risk_group_occurrence_sum: u64,
}

/// Mark every bucket whose target rate reaches the midpoint between the
/// column's lowest and highest bucket rates.
pub fn assign_risk_groups(buckets: &mut [Bucket], rate_target: &BTreeMap<String, f64>) {
    let mut rates = rate_target.values().copied();
    let Some(first) = rates.next() else {
        for bucket in buckets.iter_mut() {
            bucket.risk_group = false;
        }
        return;
    };
    let (min, max) = rates.fold((first, first), |(lo, hi), r| (lo.min(r), hi.max(r)));
    let split = min + (max - min) / 2.0;

    for bucket in buckets.iter_mut() {
        bucket.risk_group = rate_target
            .get(&bucket.key)
            .map(|&r| r >= split)
            .unwrap_or(false);
    }
}

/// Compare the risk group against the remaining buckets: aggregate both
/// sides, derive rate difference and multiplier, and compute odds ratio
/// and relative risk from the 2×2 contingency table.
pub fn compute_risk_increase(summary: &ColumnSummary) -> RiskSummary {
    let (mut above_occ, mut above_tgt) = (0u64, 0u64);
    let (mut below_occ, mut below_tgt) = (0u64, 0u64);
    for bucket in &summary.buckets {
        let occ = summary.occurrence.get(&bucket.key).copied().unwrap_or(0);
        let tgt = summary
            .occurrence_target
            .get(&bucket.key)
            .copied()
            .unwrap_or(0);
        if bucket.risk_group {
            above_occ += occ;
            above_tgt += tgt;
        } else {
            below_occ += occ;
            below_tgt += tgt;
        }
    }

    let above_rate = ratio(above_tgt as f64, above_occ as f64);
    let below_rate = ratio(below_tgt as f64, below_occ as f64);

    let risk_multiplier = match (above_rate, below_rate) {
        (Some(above), Some(below)) if below != 0.0 => Some(above / below),
        _ => None,
    };
    let risk_difference = above_rate.zip(below_rate).map(|(a, b)| a - b);

    let risk_group_keys: Vec<String> = summary
        .buckets
        .iter()
        .filter(|b| b.risk_group)
        .map(|b| b.key.clone())
        .collect();
    let min_group_rate = risk_group_keys
        .iter()
        .filter_map(|key| summary.rate(key))
        .fold(None, |acc: Option<f64>, r| {
            Some(acc.map_or(r, |m| m.min(r)))
        });

    // 2x2 table: risk group vs rest, target vs no target
    let a = above_tgt as f64;
    let b = (above_occ - above_tgt) as f64;
    let c = below_tgt as f64;
    let d = (below_occ - below_tgt) as f64;
    let odds_ratio = ratio(a * d, b * c);
    let relative_risk = match (ratio(a, a + c), ratio(b, b + d)) {
        (Some(exposed), Some(unexposed)) if unexposed != 0.0 => Some(exposed / unexposed),
        _ => None,
    };

    RiskSummary {
        label: risk_group_label(summary),
        risk_group_keys,
        risk_difference,
        risk_multiplier,
        min_group_rate,
        odds_ratio,
        relative_risk,
        absolute_risk: above_rate,
        risk_group_occurrence_sum: above_occ,
    }
}

/// Build the composite label of the risk group: contiguous numeric ranges
/// are merged and edge ranges read `"<hi"` / `"≥lo"`; labels are joined
/// with commas and a final "or".
fn risk_group_label(summary: &ColumnSummary) -> String {
    let mut group: Vec<Bucket> = summary
        .buckets
        .iter()
        .filter(|b| b.risk_group)
        .cloned()
        .collect();
    group.sort_by(compare_buckets);

    let labels: Vec<String> = match summary.kind {
        ColumnKind::Continuous => {
            let bounds: Vec<(f64, f64)> =
                summary.buckets.iter().filter_map(|b| b.range).collect();
            let col_min = bounds.iter().map(|r| r.0).fold(f64::INFINITY, f64::min);
            let col_max = bounds.iter().map(|r| r.1).fold(f64::NEG_INFINITY, f64::max);

            let mut ranges: Vec<(f64, f64)> = Vec::new();
            for (lo, hi) in group.iter().filter_map(|b| b.range) {
                match ranges.last_mut() {
                    Some(last) if last.1 == lo => last.1 = hi,
                    _ => ranges.push((lo, hi)),
                }
            }

            ranges
                .into_iter()
                .map(|(lo, hi)| {
                    if lo == col_min {
                        format!("<{}", format_bound(hi))
                    } else if hi == col_max {
                        format!("≥{}", format_bound(lo))
                    } else {
                        format!("{}-{}", format_bound(lo), format_bound(hi))
                    }
                })
                .collect()
        }
        ColumnKind::Categorical => group.iter().map(|b| b.label.clone()).collect(),
    };

    match labels.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

/// Test every bucket's target rate against the rest of the column and
/// assemble the column's score set.
pub fn compute_significance(summary: &ColumnSummary) -> Significance {
    let total = summary.totals.occurrence;
    let total_target = summary.totals.occurrence_target;

    if summary.buckets.is_empty() {
        return Significance::placeholder();
    }

    let mut tuples = Vec::with_capacity(summary.buckets.len());
    for bucket in &summary.buckets {
        let n1 = summary.occurrence.get(&bucket.key).copied().unwrap_or(0);
        let t1 = summary
            .occurrence_target
            .get(&bucket.key)
            .copied()
            .unwrap_or(0);
        let n2 = total.saturating_sub(n1);
        let p1 = summary.rate(&bucket.key);
        let p2 = ratio((total_target.saturating_sub(t1)) as f64, n2 as f64);

        let significant = match (p1, p2) {
            (Some(p1), Some(p2)) => two_proportion_significant(p1, p2, n1, n2),
            _ => false,
        };
        tuples.push(SignificanceTuple {
            key: bucket.key.clone(),
            significant,
            diff: p1.zip(p2).map(|(a, b)| (a - b).abs()),
            increase: match (p1, p2) {
                (Some(p1), Some(p2)) if p2 != 0.0 => Some(p1 / p2),
                _ => None,
            },
        });
    }

    Significance {
        significant_buckets: tuples
            .iter()
            .filter(|t| t.significant)
            .map(|t| t.key.clone())
            .collect(),
        tuples,
        scores: ScoreSet {
            regression: 0.0,
            correlation: summary.correlation_with_target.abs(),
            odds_ratio: summary.risk.odds_ratio,
            relative_risk: summary.risk.relative_risk,
        },
    }
}

/// Two-proportion z-test: significant iff both sides have at least
/// [`MIN_SAMPLES_PER_SIDE`] samples and |z| reaches [`Z_SCORE_BOUNDARY`].
pub fn two_proportion_significant(p1: f64, p2: f64, n1: u64, n2: u64) -> bool {
    if n1 < MIN_SAMPLES_PER_SIDE || n2 < MIN_SAMPLES_PER_SIDE {
        return false;
    }

    let (n1, n2) = (n1 as f64, n2 as f64);
    let p = (p1 * n1 + p2 * n2) / (n1 + n2);
    let se = (p * (1.0 - p) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        // Pooled rate of exactly 0 or 1; both proportions are equal
        return false;
    }
    let z = (p1 - p2) / se;
    z.abs() >= Z_SCORE_BOUNDARY
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

/// Sort summaries by a score, best first. Ties keep their relative order.
pub fn sort_summaries(summaries: &mut [ColumnSummary], kind: ScoreKind) {
    summaries.sort_by(|a, b| {
        b.significance
            .scores
            .get(kind)
            .partial_cmp(&a.significance.scores.get(kind))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
