//! Per-column summaries
//!
//! A [`ColumnSummary`] holds everything the scorer, similarity engine and
//! regression trainer need about one column: its buckets, per-bucket
//! occurrence counts with and without the target condition, target rates
//! and totals. Summaries are rebuilt from scratch whenever the dataset or
//! target configuration changes.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::bucket::{
    categorical_buckets, classify, compare_buckets, continuous_buckets, find_bucket, format_bound,
    merge_bucket_ends, parse_numeric, Bucket, ColumnKind,
};
use super::score::{self, RiskSummary, Significance};

/// Values treated as missing when `exclude_missing` is set.
const MISSING_KEYS: [&str; 2] = ["", "NA"];

/// Aggregates across all buckets of a column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Totals {
    pub occurrence: u64,
    pub occurrence_target: u64,
    /// `occurrence_target / occurrence`; `None` when the column has no
    /// counted rows, which propagates as a non-significant column.
    pub rate_target: Option<f64>,
}

/// Statistical summary of a single column against the target condition.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub label: String,
    pub kind: ColumnKind,
    /// Ordered bucket set; mutually exclusive, contiguous for ranges.
    pub buckets: Vec<Bucket>,
    /// Per-row original values, retained for re-binning and similarity.
    #[serde(skip)]
    pub raw_values: Vec<String>,
    /// Per-row bucket key (continuous columns only); `None` marks rows
    /// outside every bucket, which are excluded from counts.
    #[serde(skip)]
    pub binned_values: Option<Vec<Option<String>>>,
    /// Bucket key → number of rows in that bucket.
    pub occurrence: BTreeMap<String, u64>,
    /// Bucket key → number of rows in that bucket matching the target.
    pub occurrence_target: BTreeMap<String, u64>,
    /// Bucket key → target rate; only buckets with occurrence > 0.
    pub rate_target: BTreeMap<String, f64>,
    pub totals: Totals,
    /// Similarity score against the target column, filled by the pipeline.
    pub correlation_with_target: f64,
    pub significance: Significance,
    pub risk: RiskSummary,
}

impl ColumnSummary {
    /// Target rate of a single bucket.
    pub fn rate(&self, key: &str) -> Option<f64> {
        self.rate_target.get(key).copied()
    }

    /// Per-row bucket keys used for contingency counting: binned values
    /// for continuous columns, raw values for categorical ones.
    pub fn bucketed_value(&self, row: usize) -> Option<&str> {
        match (&self.binned_values, self.kind) {
            (Some(binned), ColumnKind::Continuous) => binned.get(row)?.as_deref(),
            _ => self.raw_values.get(row).map(|s| s.as_str()),
        }
    }
}

/// Build the summary for one column, or `None` when the column is neither
/// categorical nor continuous and is dropped from analysis.
///
/// `target_mask` marks the rows matching the target condition; it must
/// have one entry per row.
pub fn summarize_column(
    name: &str,
    values: &[String],
    target_mask: &[bool],
    min_bin_size: u64,
    exclude_missing: bool,
) -> Option<ColumnSummary> {
    let mut seen = HashSet::new();
    let mut distinct: Vec<String> = Vec::new();
    for value in values {
        if seen.insert(value.as_str()) {
            distinct.push(value.clone());
        }
    }

    let kind = classify(&distinct)?;

    let mut summary = match kind {
        ColumnKind::Categorical => {
            let buckets = categorical_buckets(&distinct);
            let (occurrence, occurrence_target) =
                count_by_key(values.iter().map(|v| Some(v.as_str())), target_mask, &buckets);
            ColumnSummary {
                name: name.to_string(),
                label: name.to_string(),
                kind,
                buckets,
                raw_values: values.to_vec(),
                binned_values: None,
                occurrence,
                occurrence_target,
                rate_target: BTreeMap::new(),
                totals: Totals::default(),
                correlation_with_target: 0.0,
                significance: Significance::placeholder(),
                risk: RiskSummary::default(),
            }
        }
        ColumnKind::Continuous => {
            let numeric: Vec<f64> = distinct.iter().filter_map(|v| parse_numeric(v)).collect();
            let other: Vec<String> = distinct
                .iter()
                .filter(|v| parse_numeric(v).is_none())
                .cloned()
                .collect();

            let buckets = continuous_buckets(&numeric, &other);
            let binned: Vec<Option<String>> = values
                .iter()
                .map(|v| find_bucket(v, &buckets).map(String::from))
                .collect();
            let (mut occurrence, mut occurrence_target) = count_by_key(
                binned.iter().map(|b| b.as_deref()),
                target_mask,
                &buckets,
            );

            // Merge thin edge buckets, then bin every row against the
            // final bucket set.
            let (range_buckets, other_buckets): (Vec<Bucket>, Vec<Bucket>) =
                buckets.into_iter().partition(|b| b.range.is_some());
            let mut buckets = merge_bucket_ends(
                range_buckets,
                &mut occurrence,
                &mut occurrence_target,
                min_bin_size,
            );
            buckets.extend(other_buckets);
            buckets.sort_by(compare_buckets);

            let binned: Vec<Option<String>> = values
                .iter()
                .map(|v| find_bucket(v, &buckets).map(String::from))
                .collect();
            let (occurrence, occurrence_target) = count_by_key(
                binned.iter().map(|b| b.as_deref()),
                target_mask,
                &buckets,
            );

            ColumnSummary {
                name: name.to_string(),
                label: name.to_string(),
                kind,
                buckets,
                raw_values: values.to_vec(),
                binned_values: Some(binned),
                occurrence,
                occurrence_target,
                rate_target: BTreeMap::new(),
                totals: Totals::default(),
                correlation_with_target: 0.0,
                significance: Significance::placeholder(),
                risk: RiskSummary::default(),
            }
        }
    };

    finalize_counts(&mut summary, exclude_missing);
    Some(summary)
}

/// Recompute a continuous summary against an edited bucket list, reusing
/// the stored raw values and the same target mask. Rows falling outside
/// every bucket are silently excluded from counts. Categorical summaries
/// are returned unchanged.
pub fn rebin_summary(
    summary: &ColumnSummary,
    buckets: Vec<Bucket>,
    target_mask: &[bool],
    exclude_missing: bool,
) -> ColumnSummary {
    if summary.kind == ColumnKind::Categorical {
        return summary.clone();
    }

    let mut buckets = buckets;
    buckets.sort_by(compare_buckets);
    relabel_range_buckets(&mut buckets);

    let binned: Vec<Option<String>> = summary
        .raw_values
        .iter()
        .map(|v| find_bucket(v, &buckets).map(String::from))
        .collect();
    let (occurrence, occurrence_target) =
        count_by_key(binned.iter().map(|b| b.as_deref()), target_mask, &buckets);

    let mut rebinned = ColumnSummary {
        buckets,
        binned_values: Some(binned),
        occurrence,
        occurrence_target,
        rate_target: BTreeMap::new(),
        totals: Totals::default(),
        significance: Significance::placeholder(),
        risk: RiskSummary::default(),
        ..summary.clone()
    };

    finalize_counts(&mut rebinned, exclude_missing);
    rebinned.significance = score::compute_significance(&rebinned);
    rebinned
}

/// Regenerate keys and labels after bucket boundaries were edited: the
/// first range bucket reads `<hi`, the last `≥lo`, the rest `lo-hi`.
fn relabel_range_buckets(buckets: &mut [Bucket]) {
    let range_count = buckets.iter().filter(|b| b.range.is_some()).count();
    let mut position = 0;
    for bucket in buckets.iter_mut() {
        let Some((lo, hi)) = bucket.range else { continue };
        bucket.key = format!("{}-{}", format_bound(lo), format_bound(hi));
        bucket.label = if position == 0 {
            format!("<{}", format_bound(hi))
        } else if position == range_count - 1 {
            format!("≥{}", format_bound(lo))
        } else {
            bucket.key.clone()
        };
        position += 1;
    }
}

/// Count occurrences per bucket key over all rows and over target rows.
/// Keys not in the bucket set, and rows without a key, are ignored.
fn count_by_key<'a>(
    keys: impl Iterator<Item = Option<&'a str>>,
    target_mask: &[bool],
    buckets: &[Bucket],
) -> (BTreeMap<String, u64>, BTreeMap<String, u64>) {
    let mut occurrence: BTreeMap<String, u64> = BTreeMap::new();
    let mut occurrence_target: BTreeMap<String, u64> = BTreeMap::new();
    for bucket in buckets {
        occurrence.insert(bucket.key.clone(), 0);
        occurrence_target.insert(bucket.key.clone(), 0);
    }

    for (row, key) in keys.enumerate() {
        let Some(key) = key else { continue };
        let Some(count) = occurrence.get_mut(key) else { continue };
        *count += 1;
        if target_mask.get(row).copied().unwrap_or(false) {
            if let Some(count) = occurrence_target.get_mut(key) {
                *count += 1;
            }
        }
    }

    (occurrence, occurrence_target)
}

/// Apply the exclude-missing option, derive rates and totals, and score
/// the column's risk groups. Must run before rates are read anywhere.
fn finalize_counts(summary: &mut ColumnSummary, exclude_missing: bool) {
    if exclude_missing {
        summary.buckets.retain(|b| !MISSING_KEYS.contains(&b.key.as_str()));
        for key in MISSING_KEYS {
            summary.occurrence.remove(key);
            summary.occurrence_target.remove(key);
        }
    }

    summary.rate_target = summary
        .occurrence
        .iter()
        .filter(|(_, &n)| n > 0)
        .map(|(key, &n)| {
            let target = summary.occurrence_target.get(key).copied().unwrap_or(0);
            (key.clone(), target as f64 / n as f64)
        })
        .collect();

    let occurrence: u64 = summary.occurrence.values().sum();
    let occurrence_target: u64 = summary.occurrence_target.values().sum();
    summary.totals = Totals {
        occurrence,
        occurrence_target,
        rate_target: (occurrence > 0).then(|| occurrence_target as f64 / occurrence as f64),
    };

    score::assign_risk_groups(&mut summary.buckets, &summary.rate_target);
    summary.risk = score::compute_risk_increase(summary);
}
