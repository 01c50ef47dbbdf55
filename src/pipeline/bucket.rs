//! Bucket classification and adaptive binning
//!
//! Converts raw column values into an ordered set of discrete buckets:
//! categorical passthrough for low-cardinality columns, "pretty bins" for
//! continuous ones. Bin boundaries favor step sizes that are multiples of
//! powers of 5 so the resulting labels read naturally.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Columns with at most this many distinct values are treated as categorical.
pub const MAX_CATEGORICAL_OPTIONS: usize = 10;

/// High-cardinality columns need strictly more than this many distinct
/// numeric values to qualify as continuous; otherwise they are dropped.
pub const MIN_NUMERIC_OPTIONS: usize = 5;

/// Number of steps the p5..p95 spread is divided into before rounding
/// to a pretty step size.
const PRETTY_STEPS: f64 = 4.0;

/// Whether a column is analyzed as discrete categories or binned ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Continuous,
}

/// A discrete category or numeric interval a column's values fall into.
#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    /// Stable identifier: the raw categorical value, or `"lo-hi"` for ranges.
    pub key: String,
    /// Display label, e.g. `"≥40"` for a merged tail bucket.
    pub label: String,
    /// Half-open `[low, high)` bound, present only for continuous buckets.
    pub range: Option<(f64, f64)>,
    /// Explicit ordering for buckets without a natural numeric order.
    pub order_index: Option<usize>,
    /// True if this bucket's target rate is above the column's split
    /// threshold. Assigned by the scorer, false until then.
    pub risk_group: bool,
}

impl Bucket {
    /// A categorical bucket whose key doubles as its label.
    pub fn categorical(value: &str, order_index: usize) -> Self {
        Self {
            key: value.to_string(),
            label: value.to_string(),
            range: None,
            order_index: Some(order_index),
            risk_group: false,
        }
    }

    fn from_range(lo: f64, hi: f64, label: String) -> Self {
        Self {
            key: format!("{}-{}", format_bound(lo), format_bound(hi)),
            label,
            range: Some((lo, hi)),
            order_index: None,
            risk_group: false,
        }
    }
}

/// Parse a raw value as a number. Blank and non-numeric values yield `None`.
pub fn parse_numeric(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a bucket boundary the way raw values are written: shortest
/// round-trip form, no trailing zeros.
pub fn format_bound(value: f64) -> String {
    format!("{}", value)
}

/// Classify a column from its distinct values.
///
/// At most [`MAX_CATEGORICAL_OPTIONS`] distinct values make a categorical
/// column. Above that, more than [`MIN_NUMERIC_OPTIONS`] numeric values
/// make it continuous. Anything else is unsupported and dropped from the
/// analysis set.
pub fn classify(distinct: &[String]) -> Option<ColumnKind> {
    if distinct.len() <= MAX_CATEGORICAL_OPTIONS {
        return Some(ColumnKind::Categorical);
    }
    let numeric = distinct.iter().filter(|v| parse_numeric(v).is_some()).count();
    if numeric > MIN_NUMERIC_OPTIONS {
        Some(ColumnKind::Continuous)
    } else {
        None
    }
}

/// Order raw categorical values: numeric values first in ascending order,
/// then the remaining values alphabetically.
pub fn compare_raw_values(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Order buckets: explicit indices first, then ranges by lower bound,
/// ranges before plain categories, remaining categories by key.
pub fn compare_buckets(a: &Bucket, b: &Bucket) -> Ordering {
    if let (Some(x), Some(y)) = (a.order_index, b.order_index) {
        return x.cmp(&y);
    }
    match (a.range, b.range) {
        (Some(x), Some(y)) => x.0.partial_cmp(&y.0).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.key.cmp(&b.key),
    }
}

/// Build the ordered bucket set for a categorical column.
pub fn categorical_buckets(distinct: &[String]) -> Vec<Bucket> {
    let mut sorted: Vec<&String> = distinct.iter().collect();
    sorted.sort_by(|a, b| compare_raw_values(a, b));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, v)| Bucket::categorical(v, i))
        .collect()
}

/// Build the ordered bucket set for a continuous column: pretty range
/// buckets spanning the numeric extent, followed by one bucket per
/// distinct non-numeric value.
pub fn continuous_buckets(distinct_numeric: &[f64], distinct_other: &[String]) -> Vec<Bucket> {
    let mut buckets = pretty_bins(distinct_numeric);

    let mut other: Vec<&String> = distinct_other.iter().collect();
    other.sort();
    for value in other {
        buckets.push(Bucket {
            key: value.clone(),
            label: value.clone(),
            range: None,
            order_index: None,
            risk_group: false,
        });
    }

    // Non-range buckets keep their position via an explicit index
    for (i, bucket) in buckets.iter_mut().enumerate() {
        if bucket.range.is_none() {
            bucket.order_index = Some(i);
        }
    }
    buckets
}

/// Compute contiguous half-open "pretty" bins over the distinct numeric
/// values of a column.
///
/// The step size is a quarter of the p5..p95 spread rounded to a multiple
/// of half a decade, and the extent is widened outward to multiples of
/// that step, so boundaries land on round numbers.
pub fn pretty_bins(distinct_numeric: &[f64]) -> Vec<Bucket> {
    let mut values = distinct_numeric.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let Some((&min, &max)) = values.first().zip(values.last()) else {
        return Vec::new();
    };

    let p_lower = quantile_sorted(&values, 0.05);
    let p_upper = quantile_sorted(&values, 0.95);
    let stepsize = (p_upper - p_lower) / PRETTY_STEPS;

    let step = pretty_step(stepsize);
    let decimals = boundary_decimals(step);

    let pretty_min = (min / step).floor() * step;
    let pretty_max = (max / step).ceil() * step;
    let count = ((pretty_max - pretty_min) / step).round() as usize;

    let mut bins = Vec::with_capacity(count + 1);
    for k in 0..=count {
        let raw_lo = pretty_min + k as f64 * step;
        let raw_hi = pretty_min + (k + 1) as f64 * step;
        // Boundaries are canonicalized through their printed form so the
        // key, label and range always agree.
        let lo = round_bound(raw_lo, decimals);
        let hi = round_bound(raw_hi, decimals);
        let label = format!("{}-{}", format_bound(lo), format_bound(hi));
        bins.push(Bucket::from_range(lo, hi, label));
    }
    bins
}

/// Round a step size to a "nice" value: a multiple of 5·10^k, falling
/// back to 10^k when the multiple rounds to zero.
fn pretty_step(stepsize: f64) -> f64 {
    if !stepsize.is_finite() || stepsize <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(stepsize.log10().floor());
    let half_decade = 5.0 * magnitude;
    let step = (stepsize / half_decade).round() * half_decade;
    if step == 0.0 {
        half_decade / 5.0
    } else {
        step
    }
}

/// Number of decimals needed to print boundaries of the given step size.
fn boundary_decimals(step: f64) -> usize {
    let exp = -step.log10().floor();
    if exp > 0.0 {
        exp as usize
    } else {
        0
    }
}

fn round_bound(value: f64, decimals: usize) -> f64 {
    let printed = format!("{:.*}", decimals, value);
    printed.parse().unwrap_or(value)
}

/// Linear-interpolated quantile of a sorted slice.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted {
        [] => f64::NAN,
        [only] => *only,
        _ => {
            let h = (sorted.len() - 1) as f64 * p;
            let i = h.floor() as usize;
            let lower = sorted[i];
            let upper = sorted[(i + 1).min(sorted.len() - 1)];
            lower + (upper - lower) * (h - i as f64)
        }
    }
}

/// Find the bucket a raw value belongs to: the unique range containing it
/// for numeric values, or the bucket whose key equals it. Values matching
/// no bucket are excluded from counts.
pub fn find_bucket<'a>(value: &str, buckets: &'a [Bucket]) -> Option<&'a str> {
    let numeric = parse_numeric(value);
    buckets
        .iter()
        .find(|b| match (b.range, numeric) {
            (Some((lo, hi)), Some(v)) => v >= lo && v < hi,
            (Some(_), None) => false,
            (None, _) => b.key == value,
        })
        .map(|b| b.key.as_str())
}

/// Merge range buckets at both ends of a column until the merged tail and
/// head each hold at least `min_bin_size` samples, so every bucket used
/// for significance testing carries enough weight. The merged tail is
/// labeled `"≥lo"`, the merged head `"<hi"`.
///
/// Takes the column's range buckets in ascending order together with its
/// count maps; returns the merged bucket list. Count map entries of
/// merged buckets are replaced by their aggregate.
pub fn merge_bucket_ends(
    mut numeric: Vec<Bucket>,
    occurrence: &mut BTreeMap<String, u64>,
    occurrence_target: &mut BTreeMap<String, u64>,
    min_bin_size: u64,
) -> Vec<Bucket> {
    if numeric.is_empty() || min_bin_size == 0 {
        return numeric;
    }

    // Tail pass: walk backward, always leaving the first bucket alone.
    let mut merged_tail = None;
    let mut occ_sum = 0u64;
    let mut tgt_sum = 0u64;
    let mut span: Option<(f64, f64)> = None;
    while occ_sum < min_bin_size && numeric.len() > 1 {
        let Some(bucket) = numeric.pop() else { break };
        let Some((lo, hi)) = bucket.range else {
            numeric.push(bucket);
            break;
        };
        occ_sum += occurrence.remove(&bucket.key).unwrap_or(0);
        tgt_sum += occurrence_target.remove(&bucket.key).unwrap_or(0);
        span = Some(match span {
            Some((_, end)) => (lo, end),
            None => (lo, hi),
        });
    }
    if let Some((lo, hi)) = span {
        let bucket = Bucket::from_range(lo, hi, format!("≥{}", format_bound(lo)));
        occurrence.insert(bucket.key.clone(), occ_sum);
        occurrence_target.insert(bucket.key.clone(), tgt_sum);
        merged_tail = Some(bucket);
    }

    // Head pass: mirror of the tail pass over the surviving buckets.
    let mut merged_head = None;
    let mut occ_sum = 0u64;
    let mut tgt_sum = 0u64;
    let mut span: Option<(f64, f64)> = None;
    while occ_sum < min_bin_size && !numeric.is_empty() {
        let bucket = numeric.remove(0);
        let Some((lo, hi)) = bucket.range else {
            numeric.insert(0, bucket);
            break;
        };
        occ_sum += occurrence.remove(&bucket.key).unwrap_or(0);
        tgt_sum += occurrence_target.remove(&bucket.key).unwrap_or(0);
        span = Some(match span {
            Some((start, _)) => (start, hi),
            None => (lo, hi),
        });
    }
    if let Some((lo, hi)) = span {
        let bucket = Bucket::from_range(lo, hi, format!("<{}", format_bound(hi)));
        occurrence.insert(bucket.key.clone(), occ_sum);
        occurrence_target.insert(bucket.key.clone(), tgt_sum);
        merged_head = Some(bucket);
    }

    let mut merged = Vec::with_capacity(numeric.len() + 2);
    merged.extend(merged_head);
    merged.append(&mut numeric);
    merged.extend(merged_tail);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(buckets: &[Bucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.key.as_str()).collect()
    }

    #[test]
    fn test_classify_categorical() {
        let distinct: Vec<String> = ["S", "M", "L"].iter().map(|s| s.to_string()).collect();
        assert_eq!(classify(&distinct), Some(ColumnKind::Categorical));
    }

    #[test]
    fn test_classify_continuous() {
        let distinct: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        assert_eq!(classify(&distinct), Some(ColumnKind::Continuous));
    }

    #[test]
    fn test_classify_unsupported_high_cardinality_text() {
        let distinct: Vec<String> = (0..30).map(|i| format!("id_{}", i)).collect();
        assert_eq!(classify(&distinct), None);
    }

    #[test]
    fn test_categorical_buckets_numbers_before_text() {
        let distinct: Vec<String> = ["B", "2", "A", "10"].iter().map(|s| s.to_string()).collect();
        let buckets = categorical_buckets(&distinct);
        assert_eq!(keys(&buckets), vec!["2", "10", "A", "B"]);
        assert_eq!(buckets[0].order_index, Some(0));
        assert_eq!(buckets[3].order_index, Some(3));
    }

    #[test]
    fn test_pretty_bins_uniform_0_100() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let bins = pretty_bins(&values);

        // p5..p95 spread of 90: 22.5 rounds below half a decade, so the
        // fallback step of 10 applies
        assert_eq!(bins[0].range, Some((0.0, 10.0)));
        for pair in bins.windows(2) {
            let (_, hi) = pair[0].range.unwrap();
            let (lo, _) = pair[1].range.unwrap();
            assert_eq!(hi, lo, "bins must be contiguous");
        }
        let (last_lo, _) = bins.last().unwrap().range.unwrap();
        assert!(last_lo >= 100.0, "extent must cover the maximum value");
    }

    #[test]
    fn test_pretty_bins_fractional_step() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let bins = pretty_bins(&values);

        for bucket in &bins {
            let (lo, hi) = bucket.range.unwrap();
            assert!(hi > lo);
            assert_eq!(bucket.key, format!("{}-{}", format_bound(lo), format_bound(hi)));
        }
    }

    #[test]
    fn test_find_bucket_ranges_and_keys() {
        let mut buckets = pretty_bins(&(0..=100).map(f64::from).collect::<Vec<_>>());
        buckets.push(Bucket {
            key: "NA".to_string(),
            label: "NA".to_string(),
            range: None,
            order_index: Some(buckets.len()),
            risk_group: false,
        });

        assert_eq!(find_bucket("12", &buckets), Some("10-20"));
        assert_eq!(find_bucket("20", &buckets), Some("20-30"));
        assert_eq!(find_bucket("NA", &buckets), Some("NA"));
        assert_eq!(find_bucket("unmapped", &buckets), None);
        assert_eq!(find_bucket("-3", &buckets), None);
    }

    #[test]
    fn test_merge_bucket_ends_reaches_min_size() {
        let buckets = pretty_bins(&(0..=100).map(f64::from).collect::<Vec<_>>());
        let mut occurrence: BTreeMap<String, u64> = BTreeMap::new();
        let mut occurrence_target: BTreeMap<String, u64> = BTreeMap::new();
        // 5 occurrences per bin; a min size of 12 forces three-way merges
        for bucket in &buckets {
            occurrence.insert(bucket.key.clone(), 5);
            occurrence_target.insert(bucket.key.clone(), 1);
        }

        let merged = merge_bucket_ends(buckets, &mut occurrence, &mut occurrence_target, 12);

        let first = &merged[0];
        let last = merged.last().unwrap();
        assert!(first.label.starts_with('<'));
        assert!(last.label.starts_with('≥'));
        assert!(occurrence[&first.key] >= 12);
        assert!(occurrence[&last.key] >= 12);
        let total: u64 = occurrence.values().sum();
        assert_eq!(total, 55, "merging must preserve total occurrence");
    }

    #[test]
    fn test_merge_bucket_ends_no_min_size_is_noop() {
        let buckets = pretty_bins(&(0..=100).map(f64::from).collect::<Vec<_>>());
        let n = buckets.len();
        let mut occurrence = BTreeMap::new();
        let mut occurrence_target = BTreeMap::new();
        let merged = merge_bucket_ends(buckets, &mut occurrence, &mut occurrence_target, 0);
        assert_eq!(merged.len(), n);
    }

    #[test]
    fn test_merge_bucket_ends_huge_min_size_keeps_two_buckets() {
        let buckets = pretty_bins(&(0..=100).map(f64::from).collect::<Vec<_>>());
        let mut occurrence: BTreeMap<String, u64> = BTreeMap::new();
        let mut occurrence_target: BTreeMap<String, u64> = BTreeMap::new();
        for bucket in &buckets {
            occurrence.insert(bucket.key.clone(), 1);
            occurrence_target.insert(bucket.key.clone(), 0);
        }

        let merged = merge_bucket_ends(buckets, &mut occurrence, &mut occurrence_target, 10_000);

        // The tail pass must leave one bucket for the head pass to absorb
        assert_eq!(merged.len(), 2);
        assert!(merged[0].label.starts_with('<'));
        assert!(merged[1].label.starts_with('≥'));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("42"), Some(42.0));
        assert_eq!(parse_numeric(" 3.5 "), Some(3.5));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("NA"), None);
        assert_eq!(parse_numeric("inf"), None);
    }
}
