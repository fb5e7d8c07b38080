// Aggregation engine: pure functions from a dataset to summary tables.
//
// A missing source column degrades the one table that needs it. Bucketed
// distributions come back empty; everything else returns
// `ReportError::MissingColumn` so the caller can show "insufficient data".
use crate::error::{ReportError, ReportResult};
use crate::registry::Registry;
use crate::types::{Category, Column, Dataset, Metric, Record};
use crate::util::{average, guarded_pct, median, quantile, sample_std};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Final-profit bands. Intervals are `[lo, hi)`; the first starts at -inf.
pub const PROFIT_BOUNDARIES: [f64; 7] = [
    f64::NEG_INFINITY,
    0.0,
    10_000.0,
    50_000.0,
    100_000.0,
    200_000.0,
    f64::INFINITY,
];
pub const PROFIT_LABELS: [&str; 6] = [
    "亏损(<0)",
    "低收益(0-1万)",
    "中低收益(1-5万)",
    "中收益(5-10万)",
    "中高收益(10-20万)",
    "高收益(>20万)",
];

/// Sales-profit bands used by the adviser-type cross-tab. Negative values
/// fall outside every band.
pub const SALES_BOUNDARIES: [f64; 5] = [0.0, 20_000.0, 50_000.0, 100_000.0, f64::INFINITY];
pub const SALES_LABELS: [&str; 4] = ["2万以下", "2-5万", "5-10万", "10万以上"];

/// Advisers at or above this quantile count as high performers.
pub const HIGH_PERFORMER_QUANTILE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct BucketedDistribution {
    /// Fixed label order, zero-filled. Empty when the field is unavailable.
    pub buckets: Vec<(&'static str, usize)>,
}

impl BucketedDistribution {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, c)| c).sum()
    }

    pub fn count(&self, label: &str) -> Option<usize> {
        self.buckets
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub key: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` for single-member groups.
    pub std_dev: Option<f64>,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    pub labels: Vec<&'static str>,
    /// (category, counts per label) ordered by category.
    pub rows: Vec<(String, Vec<usize>)>,
}

impl CrossTab {
    pub fn row_total(&self, category: &str) -> Option<usize> {
        self.rows
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, counts)| counts.iter().sum())
    }

    /// Each row divided by its own total, in percent. Empty rows read 0%.
    pub fn row_percentages(&self) -> Vec<(String, Vec<f64>)> {
        self.rows
            .iter()
            .map(|(category, counts)| {
                let total: usize = counts.iter().sum();
                let pcts = counts
                    .iter()
                    .map(|c| guarded_pct(*c as f64, total as f64))
                    .collect();
                (category.clone(), pcts)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub key: String,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
    pub delta_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub advisers: usize,
    pub mean: f64,
    pub sum: f64,
    pub max: f64,
    pub median: f64,
    pub min: f64,
    pub high_performer_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRanking {
    /// Regions by mean final profit, best first.
    pub regions: Vec<GroupStats>,
    pub best: Option<GroupStats>,
    pub worst: Option<GroupStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub period: String,
    pub date: NaiveDate,
    pub advisers: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionProfile {
    pub region: String,
    pub advisers: usize,
    pub mean: f64,
    pub sum: f64,
    /// Adviser-type counts, most common first.
    pub type_counts: Vec<(String, usize)>,
}

fn require(ds: &Dataset, column: Column) -> ReportResult<()> {
    if ds.has(column) {
        Ok(())
    } else {
        Err(ReportError::MissingColumn(column))
    }
}

fn values(ds: &Dataset, metric: Metric) -> Vec<f64> {
    ds.records.iter().filter_map(|r| metric.value(r)).collect()
}

/// Index of the `[lo, hi)` interval containing `v`, if any.
fn bucket_index(boundaries: &[f64], v: f64) -> Option<usize> {
    if v.is_nan() {
        return None;
    }
    boundaries
        .windows(2)
        .position(|w| v >= w[0] && v < w[1])
}

/// Count records per final-profit band.
pub fn profit_distribution(ds: &Dataset) -> BucketedDistribution {
    bucketed_distribution(ds, Metric::FinalProfit)
}

pub fn bucketed_distribution(ds: &Dataset, metric: Metric) -> BucketedDistribution {
    if !ds.has(metric.column()) {
        return BucketedDistribution { buckets: vec![] };
    }
    let mut counts = [0usize; 6];
    for v in values(ds, metric) {
        if let Some(i) = bucket_index(&PROFIT_BOUNDARIES, v) {
            counts[i] += 1;
        }
    }
    BucketedDistribution {
        buckets: PROFIT_LABELS.iter().copied().zip(counts).collect(),
    }
}

/// count / mean / median / std / sum of `metric`, per `category` value.
pub fn group_stats(
    ds: &Dataset,
    category: Category,
    metric: Metric,
) -> ReportResult<Vec<GroupStats>> {
    require(ds, category.column())?;
    require(ds, metric.column())?;
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in &ds.records {
        if let (Some(key), Some(v)) = (category.value(r), metric.value(r)) {
            groups.entry(key).or_default().push(v);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(key, vals)| summarize(key, vals))
        .collect())
}

fn summarize(key: &str, vals: Vec<f64>) -> GroupStats {
    let mean = average(&vals);
    let std_dev = sample_std(&vals);
    let sum: f64 = vals.iter().sum();
    GroupStats {
        key: key.to_string(),
        count: vals.len(),
        mean,
        median: median(vals),
        std_dev,
        sum,
    }
}

/// Sales-profit bands crossed with adviser type.
pub fn sales_crosstab(ds: &Dataset) -> ReportResult<CrossTab> {
    crosstab(ds, Category::AdviserType, Metric::SalesProfit)
}

/// Count records per (`category`, sales band of `metric`).
///
/// Every category seen in the dataset gets a row, even if none of its
/// values land in a band.
pub fn crosstab(ds: &Dataset, category: Category, metric: Metric) -> ReportResult<CrossTab> {
    require(ds, category.column())?;
    require(ds, metric.column())?;
    let mut rows: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for r in &ds.records {
        let Some(key) = category.value(r) else {
            continue;
        };
        let counts = rows
            .entry(key)
            .or_insert_with(|| vec![0; SALES_LABELS.len()]);
        if let Some(i) = metric.value(r).and_then(|v| bucket_index(&SALES_BOUNDARIES, v)) {
            counts[i] += 1;
        }
    }
    Ok(CrossTab {
        labels: SALES_LABELS.to_vec(),
        rows: rows
            .into_iter()
            .map(|(k, counts)| (k.to_string(), counts))
            .collect(),
    })
}

/// The `k` records with the largest `metric`. Ties keep file order.
pub fn top_k<'a>(ds: &'a Dataset, metric: Metric, k: usize) -> ReportResult<Vec<&'a Record>> {
    ranked(ds, metric, k, true)
}

/// The `k` records with the smallest `metric`. Ties keep file order.
pub fn bottom_k<'a>(ds: &'a Dataset, metric: Metric, k: usize) -> ReportResult<Vec<&'a Record>> {
    ranked(ds, metric, k, false)
}

fn ranked<'a>(
    ds: &'a Dataset,
    metric: Metric,
    k: usize,
    descending: bool,
) -> ReportResult<Vec<&'a Record>> {
    require(ds, metric.column())?;
    let mut rows: Vec<(&Record, f64)> = ds
        .records
        .iter()
        .filter_map(|r| metric.value(r).map(|v| (r, v)))
        .collect();
    // `sort_by` is stable, so equal values keep file order.
    rows.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    Ok(rows.into_iter().take(k).map(|(r, _)| r).collect())
}

/// Per-category sums of `metric` in `current` vs `previous`.
///
/// Categories present on only one side count as 0 on the other. Rows are
/// ordered by category.
pub fn period_delta(
    current: &Dataset,
    previous: &Dataset,
    category: Category,
    metric: Metric,
) -> ReportResult<Vec<DeltaRow>> {
    let cur = category_sums(current, category, metric)?;
    let prev = category_sums(previous, category, metric)?;

    let mut keys: Vec<&String> = cur.keys().chain(prev.keys()).collect();
    keys.sort();
    keys.dedup();

    Ok(keys
        .into_iter()
        .map(|key| {
            let current = cur.get(key).copied().unwrap_or(0.0);
            let previous = prev.get(key).copied().unwrap_or(0.0);
            let delta = current - previous;
            DeltaRow {
                key: key.clone(),
                current,
                previous,
                delta,
                delta_pct: guarded_pct(delta, previous),
            }
        })
        .collect())
}

fn category_sums(
    ds: &Dataset,
    category: Category,
    metric: Metric,
) -> ReportResult<BTreeMap<String, f64>> {
    require(ds, category.column())?;
    require(ds, metric.column())?;
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for r in &ds.records {
        if let Some(key) = category.value(r) {
            *sums.entry(key.to_string()).or_insert(0.0) += metric.value(r).unwrap_or(0.0);
        }
    }
    Ok(sums)
}

/// Headline figures for one month's final profit.
pub fn overview(ds: &Dataset) -> ReportResult<Overview> {
    require(ds, Column::FinalProfit)?;
    let vals = values(ds, Metric::FinalProfit);
    if vals.is_empty() {
        return Err(ReportError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
    let threshold = quantile(vals.clone(), HIGH_PERFORMER_QUANTILE).unwrap_or(max);
    let high = vals.iter().filter(|v| **v >= threshold).count();
    Ok(Overview {
        advisers: ds.len(),
        mean: average(&vals),
        sum: vals.iter().sum(),
        max,
        median: median(vals.clone()),
        min,
        high_performer_pct: guarded_pct(high as f64, ds.len() as f64),
    })
}

/// Regions by mean final profit, best first, plus the extremes.
pub fn region_ranking(ds: &Dataset) -> ReportResult<RegionRanking> {
    let mut regions = group_stats(ds, Category::Region, Metric::FinalProfit)?;
    regions.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal));
    let (best, worst) = if regions.len() > 1 {
        (regions.first().cloned(), regions.last().cloned())
    } else {
        (None, None)
    };
    Ok(RegionRanking {
        regions,
        best,
        worst,
    })
}

/// Mean final profit per loaded month, oldest first.
///
/// Months without the final-profit column are left out.
pub fn monthly_trend(registry: &Registry) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = registry
        .datasets()
        .into_iter()
        .filter(|ds| ds.has(Column::FinalProfit))
        .map(|ds| {
            let vals = values(ds, Metric::FinalProfit);
            TrendPoint {
                period: ds.period.clone(),
                date: ds.date,
                advisers: vals.len(),
                mean: average(&vals),
            }
        })
        .collect();
    points.reverse();
    points
}

/// Key figures and adviser-type mix for one region.
pub fn region_profile(ds: &Dataset, region: &str) -> ReportResult<RegionProfile> {
    require(ds, Column::Region)?;
    let members: Vec<&Record> = ds
        .records
        .iter()
        .filter(|r| r.region.as_deref() == Some(region))
        .collect();
    if members.is_empty() {
        return Err(ReportError::RegionNotFound(region.to_string()));
    }
    let profits: Vec<f64> = members.iter().filter_map(|r| r.final_profit).collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in &members {
        if let Some(t) = r.adviser_type.as_deref() {
            *counts.entry(t).or_insert(0) += 1;
        }
    }
    let mut type_counts: Vec<(String, usize)> =
        counts.into_iter().map(|(k, c)| (k.to_string(), c)).collect();
    type_counts.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(RegionProfile {
        region: region.to_string(),
        advisers: members.len(),
        mean: average(&profits),
        sum: profits.iter().sum(),
        type_counts,
    })
}

/// Distinct regions in first-seen order.
pub fn regions(ds: &Dataset) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for r in &ds.records {
        if let Some(region) = r.region.as_deref() {
            if !seen.iter().any(|s| s == region) {
                seen.push(region.to_string());
            }
        }
    }
    seen
}
