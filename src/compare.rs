// Comparison engine: cohorts against each other, regions against the whole.
//
// All ratios go through `util::guarded_pct`, so a zero or undefined base
// reads as a 0% difference instead of NaN/inf.
use crate::aggregate::{bottom_k, top_k};
use crate::error::{ReportError, ReportResult};
use crate::types::{Column, Dataset, Metric, Record, TRACKED_METRICS};
use crate::util::{average, finite_or_zero, pct_change};

pub const DEFAULT_COHORT_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub metric: Metric,
    pub top_mean: f64,
    pub bottom_mean: f64,
    pub overall_mean: f64,
    /// (top - bottom) / bottom, in percent.
    pub advantage_pct: f64,
    /// (top - overall) / overall, in percent.
    pub top_vs_overall_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortComparison {
    pub cohort_size: usize,
    pub ranked_by: Metric,
    /// The ranking metric itself.
    pub headline: ComparisonRow,
    /// One row per tracked contribution metric.
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Advantage,
    Disadvantage,
    Even,
}

impl Verdict {
    pub fn from_diff(diff_pct: f64) -> Self {
        if diff_pct > 0.0 {
            Verdict::Advantage
        } else if diff_pct < 0.0 {
            Verdict::Disadvantage
        } else {
            Verdict::Even
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Advantage => "advantage",
            Verdict::Disadvantage => "disadvantage",
            Verdict::Even => "even",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionDiff {
    pub metric: Metric,
    pub region_mean: f64,
    pub overall_mean: f64,
    pub diff_pct: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionComparison {
    pub region: String,
    pub advisers: usize,
    pub diffs: Vec<RegionDiff>,
    /// Metric with the largest shortfall against the overall mean.
    pub priority: Option<Metric>,
}

impl RegionComparison {
    pub fn strengths(&self) -> impl Iterator<Item = &RegionDiff> {
        self.diffs
            .iter()
            .filter(|d| d.verdict == Verdict::Advantage)
    }

    pub fn weaknesses(&self) -> impl Iterator<Item = &RegionDiff> {
        self.diffs
            .iter()
            .filter(|d| d.verdict == Verdict::Disadvantage)
    }
}

/// Mean of `metric` over `records`; 0 when the column is absent or empty.
fn mean_of(ds: &Dataset, records: &[&Record], metric: Metric) -> f64 {
    if !ds.has(metric.column()) {
        return 0.0;
    }
    let vals: Vec<f64> = records.iter().filter_map(|r| metric.value(r)).collect();
    finite_or_zero(average(&vals))
}

fn comparison_row(
    ds: &Dataset,
    metric: Metric,
    top: &[&Record],
    bottom: &[&Record],
    all: &[&Record],
) -> ComparisonRow {
    let top_mean = mean_of(ds, top, metric);
    let bottom_mean = mean_of(ds, bottom, metric);
    let overall_mean = mean_of(ds, all, metric);
    ComparisonRow {
        metric,
        top_mean,
        bottom_mean,
        overall_mean,
        advantage_pct: pct_change(top_mean, bottom_mean),
        top_vs_overall_pct: pct_change(top_mean, overall_mean),
    }
}

/// Top-`n` vs bottom-`n` vs everyone, ranked by `ranked_by`.
///
/// Needs at least `2 * n` ranked records so the cohorts cannot overlap;
/// below that the comparison is refused rather than computed on less.
pub fn cohort_comparison(
    ds: &Dataset,
    ranked_by: Metric,
    n: usize,
) -> ReportResult<CohortComparison> {
    if !ds.has(ranked_by.column()) {
        return Err(ReportError::MissingColumn(ranked_by.column()));
    }
    let ranked = ds
        .records
        .iter()
        .filter(|r| ranked_by.value(r).is_some())
        .count();
    let required = n.saturating_mul(2).max(1);
    if ranked < required {
        return Err(ReportError::InsufficientData {
            required,
            actual: ranked,
        });
    }

    let top = top_k(ds, ranked_by, n)?;
    let bottom = bottom_k(ds, ranked_by, n)?;
    let all: Vec<&Record> = ds.records.iter().collect();
    log::debug!(
        "cohort comparison on {}: {} vs {} of {}",
        ds.period,
        top.len(),
        bottom.len(),
        all.len()
    );

    let headline = comparison_row(ds, ranked_by, &top, &bottom, &all);
    let rows = TRACKED_METRICS
        .iter()
        .map(|m| comparison_row(ds, *m, &top, &bottom, &all))
        .collect();
    Ok(CohortComparison {
        cohort_size: n,
        ranked_by,
        headline,
        rows,
    })
}

/// How `region` compares with the whole month on each available metric.
pub fn region_comparison(ds: &Dataset, region: &str) -> ReportResult<RegionComparison> {
    if !ds.has(Column::Region) {
        return Err(ReportError::MissingColumn(Column::Region));
    }
    let members: Vec<&Record> = ds
        .records
        .iter()
        .filter(|r| r.region.as_deref() == Some(region))
        .collect();
    if members.is_empty() {
        return Err(ReportError::RegionNotFound(region.to_string()));
    }
    let all: Vec<&Record> = ds.records.iter().collect();

    let diffs: Vec<RegionDiff> = std::iter::once(Metric::FinalProfit)
        .chain(TRACKED_METRICS)
        .filter(|m| ds.has(m.column()))
        .map(|metric| {
            let region_mean = mean_of(ds, &members, metric);
            let overall_mean = mean_of(ds, &all, metric);
            let diff_pct = pct_change(region_mean, overall_mean);
            RegionDiff {
                metric,
                region_mean,
                overall_mean,
                diff_pct,
                verdict: Verdict::from_diff(diff_pct),
            }
        })
        .collect();

    // Ties keep the earlier metric.
    let priority = diffs
        .iter()
        .filter(|d| d.verdict == Verdict::Disadvantage)
        .fold(None::<&RegionDiff>, |worst, d| match worst {
            Some(w) if w.diff_pct <= d.diff_pct => Some(w),
            _ => Some(d),
        })
        .map(|d| d.metric);

    Ok(RegionComparison {
        region: region.to_string(),
        advisers: members.len(),
        diffs,
        priority,
    })
}
