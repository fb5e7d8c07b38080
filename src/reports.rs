// Turn engine results into display rows for previews and CSV export.
//
// Money is rounded to whole yuan and percentages to one decimal here, never
// inside the engine.
use crate::aggregate::{
    self, regions, BucketedDistribution, CrossTab, DeltaRow as Delta, GroupStats, Overview,
    RegionProfile, TrendPoint,
};
use crate::compare::{self, CohortComparison, ComparisonRow, RegionComparison};
use crate::config::Config;
use crate::error::{ReportError, ReportResult};
use crate::registry::Registry;
use crate::types::{
    Category, CohortRow, Column, Dataset, DeltaRow, DistributionRow, GroupStatsRow, KeyFigureRow,
    Metric, RankOrder, RankingRow, Record, RegionDiffRow, RegionProfileRow, SalesBandRow, Source,
    SummaryStats, TrendRow,
};
use crate::util::{format_int, format_money, format_number, format_pct, guarded_pct};

pub fn overview_rows(o: &Overview) -> Vec<KeyFigureRow> {
    let figure = |name: &str, value: String| KeyFigureRow {
        figure: name.to_string(),
        value,
    };
    vec![
        figure("Advisers", format_int(o.advisers)),
        figure("AvgProfit", format_money(o.mean)),
        figure("TotalProfit", format_money(o.sum)),
        figure("HighPerformerPct", format!("{}%", format_number(o.high_performer_pct, 1))),
        figure("MaxProfit", format_money(o.max)),
        figure("MedianProfit", format_money(o.median)),
        figure("MinProfit", format_money(o.min)),
    ]
}

pub fn distribution_rows(dist: &BucketedDistribution) -> Vec<DistributionRow> {
    let total = dist.total();
    dist.buckets
        .iter()
        .map(|(label, count)| DistributionRow {
            band: label.to_string(),
            advisers: *count,
            share_pct: format_number(guarded_pct(*count as f64, total as f64), 1),
        })
        .collect()
}

pub fn group_stats_rows(stats: &[GroupStats]) -> Vec<GroupStatsRow> {
    stats
        .iter()
        .map(|g| GroupStatsRow {
            group: g.key.clone(),
            advisers: g.count,
            avg_profit: format_money(g.mean),
            median_profit: format_money(g.median),
            std_dev: g
                .std_dev
                .map(format_money)
                .unwrap_or_else(|| "N/A".to_string()),
            total_profit: format_money(g.sum),
        })
        .collect()
}

/// Cross-tab counts, one row per adviser type.
pub fn sales_band_rows(tab: &CrossTab) -> Vec<SalesBandRow> {
    tab.rows
        .iter()
        .map(|(category, counts)| {
            let cell = |i: usize| counts.get(i).copied().unwrap_or(0).to_string();
            SalesBandRow {
                adviser_type: category.clone(),
                under_20k: cell(0),
                from_20k_to_50k: cell(1),
                from_50k_to_100k: cell(2),
                over_100k: cell(3),
                total: counts.iter().sum(),
            }
        })
        .collect()
}

/// Same shape as `sales_band_rows`, cells as row percentages.
pub fn sales_band_pct_rows(tab: &CrossTab) -> Vec<SalesBandRow> {
    tab.row_percentages()
        .into_iter()
        .zip(tab.rows.iter())
        .map(|((category, pcts), (_, counts))| {
            let cell = |i: usize| {
                let pct = pcts.get(i).copied().unwrap_or(0.0);
                format!("{}%", format_number(pct, 1))
            };
            SalesBandRow {
                adviser_type: category,
                under_20k: cell(0),
                from_20k_to_50k: cell(1),
                from_50k_to_100k: cell(2),
                over_100k: cell(3),
                total: counts.iter().sum(),
            }
        })
        .collect()
}

pub fn ranking_rows(records: &[&Record]) -> Vec<RankingRow> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let money = |v: Option<f64>| v.map(format_money).unwrap_or_default();
    records
        .iter()
        .enumerate()
        .map(|(idx, r)| RankingRow {
            rank: idx + 1,
            adviser: text(&r.adviser_name),
            adviser_type: text(&r.adviser_type),
            region: text(&r.region),
            sub_region: text(&r.sub_region),
            store: text(&r.store),
            final_profit: money(r.final_profit),
            sales_profit: money(r.sales_profit),
            total_revenue: money(r.total_revenue),
        })
        .collect()
}

fn cohort_row(row: &ComparisonRow) -> CohortRow {
    CohortRow {
        metric: row.metric.label().to_string(),
        top_avg: format_money(row.top_mean),
        bottom_avg: format_money(row.bottom_mean),
        overall_avg: format_money(row.overall_mean),
        top_vs_bottom_pct: format_pct(row.advantage_pct),
        top_vs_overall_pct: format_pct(row.top_vs_overall_pct),
    }
}

/// Headline row first, then the tracked metrics.
pub fn cohort_rows(cmp: &CohortComparison) -> Vec<CohortRow> {
    std::iter::once(&cmp.headline)
        .chain(cmp.rows.iter())
        .map(cohort_row)
        .collect()
}

pub fn region_diff_rows(cmp: &RegionComparison) -> Vec<RegionDiffRow> {
    cmp.diffs
        .iter()
        .map(|d| RegionDiffRow {
            region: cmp.region.clone(),
            metric: d.metric.label().to_string(),
            region_avg: format_money(d.region_mean),
            overall_avg: format_money(d.overall_mean),
            diff_pct: format_pct(d.diff_pct),
            verdict: d.verdict.label().to_string(),
        })
        .collect()
}

pub fn delta_rows(deltas: &[Delta]) -> Vec<DeltaRow> {
    deltas
        .iter()
        .map(|d| DeltaRow {
            region: d.key.clone(),
            current: format_money(d.current),
            previous: format_money(d.previous),
            delta: format_money(d.delta),
            delta_pct: format_pct(d.delta_pct),
        })
        .collect()
}

/// One row per region; the type mix reads `全职 2 / 兼职 1`.
pub fn region_profile_rows(profiles: &[RegionProfile]) -> Vec<RegionProfileRow> {
    profiles
        .iter()
        .map(|p| RegionProfileRow {
            region: p.region.clone(),
            advisers: p.advisers,
            avg_profit: format_money(p.mean),
            total_profit: format_money(p.sum),
            adviser_types: p
                .type_counts
                .iter()
                .map(|(t, c)| format!("{} {}", t, c))
                .collect::<Vec<_>>()
                .join(" / "),
        })
        .collect()
}

pub fn trend_rows(points: &[TrendPoint]) -> Vec<TrendRow> {
    points
        .iter()
        .map(|p| TrendRow {
            month: p.period.clone(),
            advisers: p.advisers,
            avg_profit: format_money(p.mean),
        })
        .collect()
}

pub fn summary(
    ds: &Dataset,
    overview: Option<&Overview>,
    previous_period: Option<String>,
) -> SummaryStats {
    let total_regions = regions(ds).len();
    SummaryStats {
        period: ds.period.clone(),
        source: ds.source,
        total_advisers: ds.len(),
        total_regions,
        avg_profit: overview.map(|o| o.mean).unwrap_or(0.0),
        total_profit: overview.map(|o| o.sum).unwrap_or(0.0),
        high_performer_pct: overview.map(|o| o.high_performer_pct).unwrap_or(0.0),
        previous_period,
    }
}

/// A table, or the reason it could not be built.
pub type Section<T> = Result<Vec<T>, String>;

fn skipped(e: ReportError) -> String {
    if e.is_insufficient_data() {
        log::info!("table skipped: {}", e);
    } else {
        log::warn!("table failed: {}", e);
    }
    e.to_string()
}

fn section<T>(result: ReportResult<Vec<T>>) -> Section<T> {
    result.map_err(skipped)
}

/// Every table shown for one month.
#[derive(Debug, Clone)]
pub struct MonthReport {
    pub period: String,
    pub source: Source,
    pub previous: Option<String>,
    pub overview: Section<KeyFigureRow>,
    pub distribution: Section<DistributionRow>,
    pub type_stats: Section<GroupStatsRow>,
    pub sales_bands: Section<SalesBandRow>,
    pub sales_band_pct: Section<SalesBandRow>,
    pub regions: Section<GroupStatsRow>,
    pub best_region: Option<String>,
    pub worst_region: Option<String>,
    pub trend: Section<TrendRow>,
    pub deltas: Section<DeltaRow>,
    pub ranking: Section<RankingRow>,
    pub region_profiles: Section<RegionProfileRow>,
    pub cohort: Section<CohortRow>,
    pub region_diffs: Section<RegionDiffRow>,
    /// (region, metric most in need of improvement).
    pub priorities: Vec<(String, Option<String>)>,
    pub summary: SummaryStats,
}

/// Memo key for everything in `Config` that changes a `MonthReport`.
pub fn report_params(config: &Config) -> String {
    format!(
        "cohort={};top={};rank={:?};order={:?}",
        config.cohort_size, config.top_n, config.rank_by, config.rank_order
    )
}

/// The ranking table's records: best or worst `top_n` by `rank_by`.
pub fn ranked_records<'a>(ds: &'a Dataset, config: &Config) -> ReportResult<Vec<&'a Record>> {
    match config.rank_order {
        RankOrder::Top => aggregate::top_k(ds, config.rank_by, config.top_n),
        RankOrder::Bottom => aggregate::bottom_k(ds, config.rank_by, config.top_n),
    }
}

pub fn build_month_report(
    registry: &Registry,
    period: &str,
    config: &Config,
) -> ReportResult<MonthReport> {
    let ds = registry
        .get(period)
        .ok_or_else(|| ReportError::UnknownPeriod(period.to_string()))?;
    let previous = registry.previous(period);

    let overview = aggregate::overview(ds);
    let dist = aggregate::profit_distribution(ds);
    let distribution = if dist.is_empty() {
        Err(skipped(ReportError::MissingColumn(Column::FinalProfit)))
    } else {
        Ok(distribution_rows(&dist))
    };

    let (sales_bands, sales_band_pct) = match aggregate::sales_crosstab(ds) {
        Ok(tab) => (Ok(sales_band_rows(&tab)), Ok(sales_band_pct_rows(&tab))),
        Err(e) => {
            let msg = skipped(e);
            (Err(msg.clone()), Err(msg))
        }
    };

    let ranking = aggregate::region_ranking(ds);
    let (best_region, worst_region) = match &ranking {
        Ok(r) => (
            r.best.as_ref().map(|g| g.key.clone()),
            r.worst.as_ref().map(|g| g.key.clone()),
        ),
        Err(_) => (None, None),
    };

    let trend = if registry.len() > 1 {
        Ok(trend_rows(&aggregate::monthly_trend(registry)))
    } else {
        Err("trend needs at least two months".to_string())
    };

    let deltas = match previous.as_deref().and_then(|p| registry.get(p)) {
        Some(prev) => section(
            aggregate::period_delta(ds, prev, Category::Region, Metric::FinalProfit)
                .map(|d| delta_rows(&d)),
        ),
        None => Err("no previous month loaded".to_string()),
    };

    let mut priorities = Vec::new();
    let region_diffs = if ds.has(Column::Region) {
        let mut rows = Vec::new();
        for region in regions(ds) {
            if let Ok(cmp) = compare::region_comparison(ds, &region) {
                priorities.push((region, cmp.priority.map(|m| m.label().to_string())));
                rows.extend(region_diff_rows(&cmp));
            }
        }
        Ok(rows)
    } else {
        Err(skipped(ReportError::MissingColumn(Column::Region)))
    };

    let region_profiles = if ds.has(Column::Region) {
        let profiles: Vec<RegionProfile> = regions(ds)
            .iter()
            .filter_map(|r| aggregate::region_profile(ds, r).ok())
            .collect();
        Ok(region_profile_rows(&profiles))
    } else {
        Err(skipped(ReportError::MissingColumn(Column::Region)))
    };

    let summary = summary(ds, overview.as_ref().ok(), previous.clone());
    Ok(MonthReport {
        period: ds.period.clone(),
        source: ds.source,
        previous,
        overview: section(overview.map(|o| overview_rows(&o))),
        distribution,
        type_stats: section(
            aggregate::group_stats(ds, Category::AdviserType, Metric::FinalProfit)
                .map(|g| group_stats_rows(&g)),
        ),
        sales_bands,
        sales_band_pct,
        regions: section(ranking.map(|r| group_stats_rows(&r.regions))),
        best_region,
        worst_region,
        trend,
        deltas,
        ranking: section(ranked_records(ds, config).map(|r| ranking_rows(&r))),
        region_profiles,
        cohort: section(
            compare::cohort_comparison(ds, Metric::FinalProfit, config.cohort_size)
                .map(|c| cohort_rows(&c)),
        ),
        region_diffs,
        priorities,
        summary,
    })
}
