use adviser_report::aggregate::{
    bottom_k, group_stats, monthly_trend, overview, period_delta, profit_distribution,
    region_profile, region_ranking, sales_crosstab, top_k, PROFIT_LABELS,
};
use adviser_report::loader::parse_dataset;
use adviser_report::registry::Registry;
use adviser_report::types::{Category, Column, Dataset, Metric, Record, Source};
use adviser_report::ReportError;
use chrono::NaiveDate;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn load(filename: &str, csv: &str) -> Dataset {
    parse_dataset(filename, csv.as_bytes(), Source::Local, date(2000, 1))
        .unwrap()
        .0
}

fn month(yyyymm: &str, csv: &str) -> Dataset {
    load(&format!("利润模型评估报告_原始收益值_{yyyymm}.csv"), csv)
}

const HEADER: &str = "顾问名称,顾问编制,大区,最终收益值,销售利润\n";

fn sample() -> Dataset {
    month(
        "202401",
        &format!(
            "{HEADER}\
             王一,全职,华东,5000,1000\n\
             王二,全职,华东,15000,25000\n\
             王三,兼职,华北,60000,120000\n"
        ),
    )
}

fn profits(values: &[f64]) -> Dataset {
    let mut csv = String::from("顾问名称,最终收益值\n");
    for (i, v) in values.iter().enumerate() {
        csv.push_str(&format!("a{i},{v}\n"));
    }
    month("202401", &csv)
}

// ── Distribution ─────────────────────────────────────────────────────────────

#[test]
fn worked_example_buckets_and_type_stats() {
    let ds = sample();

    let dist = profit_distribution(&ds);
    assert_eq!(dist.count("低收益(0-1万)"), Some(1));
    assert_eq!(dist.count("中低收益(1-5万)"), Some(1));
    assert_eq!(dist.count("中收益(5-10万)"), Some(1));
    assert_eq!(dist.count("中高收益(10-20万)"), Some(0));

    let stats = group_stats(&ds, Category::AdviserType, Metric::FinalProfit).unwrap();
    let full_time = stats.iter().find(|g| g.key == "全职").unwrap();
    assert_eq!(full_time.count, 2);
    assert_eq!(full_time.mean, 10000.0);
    assert_eq!(full_time.median, 10000.0);
    assert_eq!(full_time.sum, 20000.0);
}

#[test]
fn distribution_keeps_label_order_and_zero_buckets() {
    let dist = profit_distribution(&profits(&[500.0]));
    let labels: Vec<&str> = dist.buckets.iter().map(|(l, _)| *l).collect();
    assert_eq!(labels, PROFIT_LABELS.to_vec());
    assert_eq!(dist.total(), 1);
}

#[test]
fn boundaries_fall_into_the_upper_bucket() {
    let ds = profits(&[0.0, 10000.0, 50000.0, 100000.0, 200000.0, -0.5]);
    let dist = profit_distribution(&ds);
    for label in PROFIT_LABELS {
        assert_eq!(dist.count(label), Some(1), "bucket {label}");
    }
}

#[test]
fn every_non_null_value_lands_in_exactly_one_bucket() {
    let values: Vec<f64> = (0..500).map(|i| (i as f64 - 100.0) * 731.3).collect();
    let mut ds = profits(&values);
    // A blank cell is not counted.
    ds.records[3].final_profit = None;
    let dist = profit_distribution(&ds);
    assert_eq!(dist.total(), values.len() - 1);
}

#[test]
fn missing_profit_column_gives_empty_distribution() {
    let ds = month("202401", "顾问名称,大区\n甲,华东\n");
    assert!(profit_distribution(&ds).is_empty());
}

// ── Group statistics ─────────────────────────────────────────────────────────

#[test]
fn single_member_group_has_undefined_std() {
    let stats = group_stats(&sample(), Category::AdviserType, Metric::FinalProfit).unwrap();
    let part_time = stats.iter().find(|g| g.key == "兼职").unwrap();
    assert_eq!(part_time.count, 1);
    assert_eq!(part_time.std_dev, None);

    let full_time = stats.iter().find(|g| g.key == "全职").unwrap();
    let sd = full_time.std_dev.unwrap();
    // Sample std of {5000, 15000}.
    assert!((sd - 7071.067_811_865).abs() < 1e-6);
}

#[test]
fn group_stats_need_both_columns() {
    let ds = month("202401", "顾问名称,最终收益值\n甲,100\n");
    let err = group_stats(&ds, Category::Region, Metric::FinalProfit).unwrap_err();
    assert!(matches!(err, ReportError::MissingColumn(Column::Region)));
}

// ── Cross-tab ────────────────────────────────────────────────────────────────

#[test]
fn crosstab_bands_sales_profit() {
    let tab = sales_crosstab(&sample()).unwrap();
    let full_time = &tab.rows.iter().find(|(c, _)| c == "全职").unwrap().1;
    assert_eq!(full_time, &vec![1, 1, 0, 0]);
    let part_time = &tab.rows.iter().find(|(c, _)| c == "兼职").unwrap().1;
    assert_eq!(part_time, &vec![0, 0, 0, 1]);
}

#[test]
fn crosstab_row_sums_match_group_counts() {
    let ds = month(
        "202401",
        &format!(
            "{HEADER}\
             a,全职,华东,1,20000\n\
             b,兼职,华东,2,19999.99\n\
             c,全职,华北,3,50000\n\
             d,店长,华北,4,0\n\
             e,全职,华南,5,100000\n\
             f,兼职,华南,6,75000\n"
        ),
    );
    let tab = sales_crosstab(&ds).unwrap();
    let stats = group_stats(&ds, Category::AdviserType, Metric::FinalProfit).unwrap();
    assert_eq!(tab.rows.len(), stats.len());
    for g in &stats {
        assert_eq!(tab.row_total(&g.key), Some(g.count), "type {}", g.key);
    }
}

#[test]
fn crosstab_percentages_guard_empty_rows() {
    let ds = month(
        "202401",
        &format!("{HEADER}a,全职,华东,1,30000\nb,全职,华东,1,10000\nc,兼职,华东,1,-500\n"),
    );
    let tab = sales_crosstab(&ds).unwrap();
    let pcts = tab.row_percentages();
    let part_time = &pcts.iter().find(|(c, _)| c == "兼职").unwrap().1;
    assert_eq!(part_time, &vec![0.0; 4]);
    let full_time = &pcts.iter().find(|(c, _)| c == "全职").unwrap().1;
    assert_eq!(full_time, &vec![50.0, 50.0, 0.0, 0.0]);
}

// ── Ranking ──────────────────────────────────────────────────────────────────

#[test]
fn top_and_bottom_k_are_stable_on_ties() {
    let ds = profits(&[10.0, 30.0, 20.0, 30.0, 10.0]);
    let names = |rs: Vec<&Record>| -> Vec<String> {
        rs.iter().map(|r| r.adviser_name.clone().unwrap()).collect()
    };
    assert_eq!(names(top_k(&ds, Metric::FinalProfit, 3).unwrap()), ["a1", "a3", "a2"]);
    assert_eq!(names(bottom_k(&ds, Metric::FinalProfit, 2).unwrap()), ["a0", "a4"]);
}

#[test]
fn k_is_clamped_to_dataset_size() {
    let ds = profits(&[1.0, 2.0]);
    assert_eq!(top_k(&ds, Metric::FinalProfit, 50).unwrap().len(), 2);
}

#[test]
fn ranking_on_absent_field_fails_explicitly() {
    let err = top_k(&profits(&[1.0]), Metric::TotalRevenue, 5).unwrap_err();
    assert!(matches!(err, ReportError::MissingColumn(Column::TotalRevenue)));
}

// ── Cross-period delta ───────────────────────────────────────────────────────

#[test]
fn delta_outer_joins_regions_and_guards_zero_previous() {
    let current = month("202402", &format!("{HEADER}a,全职,华东,300,0\nb,全职,华北,100,0\n"));
    let previous = month(
        "202401",
        &format!("{HEADER}a,全职,华东,200,0\nb,全职,华南,50,0\nc,全职,华北,0,0\n"),
    );
    let rows = period_delta(&current, &previous, Category::Region, Metric::FinalProfit).unwrap();
    assert_eq!(rows.len(), 3);

    let get = |k: &str| rows.iter().find(|r| r.key == k).unwrap();
    assert_eq!(get("华东").delta, 100.0);
    assert_eq!(get("华东").delta_pct, 50.0);
    assert_eq!(get("华北").delta, 100.0);
    assert_eq!(get("华北").delta_pct, 0.0);
    assert_eq!(get("华南").current, 0.0);
    assert_eq!(get("华南").delta_pct, -100.0);
}

#[test]
fn delta_pct_is_zero_when_category_is_new() {
    let current = month("202402", &format!("{HEADER}a,全职,西区,800,0\n"));
    let previous = month("202401", &format!("{HEADER}a,全职,华东,200,0\n"));
    let rows = period_delta(&current, &previous, Category::Region, Metric::FinalProfit).unwrap();
    let west = rows.iter().find(|r| r.key == "西区").unwrap();
    assert_eq!(west.previous, 0.0);
    assert_eq!(west.delta_pct, 0.0);
    assert!(rows.iter().all(|r| r.delta_pct.is_finite()));
}

// ── Overview, regions, trend ─────────────────────────────────────────────────

#[test]
fn overview_counts_high_performers_from_80th_percentile() {
    let values: Vec<f64> = (1..=10).map(|i| i as f64 * 1000.0).collect();
    let o = overview(&profits(&values)).unwrap();
    assert_eq!(o.advisers, 10);
    assert_eq!(o.mean, 5500.0);
    assert_eq!(o.sum, 55000.0);
    assert_eq!(o.max, 10000.0);
    assert_eq!(o.min, 1000.0);
    assert_eq!(o.median, 5500.0);
    assert!((o.high_performer_pct - 20.0).abs() < 1e-9);
}

#[test]
fn region_ranking_orders_by_mean_and_names_extremes() {
    let ds = month(
        "202401",
        &format!("{HEADER}a,全职,华东,100,0\nb,全职,华北,300,0\nc,全职,华南,200,0\n"),
    );
    let ranking = region_ranking(&ds).unwrap();
    let order: Vec<&str> = ranking.regions.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(order, ["华北", "华南", "华东"]);
    assert_eq!(ranking.best.unwrap().key, "华北");
    assert_eq!(ranking.worst.unwrap().key, "华东");
}

#[test]
fn single_region_has_no_best_or_worst() {
    let ds = month("202401", &format!("{HEADER}a,全职,华东,100,0\n"));
    let ranking = region_ranking(&ds).unwrap();
    assert!(ranking.best.is_none());
    assert!(ranking.worst.is_none());
}

#[test]
fn trend_runs_oldest_first() {
    let mut registry = Registry::new();
    for (m, profit) in [("202403", 300), ("202401", 100), ("202402", 200)] {
        let ds = month(m, &format!("顾问名称,最终收益值\na,{profit}\n"));
        let period = ds.period.clone();
        registry.put(&period, ds);
    }
    let trend = monthly_trend(&registry);
    let periods: Vec<&str> = trend.iter().map(|p| p.period.as_str()).collect();
    assert_eq!(periods, ["2024年01月", "2024年02月", "2024年03月"]);
    assert_eq!(trend[2].mean, 300.0);
}

#[test]
fn region_profile_counts_adviser_types() {
    let ds = month(
        "202401",
        &format!("{HEADER}a,全职,华东,100,0\nb,兼职,华东,300,0\nc,全职,华东,200,0\nd,全职,华北,1,0\n"),
    );
    let p = region_profile(&ds, "华东").unwrap();
    assert_eq!(p.advisers, 3);
    assert_eq!(p.mean, 200.0);
    assert_eq!(p.sum, 600.0);
    assert_eq!(p.type_counts[0], ("全职".to_string(), 2));
    assert!(matches!(
        region_profile(&ds, "西区"),
        Err(ReportError::RegionNotFound(_))
    ));
}
