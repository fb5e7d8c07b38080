use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tabled::Tabled;

/// One row as it comes out of the CSV export, before numeric cleanup.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "顾问名称", default)]
    pub adviser_name: Option<String>,
    #[serde(rename = "顾问编制", default)]
    pub adviser_type: Option<String>,
    #[serde(rename = "大区", default)]
    pub region: Option<String>,
    #[serde(rename = "区域", default)]
    pub sub_region: Option<String>,
    #[serde(rename = "门店名称", default)]
    pub store: Option<String>,
    #[serde(rename = "最终收益值", default)]
    pub final_profit: Option<String>,
    #[serde(rename = "销售利润", default)]
    pub sales_profit: Option<String>,
    #[serde(rename = "新客贡献", default)]
    pub new_customer: Option<String>,
    #[serde(rename = "会员价值贡献", default)]
    pub membership: Option<String>,
    #[serde(rename = "试饮获客贡献", default)]
    pub trial_acquisition: Option<String>,
    #[serde(rename = "A+B内码贡献", default)]
    pub internal_code: Option<String>,
    #[serde(rename = "总收益", default)]
    pub total_revenue: Option<String>,
}

/// One adviser-month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub adviser_name: Option<String>,
    pub adviser_type: Option<String>,
    pub region: Option<String>,
    pub sub_region: Option<String>,
    pub store: Option<String>,
    pub final_profit: Option<f64>,
    pub sales_profit: Option<f64>,
    pub new_customer: Option<f64>,
    pub membership: Option<f64>,
    pub trial_acquisition: Option<f64>,
    pub internal_code: Option<f64>,
    pub total_revenue: Option<f64>,
}

/// Source columns the engine knows about, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    AdviserName,
    AdviserType,
    Region,
    SubRegion,
    Store,
    FinalProfit,
    SalesProfit,
    NewCustomer,
    Membership,
    TrialAcquisition,
    InternalCode,
    TotalRevenue,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::AdviserName,
        Column::AdviserType,
        Column::Region,
        Column::SubRegion,
        Column::Store,
        Column::FinalProfit,
        Column::SalesProfit,
        Column::NewCustomer,
        Column::Membership,
        Column::TrialAcquisition,
        Column::InternalCode,
        Column::TotalRevenue,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::AdviserName => "顾问名称",
            Column::AdviserType => "顾问编制",
            Column::Region => "大区",
            Column::SubRegion => "区域",
            Column::Store => "门店名称",
            Column::FinalProfit => "最终收益值",
            Column::SalesProfit => "销售利润",
            Column::NewCustomer => "新客贡献",
            Column::Membership => "会员价值贡献",
            Column::TrialAcquisition => "试饮获客贡献",
            Column::InternalCode => "A+B内码贡献",
            Column::TotalRevenue => "总收益",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL.into_iter().find(|c| c.header() == header)
    }

    /// Render this column's cell for `record` (used by the raw export).
    pub fn cell(&self, record: &Record) -> String {
        let text = match self {
            Column::AdviserName => record.adviser_name.as_deref(),
            Column::AdviserType => record.adviser_type.as_deref(),
            Column::Region => record.region.as_deref(),
            Column::SubRegion => record.sub_region.as_deref(),
            Column::Store => record.store.as_deref(),
            _ => None,
        };
        if let Some(t) = text {
            return t.to_string();
        }
        Metric::from_column(*self)
            .and_then(|m| m.value(record))
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// Numeric fields a statistic can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FinalProfit,
    SalesProfit,
    NewCustomer,
    Membership,
    TrialAcquisition,
    InternalCode,
    TotalRevenue,
}

/// The contribution metrics tracked by cohort and region comparisons.
pub const TRACKED_METRICS: [Metric; 6] = [
    Metric::SalesProfit,
    Metric::NewCustomer,
    Metric::Membership,
    Metric::TrialAcquisition,
    Metric::InternalCode,
    Metric::TotalRevenue,
];

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::FinalProfit,
        Metric::SalesProfit,
        Metric::NewCustomer,
        Metric::Membership,
        Metric::TrialAcquisition,
        Metric::InternalCode,
        Metric::TotalRevenue,
    ];

    /// Settings name, as in the JSON config (`final_profit`, ...).
    pub fn key(&self) -> &'static str {
        match self {
            Metric::FinalProfit => "final_profit",
            Metric::SalesProfit => "sales_profit",
            Metric::NewCustomer => "new_customer",
            Metric::Membership => "membership",
            Metric::TrialAcquisition => "trial_acquisition",
            Metric::InternalCode => "internal_code",
            Metric::TotalRevenue => "total_revenue",
        }
    }

    /// Accepts the settings name or the column header.
    pub fn from_name(name: &str) -> Option<Metric> {
        let name = name.trim();
        Metric::ALL
            .into_iter()
            .find(|m| m.key() == name || m.label() == name)
    }

    pub fn column(&self) -> Column {
        match self {
            Metric::FinalProfit => Column::FinalProfit,
            Metric::SalesProfit => Column::SalesProfit,
            Metric::NewCustomer => Column::NewCustomer,
            Metric::Membership => Column::Membership,
            Metric::TrialAcquisition => Column::TrialAcquisition,
            Metric::InternalCode => Column::InternalCode,
            Metric::TotalRevenue => Column::TotalRevenue,
        }
    }

    pub fn from_column(column: Column) -> Option<Metric> {
        match column {
            Column::FinalProfit => Some(Metric::FinalProfit),
            Column::SalesProfit => Some(Metric::SalesProfit),
            Column::NewCustomer => Some(Metric::NewCustomer),
            Column::Membership => Some(Metric::Membership),
            Column::TrialAcquisition => Some(Metric::TrialAcquisition),
            Column::InternalCode => Some(Metric::InternalCode),
            Column::TotalRevenue => Some(Metric::TotalRevenue),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.column().header()
    }

    pub fn value(&self, record: &Record) -> Option<f64> {
        match self {
            Metric::FinalProfit => record.final_profit,
            Metric::SalesProfit => record.sales_profit,
            Metric::NewCustomer => record.new_customer,
            Metric::Membership => record.membership,
            Metric::TrialAcquisition => record.trial_acquisition,
            Metric::InternalCode => record.internal_code,
            Metric::TotalRevenue => record.total_revenue,
        }
    }
}

/// Which end of the ranking the ranking table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    #[default]
    Top,
    Bottom,
}

impl RankOrder {
    pub fn label(&self) -> &'static str {
        match self {
            RankOrder::Top => "Top",
            RankOrder::Bottom => "Bottom",
        }
    }
}

/// Categorical fields records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    AdviserType,
    Region,
}

impl Category {
    pub fn column(&self) -> Column {
        match self {
            Category::AdviserType => Column::AdviserType,
            Category::Region => Column::Region,
        }
    }

    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            Category::AdviserType => record.adviser_type.as_deref(),
            Category::Region => record.region.as_deref(),
        }
    }
}

/// Where a dataset came from. Higher priority wins a period-key collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Local,
    Uploaded,
    Remote,
}

impl Source {
    pub fn priority(&self) -> u8 {
        match self {
            Source::Local => 0,
            Source::Uploaded | Source::Remote => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Source::Local => "local file",
            Source::Uploaded => "uploaded file",
            Source::Remote => "remote fetch",
        }
    }
}

/// All records of one reporting period.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub period: String,
    pub date: NaiveDate,
    pub source: Source,
    pub origin: String,
    pub columns: BTreeSet<Column>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KeyFigureRow {
    #[serde(rename = "Figure")]
    #[tabled(rename = "Figure")]
    pub figure: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DistributionRow {
    #[serde(rename = "ProfitBand")]
    #[tabled(rename = "ProfitBand")]
    pub band: String,
    #[serde(rename = "Advisers")]
    #[tabled(rename = "Advisers")]
    pub advisers: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupStatsRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Advisers")]
    #[tabled(rename = "Advisers")]
    pub advisers: usize,
    #[serde(rename = "AvgProfit")]
    #[tabled(rename = "AvgProfit")]
    pub avg_profit: String,
    #[serde(rename = "MedianProfit")]
    #[tabled(rename = "MedianProfit")]
    pub median_profit: String,
    #[serde(rename = "StdDev")]
    #[tabled(rename = "StdDev")]
    pub std_dev: String,
    #[serde(rename = "TotalProfit")]
    #[tabled(rename = "TotalProfit")]
    pub total_profit: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SalesBandRow {
    #[serde(rename = "AdviserType")]
    #[tabled(rename = "AdviserType")]
    pub adviser_type: String,
    #[serde(rename = "Under20k")]
    #[tabled(rename = "Under20k")]
    pub under_20k: String,
    #[serde(rename = "20k-50k")]
    #[tabled(rename = "20k-50k")]
    pub from_20k_to_50k: String,
    #[serde(rename = "50k-100k")]
    #[tabled(rename = "50k-100k")]
    pub from_50k_to_100k: String,
    #[serde(rename = "Over100k")]
    #[tabled(rename = "Over100k")]
    pub over_100k: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Adviser")]
    #[tabled(rename = "Adviser")]
    pub adviser: String,
    #[serde(rename = "AdviserType")]
    #[tabled(rename = "AdviserType")]
    pub adviser_type: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "SubRegion")]
    #[tabled(rename = "SubRegion")]
    pub sub_region: String,
    #[serde(rename = "Store")]
    #[tabled(rename = "Store")]
    pub store: String,
    #[serde(rename = "FinalProfit")]
    #[tabled(rename = "FinalProfit")]
    pub final_profit: String,
    #[serde(rename = "SalesProfit")]
    #[tabled(rename = "SalesProfit")]
    pub sales_profit: String,
    #[serde(rename = "TotalRevenue")]
    #[tabled(rename = "TotalRevenue")]
    pub total_revenue: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionProfileRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Advisers")]
    #[tabled(rename = "Advisers")]
    pub advisers: usize,
    #[serde(rename = "AvgProfit")]
    #[tabled(rename = "AvgProfit")]
    pub avg_profit: String,
    #[serde(rename = "TotalProfit")]
    #[tabled(rename = "TotalProfit")]
    pub total_profit: String,
    #[serde(rename = "AdviserTypes")]
    #[tabled(rename = "AdviserTypes")]
    pub adviser_types: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CohortRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "TopAvg")]
    #[tabled(rename = "TopAvg")]
    pub top_avg: String,
    #[serde(rename = "BottomAvg")]
    #[tabled(rename = "BottomAvg")]
    pub bottom_avg: String,
    #[serde(rename = "OverallAvg")]
    #[tabled(rename = "OverallAvg")]
    pub overall_avg: String,
    #[serde(rename = "TopVsBottomPct")]
    #[tabled(rename = "TopVsBottomPct")]
    pub top_vs_bottom_pct: String,
    #[serde(rename = "TopVsOverallPct")]
    #[tabled(rename = "TopVsOverallPct")]
    pub top_vs_overall_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionDiffRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "RegionAvg")]
    #[tabled(rename = "RegionAvg")]
    pub region_avg: String,
    #[serde(rename = "OverallAvg")]
    #[tabled(rename = "OverallAvg")]
    pub overall_avg: String,
    #[serde(rename = "DiffPct")]
    #[tabled(rename = "DiffPct")]
    pub diff_pct: String,
    #[serde(rename = "Verdict")]
    #[tabled(rename = "Verdict")]
    pub verdict: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DeltaRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "Previous")]
    #[tabled(rename = "Previous")]
    pub previous: String,
    #[serde(rename = "Delta")]
    #[tabled(rename = "Delta")]
    pub delta: String,
    #[serde(rename = "DeltaPct")]
    #[tabled(rename = "DeltaPct")]
    pub delta_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Advisers")]
    #[tabled(rename = "Advisers")]
    pub advisers: usize,
    #[serde(rename = "AvgProfit")]
    #[tabled(rename = "AvgProfit")]
    pub avg_profit: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct SummaryStats {
    pub period: String,
    pub source: Source,
    pub total_advisers: usize,
    pub total_regions: usize,
    pub avg_profit: f64,
    pub total_profit: f64,
    pub high_performer_pct: f64,
    pub previous_period: Option<String>,
}
