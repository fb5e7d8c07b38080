// Period keys derived from report filenames.
//
// Expected names look like `利润模型评估报告_原始收益值_202401.csv`. Anything
// that does not parse falls back to the bare file stem so ad-hoc uploads
// still get a (lossy) key instead of being rejected.
use chrono::{Datelike, NaiveDate};
use std::path::Path;

/// Prefix templates, most specific first.
pub const REPORT_PREFIXES: [&str; 2] = ["利润模型评估报告_原始收益值_", "利润模型评估报告_"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKey {
    pub key: String,
    /// First day of the month, when the filename carried a valid date.
    pub date: Option<NaiveDate>,
}

impl PeriodKey {
    pub fn is_dated(&self) -> bool {
        self.date.is_some()
    }
}

/// Canonical key for a month, e.g. `2024年01月`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{}年{:02}月", date.year(), date.month())
}

/// Derive the period key for `filename`. Never fails.
pub fn extract_period(filename: &str) -> PeriodKey {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let stem = strip_extension(base);

    let date = REPORT_PREFIXES
        .iter()
        .find_map(|prefix| stem.strip_prefix(prefix))
        .and_then(parse_date_token);

    match date {
        Some(d) => PeriodKey {
            key: month_key(d),
            date: Some(d),
        },
        None => {
            log::debug!("no dated period in '{}', using stem '{}'", base, stem);
            PeriodKey {
                key: stem.to_string(),
                date: None,
            }
        }
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// `YYYYMM` or `YYYYMMDD`, truncated to the first of the month.
fn parse_date_token(token: &str) -> Option<NaiveDate> {
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match token.len() {
        6 => {
            let year: i32 = token[..4].parse().ok()?;
            let month: u32 = token[4..].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        8 => {
            let full = NaiveDate::parse_from_str(token, "%Y%m%d").ok()?;
            NaiveDate::from_ymd_opt(full.year(), full.month(), 1)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_digit_token() {
        let p = extract_period("利润模型评估报告_原始收益值_202401.xlsx");
        assert_eq!(p.key, "2024年01月");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn eight_digit_token_truncates_to_month() {
        let p = extract_period("利润模型评估报告_20231215.csv");
        assert_eq!(p.key, "2023年12月");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2023, 12, 1));
    }

    #[test]
    fn directories_are_ignored() {
        let p = extract_period("/data/reports/利润模型评估报告_原始收益值_202402.csv");
        assert_eq!(p.key, "2024年02月");
    }

    #[test]
    fn fallbacks_keep_the_stem() {
        for (name, stem) in [
            ("利润模型评估报告_原始收益值_2024-01.xlsx", "利润模型评估报告_原始收益值_2024-01"),
            ("利润模型评估报告_原始收益值_202413.xlsx", "利润模型评估报告_原始收益值_202413"),
            ("利润模型评估报告_2024011.csv", "利润模型评估报告_2024011"),
            ("202401.csv", "202401"),
            ("january export.csv", "january export"),
            ("noext", "noext"),
        ] {
            let p = extract_period(name);
            assert_eq!(p.key, stem, "for {name}");
            assert!(!p.is_dated());
        }
    }
}
