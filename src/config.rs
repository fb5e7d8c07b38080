use crate::compare::DEFAULT_COHORT_SIZE;
use crate::error::{ReportError, ReportResult};
use crate::period::REPORT_PREFIXES;
use crate::types::{Metric, RankOrder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings. Defaults, then an optional JSON file, then flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned for local monthly reports.
    pub data_folder: PathBuf,
    /// Where exported CSV/JSON files go.
    pub output_folder: PathBuf,
    /// Filename prefix of local report files.
    pub file_prefix: String,
    /// Size of each cohort in the top-vs-bottom comparison.
    pub cohort_size: usize,
    /// Rows in the ranking table.
    pub top_n: usize,
    pub rank_by: Metric,
    /// Best or worst `top_n` advisers in the ranking table.
    pub rank_order: RankOrder,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("reports"),
            output_folder: PathBuf::from("."),
            file_prefix: REPORT_PREFIXES[0].to_string(),
            cohort_size: DEFAULT_COHORT_SIZE,
            top_n: 20,
            rank_by: Metric::FinalProfit,
            rank_order: RankOrder::Top,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> ReportResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()
    }

    /// Build from command-line arguments (`args[0]` is the program name).
    ///
    /// Flags: `--config <file>`, `--data-dir <dir>`, `--out-dir <dir>`,
    /// `--cohort-size <n>`, `--top-n <n>`, `--rank-by <metric>`, `--bottom`.
    pub fn from_args(args: &[String]) -> ReportResult<Self> {
        let mut config = match flag(args, "--config") {
            Some(path) => Config::from_file(Path::new(path))?,
            None => Config::default(),
        };
        if let Some(dir) = flag(args, "--data-dir") {
            config.data_folder = PathBuf::from(dir);
        }
        if let Some(dir) = flag(args, "--out-dir") {
            config.output_folder = PathBuf::from(dir);
        }
        if let Some(n) = flag(args, "--cohort-size") {
            config.cohort_size = parse_count("--cohort-size", n)?;
        }
        if let Some(n) = flag(args, "--top-n") {
            config.top_n = parse_count("--top-n", n)?;
        }
        if let Some(name) = flag(args, "--rank-by") {
            config.rank_by = Metric::from_name(name).ok_or_else(|| {
                ReportError::Config(format!("--rank-by: unknown metric '{}'", name))
            })?;
        }
        if switch(args, "--bottom") {
            config.rank_order = RankOrder::Bottom;
        }
        config.validate()
    }

    fn validate(self) -> ReportResult<Self> {
        if self.cohort_size == 0 {
            return Err(ReportError::Config("cohort_size must be at least 1".into()));
        }
        if self.top_n == 0 {
            return Err(ReportError::Config("top_n must be at least 1".into()));
        }
        Ok(self)
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn switch(args: &[String], name: &str) -> bool {
    args.iter().skip(1).any(|a| a == name)
}

fn parse_count(name: &str, value: &str) -> ReportResult<usize> {
    value
        .parse()
        .map_err(|_| ReportError::Config(format!("{} expects a number, got '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("adviser_report")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_without_flags() {
        let c = Config::from_args(&args(&[])).unwrap();
        assert_eq!(c.cohort_size, 100);
        assert_eq!(c.top_n, 20);
        assert_eq!(c.file_prefix, "利润模型评估报告_原始收益值_");
    }

    #[test]
    fn flags_override_defaults() {
        let c = Config::from_args(&args(&["--data-dir", "/tmp/r", "--cohort-size", "50"])).unwrap();
        assert_eq!(c.data_folder, PathBuf::from("/tmp/r"));
        assert_eq!(c.cohort_size, 50);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        assert!(matches!(
            Config::from_args(&args(&["--top-n", "many"])),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            Config::from_args(&args(&["--cohort-size", "0"])),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn ranking_flags() {
        let c = Config::from_args(&args(&["--rank-by", "total_revenue", "--bottom"])).unwrap();
        assert_eq!(c.rank_by, Metric::TotalRevenue);
        assert_eq!(c.rank_order, RankOrder::Bottom);

        let c = Config::from_args(&args(&["--rank-by", "销售利润"])).unwrap();
        assert_eq!(c.rank_by, Metric::SalesProfit);
        assert_eq!(c.rank_order, RankOrder::Top);

        assert!(matches!(
            Config::from_args(&args(&["--rank-by", "height"])),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn json_fields_are_optional() {
        let c: Config = serde_json::from_str(r#"{"top_n": 5, "rank_by": "sales_profit"}"#).unwrap();
        assert_eq!(c.top_n, 5);
        assert_eq!(c.rank_by, Metric::SalesProfit);
        assert_eq!(c.cohort_size, 100);
        assert_eq!(c.rank_order, RankOrder::Top);

        let c: Config = serde_json::from_str(r#"{"rank_order": "bottom"}"#).unwrap();
        assert_eq!(c.rank_order, RankOrder::Bottom);
    }
}
