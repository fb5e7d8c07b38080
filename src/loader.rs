use crate::error::{ReportError, ReportResult};
use crate::period::{extract_period, REPORT_PREFIXES};
use crate::registry::Registry;
use crate::types::{Column, Dataset, RawRow, Record, Source};
use crate::util::{clean_text, parse_f64_safe};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Outcome of turning one file into a dataset.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub period: String,
    pub total_rows: usize,
    pub parse_errors: usize,
    pub missing_columns: Vec<Column>,
}

/// Outcome of a batch load (folder scan or upload).
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<FileReport>,
    /// Periods that stayed with a higher-priority source.
    pub kept_existing: Vec<String>,
    /// One line per skipped file, meant for the user.
    pub warnings: Vec<String>,
}

/// Decode one CSV byte stream into a dataset.
///
/// The period key comes from `filename`. When the name carries no usable
/// date, `fallback_date` orders the dataset instead.
pub fn parse_dataset<R: Read>(
    filename: &str,
    reader: R,
    source: Source,
    fallback_date: NaiveDate,
) -> ReportResult<(Dataset, FileReport)> {
    let period = extract_period(filename);
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns: BTreeSet<Column> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .filter_map(Column::from_header)
        .collect();
    if columns.is_empty() {
        return Err(ReportError::Ingest {
            file: filename.to_string(),
            reason: "no recognised report columns".to_string(),
        });
    }
    // A BOM glued to the first header would hide that column from serde.
    if headers.get(0).is_some_and(|h| h.starts_with('\u{feff}')) {
        let cleaned: csv::StringRecord = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}'))
            .collect();
        rdr.set_headers(cleaned);
    }

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut records = Vec::new();
    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::debug!("{}: row {} skipped: {}", filename, total_rows, e);
                parse_errors += 1;
                continue;
            }
        };
        records.push(Record {
            adviser_name: clean_text(row.adviser_name),
            adviser_type: clean_text(row.adviser_type),
            region: clean_text(row.region),
            sub_region: clean_text(row.sub_region),
            store: clean_text(row.store),
            final_profit: parse_f64_safe(row.final_profit.as_deref()),
            sales_profit: parse_f64_safe(row.sales_profit.as_deref()),
            new_customer: parse_f64_safe(row.new_customer.as_deref()),
            membership: parse_f64_safe(row.membership.as_deref()),
            trial_acquisition: parse_f64_safe(row.trial_acquisition.as_deref()),
            internal_code: parse_f64_safe(row.internal_code.as_deref()),
            total_revenue: parse_f64_safe(row.total_revenue.as_deref()),
        });
    }

    let missing_columns: Vec<Column> = Column::ALL
        .into_iter()
        .filter(|c| !columns.contains(c))
        .collect();
    let report = FileReport {
        period: period.key.clone(),
        total_rows,
        parse_errors,
        missing_columns,
    };
    let dataset = Dataset {
        period: period.key,
        date: period.date.unwrap_or(fallback_date),
        source,
        origin: filename.to_string(),
        columns,
        records,
    };
    Ok((dataset, report))
}

/// Load every `<prefix>*.csv` under `folder` as local data.
///
/// A missing folder or an unreadable file is a warning, never an error.
pub fn scan_folder(
    registry: &mut Registry,
    folder: &Path,
    prefix: &str,
    today: NaiveDate,
) -> LoadReport {
    let mut report = LoadReport::default();
    let entries = match fs::read_dir(folder) {
        Ok(e) => e,
        Err(e) => {
            let msg = format!("data folder {} not readable: {}", folder.display(), e);
            log::warn!("{}", msg);
            report.warnings.push(msg);
            return report;
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| is_report_file(p, prefix))
        .collect();
    files.sort();
    if files.is_empty() {
        let msg = format!(
            "no report files in {} (expected {}YYYYMM.csv)",
            folder.display(),
            prefix
        );
        log::warn!("{}", msg);
        report.warnings.push(msg);
        return report;
    }
    log::info!("found {} local report files", files.len());

    for path in files {
        load_into(registry, &path, Source::Local, today, &mut report);
    }
    report
}

/// Load explicitly chosen files. They take precedence over local data.
pub fn load_uploads(registry: &mut Registry, paths: &[PathBuf], today: NaiveDate) -> LoadReport {
    let mut report = LoadReport::default();
    for path in paths {
        load_into(registry, path, Source::Uploaded, today, &mut report);
    }
    report
}

fn load_into(
    registry: &mut Registry,
    path: &Path,
    source: Source,
    today: NaiveDate,
    report: &mut LoadReport,
) {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let parsed = fs::File::open(path)
        .map_err(ReportError::from)
        .and_then(|f| parse_dataset(&filename, f, source, today));
    match parsed {
        Ok((mut dataset, file_report)) => {
            dataset.origin = path.display().to_string();
            log::info!(
                "loaded {} from {} ({} records)",
                dataset.period,
                source.label(),
                dataset.len()
            );
            if registry.offer(dataset) {
                report.loaded.push(file_report);
            } else {
                report.kept_existing.push(file_report.period);
            }
        }
        Err(e) => {
            let msg = format!("skipped {}: {}", path.display(), e);
            log::warn!("{}", msg);
            report.warnings.push(msg);
        }
    }
}

fn is_report_file(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let prefix = if prefix.is_empty() {
        REPORT_PREFIXES[0]
    } else {
        prefix
    };
    path.is_file()
        && name.starts_with(prefix)
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}
