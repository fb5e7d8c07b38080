// Entry point and interactive CLI flow.
//
// - Option [1] scans the data folder for monthly report files.
// - Option [2] loads explicitly chosen files; these win over local files
//   for the same month.
// - Option [3] picks a month, prints every report table and exports them.
// After generating reports, the user can go back to the menu or exit.
use adviser_report::cache::Memo;
use adviser_report::config::Config;
use adviser_report::loader::{self, LoadReport};
use adviser_report::output;
use adviser_report::registry::Registry;
use adviser_report::reports::{self, MonthReport, Section};
use adviser_report::util;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tabled::Tabled;

// One session of mutable state: the loaded months plus memoized reports.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        registry: Registry::new(),
        reports: Memo::new(),
    })
});

struct AppState {
    registry: Registry,
    reports: Memo<MonthReport>,
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to Report Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn print_load_report(report: &LoadReport) {
    for f in &report.loaded {
        println!(
            "Loaded {} ({} rows, {} skipped)",
            f.period,
            util::format_int(f.total_rows),
            util::format_int(f.parse_errors)
        );
        if !f.missing_columns.is_empty() {
            let names: Vec<&str> = f.missing_columns.iter().map(|c| c.header()).collect();
            println!("  Note: missing columns {}", names.join(", "));
        }
    }
    for p in &report.kept_existing {
        println!("Kept uploaded data for {}", p);
    }
    for w in &report.warnings {
        println!("Warning: {}", w);
    }
}

fn print_registry_counts(registry: &Registry) {
    let (local, uploaded) = registry.counts_by_source();
    println!("Data: {} local month(s), {} uploaded month(s)\n", local, uploaded);
}

fn handle_scan(config: &Config) {
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    let report = loader::scan_folder(
        &mut state.registry,
        &config.data_folder,
        &config.file_prefix,
        today(),
    );
    print_load_report(&report);
    let AppState { registry, reports } = &mut *state;
    reports.prune(registry);
    print_registry_counts(registry);
}

fn handle_upload() {
    let input = prompt("File path(s), comma separated: ");
    let paths: Vec<PathBuf> = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    if paths.is_empty() {
        println!("No files given.\n");
        return;
    }
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    let report = loader::load_uploads(&mut state.registry, &paths, today());
    print_load_report(&report);
    let AppState { registry, reports } = &mut *state;
    reports.prune(registry);
    print_registry_counts(registry);
}

fn select_month(registry: &Registry) -> Option<String> {
    let months = registry.list_periods();
    if months.is_empty() {
        println!("Error: No data loaded. Load or upload report files first (option 1 or 2).\n");
        return None;
    }
    println!("Available months:");
    for (i, m) in months.iter().enumerate() {
        let source = registry.get(m).map(|d| d.source.label()).unwrap_or_default();
        println!("[{}] {} ({})", i + 1, m, source);
    }
    let choice = prompt("Select month (Enter for latest): ");
    if choice.is_empty() {
        return months.into_iter().next();
    }
    match choice.parse::<usize>() {
        Ok(n) if (1..=months.len()).contains(&n) => months.into_iter().nth(n - 1),
        _ => {
            println!("Invalid month selection.\n");
            None
        }
    }
}

/// Print a table preview and export it as CSV under `out_dir`.
fn show_section<T>(
    title: &str,
    section: &Section<T>,
    out_dir: &Path,
    file: &str,
    preview_rows: usize,
) where
    T: Tabled + Serialize + Clone,
{
    println!("{}\n", title);
    match section {
        Ok(rows) => {
            output::preview_table_rows(rows, preview_rows);
            let path = out_dir.join(file);
            match output::write_csv(&path, rows) {
                Ok(()) => println!("(Full table exported to {})\n", path.display()),
                Err(e) => eprintln!("Write error: {}", e),
            }
        }
        Err(reason) => println!("Insufficient data: {}\n", reason),
    }
}

fn handle_generate_reports(config: &Config) {
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    let Some(period) = select_month(&state.registry) else {
        return;
    };
    let params = reports::report_params(config);
    let AppState { registry, reports: memo } = &mut *state;
    let registry: &Registry = registry;
    let report = match memo.get_or_compute(registry, &period, &params, |_| {
        reports::build_month_report(registry, &period, config)
    }) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to build report: {}\n", e);
            return;
        }
    };
    log::debug!("report cache: {} hits, {} misses", memo.hits(), memo.misses());

    let out = &config.output_folder;
    if let Err(e) = std::fs::create_dir_all(out) {
        eprintln!("Cannot create {}: {}", out.display(), e);
        return;
    }
    println!("\nAdviser Performance Overview - {} ({})\n", report.period, report.source.label());

    show_section("Key Figures", &report.overview, out, &format!("overview_{}.csv", period), 10);
    show_section(
        "Report 1: Profit Distribution",
        &report.distribution,
        out,
        &format!("report1_profit_distribution_{}.csv", period),
        6,
    );
    show_section(
        "Report 2: Adviser Type Performance",
        &report.type_stats,
        out,
        &format!("report2_adviser_types_{}.csv", period),
        10,
    );
    show_section(
        "Report 3: Sales Profit Bands by Adviser Type",
        &report.sales_bands,
        out,
        &format!("report3_sales_bands_{}.csv", period),
        10,
    );
    show_section(
        "Report 3b: Sales Profit Band Share by Adviser Type",
        &report.sales_band_pct,
        out,
        &format!("report3b_sales_band_share_{}.csv", period),
        10,
    );
    show_section(
        "Report 4: Region Performance",
        &report.regions,
        out,
        &format!("report4_regions_{}.csv", period),
        10,
    );
    if let (Some(best), Some(worst)) = (&report.best_region, &report.worst_region) {
        println!("Best region: {}  |  Needs improvement: {}\n", best, worst);
    }
    show_section(
        "Report 5: Monthly Trend",
        &report.trend,
        out,
        "report5_monthly_trend.csv",
        12,
    );
    show_section(
        &format!(
            "Report 6: Region Change vs {}",
            report.previous.as_deref().unwrap_or("previous month")
        ),
        &report.deltas,
        out,
        &format!("report6_region_change_{}.csv", period),
        10,
    );
    show_section(
        &format!(
            "Report 7: {} {} by {}",
            config.rank_order.label(),
            config.top_n,
            config.rank_by.label()
        ),
        &report.ranking,
        out,
        &format!("report7_ranking_{}.csv", period),
        5,
    );
    show_section(
        "Report 7b: Region Details",
        &report.region_profiles,
        out,
        &format!("report7b_region_details_{}.csv", period),
        10,
    );
    show_section(
        &format!(
            "Report 8: Top {n} vs Bottom {n} Advisers",
            n = config.cohort_size
        ),
        &report.cohort,
        out,
        &format!("report8_cohorts_{}.csv", period),
        7,
    );
    show_section(
        "Report 9: Region Strengths and Weaknesses",
        &report.region_diffs,
        out,
        &format!("report9_region_diffs_{}.csv", period),
        7,
    );
    for (region, priority) in &report.priorities {
        match priority {
            Some(metric) => println!("{}: improve {} first", region, metric),
            None => println!("{}: no metric below the overall average", region),
        }
    }
    println!();

    if let Some(ds) = registry.get(&period) {
        let path = out.join(format!("adviser_data_{}.csv", period));
        let written = std::fs::File::create(&path)
            .map_err(adviser_report::ReportError::from)
            .and_then(|f| output::write_records_csv(f, ds));
        match written {
            Ok(()) => println!("Raw data exported to {}", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }

    let summary_path = out.join(format!("summary_{}.json", period));
    if let Err(e) = output::write_json(&summary_path, &report.summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats ({}):", summary_path.display());
    println!(
        "{{\"avg_profit\": {}, \"total_profit\": {}, \"high_performer_pct\": {}}}\n",
        util::format_number(report.summary.avg_profit, 2),
        util::format_number(report.summary.total_profit, 2),
        util::format_number(report.summary.high_performer_pct, 1)
    );
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    log::info!("data folder: {}", config.data_folder.display());

    loop {
        println!("Adviser Performance Reports");
        println!("[1] Load local report files");
        println!("[2] Upload report files");
        println!("[3] Generate Reports\n");
        match read_choice().as_str() {
            "1" => handle_scan(&config),
            "2" => handle_upload(),
            "3" => {
                println!();
                handle_generate_reports(&config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}
