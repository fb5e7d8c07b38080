use crate::error::ReportResult;
use crate::types::{Column, Dataset};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> ReportResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv_to(file, rows)
}

pub fn write_csv_to<W: Write, T: Serialize>(writer: W, rows: &[T]) -> ReportResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ReportResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Raw records of a month under the headers they were loaded with.
pub fn write_records_csv<W: Write>(writer: W, ds: &Dataset) -> ReportResult<()> {
    let columns: Vec<Column> = ds.columns.iter().copied().collect();
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns.iter().map(|c| c.header()))?;
    for r in &ds.records {
        wtr.write_record(columns.iter().map(|c| c.cell(r)))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn render_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    match render_table(rows, max_rows) {
        Some(table_str) => println!("{}\n", table_str),
        None => println!("(no rows)\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Record, Source};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    #[test]
    fn raw_export_keeps_source_headers() {
        let ds = Dataset {
            period: "2024年01月".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            source: Source::Local,
            origin: "test".into(),
            columns: BTreeSet::from([Column::AdviserName, Column::FinalProfit]),
            records: vec![Record {
                adviser_name: Some("张三".into()),
                final_profit: Some(1500.5),
                ..Record::default()
            }],
        };
        let mut buf = Vec::new();
        write_records_csv(&mut buf, &ds).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "顾问名称,最终收益值\n张三,1500.5\n");
    }
}
