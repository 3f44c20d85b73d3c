//! Export of the filtered, metric-augmented table.
//!
//! The report keeps every input column in its original order and appends
//! the derived rates. `.xlsx` destinations get a single `Report` sheet with
//! a bold header row; anything else is written as delimited text. Blank
//! cells and undefined rates are left empty in both formats.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::info;
use rust_xlsxwriter::{Format, Workbook};

use crate::{
    cli::ExportArgs,
    data::Cell,
    dataset::Dataset,
    io_utils,
    metrics::RowMetrics,
    session::Session,
    view::ViewModel,
};

pub const REPORT_SHEET: &str = "Report";
pub const METRIC_COLUMNS: [&str; 3] = ["admission_rate", "vacancy_rate", "attendance_pct"];

pub fn execute(args: &ExportArgs) -> Result<()> {
    let session = Session::open(&args.source)?;
    let request = session.request(&args.view)?;
    let view = session.compute(&request)?;
    let delimiter = io_utils::resolve_output_delimiter(&args.output, args.output_delimiter);
    let written = write_report(&args.output, &session.dataset, &view, delimiter)?;
    info!(
        "Exported {written} row(s) for {} to {:?}",
        view.selection(),
        args.output
    );
    Ok(())
}

pub fn report_headers(dataset: &Dataset) -> Vec<String> {
    dataset
        .headers()
        .iter()
        .cloned()
        .chain(METRIC_COLUMNS.iter().map(|name| name.to_string()))
        .collect()
}

fn rate_cell(rate: Option<f64>) -> Cell {
    rate.map(Cell::Number).unwrap_or(Cell::Empty)
}

fn report_row(dataset: &Dataset, metrics: &RowMetrics) -> Vec<Cell> {
    let mut cells = dataset.rows()[metrics.row].clone();
    cells.push(rate_cell(metrics.admission_rate));
    cells.push(rate_cell(metrics.vacancy_rate));
    cells.push(rate_cell(metrics.attendance_pct));
    cells
}

/// Rows of the report in view order.
pub fn report_rows(dataset: &Dataset, view: &ViewModel) -> Vec<Vec<Cell>> {
    view.rows
        .iter()
        .map(|metrics| report_row(dataset, metrics))
        .collect()
}

/// Writes the report and returns the number of data rows written.
pub fn write_report(
    path: &Path,
    dataset: &Dataset,
    view: &ViewModel,
    delimiter: u8,
) -> Result<usize> {
    let headers = report_headers(dataset);
    let rows = report_rows(dataset, view);
    if io_utils::is_xlsx(path) {
        write_xlsx(path, &headers, &rows)?;
    } else {
        write_delimited(path, delimiter, &headers, &rows)?;
    }
    Ok(rows.len())
}

fn write_delimited(path: &Path, delimiter: u8, headers: &[String], rows: &[Vec<Cell>]) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(headers)
        .context("Writing report headers")?;
    for (idx, row) in rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(Cell::as_display))
            .with_context(|| format!("Writing report row {}", idx + 2))?;
    }
    writer.flush().context("Flushing report")?;
    Ok(())
}

fn write_xlsx(path: &Path, headers: &[String], rows: &[Vec<Cell>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, header, &header_format)?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        let row_number = u32::try_from(row_idx + 1)
            .map_err(|_| anyhow!("Report exceeds the worksheet row limit"))?;
        for (col, cell) in row.iter().enumerate() {
            let col = column_index(col)?;
            match cell {
                Cell::Number(n) if n.is_finite() => {
                    worksheet.write_number(row_number, col, *n)?;
                }
                Cell::Number(n) => {
                    worksheet.write_string(row_number, col, n.to_string())?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(row_number, col, s)?;
                }
                Cell::Empty => {}
            }
        }
    }
    workbook
        .save(path)
        .with_context(|| format!("Saving workbook {path:?}"))?;
    Ok(())
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| anyhow!("Report exceeds the worksheet column limit"))
}
