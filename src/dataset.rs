//! Raw record set loading.
//!
//! A [`Dataset`] is built once per input file and never mutated afterwards.
//! Delimited text goes through the `csv` reader with `encoding_rs` decoding;
//! workbooks go through `calamine` and read a single sheet. Headers are
//! canonicalized on the way in and missing cells are kept as
//! [`Cell::Empty`], which reads as zero wherever a number is required.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, warn};

use crate::{
    bindings::ColumnRef,
    data::{Cell, canonicalize_column_name, parse_cell},
    error::DashboardError,
    io_utils::{self, InputFormat},
};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub sheet: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            sheet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Builds a dataset from raw header names and rows. Headers are
    /// canonicalized, blank headers get positional names, and short rows are
    /// padded with empty cells.
    pub fn from_records(raw_headers: &[String], rows: Vec<Vec<Cell>>) -> Self {
        let headers = raw_headers
            .iter()
            .enumerate()
            .map(|(idx, raw)| {
                let canonical = canonicalize_column_name(raw);
                if canonical.is_empty() {
                    format!("column_{}", idx + 1)
                } else {
                    canonical
                }
            })
            .collect::<Vec<_>>();
        for duplicate in headers.iter().duplicates() {
            warn!("Column '{duplicate}' appears more than once after canonicalization");
        }
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, Cell::Empty);
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let dataset = match io_utils::detect_format(path) {
            InputFormat::Workbook => load_workbook(path, options.sheet.as_deref())?,
            InputFormat::Delimited => {
                let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
                load_delimited(path, delimiter, options.encoding)?
            }
        };
        debug!(
            "Loaded {} row(s) x {} column(s) from {:?}",
            dataset.len(),
            dataset.headers.len(),
            path
        );
        Ok(dataset)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Empty)
    }

    /// Numeric value of a cell, zero-filling blanks.
    pub fn number(&self, row: usize, column: &ColumnRef) -> Result<f64, DashboardError> {
        let cell = self.cell(row, column.index);
        cell.as_number()
            .ok_or_else(|| DashboardError::NonNumericCell {
                row: row + 2,
                column: column.name.clone(),
                value: cell.as_display(),
            })
    }

    /// Display text of a cell, or `None` when the cell is blank.
    pub fn text(&self, row: usize, column: usize) -> Option<String> {
        let cell = self.cell(row, column);
        (!cell.is_empty()).then(|| cell.as_display())
    }

    /// Distinct district values in first-seen order with their row counts.
    pub fn district_counts(&self, district: &ColumnRef) -> Vec<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in 0..self.len() {
            let value = self.cell(row, district.index).as_display();
            *counts.entry(value).or_insert(0) += 1;
        }
        (0..self.len())
            .map(|row| self.cell(row, district.index).as_display())
            .unique()
            .map(|value| {
                let count = counts.get(&value).copied().unwrap_or_default();
                (value, count)
            })
            .collect()
    }
}

fn load_delimited(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Dataset> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?;
    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} in {path:?}", row_idx + 2))?;
        rows.push(decoded.iter().map(|field| parse_cell(field)).collect());
    }
    Ok(Dataset::from_records(&headers, rows))
}

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Dataset> {
    let mut workbook = open_workbook_auto(path).map_err(|e| anyhow!("Excel: {e}"))?;
    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(DashboardError::EmptyWorkbook.into());
    }
    let range = match sheet {
        Some(selector) => {
            if let Ok(idx) = selector.parse::<usize>() {
                workbook
                    .worksheet_range_at(idx)
                    .ok_or_else(|| DashboardError::UnknownSheet(selector.to_string()))?
                    .map_err(|e| anyhow!("Excel: {e}"))?
            } else {
                if !sheet_names.iter().any(|name| name == selector) {
                    return Err(DashboardError::UnknownSheet(selector.to_string()).into());
                }
                workbook
                    .worksheet_range(selector)
                    .map_err(|e| anyhow!("Excel: {e}"))?
            }
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or(DashboardError::EmptyWorkbook)?
            .map_err(|e| anyhow!("Excel: {e}"))?,
    };

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Dataset::from_records(&[], Vec::new()));
    };
    let headers = header_row.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    let body = rows
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();
    Ok(Dataset::from_records(&headers, body))
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) if f.is_nan() => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => parse_cell(s),
        Data::Empty | Data::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}
