//! Domain errors surfaced by the binding, loading, and metric layers.
//!
//! Command handlers wrap these in `anyhow` with context; library callers can
//! match on the variants directly.

use thiserror::Error;

use crate::bindings::Selection;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Missing required column(s) for {selection}: {}", .fields.join(", "))]
    MissingColumns {
        selection: Selection,
        fields: Vec<String>,
    },
    #[error("Ambiguous column binding(s) for {selection}: {}", describe_conflicts(.conflicts))]
    AmbiguousColumns {
        selection: Selection,
        conflicts: Vec<(String, Vec<String>)>,
    },
    #[error("Row {row}: column '{column}' holds non-numeric value '{value}'")]
    NonNumericCell {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,
    #[error("Worksheet '{0}' not found")]
    UnknownSheet(String),
}

fn describe_conflicts(conflicts: &[(String, Vec<String>)]) -> String {
    conflicts
        .iter()
        .map(|(field, candidates)| format!("{field} matches [{}]", candidates.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}
