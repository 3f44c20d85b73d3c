use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of the raw record set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Numeric view of the cell. Empty cells read as zero; text does not convert.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Empty => Some(0.0),
            Cell::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Canonical header form: trimmed, lowercased, spaces replaced by underscores.
pub fn canonicalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Parses a text field. Blank fields and `NaN` become [`Cell::Empty`];
/// `inf`/`infinity` spellings stay text so numeric reads reject them.
pub fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_nan() => Cell::Empty,
        Ok(value) if value.is_finite() => Cell::Number(value),
        _ => Cell::Text(raw.to_string()),
    }
}

/// Integral values print without a fractional part; everything else uses the
/// shortest representation that parses back to the same `f64`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}
