//! Per-row rate derivation and session KPIs.
//!
//! Rates are `None` whenever the division is undefined (zero denominator or
//! any other non-finite result). Undefined rates stay out of every
//! rate-based chart input; the raw counts behind them still feed the totals.

use serde::Serialize;

use crate::{bindings::SelectedColumns, dataset::Dataset, error::DashboardError};

/// `numerator / denominator × 100`, or `None` when the result is not finite.
pub fn percent(numerator: f64, denominator: f64) -> Option<f64> {
    let value = numerator / denominator * 100.0;
    value.is_finite().then_some(value)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowMetrics {
    /// Position of the row in the loaded dataset.
    pub row: usize,
    pub district: String,
    pub institution: Option<String>,
    pub sanctioned: f64,
    pub admitted: f64,
    pub vacant: f64,
    pub attendance: f64,
    pub absentees: f64,
    pub admission_rate: Option<f64>,
    pub vacancy_rate: Option<f64>,
    pub attendance_pct: Option<f64>,
}

impl RowMetrics {
    pub fn derive(
        dataset: &Dataset,
        columns: &SelectedColumns,
        row: usize,
    ) -> Result<Self, DashboardError> {
        let sanctioned = dataset.number(row, &columns.sanctioned)?;
        let admitted = dataset.number(row, &columns.admitted)?;
        let vacant = dataset.number(row, &columns.vacancy)?;
        let attendance = dataset.number(row, &columns.attendance)?;
        let absentees = dataset.number(row, &columns.absentees)?;
        Ok(Self {
            row,
            district: dataset.cell(row, columns.district.index).as_display(),
            institution: dataset.text(row, columns.institution.index),
            sanctioned,
            admitted,
            vacant,
            attendance,
            absentees,
            admission_rate: percent(admitted, sanctioned),
            vacancy_rate: percent(vacant, sanctioned),
            attendance_pct: percent(attendance, attendance + absentees),
        })
    }

    pub fn institution_name(&self) -> &str {
        self.institution.as_deref().unwrap_or_default()
    }
}

pub fn derive_rows(
    dataset: &Dataset,
    columns: &SelectedColumns,
    rows: &[usize],
) -> Result<Vec<RowMetrics>, DashboardError> {
    rows.iter()
        .map(|&row| RowMetrics::derive(dataset, columns, row))
        .collect()
}

/// Headline totals for the filtered rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_sanctioned: f64,
    pub total_admitted: f64,
    pub total_vacant: f64,
    pub total_attendance: f64,
    pub total_absentees: f64,
    /// Rounded to two decimals; zero when there is no attendance data.
    pub attendance_pct: f64,
}

impl Kpis {
    pub fn from_rows(rows: &[RowMetrics]) -> Self {
        let mut kpis = rows.iter().fold(Kpis::default(), |mut acc, row| {
            acc.total_sanctioned += row.sanctioned;
            acc.total_admitted += row.admitted;
            acc.total_vacant += row.vacant;
            acc.total_attendance += row.attendance;
            acc.total_absentees += row.absentees;
            acc
        });
        let denominator = kpis.total_attendance + kpis.total_absentees;
        kpis.attendance_pct = if denominator > 0.0 {
            round2(kpis.total_attendance / denominator * 100.0)
        } else {
            0.0
        };
        kpis
    }
}

/// Count of rows whose rates could not be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UndefinedRates {
    pub admission_rate: usize,
    pub vacancy_rate: usize,
    pub attendance_pct: usize,
}

impl UndefinedRates {
    pub fn count(rows: &[RowMetrics]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            acc.admission_rate += usize::from(row.admission_rate.is_none());
            acc.vacancy_rate += usize::from(row.vacancy_rate.is_none());
            acc.attendance_pct += usize::from(row.attendance_pct.is_none());
            acc
        })
    }

    pub fn any(&self) -> bool {
        self.admission_rate + self.vacancy_rate + self.attendance_pct > 0
    }
}
