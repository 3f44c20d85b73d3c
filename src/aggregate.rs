//! Grouped aggregates and chart inputs built from derived row metrics.
//!
//! Everything here is a pure function of a slice of [`RowMetrics`]; an
//! empty slice always produces empty output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::metrics::RowMetrics;

pub const DEFAULT_DISTRICT_LIMIT: usize = 10;
pub const DEFAULT_RANK_LIMIT: usize = 5;

#[derive(Debug, Clone, Default)]
struct DistrictTotals {
    sanctioned: f64,
    admitted: f64,
    absentees: f64,
    vacancy_rates: Vec<f64>,
}

/// Per-district running sums, keyed in district-name order.
#[derive(Debug, Default)]
struct DistrictAccumulator {
    totals: BTreeMap<String, DistrictTotals>,
}

impl DistrictAccumulator {
    fn from_rows(rows: &[RowMetrics]) -> Self {
        let mut acc = Self::default();
        for row in rows {
            let entry = acc.totals.entry(row.district.clone()).or_default();
            entry.sanctioned += row.sanctioned;
            entry.admitted += row.admitted;
            entry.absentees += row.absentees;
            if let Some(rate) = row.vacancy_rate {
                entry.vacancy_rates.push(rate);
            }
        }
        acc
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictTotal {
    pub district: String,
    pub absentees: f64,
}

/// Absentee sums per district, highest first. Equal sums keep district-name order.
pub fn district_absentees(rows: &[RowMetrics], limit: usize) -> Vec<DistrictTotal> {
    let acc = DistrictAccumulator::from_rows(rows);
    let mut items = acc
        .totals
        .into_iter()
        .map(|(district, totals)| DistrictTotal {
            district,
            absentees: totals.absentees,
        })
        .collect::<Vec<_>>();
    items.sort_by(|a, b| b.absentees.total_cmp(&a.absentees));
    items.truncate(limit);
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    Sanctioned,
    Admitted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatCount {
    pub district: String,
    pub seat_type: SeatType,
    pub seat_count: f64,
}

/// Sanctioned and admitted sums per district in long form: every sanctioned
/// entry first, then every admitted entry, districts in name order.
pub fn seat_comparison(rows: &[RowMetrics]) -> Vec<SeatCount> {
    let acc = DistrictAccumulator::from_rows(rows);
    let mut sanctioned = Vec::with_capacity(acc.totals.len());
    let mut admitted = Vec::with_capacity(acc.totals.len());
    for (district, totals) in acc.totals {
        sanctioned.push(SeatCount {
            district: district.clone(),
            seat_type: SeatType::Sanctioned,
            seat_count: totals.sanctioned,
        });
        admitted.push(SeatCount {
            district,
            seat_type: SeatType::Admitted,
            seat_count: totals.admitted,
        });
    }
    sanctioned.extend(admitted);
    sanctioned
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictRates {
    pub district: String,
    pub vacancy_rates: Vec<f64>,
}

/// Defined vacancy rates grouped by district, for distribution plots.
pub fn vacancy_distribution(rows: &[RowMetrics]) -> Vec<DistrictRates> {
    DistrictAccumulator::from_rows(rows)
        .totals
        .into_iter()
        .filter(|(_, totals)| !totals.vacancy_rates.is_empty())
        .map(|(district, totals)| DistrictRates {
            district,
            vacancy_rates: totals.vacancy_rates,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionRank {
    pub name: String,
    pub attendance_pct: f64,
}

/// Highest and lowest `limit` institutions by attendance percentage.
///
/// Rows without a defined percentage are not ranked. Both lists come from
/// one stable descending order: the top list is its head and the bottom list
/// its tail, lowest first. They are disjoint whenever `2 * limit` rows rank.
///
/// Tie order: among equal percentages the top list keeps input order, while
/// the bottom list, read from the tail, lists the later input row first and
/// prefers later rows when a tie straddles its cutoff.
pub fn rank_attendance(
    rows: &[RowMetrics],
    limit: usize,
) -> (Vec<InstitutionRank>, Vec<InstitutionRank>) {
    let mut ranked = rows
        .iter()
        .filter_map(|row| {
            row.attendance_pct.map(|pct| InstitutionRank {
                name: row.institution_name().to_string(),
                attendance_pct: pct,
            })
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.attendance_pct.total_cmp(&a.attendance_pct));

    let top = ranked.iter().take(limit).cloned().collect();
    let bottom = ranked.iter().rev().take(limit).cloned().collect();
    (top, bottom)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatePoint {
    pub institution: String,
    pub admission_rate: f64,
    pub vacancy_rate: f64,
    /// Marker size; mirrors the admission rate.
    pub size: f64,
    /// Marker colour; the attendance count.
    pub color: f64,
}

/// Admission vs vacancy rate points for rows whose rates are both defined.
pub fn rate_scatter(rows: &[RowMetrics]) -> Vec<RatePoint> {
    rows.iter()
        .filter_map(|row| match (row.admission_rate, row.vacancy_rate) {
            (Some(admission_rate), Some(vacancy_rate)) => Some(RatePoint {
                institution: row.institution_name().to_string(),
                admission_rate,
                vacancy_rate,
                size: admission_rate,
                color: row.attendance,
            }),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendancePoint {
    pub institution: String,
    pub attendance: f64,
    pub vacancy_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl TrendLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceImpact {
    pub points: Vec<AttendancePoint>,
    pub trend: Option<TrendLine>,
}

/// Attendance count vs vacancy rate with an ordinary least squares fit.
pub fn attendance_impact(rows: &[RowMetrics]) -> AttendanceImpact {
    let points = rows
        .iter()
        .filter_map(|row| {
            row.vacancy_rate.map(|vacancy_rate| AttendancePoint {
                institution: row.institution_name().to_string(),
                attendance: row.attendance,
                vacancy_rate,
            })
        })
        .collect::<Vec<_>>();
    let trend = least_squares(
        &points
            .iter()
            .map(|p| (p.attendance, p.vacancy_rate))
            .collect::<Vec<_>>(),
    );
    AttendanceImpact { points, trend }
}

/// Fits `y = intercept + slope·x`. Needs at least two points and some spread in x.
pub fn least_squares(points: &[(f64, f64)]) -> Option<TrendLine> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    // all y equal: the horizontal fit is exact
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };
    Some(TrendLine {
        slope,
        intercept,
        r_squared,
    })
}
