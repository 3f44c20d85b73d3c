//! The full pipeline from a loaded dataset to everything a presentation layer
//! needs: `compute(dataset, bindings, request) -> ViewModel`.
//!
//! Nothing is cached between calls. Callers that react to a changed filter
//! or selection simply call [`compute`] again with the same dataset.

use log::{debug, warn};
use serde::Serialize;

use crate::{
    aggregate::{
        self, AttendanceImpact, DistrictRates, DistrictTotal, InstitutionRank, RatePoint,
        SeatCount,
    },
    bindings::{BindingTable, SelectedColumns, Selection},
    dataset::Dataset,
    error::DashboardError,
    filter::RowFilter,
    metrics::{self, Kpis, RowMetrics, UndefinedRates},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRequest {
    pub selection: Selection,
    pub filter: RowFilter,
    pub district_limit: usize,
    pub rank_limit: usize,
}

impl ViewRequest {
    pub fn new(selection: Selection, filter: RowFilter) -> Self {
        Self {
            selection,
            filter,
            district_limit: aggregate::DEFAULT_DISTRICT_LIMIT,
            rank_limit: aggregate::DEFAULT_RANK_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub columns: SelectedColumns,
    pub row_count: usize,
    pub kpis: Kpis,
    pub rows: Vec<RowMetrics>,
    pub rate_scatter: Vec<RatePoint>,
    pub attendance_impact: AttendanceImpact,
    pub district_absentees: Vec<DistrictTotal>,
    pub vacancy_distribution: Vec<DistrictRates>,
    pub seat_comparison: Vec<SeatCount>,
    pub top_attendance: Vec<InstitutionRank>,
    pub bottom_attendance: Vec<InstitutionRank>,
    pub undefined_rates: UndefinedRates,
}

impl ViewModel {
    pub fn selection(&self) -> Selection {
        self.columns.selection
    }

    /// Rows of one district, in input order.
    pub fn drilldown(&self, district: &str) -> Vec<&RowMetrics> {
        self.rows
            .iter()
            .filter(|row| row.district == district)
            .collect()
    }
}

pub fn compute(
    dataset: &Dataset,
    bindings: &BindingTable,
    request: &ViewRequest,
) -> Result<ViewModel, DashboardError> {
    let columns = bindings.select(request.selection)?;
    let selected = request.filter.apply(dataset, &columns);
    debug!(
        "{} of {} row(s) pass the filter for {}",
        selected.len(),
        dataset.len(),
        request.selection
    );
    let rows = metrics::derive_rows(dataset, &columns, &selected)?;

    let undefined_rates = UndefinedRates::count(&rows);
    if undefined_rates.any() {
        warn!(
            "Excluded undefined rates from charts: admission {}, vacancy {}, attendance {}",
            undefined_rates.admission_rate,
            undefined_rates.vacancy_rate,
            undefined_rates.attendance_pct
        );
    }

    let kpis = Kpis::from_rows(&rows);
    let (top_attendance, bottom_attendance) =
        aggregate::rank_attendance(&rows, request.rank_limit);
    Ok(ViewModel {
        row_count: rows.len(),
        kpis,
        rate_scatter: aggregate::rate_scatter(&rows),
        attendance_impact: aggregate::attendance_impact(&rows),
        district_absentees: aggregate::district_absentees(&rows, request.district_limit),
        vacancy_distribution: aggregate::vacancy_distribution(&rows),
        seat_comparison: aggregate::seat_comparison(&rows),
        top_attendance,
        bottom_attendance,
        undefined_rates,
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bindings::{BindingConfig, Category, Level},
        data::Cell,
    };

    fn worked_example() -> Dataset {
        let headers = [
            "district",
            "college_name",
            "vth_class_minority_sanctioned",
            "vth_class_minority_admitted",
            "vth_class_minority_vacancies",
            "total_school_attendance",
            "total_absentees",
        ]
        .map(String::from);
        let row = |name: &str, values: [f64; 5]| {
            let mut cells = vec![Cell::Text("A".into()), Cell::Text(name.into())];
            cells.extend(values.map(Cell::Number));
            cells
        };
        Dataset::from_records(
            &headers,
            vec![
                row("first", [100.0, 90.0, 10.0, 450.0, 50.0]),
                row("second", [0.0, 0.0, 0.0, 50.0, 0.0]),
            ],
        )
    }

    fn request(dataset: &Dataset, bindings: &BindingTable) -> ViewRequest {
        let columns = bindings.select(Selection::default()).unwrap();
        ViewRequest::new(Selection::default(), RowFilter::all_districts(dataset, &columns))
    }

    #[test]
    fn worked_example_matches_expected_totals() {
        let dataset = worked_example();
        let bindings = BindingTable::resolve(&BindingConfig::default(), dataset.headers());
        let view = compute(&dataset, &bindings, &request(&dataset, &bindings)).unwrap();

        assert_eq!(view.row_count, 2);
        assert_eq!(view.kpis.total_sanctioned, 100.0);
        assert_eq!(view.kpis.total_admitted, 90.0);
        assert_eq!(view.kpis.attendance_pct, 90.91);
        assert_eq!(view.rate_scatter.len(), 1);
        assert_eq!(view.rate_scatter[0].institution, "first");
        assert_eq!(view.rate_scatter[0].admission_rate, 90.0);
        assert_eq!(view.undefined_rates.admission_rate, 1);
        assert_eq!(view.rows[1].attendance_pct, Some(100.0));
    }

    #[test]
    fn empty_filter_degrades_to_zero() {
        let dataset = worked_example();
        let bindings = BindingTable::resolve(&BindingConfig::default(), dataset.headers());
        let request = ViewRequest::new(Selection::default(), RowFilter::default());
        let view = compute(&dataset, &bindings, &request).unwrap();

        assert_eq!(view.row_count, 0);
        assert_eq!(view.kpis, Kpis::default());
        assert!(view.district_absentees.is_empty());
        assert!(view.seat_comparison.is_empty());
        assert!(view.top_attendance.is_empty());
        assert!(view.attendance_impact.points.is_empty());
    }

    #[test]
    fn missing_columns_block_computation() {
        let dataset = worked_example();
        let bindings = BindingTable::resolve(&BindingConfig::default(), dataset.headers());
        let request = ViewRequest::new(
            Selection::new(Level::Intermediate, Category::NonMinority),
            RowFilter::new(["A"], None),
        );
        let err = compute(&dataset, &bindings, &request).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumns { .. }));
        assert!(err.to_string().contains("intermediate.attendance"));
    }

    #[test]
    fn drilldown_selects_one_district() {
        let dataset = worked_example();
        let bindings = BindingTable::resolve(&BindingConfig::default(), dataset.headers());
        let view = compute(&dataset, &bindings, &request(&dataset, &bindings)).unwrap();
        assert_eq!(view.drilldown("A").len(), 2);
        assert!(view.drilldown("B").is_empty());
    }
}
