use std::collections::HashSet;

use proptest::prelude::*;
use seatboard::{
    BindingConfig, BindingTable, Dataset, RowFilter, Selection, ViewRequest, compute,
    data::Cell,
    metrics::round2,
};

const DISTRICTS: [&str; 4] = ["Adilabad", "Hyderabad", "Warangal", "Karimnagar"];

#[derive(Debug, Clone)]
struct GeneratedRow {
    district: usize,
    sanctioned: u32,
    admitted: u32,
    vacancy: u32,
    attendance: u32,
    absentees: u32,
}

fn row_strategy(min_attendance: u32) -> impl Strategy<Value = GeneratedRow> {
    (
        0..DISTRICTS.len(),
        0u32..200,
        0u32..200,
        0u32..200,
        min_attendance..1000,
        0u32..1000,
    )
        .prop_map(
            |(district, sanctioned, admitted, vacancy, attendance, absentees)| GeneratedRow {
                district,
                sanctioned,
                admitted,
                vacancy,
                attendance,
                absentees,
            },
        )
}

fn build_dataset(rows: &[GeneratedRow]) -> Dataset {
    let headers = [
        "District",
        "College Name",
        "Vth Class Minority Sanctioned",
        "Vth Class Minority Admitted",
        "Vth Class Minority Vacancies",
        "Total School Attendance",
        "Total Absentees",
    ]
    .map(String::from);
    let records = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            vec![
                Cell::Text(DISTRICTS[row.district].to_string()),
                Cell::Text(format!("Institution {idx}")),
                Cell::Number(f64::from(row.sanctioned)),
                Cell::Number(f64::from(row.admitted)),
                Cell::Number(f64::from(row.vacancy)),
                Cell::Number(f64::from(row.attendance)),
                Cell::Number(f64::from(row.absentees)),
            ]
        })
        .collect();
    Dataset::from_records(&headers, records)
}

fn bindings(dataset: &Dataset) -> BindingTable {
    BindingTable::resolve(&BindingConfig::default(), dataset.headers())
}

fn every_district() -> RowFilter {
    RowFilter::new(DISTRICTS, None)
}

proptest! {
    #[test]
    fn totals_do_not_depend_on_row_order(
        (rows, shuffled) in proptest::collection::vec(row_strategy(0), 0..30)
            .prop_flat_map(|rows| (Just(rows.clone()), Just(rows).prop_shuffle()))
    ) {
        let request = ViewRequest::new(Selection::default(), every_district());
        let original = build_dataset(&rows);
        let reordered = build_dataset(&shuffled);
        let left = compute(&original, &bindings(&original), &request).expect("compute original");
        let right = compute(&reordered, &bindings(&reordered), &request).expect("compute shuffled");

        let expected = rows.iter().map(|r| f64::from(r.sanctioned)).sum::<f64>();
        prop_assert_eq!(left.kpis.total_sanctioned, expected);
        prop_assert_eq!(left.kpis, right.kpis);
        prop_assert_eq!(left.district_absentees, right.district_absentees);
        prop_assert_eq!(left.seat_comparison, right.seat_comparison);
    }

    #[test]
    fn attendance_pct_is_bounded_and_zero_without_data(
        rows in proptest::collection::vec(row_strategy(0), 0..30)
    ) {
        let dataset = build_dataset(&rows);
        let request = ViewRequest::new(Selection::default(), every_district());
        let view = compute(&dataset, &bindings(&dataset), &request).expect("compute view");

        let pct = view.kpis.attendance_pct;
        prop_assert!((0.0..=100.0).contains(&pct));
        let denominator = view.kpis.total_attendance + view.kpis.total_absentees;
        if denominator == 0.0 {
            prop_assert_eq!(pct, 0.0);
        } else {
            prop_assert_eq!(pct, round2(view.kpis.total_attendance / denominator * 100.0));
        }
    }

    #[test]
    fn district_filter_yields_subset(
        rows in proptest::collection::vec(row_strategy(0), 0..30),
        allowed in proptest::sample::subsequence(DISTRICTS.to_vec(), 0..=DISTRICTS.len())
    ) {
        let dataset = build_dataset(&rows);
        let request = ViewRequest::new(Selection::default(), RowFilter::new(allowed.clone(), None));
        let view = compute(&dataset, &bindings(&dataset), &request).expect("compute view");

        let allowed = allowed.into_iter().collect::<HashSet<_>>();
        prop_assert!(view.rows.iter().all(|r| allowed.contains(r.district.as_str())));
        let expected = rows
            .iter()
            .filter(|r| allowed.contains(DISTRICTS[r.district]))
            .count();
        prop_assert_eq!(view.row_count, expected);
        if allowed.is_empty() {
            prop_assert_eq!(view.row_count, 0);
        }
    }

    #[test]
    fn zero_sanctioned_rows_stay_out_of_rate_scatter(
        rows in proptest::collection::vec(row_strategy(0), 1..30)
    ) {
        let dataset = build_dataset(&rows);
        let request = ViewRequest::new(Selection::default(), every_district());
        let view = compute(&dataset, &bindings(&dataset), &request).expect("compute view");

        let with_seats = rows.iter().filter(|r| r.sanctioned > 0).count();
        prop_assert_eq!(view.rate_scatter.len(), with_seats);
        let admitted = rows.iter().map(|r| f64::from(r.admitted)).sum::<f64>();
        prop_assert_eq!(view.kpis.total_admitted, admitted);
    }

    #[test]
    fn attendance_rankings_are_disjoint(
        rows in proptest::collection::vec(row_strategy(1), 0..30)
    ) {
        let dataset = build_dataset(&rows);
        let request = ViewRequest::new(Selection::default(), every_district());
        let view = compute(&dataset, &bindings(&dataset), &request).expect("compute view");

        let top = view.top_attendance.iter().map(|r| r.name.as_str()).collect::<HashSet<_>>();
        let bottom = view.bottom_attendance.iter().map(|r| r.name.as_str()).collect::<HashSet<_>>();
        if rows.len() >= 10 {
            prop_assert!(top.is_disjoint(&bottom));
        }
        prop_assert!(top.union(&bottom).count() <= rows.len().min(10));
    }
}
