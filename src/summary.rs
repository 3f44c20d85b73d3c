//! `summary` and `drilldown` command output.

use anyhow::Result;
use log::info;

use crate::{
    aggregate::{InstitutionRank, SeatType},
    cli::{DrilldownArgs, SummaryArgs},
    data::{format_number, format_percent},
    metrics::{Kpis, RowMetrics},
    session::Session,
    table,
    view::ViewModel,
};

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let session = Session::open(&args.source)?;
    let mut request = session.request(&args.view)?;
    request.rank_limit = args.top;
    request.district_limit = args.district_limit;
    let view = session.compute(&request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_summary(&view, request.filter.districts.len());
    }
    info!(
        "Summarized {} row(s) for {}",
        view.row_count,
        view.selection()
    );
    Ok(())
}

pub fn execute_drilldown(args: &DrilldownArgs) -> Result<()> {
    let session = Session::open(&args.source)?;
    let request = session.request(&args.view)?;
    let view = session.compute(&request)?;
    let rows = view.drilldown(args.target.trim());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let (headers, body) = drilldown_table(&view, &rows);
        table::print_section(
            &format!("Institutions in {} ({})", args.target.trim(), view.selection()),
            &headers,
            &body,
        );
    }
    info!(
        "Listed {} institution(s) in district '{}'",
        rows.len(),
        args.target.trim()
    );
    Ok(())
}

pub fn kpi_rows(kpis: &Kpis) -> Vec<Vec<String>> {
    [
        ("Total Sanctioned", format_number(kpis.total_sanctioned)),
        ("Total Admitted", format_number(kpis.total_admitted)),
        ("Total Vacant", format_number(kpis.total_vacant)),
        ("Total Attendance", format_number(kpis.total_attendance)),
        ("Total Absentees", format_number(kpis.total_absentees)),
        ("Attendance %", format!("{:.2}%", kpis.attendance_pct)),
    ]
    .into_iter()
    .map(|(label, value)| vec![label.to_string(), value])
    .collect()
}

fn rank_rows(ranks: &[InstitutionRank]) -> Vec<Vec<String>> {
    ranks
        .iter()
        .map(|rank| vec![rank.name.clone(), format!("{:.2}", rank.attendance_pct)])
        .collect()
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn print_summary(view: &ViewModel, district_count: usize) {
    let columns = &view.columns;
    println!(
        "Selection: {} | {} row(s) across {} district(s) selected",
        view.selection(),
        view.row_count,
        district_count
    );
    println!();

    table::print_section("KPIs", &headers(&["metric", "value"]), &kpi_rows(&view.kpis));

    let absentees = view
        .district_absentees
        .iter()
        .map(|d| vec![d.district.clone(), format_number(d.absentees)])
        .collect::<Vec<_>>();
    table::print_section(
        &format!("Top {} Districts by Absenteeism", absentees.len()),
        &headers(&["district", columns.absentees.name.as_str()]),
        &absentees,
    );

    let seats = view
        .seat_comparison
        .iter()
        .map(|s| {
            let seat_column = match s.seat_type {
                SeatType::Sanctioned => &columns.sanctioned.name,
                SeatType::Admitted => &columns.admitted.name,
            };
            vec![s.district.clone(), seat_column.clone(), format_number(s.seat_count)]
        })
        .collect::<Vec<_>>();
    table::print_section(
        "Sanctioned vs Admitted Seats",
        &headers(&["district", "type", "seats"]),
        &seats,
    );

    let rank_headers = headers(&["institution", "attendance_pct"]);
    table::print_section(
        "Top Institutes (Attendance %)",
        &rank_headers,
        &rank_rows(&view.top_attendance),
    );
    table::print_section(
        "Bottom Institutes (Attendance %)",
        &rank_headers,
        &rank_rows(&view.bottom_attendance),
    );

    let distribution = view
        .vacancy_distribution
        .iter()
        .map(|group| {
            let rates = &group.vacancy_rates;
            let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
            let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = rates.iter().sum::<f64>() / rates.len() as f64;
            vec![
                group.district.clone(),
                rates.len().to_string(),
                format!("{min:.2}"),
                format!("{mean:.2}"),
                format!("{max:.2}"),
            ]
        })
        .collect::<Vec<_>>();
    table::print_section(
        "Vacancy Rate by District",
        &headers(&["district", "institutions", "min", "mean", "max"]),
        &distribution,
    );

    match view.attendance_impact.trend {
        Some(trend) => println!(
            "Attendance impact on vacancy rate: vacancy_rate = {:.4} + {:.6} x {} (r^2 = {:.4}, {} point(s))",
            trend.intercept,
            trend.slope,
            columns.attendance.name,
            trend.r_squared,
            view.attendance_impact.points.len()
        ),
        None => println!("Attendance impact on vacancy rate: not enough data for a trend line"),
    }

    let undefined = &view.undefined_rates;
    if undefined.any() {
        println!(
            "Rows without a defined rate (excluded from charts): admission {}, vacancy {}, attendance {}",
            undefined.admission_rate, undefined.vacancy_rate, undefined.attendance_pct
        );
    }
}

pub fn drilldown_table(view: &ViewModel, rows: &[&RowMetrics]) -> (Vec<String>, Vec<Vec<String>>) {
    let columns = &view.columns;
    let headers = vec![
        columns.institution.name.clone(),
        columns.sanctioned.name.clone(),
        columns.admitted.name.clone(),
        columns.vacancy.name.clone(),
        columns.attendance.name.clone(),
        columns.absentees.name.clone(),
        "attendance_pct".to_string(),
    ];
    let body = rows
        .iter()
        .map(|row| {
            vec![
                row.institution_name().to_string(),
                format_number(row.sanctioned),
                format_number(row.admitted),
                format_number(row.vacant),
                format_number(row.attendance),
                format_number(row.absentees),
                format_percent(row.attendance_pct),
            ]
        })
        .collect();
    (headers, body)
}
