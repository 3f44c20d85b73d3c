use std::borrow::Cow;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Renders an elastic text table. Columns whose body cells are all numeric
/// (or blank) are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }
    let aligns = (0..column_count)
        .map(|idx| column_alignment(rows, idx))
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Prints a titled table, or a placeholder line when there is nothing to show.
pub fn print_section(title: &str, headers: &[String], rows: &[Vec<String>]) {
    println!("{title}");
    if rows.is_empty() {
        println!("(no rows)");
    } else {
        print_table(headers, rows);
    }
    println!();
}

fn column_alignment(rows: &[Vec<String>], idx: usize) -> Align {
    let mut saw_number = false;
    for cell in rows.iter().filter_map(|row| row.get(idx)) {
        let trimmed = cell.trim().trim_end_matches('%');
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.parse::<f64>().is_err() {
            return Align::Left;
        }
        saw_number = true;
    }
    if saw_number { Align::Right } else { Align::Left }
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(widths[idx].saturating_sub(display_width(&sanitized)));
        let cell = match aligns.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => format!("{sanitized}{padding}"),
            Align::Right => format!("{padding}{sanitized}"),
        };
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape (e.g. \x1b[31m)
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn numeric_columns_align_right() {
        let headers = strings(&["district", "absentees"]);
        let rows = vec![strings(&["Adilabad", "120"]), strings(&["Medak", "7"])];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "district  absentees",
                "--------  ---------",
                "Adilabad        120",
                "Medak             7",
            ]
        );
    }

    #[test]
    fn percentages_count_as_numeric() {
        let rows = vec![strings(&["90.91%"]), strings(&[""])];
        assert_eq!(column_alignment(&rows, 0), Align::Right);
        let rows = vec![strings(&["90.91%"]), strings(&["n/a"])];
        assert_eq!(column_alignment(&rows, 0), Align::Left);
    }

    #[test]
    fn control_characters_are_flattened() {
        let headers = strings(&["note"]);
        let rows = vec![strings(&["line1\nline2\tvalue"])];
        let rendered = render_table(&headers, &rows);
        assert_eq!(rendered.lines().nth(2), Some("line1 line2 value"));
    }
}
