//! Plain-text tables for terminal output.

use std::borrow::Cow;
use std::fmt::Write as _;

/// Widest a cell may render before it is cut with an ellipsis.
pub const DEFAULT_MAX_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    render_table_with_width(headers, rows, DEFAULT_MAX_WIDTH)
}

pub fn render_table_with_width(headers: &[String], rows: &[Vec<String>], max_width: usize) -> String {
    let column_count = headers.len();
    let max_width = max_width.max(4);
    let clip = |value: &str| truncate(&sanitize_cell(value), max_width);

    let headers = headers.iter().map(|h| clip(h.as_str())).collect::<Vec<_>>();
    let rows = rows
        .iter()
        .map(|row| row.iter().take(column_count).map(|c| clip(c.as_str())).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }
    let alignments = (0..column_count)
        .map(|idx| column_alignment(&rows, idx))
        .collect::<Vec<_>>();

    let mut output = String::new();
    let header_alignments = vec![Alignment::Left; column_count];
    let _ = writeln!(output, "{}", format_row(&headers, &widths, &header_alignments));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &header_alignments));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &alignments));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Columns whose non-placeholder cells are all numeric align right.
fn column_alignment(rows: &[Vec<String>], column: usize) -> Alignment {
    let mut saw_number = false;
    for cell in rows.iter().filter_map(|row| row.get(column)) {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed == "-" {
            continue;
        }
        if trimmed.parse::<f64>().is_err() {
            return Alignment::Left;
        }
        saw_number = true;
    }
    if saw_number {
        Alignment::Right
    } else {
        Alignment::Left
    }
}

fn format_row(values: &[String], widths: &[usize], alignments: &[Alignment]) -> String {
    let cells = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let value = values.get(idx).map(String::as_str).unwrap_or_default();
            let padding = " ".repeat(width.saturating_sub(display_width(value)));
            match alignments.get(idx) {
                Some(Alignment::Right) => format!("{padding}{value}"),
                _ => format!("{value}{padding}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn truncate(value: &str, max_width: usize) -> String {
    if display_width(value) <= max_width {
        return value.to_string();
    }
    let mut clipped = value.chars().take(max_width - 1).collect::<String>();
    clipped.push('…');
    clipped
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
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn numeric_columns_align_right() {
        let headers = strings(&["name", "amount"]);
        let rows = vec![strings(&["Tunga", "12.5"]), strings(&["Bhadra", "1200"]), strings(&["Kabini", "-"])];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "name    amount");
        assert_eq!(lines[1], "------  ------");
        assert_eq!(lines[2], "Tunga     12.5");
        assert_eq!(lines[3], "Bhadra    1200");
        assert_eq!(lines[4], "Kabini       -");
    }

    #[test]
    fn long_cells_are_clipped_and_whitespace_flattened() {
        let headers = strings(&["purpose"]);
        let rows = vec![strings(&["drinking\nwater supply for towns"])];
        let rendered = render_table_with_width(&headers, &rows, 10);
        assert!(rendered.lines().any(|line| line == "drinking …"));
    }
}
