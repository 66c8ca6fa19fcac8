//! Plain-text rendering of a column plan for the `plan` subcommand.

use std::{borrow::Cow, fmt::Write as _};

use crate::{reconcile::Dialect, schema::TableDescriptor};

const PLAN_HEADERS: [&str; 5] = ["#", "column", "source", "type", "native type"];

/// One line per column: position, name, worksheet column letter, inferred and native type.
pub fn render_plan(descriptor: &TableDescriptor, dialect: Dialect) -> String {
    let rows = descriptor
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.header_name.clone(),
                column_letter(column.source_index),
                column.column_type.to_string(),
                dialect.native_type(column),
            ]
        })
        .collect::<Vec<_>>();
    render_grid(&PLAN_HEADERS, &rows)
}

/// Spreadsheet column letters for a 1-based index: 1 → `A`, 27 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(sanitize(cell).chars().count());
        }
    }

    let mut output = String::new();
    let header_cells = headers.iter().map(|h| Cow::Borrowed(*h)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&header_cells, &widths));
    let rule = widths.iter().map(|w| Cow::Owned("-".repeat(*w))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let cells = row.iter().map(|cell| sanitize(cell)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", format_line(&cells, &widths));
    }
    output
}

fn format_line(cells: &[Cow<'_, str>], widths: &[usize]) -> String {
    let mut line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn sanitize(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
