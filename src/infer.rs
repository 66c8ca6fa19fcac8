//! Column type inference.
//!
//! A column is classified from every data row it has (the header row is excluded):
//!
//! - **Float** when every non-blank cell parses as a finite floating-point number and at
//!   least one cell contains a literal `.`
//! - **Integer** when every non-blank cell parses as a signed 32-bit integer
//! - **Text** otherwise, including columns without a single non-blank cell
//!
//! Parsing is locale-invariant: `1,5` is not a float and `1.5abc` is not a number. One
//! stray non-numeric cell turns the whole column into text.

use log::trace;

use crate::{
    schema::ColumnType,
    source::{CellTextSource, is_blank},
};

/// Outcome of scanning one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInference {
    pub column_type: ColumnType,
    pub non_blank: usize,
    /// Longest non-blank cell, in characters.
    pub max_chars: usize,
}

#[derive(Debug, Clone, Copy)]
struct ColumnScan {
    non_blank: usize,
    decimal_point_seen: bool,
    all_float: bool,
    all_integer: bool,
    max_chars: usize,
}

impl ColumnScan {
    fn new() -> Self {
        Self {
            non_blank: 0,
            decimal_point_seen: false,
            all_float: true,
            all_integer: true,
            max_chars: 0,
        }
    }

    fn update(&mut self, text: &str) {
        if text.contains('.') {
            self.decimal_point_seen = true;
        }
        if is_blank(text) {
            return;
        }
        self.non_blank += 1;
        self.max_chars = self.max_chars.max(text.chars().count());
        if self.all_float && !is_float_text(text) {
            self.all_float = false;
        }
        if self.all_integer && !is_integer_text(text) {
            self.all_integer = false;
        }
    }

    fn is_float(&self) -> bool {
        self.all_float && self.decimal_point_seen && self.non_blank > 0
    }

    fn is_integer(&self) -> bool {
        self.all_integer && self.non_blank > 0
    }

    fn finish(self) -> ColumnInference {
        let column_type = if self.is_float() {
            ColumnType::Float
        } else if self.is_integer() {
            ColumnType::Integer
        } else {
            ColumnType::Text
        };
        ColumnInference {
            column_type,
            non_blank: self.non_blank,
            max_chars: self.max_chars,
        }
    }
}

/// Scans column `col` from `first_row` to the last used row of `source`.
pub fn infer_column<S>(source: &S, col: usize, first_row: usize) -> ColumnInference
where
    S: CellTextSource + ?Sized,
{
    let (max_row, _) = source.extent();
    let mut scan = ColumnScan::new();
    for row in first_row..=max_row {
        if let Some(text) = source.cell_text(row, col) {
            scan.update(&text);
        }
    }
    let inference = scan.finish();
    trace!("Column {col} scanned: {inference:?}");
    inference
}

/// Classifies an in-memory list of cell texts; `None` and whitespace-only cells are blank.
pub fn infer_values<'a, I>(values: I) -> ColumnInference
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut scan = ColumnScan::new();
    for value in values.into_iter().flatten() {
        scan.update(value);
    }
    scan.finish()
}

pub fn is_integer_text(text: &str) -> bool {
    parse_integer(text).is_some()
}

pub fn is_float_text(text: &str) -> bool {
    parse_float(text).is_some()
}

/// Parses a signed 32-bit integer, tolerating surrounding whitespace and a leading sign.
pub fn parse_integer(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok()
}

/// Parses a finite double, tolerating surrounding whitespace. `NaN` and infinities are
/// rejected.
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
