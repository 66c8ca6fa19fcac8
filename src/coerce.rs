//! Row coercion from raw cell text to typed values.
//!
//! Blank cells become [`CellValue::Null`]. Text columns keep the raw text unchanged.
//! Numeric columns parse the text, and a parse failure at this stage is fail-soft: the
//! cell becomes zero and the failure is counted instead of aborting the row. The
//! inference pass already guarantees parseability, so a non-zero count points at a
//! source that changed between the two passes.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::{
    infer::{parse_float, parse_integer},
    schema::{ColumnType, TableDescriptor},
    source::is_blank,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i32),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Runtime type of the value, `None` for null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(_) => Some(ColumnType::Integer),
            CellValue::Float(_) => Some(ColumnType::Float),
            CellValue::Text(_) => Some(ColumnType::Text),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(value) => write!(f, "{value}"),
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::Text(value) => f.write_str(value),
        }
    }
}

/// One coerced data row, aligned with the descriptor's columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TypedRow(Vec<CellValue>);

impl TypedRow {
    pub fn values(&self) -> &[CellValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<CellValue>> for TypedRow {
    fn from(values: Vec<CellValue>) -> Self {
        Self(values)
    }
}

/// Parse result for a numeric cell under the fail-soft policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoftParse<T> {
    Parsed(T),
    /// Parsing failed and the zero default was substituted.
    Defaulted(T),
}

impl<T> SoftParse<T> {
    pub fn value(self) -> T {
        match self {
            SoftParse::Parsed(value) | SoftParse::Defaulted(value) => value,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, SoftParse::Defaulted(_))
    }
}

pub fn integer_or_zero(text: &str) -> SoftParse<i32> {
    parse_integer(text).map_or(SoftParse::Defaulted(0), SoftParse::Parsed)
}

pub fn float_or_zero(text: &str) -> SoftParse<f64> {
    parse_float(text).map_or(SoftParse::Defaulted(0.0), SoftParse::Parsed)
}

/// Coerces rows for one descriptor and keeps a tally of fail-soft substitutions.
#[derive(Debug)]
pub struct RowCoercer<'a> {
    descriptor: &'a TableDescriptor,
    soft_failures: usize,
}

impl<'a> RowCoercer<'a> {
    pub fn new(descriptor: &'a TableDescriptor) -> Self {
        Self {
            descriptor,
            soft_failures: 0,
        }
    }

    /// Coerces `raw_cells`, position `i` belonging to descriptor column `i`. Missing
    /// trailing cells are blank; the output always has one value per column.
    pub fn coerce(&mut self, raw_cells: &[Option<&str>]) -> TypedRow {
        let descriptor = self.descriptor;
        let mut values = Vec::with_capacity(descriptor.len());
        for (idx, column) in descriptor.columns().iter().enumerate() {
            let raw = raw_cells
                .get(idx)
                .copied()
                .flatten()
                .filter(|text| !is_blank(text));
            let Some(text) = raw else {
                values.push(CellValue::Null);
                continue;
            };
            let value = match column.column_type {
                ColumnType::Text => CellValue::Text(text.to_string()),
                ColumnType::Integer => {
                    let parsed = integer_or_zero(text);
                    self.note(parsed.is_defaulted(), &column.header_name, text);
                    CellValue::Integer(parsed.value())
                }
                ColumnType::Float => {
                    let parsed = float_or_zero(text);
                    self.note(parsed.is_defaulted(), &column.header_name, text);
                    CellValue::Float(parsed.value())
                }
            };
            values.push(value);
        }
        TypedRow(values)
    }

    pub fn soft_failures(&self) -> usize {
        self.soft_failures
    }

    fn note(&mut self, defaulted: bool, column: &str, text: &str) {
        if defaulted {
            self.soft_failures += 1;
            debug!("Column '{column}': could not coerce '{text}', using 0");
        }
    }
}

/// Coerces a single row without keeping failure counts.
pub fn coerce_row(raw_cells: &[Option<&str>], descriptor: &TableDescriptor) -> TypedRow {
    RowCoercer::new(descriptor).coerce(raw_cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnPlan;

    fn descriptor() -> TableDescriptor {
        TableDescriptor::new(vec![
            ColumnPlan::new("ID", 1, ColumnType::Integer),
            ColumnPlan::new("Price", 2, ColumnType::Float),
            ColumnPlan::new("Name", 3, ColumnType::Text),
        ])
        .unwrap()
    }

    #[test]
    fn values_follow_the_column_types() {
        let row = coerce_row(&[Some("7"), Some("9.99"), Some(" Ada ")], &descriptor());
        assert_eq!(
            row.values(),
            &[
                CellValue::Integer(7),
                CellValue::Float(9.99),
                CellValue::Text(" Ada ".into())
            ]
        );
    }

    #[test]
    fn blank_and_missing_cells_become_null() {
        let row = coerce_row(&[None, Some("   ")], &descriptor());
        assert_eq!(row.len(), 3);
        assert!(row.values().iter().all(CellValue::is_null));
    }

    #[test]
    fn unexpected_parse_failures_default_to_zero_and_are_counted() {
        let descriptor = descriptor();
        let mut coercer = RowCoercer::new(&descriptor);
        let row = coercer.coerce(&[Some("oops"), Some("1.2.3"), Some("x")]);
        assert_eq!(
            row.values(),
            &[
                CellValue::Integer(0),
                CellValue::Float(0.0),
                CellValue::Text("x".into())
            ]
        );
        assert_eq!(coercer.soft_failures(), 2);

        coercer.coerce(&[Some("2"), Some("2.5"), None]);
        assert_eq!(coercer.soft_failures(), 2);
    }

    #[test]
    fn soft_parse_reports_substitution() {
        assert_eq!(integer_or_zero(" 42 "), SoftParse::Parsed(42));
        assert!(integer_or_zero("4294967296").is_defaulted());
        assert_eq!(float_or_zero("-0.5"), SoftParse::Parsed(-0.5));
        assert_eq!(float_or_zero("abc").value(), 0.0);
    }

    #[test]
    fn numeric_round_trip_keeps_value_but_not_spelling() {
        let row = coerce_row(&[Some("007"), Some("2.50"), None], &descriptor());
        let rendered = row.values().iter().map(ToString::to_string).collect::<Vec<_>>();
        // Leading zeros and trailing fractional zeros are accepted losses.
        assert_eq!(rendered, vec!["7", "2.5", ""]);
        assert_eq!(rendered[0].parse::<i32>().unwrap(), 7);
        assert_eq!(rendered[1].parse::<f64>().unwrap(), 2.50);
    }

    #[test]
    fn runtime_types_match_declared_types() {
        let descriptor = descriptor();
        let row = coerce_row(&[Some("1"), None, Some("t")], &descriptor);
        for (value, column) in row.values().iter().zip(descriptor.columns()) {
            if let Some(ty) = value.column_type() {
                assert_eq!(ty, column.column_type);
            }
        }
    }
}
