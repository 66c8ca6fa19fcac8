//! Logical table model extracted from a worksheet.
//!
//! This module owns [`ColumnType`], the per-column [`ColumnPlan`] and the ordered
//! [`TableDescriptor`], plus the header rules that turn row 1 into unique column names
//! and the `old,new` rename requests applied on top of them.
//!
//! ## Header rules
//!
//! - Header texts are trimmed. Blank headers, and every header of a headerless sheet,
//!   become `Column {n}` with `n` the 1-based column position.
//! - Names are unique ignoring ASCII case. A repeated name gets the first free numeric
//!   suffix starting at 2: `Name`, `Name2`, `Name3`.

use std::{collections::HashSet, fmt};

use log::{debug, info};
use serde::Serialize;

use crate::{error::LoadError, infer, source::CellTextSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How text columns are sized in generated DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextLength {
    /// Maximum-length character type.
    #[default]
    Unbounded,
    /// Bounded by the longest value seen in the column.
    Observed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnPlan {
    pub header_name: String,
    /// 1-based column position in the worksheet.
    pub source_index: usize,
    pub column_type: ColumnType,
    /// Only set for text columns; `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_text_length: Option<usize>,
}

impl ColumnPlan {
    pub fn new(
        header_name: impl Into<String>,
        source_index: usize,
        column_type: ColumnType,
    ) -> Self {
        Self {
            header_name: header_name.into(),
            source_index,
            column_type,
            max_text_length: None,
        }
    }

    pub fn with_max_text_length(mut self, length: Option<usize>) -> Self {
        self.max_text_length = match self.column_type {
            ColumnType::Text => length,
            ColumnType::Integer | ColumnType::Float => None,
        };
        self
    }
}

/// Ordered column plans in worksheet order; names are unique ignoring ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    columns: Vec<ColumnPlan>,
}

impl TableDescriptor {
    pub fn new(columns: Vec<ColumnPlan>) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.header_name.to_ascii_lowercase()) {
                return Err(LoadError::configuration(format!(
                    "duplicate column name '{}'",
                    column.header_name
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnPlan] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.header_name.as_str())
    }

    /// Applies rename requests in order. The old name is matched ignoring ASCII case;
    /// requests naming an absent column are ignored.
    pub fn with_renames(mut self, renames: &[ColumnRename]) -> Result<Self, LoadError> {
        for rename in renames {
            let Some(idx) = self
                .columns
                .iter()
                .position(|column| column.header_name.eq_ignore_ascii_case(&rename.from))
            else {
                debug!("Rename '{}' matches no column; ignored", rename.from);
                continue;
            };
            let collides = self.columns.iter().enumerate().any(|(other, column)| {
                other != idx && column.header_name.eq_ignore_ascii_case(&rename.to)
            });
            if collides {
                return Err(LoadError::configuration(format!(
                    "cannot rename '{}' to '{}': a column with that name already exists",
                    rename.from, rename.to
                )));
            }
            info!(
                "Renaming column '{}' to '{}'",
                self.columns[idx].header_name, rename.to
            );
            self.columns[idx].header_name = rename.to.clone();
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescribeOptions {
    pub has_headers: bool,
    pub text_length: TextLength,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self {
            has_headers: true,
            text_length: TextLength::Unbounded,
        }
    }
}

impl DescribeOptions {
    /// First worksheet row holding data.
    pub fn first_data_row(&self) -> usize {
        if self.has_headers { 2 } else { 1 }
    }
}

/// Builds the table descriptor by scanning every column of `source`.
pub fn describe<S>(source: &S, options: &DescribeOptions) -> Result<TableDescriptor, LoadError>
where
    S: CellTextSource + ?Sized,
{
    let headers = if options.has_headers {
        source.header_texts()
    } else {
        vec![String::new(); source.extent().1]
    };
    let names = resolve_headers(&headers, options.has_headers);
    let first_row = options.first_data_row();

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let source_index = idx + 1;
            let inference = infer::infer_column(source, source_index, first_row);
            let max_text_length = match options.text_length {
                TextLength::Unbounded => None,
                TextLength::Observed => Some(inference.max_chars.max(1)),
            };
            debug!(
                "Column {} '{}' inferred as {} from {} value(s)",
                source_index, name, inference.column_type, inference.non_blank
            );
            ColumnPlan::new(name, source_index, inference.column_type)
                .with_max_text_length(max_text_length)
        })
        .collect();
    TableDescriptor::new(columns)
}

/// Turns raw header texts into unique column names.
pub fn resolve_headers(raw_headers: &[String], has_headers: bool) -> Vec<String> {
    let mut taken = HashSet::with_capacity(raw_headers.len());
    let mut resolved = Vec::with_capacity(raw_headers.len());
    for (idx, raw) in raw_headers.iter().enumerate() {
        let trimmed = raw.trim();
        let base = if has_headers && !trimmed.is_empty() {
            trimmed.to_string()
        } else {
            synthetic_name(idx + 1)
        };
        let name = unique_name(&base, &taken);
        taken.insert(name.to_ascii_lowercase());
        resolved.push(name);
    }
    resolved
}

pub fn synthetic_name(position: usize) -> String {
    format!("Column {position}")
}

fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(&base.to_ascii_lowercase()) {
        return base.to_string();
    }
    (2..)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !taken.contains(&candidate.to_ascii_lowercase()))
        .unwrap_or_else(|| base.to_string())
}

/// An `old,new` column rename request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

impl ColumnRename {
    /// Parses `old,new`. Anything after a second comma is ignored; requests without a
    /// comma or with an empty side yield `None`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split(',');
        let from = parts.next()?.trim();
        let to = parts.next()?.trim();
        if from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
