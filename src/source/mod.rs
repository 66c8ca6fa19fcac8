//! Raw cell access for the inference and coercion passes.
//!
//! A [`CellTextSource`] exposes a worksheet as 1-based `(row, column)` text cells. Blank
//! and absent cells both read as `None`, so ragged rows need no special handling by
//! callers.

pub mod delimited;
pub mod grid;
pub mod workbook;

use std::{borrow::Cow, path::Path};

use encoding_rs::Encoding;

use crate::error::LoadError;

pub use delimited::DelimitedSource;
pub use grid::GridSource;
pub use workbook::WorkbookSource;

pub trait CellTextSource {
    /// `(max_row, max_col)` of the used area; `(0, 0)` for an empty sheet.
    fn extent(&self) -> (usize, usize);

    /// Text of the cell at the 1-based address, or `None` when the cell is empty.
    fn cell_text(&self, row: usize, col: usize) -> Option<Cow<'_, str>>;

    /// Texts of row 1, padded with empty strings up to the used column count.
    fn header_texts(&self) -> Vec<String> {
        let (_, max_col) = self.extent();
        (1..=max_col)
            .map(|col| {
                self.cell_text(1, col)
                    .map(Cow::into_owned)
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Whitespace-only text counts as blank, the same as an empty cell.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Workbook,
    Delimited,
}

impl SourceKind {
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceKind::Workbook),
            "csv" | "tsv" => Some(SourceKind::Delimited),
            _ => None,
        }
    }
}

/// Opens the spreadsheet at `path`, choosing the reader from the file extension.
pub fn open_source(
    path: &Path,
    worksheet: Option<&str>,
    encoding: &'static Encoding,
) -> Result<Box<dyn CellTextSource>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::SourceNotFound(path.to_path_buf()));
    }
    match SourceKind::for_path(path) {
        Some(SourceKind::Workbook) => Ok(Box::new(WorkbookSource::open(path, worksheet)?)),
        Some(SourceKind::Delimited) => Ok(Box::new(DelimitedSource::open(path, encoding)?)),
        None => Err(LoadError::unreadable(
            path,
            "unsupported file extension (expected a workbook or a .csv/.tsv file)",
        )),
    }
}
