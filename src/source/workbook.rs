use std::{borrow::Cow, path::Path};

use calamine::{Data, Range, Reader, open_workbook_auto};
use log::debug;

use super::CellTextSource;
use crate::error::LoadError;

/// One worksheet of an Excel or OpenDocument workbook.
pub struct WorkbookSource {
    sheet: String,
    range: Range<Data>,
}

impl WorkbookSource {
    /// Opens `path` and reads `worksheet`, or the first worksheet when none is named.
    pub fn open(path: &Path, worksheet: Option<&str>) -> Result<Self, LoadError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|err| LoadError::unreadable(path, err))?;
        let sheet = match worksheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| LoadError::unreadable(path, "workbook has no worksheets"))?,
        };
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|err| LoadError::unreadable(path, format!("worksheet '{sheet}': {err}")))?;
        debug!(
            "Opened worksheet '{}' of {:?} with used range ending at {:?}",
            sheet,
            path,
            range.end()
        );
        Ok(Self { sheet, range })
    }

    pub fn from_range(sheet: impl Into<String>, range: Range<Data>) -> Self {
        Self {
            sheet: sheet.into(),
            range,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }
}

impl CellTextSource for WorkbookSource {
    fn extent(&self) -> (usize, usize) {
        if self.range.is_empty() {
            return (0, 0);
        }
        self.range
            .end()
            .map_or((0, 0), |(row, col)| (row as usize + 1, col as usize + 1))
    }

    fn cell_text(&self, row: usize, col: usize) -> Option<Cow<'_, str>> {
        let position = (
            u32::try_from(row.checked_sub(1)?).ok()?,
            u32::try_from(col.checked_sub(1)?).ok()?,
        );
        self.range.get_value(position).and_then(cell_text)
    }
}

/// Textual form of a cell as a spreadsheet user would read it.
///
/// Whole-number floats drop their fractional part so `3` stays integer-like even though
/// the workbook stores every number as a double.
pub fn cell_text(cell: &Data) -> Option<Cow<'_, str>> {
    match cell {
        Data::Empty => None,
        Data::String(text) if text.is_empty() => None,
        Data::String(text) => Some(Cow::Borrowed(text.as_str())),
        Data::Float(value) if value.is_finite() && value.fract() == 0.0 => {
            Some(Cow::Owned(format!("{value:.0}")))
        }
        Data::Float(value) => Some(Cow::Owned(value.to_string())),
        Data::Int(value) => Some(Cow::Owned(value.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_floats_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(3.0)).as_deref(), Some("3"));
        assert_eq!(cell_text(&Data::Float(-12.0)).as_deref(), Some("-12"));
        assert_eq!(cell_text(&Data::Float(9.99)).as_deref(), Some("9.99"));
        assert_eq!(cell_text(&Data::Int(42)).as_deref(), Some("42"));
    }

    #[test]
    fn empty_cells_are_blank() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String(String::new())), None);
    }

    #[test]
    fn range_addresses_are_one_based() {
        let mut range = Range::new((0, 0), (2, 1));
        range.set_value((0, 0), Data::String("ID".into()));
        range.set_value((0, 1), Data::String("Price".into()));
        range.set_value((1, 0), Data::Float(1.0));
        range.set_value((1, 1), Data::Float(9.99));
        range.set_value((2, 0), Data::Float(2.0));
        let source = WorkbookSource::from_range("Sheet1", range);

        assert_eq!(source.extent(), (3, 2));
        assert_eq!(source.header_texts(), vec!["ID", "Price"]);
        assert_eq!(source.cell_text(2, 2).as_deref(), Some("9.99"));
        assert_eq!(source.cell_text(3, 1).as_deref(), Some("2"));
        assert_eq!(source.cell_text(3, 2), None);
        assert_eq!(source.sheet_name(), "Sheet1");
    }
}
