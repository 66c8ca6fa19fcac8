use std::borrow::Cow;

use super::CellTextSource;

/// In-memory worksheet backed by ragged rows of optional text.
#[derive(Debug, Clone, Default)]
pub struct GridSource {
    rows: Vec<Vec<Option<String>>>,
    width: usize,
}

impl GridSource {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows
            .iter()
            .map(|row| {
                row.iter()
                    .rposition(|cell| cell.as_deref().is_some_and(|text| !text.is_empty()))
                    .map_or(0, |idx| idx + 1)
            })
            .max()
            .unwrap_or(0);
        let height = rows
            .iter()
            .rposition(|row| row.iter().any(|cell| cell.as_deref().is_some_and(|t| !t.is_empty())))
            .map_or(0, |idx| idx + 1);
        let mut rows = rows;
        rows.truncate(height);
        Self { rows, width }
    }

    /// Builds a grid where empty strings stand for blank cells.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let text = cell.as_ref();
                        (!text.is_empty()).then(|| text.to_string())
                    })
                    .collect()
            })
            .collect();
        Self::new(rows)
    }
}

impl CellTextSource for GridSource {
    fn extent(&self) -> (usize, usize) {
        if self.width == 0 {
            (0, 0)
        } else {
            (self.rows.len(), self.width)
        }
    }

    fn cell_text(&self, row: usize, col: usize) -> Option<Cow<'_, str>> {
        let cell = self
            .rows
            .get(row.checked_sub(1)?)?
            .get(col.checked_sub(1)?)?
            .as_deref()?;
        (!cell.is_empty()).then_some(Cow::Borrowed(cell))
    }
}
