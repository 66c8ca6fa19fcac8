use std::{borrow::Cow, fs::File, io::BufReader, path::Path};

use encoding_rs::{Encoding, UTF_8};

use super::{CellTextSource, GridSource};
use crate::error::LoadError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// A `.csv` or `.tsv` file read fully into memory so it can be scanned column by column.
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    grid: GridSource,
}

impl DelimitedSource {
    pub fn open(path: &Path, encoding: &'static Encoding) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|err| LoadError::unreadable(path, err))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter_for(path))
            .double_quote(true)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut rows = Vec::new();
        let mut record = csv::ByteRecord::new();
        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => return Err(LoadError::unreadable(path, err)),
            }
            let line = rows.len() + 1;
            let row = record
                .iter()
                .enumerate()
                .map(|(idx, field)| {
                    let field = if line == 1 && idx == 0 && encoding == UTF_8 {
                        field.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(field)
                    } else {
                        field
                    };
                    decode_field(field, encoding).map_err(|message| {
                        LoadError::unreadable(path, format!("line {line}: {message}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Ok(Self {
            grid: GridSource::new(rows),
        })
    }
}

impl CellTextSource for DelimitedSource {
    fn extent(&self) -> (usize, usize) {
        self.grid.extent()
    }

    fn cell_text(&self, row: usize, col: usize) -> Option<Cow<'_, str>> {
        self.grid.cell_text(row, col)
    }
}

pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> Result<Option<String>, String> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(format!(
            "failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(Some(text.into_owned()))
    }
}

/// Resolves an encoding label such as `windows-1252`, defaulting to UTF-8.
pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, LoadError> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| LoadError::configuration(format!("unknown encoding '{value}'"))),
        None => Ok(UTF_8),
    }
}
