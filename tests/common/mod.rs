#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rust_xlsxwriter::Workbook;
use tempfile::{TempDir, tempdir};

/// A worksheet cell written by [`TestWorkspace::write_xlsx`].
#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a workbook with one worksheet per `(name, rows)` pair.
    pub fn write_xlsx(&self, name: &str, sheets: &[(&str, Vec<Vec<Cell<'_>>>)]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut workbook = Workbook::new();
        for (sheet_name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*sheet_name).expect("sheet name");
            for (row_idx, row) in rows.iter().enumerate() {
                for (col_idx, cell) in row.iter().enumerate() {
                    let (r, c) = (row_idx as u32, col_idx as u16);
                    match cell {
                        Cell::Text(text) => {
                            worksheet.write_string(r, c, *text).expect("write string");
                        }
                        Cell::Number(number) => {
                            worksheet.write_number(r, c, *number).expect("write number");
                        }
                        Cell::Blank => {}
                    }
                }
            }
        }
        workbook.save(&path).expect("save workbook");
        path
    }

    /// Path for a SQLite database inside the workspace; the file is created on first load.
    pub fn database(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

pub fn text_row<'a>(cells: &[&'a str]) -> Vec<Cell<'a>> {
    cells
        .iter()
        .map(|&cell| if cell.is_empty() { Cell::Blank } else { Cell::Text(cell) })
        .collect()
}

pub fn open_database(path: &Path) -> Connection {
    Connection::open(path).expect("open database")
}

/// `(name, declared type)` for every column of `table`, in table order.
pub fn table_columns(conn: &Connection, table: &str) -> Vec<(String, String)> {
    let mut statement = conn
        .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
        .expect("prepare table_info");
    statement
        .query_map([table], |row| Ok((row.get(0)?, row.get(1)?)))
        .expect("query table_info")
        .collect::<Result<Vec<_>, _>>()
        .expect("read table_info")
}

pub fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
        row.get(0)
    })
    .expect("count rows")
}
