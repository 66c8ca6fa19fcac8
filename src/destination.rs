//! Destination database access.
//!
//! [`Destination`] is the narrow surface the load needs from a database: column
//! discovery, DDL execution, batched inserts and a row count. [`SqliteDestination`]
//! implements it on top of `rusqlite`.

use std::{collections::BTreeSet, path::Path, time::Duration};

use itertools::Itertools;
use log::{debug, info};
use rusqlite::{
    Connection, OpenFlags, OptionalExtension, params, params_from_iter,
    types::{ToSql, ToSqlOutput, Value},
};

use crate::{
    coerce::{CellValue, TypedRow},
    error::LoadError,
    reconcile::Dialect,
    schema::TableDescriptor,
};

/// A bulk insert that stopped part-way. Batches committed before the failure stay.
#[derive(Debug)]
pub struct PartialInsert<E> {
    pub rows_written: usize,
    pub error: E,
}

pub trait Destination {
    type Error: std::error::Error + Send + Sync + 'static;

    fn dialect(&self) -> Dialect;

    /// Column names of `table`, or `None` when the table does not exist.
    fn list_columns(&mut self, table: &str) -> Result<Option<BTreeSet<String>>, Self::Error>;

    /// Drops `table` if present; returns whether anything was dropped.
    fn drop_table(&mut self, table: &str) -> Result<bool, Self::Error>;

    fn execute(&mut self, statement: &str) -> Result<(), Self::Error>;

    /// Inserts `rows` mapping row positions to descriptor column names, committing every
    /// `batch_size` rows. Returns the number of rows written.
    fn bulk_insert(
        &mut self,
        table: &str,
        descriptor: &TableDescriptor,
        rows: &[TypedRow],
        batch_size: usize,
    ) -> Result<usize, PartialInsert<Self::Error>>;

    fn row_count(&mut self, table: &str) -> Result<u64, Self::Error>;
}

#[derive(Debug)]
pub struct SqliteDestination {
    conn: Connection,
}

impl SqliteDestination {
    /// Opens (creating if needed) the database file at `target`; `:memory:` opens a
    /// private in-memory database.
    pub fn open(target: &str) -> Result<Self, LoadError> {
        Self::open_with_flags(
            target,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
    }

    /// Opens an existing database without write access.
    pub fn open_read_only(target: &str) -> Result<Self, LoadError> {
        Self::open_with_flags(target, OpenFlags::SQLITE_OPEN_READ_ONLY)
    }

    fn open_with_flags(target: &str, flags: OpenFlags) -> Result<Self, LoadError> {
        let connectivity = |source: rusqlite::Error| LoadError::Connectivity {
            target: target.to_string(),
            source: Box::new(source),
        };
        let conn = if target == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open_with_flags(Path::new(target), flags | OpenFlags::SQLITE_OPEN_URI)
        }
        .map_err(connectivity)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(connectivity)?;
        // Opening is lazy; touch the schema so an unusable file fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(connectivity)?;
        info!("Successfully connected to database {target}");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn table_exists(&self, table: &str) -> rusqlite::Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                params![table],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
    }

    fn insert_batch(&mut self, sql: &str, batch: &[TypedRow]) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut statement = tx.prepare_cached(sql)?;
            for row in batch {
                statement.execute(params_from_iter(row.values()))?;
            }
        }
        tx.commit()
    }
}

impl Destination for SqliteDestination {
    type Error = rusqlite::Error;

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn list_columns(&mut self, table: &str) -> rusqlite::Result<Option<BTreeSet<String>>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }
        let mut statement = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = statement
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(Some(columns))
    }

    fn drop_table(&mut self, table: &str) -> rusqlite::Result<bool> {
        if !self.table_exists(table)? {
            return Ok(false);
        }
        let sql = format!("DROP TABLE {}", self.dialect().quote_identifier(table));
        info!("Dropping table using command: {sql}");
        self.conn.execute_batch(&sql)?;
        Ok(true)
    }

    fn execute(&mut self, statement: &str) -> rusqlite::Result<()> {
        self.conn.execute_batch(statement)
    }

    fn bulk_insert(
        &mut self,
        table: &str,
        descriptor: &TableDescriptor,
        rows: &[TypedRow],
        batch_size: usize,
    ) -> Result<usize, PartialInsert<rusqlite::Error>> {
        let dialect = self.dialect();
        let columns = descriptor
            .names()
            .map(|name| dialect.quote_identifier(name))
            .join(", ");
        let placeholders = (1..=descriptor.len()).map(|idx| format!("?{idx}")).join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            dialect.quote_identifier(table)
        );
        debug!("Bulk insert statement: {sql}");

        let mut written = 0usize;
        for batch in rows.chunks(batch_size.max(1)) {
            self.insert_batch(&sql, batch).map_err(|error| PartialInsert {
                rows_written: written,
                error,
            })?;
            written += batch.len();
            debug!("Committed {written} of {} row(s)", rows.len());
        }
        Ok(written)
    }

    fn row_count(&mut self, table: &str) -> rusqlite::Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            self.dialect().quote_identifier(table)
        );
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(value) => ToSqlOutput::Owned(Value::Integer(i64::from(*value))),
            CellValue::Float(value) => ToSqlOutput::Owned(Value::Real(*value)),
            CellValue::Text(value) => ToSqlOutput::from(value.as_str()),
        })
    }
}
