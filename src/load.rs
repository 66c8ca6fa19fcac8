//! Load orchestration: describe, reconcile, coerce, insert, verify.
//!
//! The descriptor is computed from a full scan before the destination is touched, and
//! every phase runs sequentially. Any fatal error aborts the run; nothing already
//! applied is rolled back.

use std::borrow::Cow;

use log::{info, warn};

use crate::{
    coerce::{RowCoercer, TypedRow},
    config::{LoadConfig, SourceConfig},
    destination::{Destination, PartialInsert},
    error::LoadError,
    reconcile::{DdlOperation, reconcile},
    schema::{self, TableDescriptor},
    source::CellTextSource,
};

/// Builds the descriptor for `source` and applies the configured renames.
pub fn prepare_descriptor<S>(
    source: &S,
    config: &SourceConfig,
) -> Result<TableDescriptor, LoadError>
where
    S: CellTextSource + ?Sized,
{
    let descriptor =
        schema::describe(source, &config.describe)?.with_renames(&config.renames)?;
    if descriptor.is_empty() {
        return Err(LoadError::unreadable(&config.path, "worksheet has no columns"));
    }
    Ok(descriptor)
}

/// Coerced data rows of a worksheet together with the fail-soft tally.
#[derive(Debug, Clone, Default)]
pub struct CoercedRows {
    pub rows: Vec<TypedRow>,
    pub soft_failures: usize,
}

/// Reads every data row of `source` in row order and coerces it against `descriptor`.
pub fn coerce_rows<S>(source: &S, descriptor: &TableDescriptor, first_row: usize) -> CoercedRows
where
    S: CellTextSource + ?Sized,
{
    let (max_row, _) = source.extent();
    let mut coercer = RowCoercer::new(descriptor);
    let mut rows = Vec::with_capacity((max_row + 1).saturating_sub(first_row));
    for row in first_row..=max_row {
        let raw: Vec<Option<Cow<'_, str>>> = descriptor
            .columns()
            .iter()
            .map(|column| source.cell_text(row, column.source_index))
            .collect();
        let cells: Vec<Option<&str>> = raw.iter().map(|cell| cell.as_deref()).collect();
        rows.push(coercer.coerce(&cells));
    }
    CoercedRows {
        rows,
        soft_failures: coercer.soft_failures(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountCheck {
    pub expected: u64,
    pub actual: u64,
}

impl RowCountCheck {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: String,
    pub descriptor: TableDescriptor,
    pub dropped: bool,
    pub operations: Vec<DdlOperation>,
    pub rows_read: usize,
    pub rows_written: usize,
    pub soft_failures: usize,
    /// `None` when verification was skipped or the count query failed.
    pub verification: Option<RowCountCheck>,
}

pub struct LoadOrchestrator<'a, D> {
    config: &'a LoadConfig,
    destination: D,
}

impl<'a, D> LoadOrchestrator<'a, D>
where
    D: Destination,
{
    pub fn new(config: &'a LoadConfig, destination: D) -> Self {
        Self {
            config,
            destination,
        }
    }

    pub fn into_destination(self) -> D {
        self.destination
    }

    pub fn run<S>(&mut self, source: &S) -> Result<LoadReport, LoadError>
    where
        S: CellTextSource + ?Sized,
    {
        let config = self.config;
        let source_config = &config.source;
        let table = source_config.table.as_str();
        let descriptor = prepare_descriptor(source, source_config)?;

        let dropped = if config.drop_table {
            self.destination
                .drop_table(table)
                .map_err(|err| schema_error(format!("DROP TABLE {table}"), err))?
        } else {
            false
        };

        let existing = self
            .destination
            .list_columns(table)
            .map_err(|err| schema_error(format!("list columns of {table}"), err))?;
        let operations = reconcile(table, &descriptor, existing.as_ref());
        self.apply(&operations)?;

        let coerced = coerce_rows(source, &descriptor, source_config.describe.first_data_row());
        info!(
            "Read in {} rows from {}",
            coerced.rows.len(),
            source_config.path.display()
        );
        if coerced.soft_failures > 0 {
            warn!(
                "{} cell(s) could not be coerced to their column type and were loaded as 0",
                coerced.soft_failures
            );
        }

        info!("Inserting {} rows into table {}", coerced.rows.len(), table);
        let rows_written = self
            .destination
            .bulk_insert(table, &descriptor, &coerced.rows, config.batch_size)
            .map_err(|PartialInsert { rows_written, error }| LoadError::BulkLoad {
                table: table.to_string(),
                rows_written,
                source: Box::new(error),
            })?;

        let verification = if config.verify {
            self.verify(table, coerced.rows.len())
        } else {
            None
        };

        Ok(LoadReport {
            table: table.to_string(),
            descriptor,
            dropped,
            operations,
            rows_read: coerced.rows.len(),
            rows_written,
            soft_failures: coerced.soft_failures,
            verification,
        })
    }

    fn apply(&mut self, operations: &[DdlOperation]) -> Result<(), LoadError> {
        let dialect = self.destination.dialect();
        for operation in operations {
            let statement = dialect.render(operation);
            match operation {
                DdlOperation::CreateTable { .. } => {
                    info!("Creating table with command: {statement}")
                }
                DdlOperation::AddColumn { .. } => {
                    info!("Creating column with command: {statement}")
                }
            }
            self.destination
                .execute(&statement)
                .map_err(|err| schema_error(statement.clone(), err))?;
        }
        Ok(())
    }

    fn verify(&mut self, table: &str, expected: usize) -> Option<RowCountCheck> {
        match self.destination.row_count(table) {
            Ok(actual) => {
                let check = RowCountCheck {
                    expected: expected as u64,
                    actual,
                };
                if check.matches() {
                    info!("Confirmed table {table} now has {actual} rows.");
                } else {
                    warn!(
                        "Table counts do not match. {table} now has {actual} rows but the spreadsheet read in {expected} rows."
                    );
                }
                Some(check)
            }
            Err(err) => {
                warn!("Could not verify the row count of {table}: {err}");
                None
            }
        }
    }
}

fn schema_error<E>(statement: String, err: E) -> LoadError
where
    E: std::error::Error + Send + Sync + 'static,
{
    LoadError::Schema {
        statement,
        source: Box::new(err),
    }
}
