//! Additive schema reconciliation and DDL rendering.
//!
//! [`reconcile`] compares a [`TableDescriptor`] with the column names already present in
//! the destination and returns the smallest list of [`DdlOperation`]s that lets the table
//! accept every column: one `CreateTable` when the table is absent, otherwise one
//! `AddColumn` per missing column. Existing columns are never dropped or retyped, and a
//! name match alone (ignoring ASCII case) is enough to skip a column.
//!
//! Generated columns are always nullable and carry no key or identity clause.

use std::collections::BTreeSet;

use clap::ValueEnum;
use itertools::Itertools;
use serde::Serialize;

use crate::schema::{ColumnPlan, ColumnType, TableDescriptor};

/// Widest bounded `nvarchar`; longer text uses `nvarchar(max)`.
const SQL_SERVER_MAX_NVARCHAR: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    #[default]
    Sqlite,
    SqlServer,
}

impl Dialect {
    /// Native column type for a planned column.
    pub fn native_type(&self, column: &ColumnPlan) -> String {
        match (self, column.column_type) {
            (Dialect::SqlServer, ColumnType::Integer) => "int".to_string(),
            (Dialect::SqlServer, ColumnType::Float) => "float".to_string(),
            (Dialect::SqlServer, ColumnType::Text) => match column.max_text_length {
                Some(len) if len <= SQL_SERVER_MAX_NVARCHAR => format!("nvarchar({len})"),
                _ => "nvarchar(max)".to_string(),
            },
            (Dialect::Sqlite, ColumnType::Integer) => "INTEGER".to_string(),
            (Dialect::Sqlite, ColumnType::Float) => "REAL".to_string(),
            (Dialect::Sqlite, ColumnType::Text) => match column.max_text_length {
                Some(len) => format!("VARCHAR({len})"),
                None => "TEXT".to_string(),
            },
        }
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::SqlServer => format!("[{}]", name.replace(']', "]]")),
            Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Renders one operation as a single executable statement.
    pub fn render(&self, operation: &DdlOperation) -> String {
        match operation {
            DdlOperation::CreateTable { table, descriptor } => {
                let columns = descriptor
                    .columns()
                    .iter()
                    .map(|column| format!("    {}", self.column_definition(column)))
                    .join(",\n");
                format!(
                    "CREATE TABLE {} (\n{}\n)",
                    self.quote_identifier(table),
                    columns
                )
            }
            DdlOperation::AddColumn { table, column } => {
                let keyword = match self {
                    Dialect::SqlServer => "ADD",
                    Dialect::Sqlite => "ADD COLUMN",
                };
                format!(
                    "ALTER TABLE {} {} {}",
                    self.quote_identifier(table),
                    keyword,
                    self.column_definition(column)
                )
            }
        }
    }

    fn column_definition(&self, column: &ColumnPlan) -> String {
        format!(
            "{} {}",
            self.quote_identifier(&column.header_name),
            self.native_type(column)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum DdlOperation {
    CreateTable {
        table: String,
        descriptor: TableDescriptor,
    },
    AddColumn {
        table: String,
        column: ColumnPlan,
    },
}

/// Plans the schema changes needed before `descriptor` can be loaded into `table`.
///
/// `existing` is `None` when the table does not exist yet.
pub fn reconcile(
    table: &str,
    descriptor: &TableDescriptor,
    existing: Option<&BTreeSet<String>>,
) -> Vec<DdlOperation> {
    let Some(existing) = existing else {
        return vec![DdlOperation::CreateTable {
            table: table.to_string(),
            descriptor: descriptor.clone(),
        }];
    };
    descriptor
        .columns()
        .iter()
        .filter(|column| {
            !existing
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&column.header_name))
        })
        .map(|column| DdlOperation::AddColumn {
            table: table.to_string(),
            column: column.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(columns: &[(&str, ColumnType)]) -> TableDescriptor {
        TableDescriptor::new(
            columns
                .iter()
                .enumerate()
                .map(|(idx, (name, ty))| ColumnPlan::new(*name, idx + 1, *ty))
                .collect(),
        )
        .unwrap()
    }

    fn existing(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn absent_table_yields_a_single_create() {
        let people = descriptor(&[("Name", ColumnType::Text), ("Age", ColumnType::Integer)]);
        let operations = reconcile("people", &people, None);
        assert_eq!(
            operations,
            vec![DdlOperation::CreateTable {
                table: "people".into(),
                descriptor: people.clone(),
            }]
        );
    }

    #[test]
    fn existing_table_only_gets_missing_columns() {
        let people = descriptor(&[("Name", ColumnType::Text), ("Age", ColumnType::Integer)]);
        let operations = reconcile("people", &people, Some(&existing(&["Name"])));
        assert_eq!(operations.len(), 1);
        match &operations[0] {
            DdlOperation::AddColumn { table, column } => {
                assert_eq!(table, "people");
                assert_eq!(column.header_name, "Age");
            }
            other => panic!("expected AddColumn, got {other:?}"),
        }
    }

    #[test]
    fn type_mismatches_and_case_differences_are_not_changes() {
        let people = descriptor(&[("Name", ColumnType::Integer), ("age", ColumnType::Float)]);
        let operations = reconcile("people", &people, Some(&existing(&["Name", "AGE", "Extra"])));
        assert!(operations.is_empty());
    }

    #[test]
    fn add_operations_follow_descriptor_order() {
        let wide = descriptor(&[
            ("c", ColumnType::Text),
            ("a", ColumnType::Text),
            ("b", ColumnType::Text),
        ]);
        let names = reconcile("t", &wide, Some(&existing(&[])))
            .into_iter()
            .map(|op| match op {
                DdlOperation::AddColumn { column, .. } => column.header_name,
                DdlOperation::CreateTable { .. } => unreachable!(),
            })
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn sql_server_type_mapping() {
        let dialect = Dialect::SqlServer;
        let int = ColumnPlan::new("n", 1, ColumnType::Integer);
        let float = ColumnPlan::new("f", 2, ColumnType::Float);
        let text = ColumnPlan::new("t", 3, ColumnType::Text);
        assert_eq!(dialect.native_type(&int), "int");
        assert_eq!(dialect.native_type(&float), "float");
        assert_eq!(dialect.native_type(&text), "nvarchar(max)");
        assert_eq!(
            dialect.native_type(&text.clone().with_max_text_length(Some(40))),
            "nvarchar(40)"
        );
        assert_eq!(
            dialect.native_type(&text.with_max_text_length(Some(5000))),
            "nvarchar(max)"
        );
    }

    #[test]
    fn renders_create_and_alter_statements() {
        let table = descriptor(&[("ID", ColumnType::Integer), ("Price", ColumnType::Float)]);
        let create = DdlOperation::CreateTable {
            table: "Sales".into(),
            descriptor: table,
        };
        assert_eq!(
            Dialect::SqlServer.render(&create),
            "CREATE TABLE [Sales] (\n    [ID] int,\n    [Price] float\n)"
        );
        assert_eq!(
            Dialect::Sqlite.render(&create),
            "CREATE TABLE \"Sales\" (\n    \"ID\" INTEGER,\n    \"Price\" REAL\n)"
        );

        let add = DdlOperation::AddColumn {
            table: "Sales".into(),
            column: ColumnPlan::new("Note", 3, ColumnType::Text),
        };
        assert_eq!(
            Dialect::SqlServer.render(&add),
            "ALTER TABLE [Sales] ADD [Note] nvarchar(max)"
        );
        assert_eq!(
            Dialect::Sqlite.render(&add),
            "ALTER TABLE \"Sales\" ADD COLUMN \"Note\" TEXT"
        );
    }

    #[test]
    fn identifiers_escape_their_quote_characters() {
        assert_eq!(Dialect::SqlServer.quote_identifier("a]b"), "[a]]b]");
        assert_eq!(Dialect::Sqlite.quote_identifier("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
