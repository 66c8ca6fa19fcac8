use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::reconcile::Dialect;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import a spreadsheet into a database table, inferring column types",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a worksheet into a table, creating it or adding missing columns first
    Load(LoadArgs),
    /// Show inferred columns and the DDL a load would issue, without writing anything
    Plan(PlanArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Spreadsheet to read, required (.xlsx, .xlsm, .xlsb, .xls, .ods, .csv or .tsv)
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
    /// Worksheet to read (defaults to the first worksheet)
    #[arg(short = 'w', long = "worksheet")]
    pub worksheet: Option<String>,
    /// Destination table name (defaults to the file name without extension)
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
    /// Rename a column, in the form `oldname,newname`
    #[arg(short = 'r', long = "rename", action = clap::ArgAction::Append)]
    pub renames: Vec<String>,
    /// Treat row 1 as data and name columns `Column 1`, `Column 2`, ...
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Size text columns to their longest value instead of maximum length
    #[arg(long = "bounded-text")]
    pub bounded_text: bool,
    /// Character encoding of .csv/.tsv input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// SQLite database to load into (falls back to $SHEET2SQL_CONNECTION)
    #[arg(short = 'c', long = "connection")]
    pub connection: Option<String>,
    /// Drop the table first if it exists, then recreate it
    #[arg(short = 'd', long = "drop")]
    pub drop: bool,
    /// Rows per committed insert batch
    #[arg(long = "batch-size", default_value_t = crate::config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Skip the post-load row count check
    #[arg(long = "skip-verify")]
    pub skip_verify: bool,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Existing SQLite database to compare against; without one the table is assumed absent
    #[arg(short = 'c', long = "connection")]
    pub connection: Option<String>,
    /// SQL dialect used to render the DDL
    #[arg(long, value_enum, default_value_t = Dialect::Sqlite)]
    pub dialect: Dialect,
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}
