pub mod cli;
pub mod coerce;
pub mod config;
pub mod destination;
pub mod error;
pub mod infer;
pub mod load;
pub mod reconcile;
pub mod schema;
pub mod source;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use crate::{
    cli::{Cli, Commands},
    config::{LoadConfig, SourceConfig, resolve_connection},
    destination::{Destination, SqliteDestination},
    error::LoadError,
    load::LoadOrchestrator,
    reconcile::{DdlOperation, Dialect},
    schema::ColumnPlan,
};

pub use error::exit_code;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet2sql", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Plan(args) => handle_plan(&args),
    }
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let config = LoadConfig::from_args(args)?;
    info!(
        "Loading {:?} into table '{}'",
        config.source.path, config.source.table
    );
    let source = source::open_source(
        &config.source.path,
        config.source.worksheet.as_deref(),
        config.source.encoding,
    )?;
    let destination = SqliteDestination::open(&config.connection)?;
    let report = LoadOrchestrator::new(&config, destination)
        .run(source.as_ref())
        .with_context(|| format!("Loading {:?}", config.source.path))?;
    debug!("Load report: {report:?}");
    info!(
        "Loaded {} row(s) into '{}' ({} schema change(s))",
        report.rows_written,
        report.table,
        report.operations.len()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    table: &'a str,
    dialect: Dialect,
    table_exists: bool,
    columns: &'a [ColumnPlan],
    operations: &'a [DdlOperation],
    statements: Vec<String>,
}

fn handle_plan(args: &cli::PlanArgs) -> Result<()> {
    let config = SourceConfig::from_args(&args.source)?;
    let source = source::open_source(&config.path, config.worksheet.as_deref(), config.encoding)?;
    let descriptor = load::prepare_descriptor(source.as_ref(), &config)?;

    let existing = match resolve_connection(args.connection.as_deref(), |key| env::var(key).ok()) {
        Some(target) => {
            let mut destination = SqliteDestination::open_read_only(&target)?;
            destination
                .list_columns(&config.table)
                .map_err(|err| LoadError::Schema {
                    statement: format!("list columns of {}", config.table),
                    source: Box::new(err),
                })?
        }
        None => None,
    };
    let operations = reconcile::reconcile(&config.table, &descriptor, existing.as_ref());
    let statements = operations
        .iter()
        .map(|operation| args.dialect.render(operation))
        .collect::<Vec<_>>();

    if args.json {
        let output = PlanOutput {
            table: &config.table,
            dialect: args.dialect,
            table_exists: existing.is_some(),
            columns: descriptor.columns(),
            operations: &operations,
            statements,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Serializing plan")?
        );
        return Ok(());
    }

    print!("{}", table::render_plan(&descriptor, args.dialect));
    println!();
    if statements.is_empty() {
        println!("-- table '{}' already has every column", config.table);
    }
    for statement in statements {
        println!("{statement};");
    }
    Ok(())
}
