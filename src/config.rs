//! Immutable run configuration.
//!
//! Arguments and environment are resolved once into a [`LoadConfig`] (or, for `plan`,
//! a [`SourceConfig`]) before any file or database is touched; every later stage reads
//! from it by reference.

use std::{env, path::PathBuf};

use encoding_rs::{Encoding, UTF_8};
use log::warn;

use crate::{
    cli::{LoadArgs, SourceArgs},
    error::LoadError,
    schema::{ColumnRename, DescribeOptions, TextLength},
    source::delimited::resolve_encoding,
};

pub const CONNECTION_ENV: &str = "SHEET2SQL_CONNECTION";
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub worksheet: Option<String>,
    pub table: String,
    pub encoding: &'static Encoding,
    pub describe: DescribeOptions,
    pub renames: Vec<ColumnRename>,
}

impl SourceConfig {
    /// Defaults for `path`: first worksheet, header row, unbounded text, table named after
    /// the file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let table = default_table_name(&path)?;
        Ok(Self {
            path,
            worksheet: None,
            table,
            encoding: UTF_8,
            describe: DescribeOptions::default(),
            renames: Vec::new(),
        })
    }

    pub fn from_args(args: &SourceArgs) -> Result<Self, LoadError> {
        let file = args
            .file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| LoadError::configuration("a spreadsheet file path is required"))?;
        let mut config = Self::new(file)?;
        if let Some(table) = args.table.as_deref().map(str::trim) {
            if table.is_empty() {
                return Err(LoadError::configuration("table name cannot be empty"));
            }
            config.table = table.to_string();
        }
        config.worksheet = args
            .worksheet
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        config.encoding = resolve_encoding(args.input_encoding.as_deref())?;
        config.describe = DescribeOptions {
            has_headers: !args.no_header,
            text_length: if args.bounded_text {
                TextLength::Observed
            } else {
                TextLength::Unbounded
            },
        };
        config.renames = parse_renames(&args.renames);
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub source: SourceConfig,
    pub connection: String,
    pub drop_table: bool,
    pub batch_size: usize,
    pub verify: bool,
}

impl LoadConfig {
    pub fn new(source: SourceConfig, connection: impl Into<String>) -> Self {
        Self {
            source,
            connection: connection.into(),
            drop_table: false,
            batch_size: DEFAULT_BATCH_SIZE,
            verify: true,
        }
    }

    pub fn from_args(args: &LoadArgs) -> Result<Self, LoadError> {
        Self::from_args_with_env(args, |key| env::var(key).ok())
    }

    pub fn from_args_with_env<F>(args: &LoadArgs, lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = SourceConfig::from_args(&args.source)?;
        let connection = resolve_connection(args.connection.as_deref(), lookup).ok_or_else(|| {
            LoadError::configuration(format!(
                "the connection was not set; use --connection or set {CONNECTION_ENV}"
            ))
        })?;
        if args.batch_size == 0 {
            return Err(LoadError::configuration("--batch-size must be at least 1"));
        }
        Ok(Self {
            source,
            connection,
            drop_table: args.drop,
            batch_size: args.batch_size,
            verify: !args.skip_verify,
        })
    }
}

/// Explicit value first, then the environment; blank values count as unset.
pub fn resolve_connection<F>(explicit: Option<&str>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .or_else(|| lookup(CONNECTION_ENV))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_table_name(path: &std::path::Path) -> Result<String, LoadError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            LoadError::configuration(format!(
                "cannot derive a table name from {path:?}; use --table"
            ))
        })
}

fn parse_renames(specs: &[String]) -> Vec<ColumnRename> {
    specs
        .iter()
        .filter_map(|spec| {
            let parsed = ColumnRename::parse(spec);
            if parsed.is_none() {
                warn!("Ignoring rename '{spec}': expected oldname,newname");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_args(file: &str) -> SourceArgs {
        SourceArgs {
            file: Some(PathBuf::from(file)),
            worksheet: None,
            table: None,
            renames: Vec::new(),
            no_header: false,
            bounded_text: false,
            input_encoding: None,
        }
    }

    fn load_args(file: &str, connection: Option<&str>) -> LoadArgs {
        LoadArgs {
            source: source_args(file),
            connection: connection.map(str::to_string),
            drop: false,
            batch_size: DEFAULT_BATCH_SIZE,
            skip_verify: false,
        }
    }

    #[test]
    fn table_defaults_to_file_stem() {
        let config = SourceConfig::from_args(&source_args("data/Sales Q1.xlsx")).unwrap();
        assert_eq!(config.table, "Sales Q1");
        assert!(config.describe.has_headers);
    }

    #[test]
    fn connection_falls_back_to_environment() {
        let args = load_args("a.xlsx", None);
        let config = LoadConfig::from_args_with_env(&args, |key| {
            (key == CONNECTION_ENV).then(|| "warehouse.db".to_string())
        })
        .unwrap();
        assert_eq!(config.connection, "warehouse.db");

        let explicit = load_args("a.xlsx", Some("explicit.db"));
        let config =
            LoadConfig::from_args_with_env(&explicit, |_| Some("env.db".to_string())).unwrap();
        assert_eq!(config.connection, "explicit.db");
    }

    #[test]
    fn missing_connection_is_a_configuration_error() {
        let args = load_args("a.xlsx", None);
        let err = LoadConfig::from_args_with_env(&args, |_| None).unwrap_err();
        assert!(matches!(err, LoadError::Configuration(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn malformed_renames_are_dropped() {
        let mut args = source_args("a.xlsx");
        args.renames = vec!["Old,New".into(), "broken".into()];
        let config = SourceConfig::from_args(&args).unwrap();
        assert_eq!(
            config.renames,
            vec![ColumnRename {
                from: "Old".into(),
                to: "New".into()
            }]
        );
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let mut args = load_args("a.xlsx", Some("db"));
        args.source.file = None;
        let err = LoadConfig::from_args_with_env(&args, |_| None).unwrap_err();
        assert!(matches!(err, LoadError::Configuration(_)));

        args.source.file = Some(PathBuf::new());
        let err = LoadConfig::from_args_with_env(&args, |_| None).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut args = load_args("a.xlsx", Some("db"));
        args.batch_size = 0;
        assert!(LoadConfig::from_args_with_env(&args, |_| None).is_err());
    }
}
