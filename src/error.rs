//! Failure taxonomy for a load run.
//!
//! Every fatal condition is one [`LoadError`] variant, and every variant belongs to a
//! class with its own process exit status. Cells that fail numeric coercion are not
//! errors at all; they are counted by [`crate::coerce::RowCoercer`] instead.

use std::path::PathBuf;

use thiserror::Error;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("the file path could not be found at: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("could not read {}: {message}", .path.display())]
    SourceUnreadable { path: PathBuf, message: String },
    #[error("error connecting to the database at '{target}'")]
    Connectivity {
        target: String,
        #[source]
        source: BoxedError,
    },
    #[error("schema change failed: {statement}")]
    Schema {
        statement: String,
        #[source]
        source: BoxedError,
    },
    #[error("bulk load into '{table}' failed after {rows_written} row(s) were written")]
    BulkLoad {
        table: String,
        rows_written: usize,
        #[source]
        source: BoxedError,
    },
}

impl LoadError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LoadError::Configuration(message.into())
    }

    pub fn unreadable(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        LoadError::SourceUnreadable {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::Configuration(_) => 4,
            LoadError::Connectivity { .. } => 6,
            LoadError::BulkLoad { .. } => 7,
            LoadError::SourceNotFound(_) => 8,
            LoadError::Schema { .. } => 9,
            LoadError::SourceUnreadable { .. } => 10,
        }
    }
}

/// Exit status for an error returned by [`crate::run`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LoadError>()
        .map(LoadError::exit_code)
        .unwrap_or(1)
}
