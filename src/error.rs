use std::io;

/// Error type used at the transformer and encoder seams, where callers plug in their own implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// A transformer refused a row. Rows rewritten before this one keep their new values.
  #[error("transform failed on {database}.{table} row {row}: {source}")]
  Transform {
    database: String,
    table: String,
    row: usize,
    #[source]
    source: BoxError,
  },

  /// The capture side produced a row image that does not span the sheet's column list.
  #[error("row {row} of {database}.{table} carries {actual} values but {expected} columns are known")]
  ReconciliationMismatch {
    database: String,
    table: String,
    row: usize,
    expected: usize,
    actual: usize,
  },

  #[error("{database}.{table} has no row {row}")]
  RowNotFound { database: String, table: String, row: usize },

  #[error("failed to serialize {message} message: {source}")]
  Serialization {
    message: &'static str,
    #[source]
    source: BoxError,
  },

  #[error("unknown sql kind {0}")]
  InvalidSqlKind(u8),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Io(#[from] io::Error),
}
