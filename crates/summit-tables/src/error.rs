//! Error type for `summit-tables`.

use summit_core::entity::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no path from {from} to {to}")]
  UnknownPath { from: EntityKind, to: EntityKind },

  #[error("invalid column path: {0}")]
  InvalidPath(String),

  #[error("a column named {0:?} already exists")]
  DuplicateName(String),

  #[error("no column named {0:?}")]
  UnknownColumn(String),

  #[error("column index {0} is out of range")]
  ColumnOutOfRange(usize),

  #[error("built-in column {0:?} can only be hidden")]
  BuiltinColumn(String),

  #[error("row index {0} is out of range")]
  RowOutOfRange(usize),

  #[error("invalid filter: {0}")]
  InvalidFilter(String),

  #[error("bucket width must be positive, got {0}")]
  BucketWidth(i64),

  #[error("column {column:?} is not {expected}")]
  TypeMismatch {
    column:   String,
    expected: &'static str,
  },

  /// An error reported by the base table store.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("run cancelled")]
  Cancelled,

  #[error("worker failed: {0}")]
  Worker(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
