//! Error type for `summit-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Core(#[from] summit_core::Error),

  /// Disk, permission or connection failure. Fatal to the operation; the
  /// surrounding transaction is rolled back.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("cannot decode {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("store has schema version {found}, expected {expected}; run the upgrade tool first")]
  SchemaUpgradeRequired { found: i64, expected: i64 },

  #[error("store has schema version {0}, which is newer than this build supports")]
  UnsupportedSchemaVersion(i64),
}

impl Error {
  /// `true` for failures of the storage layer itself, as opposed to rejected
  /// input.
  pub fn is_io(&self) -> bool {
    matches!(self, Self::Database(_) | Self::Sqlite(_))
  }
}

impl From<summit_core::ValidationError> for Error {
  fn from(e: summit_core::ValidationError) -> Self {
    Self::Core(summit_core::Error::Validation(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
