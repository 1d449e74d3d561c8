//! Error type for `siren-store-sqlite`.

use siren_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] siren_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  /// A UNIQUE constraint rejected the write.
  #[error("duplicate value: {0}")]
  Duplicate(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unexpected column value: {0}")]
  Decode(String),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    let duplicate = match &e {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, message))
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
      {
        Some(message.clone().unwrap_or_else(|| failure.to_string()))
      }
      _ => None,
    };
    match duplicate {
      Some(what) => Self::Duplicate(what),
      None => Self::Database(e),
    }
  }
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool { matches!(self, Self::Duplicate(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
