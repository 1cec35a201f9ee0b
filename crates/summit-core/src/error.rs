//! Error types for `summit-core`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::{delete::WhatIfReport, entity::EntityKind};

/// A record failed its field-level checks. Reported against the offending
/// row only; other rows of a batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{kind} is missing required field `{field}`")]
  MissingField {
    kind:  EntityKind,
    field: &'static str,
  },

  #[error("trip dates must be given together (start: {start:?}, end: {end:?})")]
  HalfOpenDateRange {
    start: Option<NaiveDate>,
    end:   Option<NaiveDate>,
  },

  #[error("trip starts on {start} but ends on {end}")]
  InvertedDateRange { start: NaiveDate, end: NaiveDate },

  #[error("grade {grade:?} does not belong to the {system} scale")]
  GradeNotInSystem { system: String, grade: String },

  #[error("photo sort index must not be negative (got {0})")]
  NegativeSortIndex(i64),

  #[error("{kind} rows cannot be written through this operation")]
  UnsupportedKind { kind: EntityKind },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("{kind} named {name:?} already exists")]
  DuplicateName { kind: EntityKind, name: String },

  #[error("{kind} {id} not found")]
  NotFound { kind: EntityKind, id: i64 },

  #[error("deleting would affect {} dependent rows; confirmation required", .0.effects.len())]
  UnconfirmedDelete(WhatIfReport),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
