//! Row filters over resolved cells.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  value::{Value, ValueType},
};

// ─── Class buckets ───────────────────────────────────────────────────────────

/// Fixed-width numeric classes between `floor` and `ceiling`.
///
/// Every class is half-open `[low, low + step)` except the top one, which
/// also contains `ceiling`. Values outside the range are clipped into the
/// lowest or highest class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBuckets {
  pub step:    i64,
  pub floor:   i64,
  pub ceiling: i64,
}

impl ClassBuckets {
  pub fn new(step: i64, floor: i64, ceiling: i64) -> Result<Self> {
    let buckets = Self { step, floor, ceiling };
    buckets.validate()?;
    Ok(buckets)
  }

  fn validate(&self) -> Result<()> {
    if self.step <= 0 {
      return Err(Error::InvalidFilter(format!(
        "class step must be positive, got {}",
        self.step
      )));
    }
    if self.floor.rem_euclid(self.step) != 0
      || self.ceiling.rem_euclid(self.step) != 0
    {
      return Err(Error::InvalidFilter(format!(
        "class bounds {}..{} are not multiples of {}",
        self.floor, self.ceiling, self.step
      )));
    }
    if self.ceiling <= self.floor {
      return Err(Error::InvalidFilter(format!(
        "class ceiling {} is not above floor {}",
        self.ceiling, self.floor
      )));
    }
    Ok(())
  }

  /// Number of classes.
  pub fn len(&self) -> usize { ((self.ceiling - self.floor) / self.step) as usize }

  /// Lower bound of the class containing `value`.
  pub fn low_of(&self, value: i64) -> i64 {
    let low = value.div_euclid(self.step) * self.step;
    low.clamp(self.floor, self.ceiling - self.step)
  }

  /// Index of the class containing `value`, counted from `floor`.
  pub fn index_of(&self, value: i64) -> usize {
    ((self.low_of(value) - self.floor) / self.step) as usize
  }

  /// `(low, high)` of class `index`; `high` is exclusive except for the
  /// top class.
  pub fn bounds(&self, index: usize) -> (i64, i64) {
    let low = self.floor + index as i64 * self.step;
    (low, low + self.step)
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
  /// The cell (or one of its list items) displays exactly as `value`.
  Identity { value: String },
  /// Case-insensitive substring of the displayed cell.
  Text { needle: String },
  IntExact { value: i64 },
  /// The cell falls in the class starting at `low`.
  IntClass { buckets: ClassBuckets, low: i64 },
  /// Inclusive on both ends; a missing end is open.
  DateRange {
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
  },
  TimeRange {
    min: Option<NaiveTime>,
    max: Option<NaiveTime>,
  },
  Bool { value: bool },
}

impl Predicate {
  fn matches(&self, cell: &Value) -> bool {
    let mut items = cell.items().iter().filter(|v| !v.is_none());
    match self {
      Self::Identity { value } => items.any(|v| v.to_string() == *value),
      Self::Text { needle } => {
        let needle = needle.to_lowercase();
        cell.to_string().to_lowercase().contains(&needle)
      }
      Self::IntExact { value } => {
        items.any(|v| v.as_f64() == Some(*value as f64))
      }
      Self::IntClass { buckets, low } => items.any(|v| {
        v.as_f64()
          .is_some_and(|x| buckets.low_of(x.floor() as i64) == *low)
      }),
      Self::DateRange { min, max } => items.any(|v| match v {
        Value::Date(d) => in_range(d, min.as_ref(), max.as_ref()),
        _ => false,
      }),
      Self::TimeRange { min, max } => items.any(|v| match v {
        Value::Time(t) => in_range(t, min.as_ref(), max.as_ref()),
        _ => false,
      }),
      Self::Bool { value } => items.any(|v| *v == Value::Bool(*value)),
    }
  }

  /// Whether the predicate can apply to cells of `value_type`.
  fn accepts(&self, value_type: ValueType) -> bool {
    let list = value_type == ValueType::List;
    match self {
      Self::Text { .. } => true,
      Self::Identity { .. } => {
        matches!(value_type, ValueType::Text | ValueType::Bool) || list
      }
      Self::IntExact { .. } | Self::IntClass { .. } => {
        value_type.is_numeric() || list
      }
      Self::DateRange { .. } => value_type == ValueType::Date || list,
      Self::TimeRange { .. } => value_type == ValueType::Time || list,
      Self::Bool { .. } => value_type == ValueType::Bool || list,
    }
  }

  fn validate(&self) -> Result<()> {
    match self {
      Self::IntClass { buckets, low } => {
        buckets.validate()?;
        if buckets.low_of(*low) != *low {
          return Err(Error::InvalidFilter(format!(
            "{low} is not the start of a class"
          )));
        }
        Ok(())
      }
      Self::DateRange { min: Some(min), max: Some(max) } if min > max => Err(
        Error::InvalidFilter(format!("date range {min}..{max} is inverted")),
      ),
      Self::TimeRange { min: Some(min), max: Some(max) } if min > max => Err(
        Error::InvalidFilter(format!("time range {min}..{max} is inverted")),
      ),
      _ => Ok(()),
    }
  }
}

fn in_range<T: PartialOrd>(v: &T, min: Option<&T>, max: Option<&T>) -> bool {
  min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m)
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// A predicate on one named column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
  pub column:    String,
  pub predicate: Predicate,
  /// Keep the rows that do *not* match.
  #[serde(default)]
  pub exclude:   bool,
  /// Inactive filters are kept but let every row through.
  #[serde(default = "active_default")]
  pub active:    bool,
}

fn active_default() -> bool { true }

impl Filter {
  pub fn new(column: impl Into<String>, predicate: Predicate) -> Self {
    Self {
      column: column.into(),
      predicate,
      exclude: false,
      active: true,
    }
  }

  pub fn excluding(mut self) -> Self {
    self.exclude = true;
    self
  }

  pub fn matches(&self, cell: &Value) -> bool {
    !self.active || self.predicate.matches(cell) != self.exclude
  }

  /// Validate parameters and the column type the filter will see.
  pub fn check(&self, value_type: ValueType) -> Result<()> {
    self.predicate.validate()?;
    if !self.predicate.accepts(value_type) {
      return Err(Error::InvalidFilter(format!(
        "{:?} cannot filter {value_type:?} column {:?}",
        self.predicate, self.column
      )));
    }
    Ok(())
  }
}
