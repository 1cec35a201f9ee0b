//! Cell values.

use std::{cmp::Ordering, fmt};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// The type of a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
  Int,
  Float,
  Text,
  Bool,
  Date,
  Time,
  /// Several values folded into one cell.
  List,
}

impl ValueType {
  pub fn is_numeric(self) -> bool { matches!(self, Self::Int | Self::Float) }
}

/// One display-ready cell.
///
/// `None` means "no data"; it is distinct from zero and from the empty
/// string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
  #[default]
  None,
  Int(i64),
  Float(f64),
  Text(String),
  Bool(bool),
  Date(NaiveDate),
  Time(NaiveTime),
  List(Vec<Value>),
}

impl Value {
  pub fn is_none(&self) -> bool { matches!(self, Self::None) }

  pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Self::Int(v) => Some(*v as f64),
      Self::Float(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_date(&self) -> Option<NaiveDate> {
    match self {
      Self::Date(d) => Some(*d),
      _ => None,
    }
  }

  /// Items of a folded list, or the value itself.
  pub fn items(&self) -> &[Value] {
    match self {
      Self::List(items) => items,
      other => std::slice::from_ref(other),
    }
  }

  fn rank(&self) -> u8 {
    match self {
      Self::Bool(_) => 0,
      Self::Int(_) | Self::Float(_) => 1,
      Self::Date(_) => 2,
      Self::Time(_) => 3,
      Self::Text(_) => 4,
      Self::List(_) => 5,
      Self::None => 6,
    }
  }

  /// Total order used for sorting. Numbers compare across `Int`/`Float`;
  /// text compares case-insensitively; `None` sorts after everything.
  pub fn compare(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Self::Int(a), Self::Int(b)) => a.cmp(b),
      (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
      (Self::Date(a), Self::Date(b)) => a.cmp(b),
      (Self::Time(a), Self::Time(b)) => a.cmp(b),
      (Self::Text(a), Self::Text(b)) => a
        .to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b)),
      (Self::List(a), Self::List(b)) => {
        for (x, y) in a.iter().zip(b) {
          let ord = x.compare(y);
          if ord != Ordering::Equal {
            return ord;
          }
        }
        a.len().cmp(&b.len())
      }
      (a, b) if a.rank() == 1 && b.rank() == 1 => {
        let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
        x.total_cmp(&y)
      }
      (a, b) => a.rank().cmp(&b.rank()),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::None => Ok(()),
      Self::Int(v) => write!(f, "{v}"),
      Self::Float(v) => {
        if v.fract() == 0.0 {
          write!(f, "{v:.0}")
        } else {
          write!(f, "{v:.1}")
        }
      }
      Self::Text(s) => f.write_str(s),
      Self::Bool(b) => f.write_str(if *b { "yes" } else { "no" }),
      Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
      Self::Time(t) => write!(f, "{}", t.format("%H:%M")),
      Self::List(items) => {
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{item}")?;
        }
        Ok(())
      }
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Int(v) }
}

impl From<Option<i64>> for Value {
  fn from(v: Option<i64>) -> Self { v.map_or(Self::None, Self::Int) }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<Option<&str>> for Value {
  fn from(v: Option<&str>) -> Self { v.map_or(Self::None, Self::from) }
}

impl From<Option<NaiveDate>> for Value {
  fn from(v: Option<NaiveDate>) -> Self { v.map_or(Self::None, Self::Date) }
}

impl From<Option<NaiveTime>> for Value {
  fn from(v: Option<NaiveTime>) -> Self { v.map_or(Self::None, Self::Time) }
}
