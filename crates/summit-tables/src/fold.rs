//! Fold operations: reducing the values of many related rows to one cell.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::value::{Value, ValueType};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Fold {
  /// Distinct values ordered by the related row's primary key.
  List,
  /// Number of related rows, counted once per link.
  Count,
  Average,
  Sum,
  Max,
  Min,
}

impl Fold {
  /// Whether the fold only makes sense over numeric input.
  pub fn is_numeric(self) -> bool {
    matches!(self, Self::Average | Self::Sum | Self::Max | Self::Min)
  }

  /// Type of the folded cell given the type of the input column. Cells of
  /// a folded column are either of this type or none.
  pub fn output_type(self, input: ValueType) -> ValueType {
    match self {
      Self::List => ValueType::List,
      Self::Count => ValueType::Int,
      Self::Average => ValueType::Float,
      Self::Sum | Self::Max | Self::Min => input,
    }
  }

  /// Reduce `(row id, value)` pairs in traversal order.
  pub fn apply(self, items: &[(i64, Value)]) -> Value {
    match self {
      Self::Count => Value::Int(items.len() as i64),
      Self::List => {
        let mut sorted: Vec<&(i64, Value)> = items.iter().collect();
        sorted.sort_by_key(|(id, _)| *id);
        sorted.dedup_by_key(|(id, _)| *id);
        let values: Vec<Value> = sorted
          .into_iter()
          .filter(|(_, v)| !v.is_none())
          .map(|(_, v)| v.clone())
          .collect();
        if values.is_empty() {
          Value::None
        } else {
          Value::List(values)
        }
      }
      numeric => {
        let present: Vec<&Value> =
          items.iter().map(|(_, v)| v).filter(|v| !v.is_none()).collect();
        if present.is_empty() {
          return Value::None;
        }
        if present.iter().any(|v| v.as_f64().is_none()) {
          tracing::debug!(fold = %numeric, "non-numeric input to numeric fold");
          return Value::None;
        }
        match numeric {
          Self::Average => {
            let sum: f64 = present.iter().filter_map(|v| v.as_f64()).sum();
            Value::Float(sum / present.len() as f64)
          }
          Self::Sum => sum(&present),
          Self::Max => extreme(&present, std::cmp::Ordering::Greater),
          Self::Min => extreme(&present, std::cmp::Ordering::Less),
          Self::List | Self::Count => Value::None,
        }
      }
    }
  }
}

/// Integer input sums to an integer; a total outside `i64` is none.
fn sum(values: &[&Value]) -> Value {
  if !values.iter().all(|v| matches!(v, Value::Int(_))) {
    return Value::Float(values.iter().filter_map(|v| v.as_f64()).sum());
  }
  let total = values
    .iter()
    .filter_map(|v| v.as_i64())
    .try_fold(0i64, i64::checked_add);
  match total {
    Some(total) => Value::Int(total),
    None => {
      tracing::warn!(values = values.len(), "integer sum overflowed");
      Value::None
    }
  }
}

fn extreme(values: &[&Value], keep: std::cmp::Ordering) -> Value {
  let mut best = values[0];
  for v in &values[1..] {
    if v.compare(best) == keep {
      best = v;
    }
  }
  best.clone()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ints(values: &[Option<i64>]) -> Vec<(i64, Value)> {
    values
      .iter()
      .enumerate()
      .map(|(i, v)| (i as i64 + 1, Value::from(*v)))
      .collect()
  }

  #[test]
  fn sum_skips_missing_values() {
    assert_eq!(
      Fold::Sum.apply(&ints(&[Some(200), None, Some(300)])),
      Value::Int(500)
    );
  }

  #[test]
  fn numeric_folds_over_nothing_are_none() {
    for fold in [Fold::Sum, Fold::Average, Fold::Max, Fold::Min] {
      assert_eq!(fold.apply(&[]), Value::None, "{fold}");
      assert_eq!(fold.apply(&ints(&[None, None])), Value::None, "{fold}");
    }
  }

  #[test]
  fn count_counts_every_link() {
    assert_eq!(Fold::Count.apply(&[]), Value::Int(0));
    assert_eq!(Fold::Count.apply(&ints(&[None, Some(1)])), Value::Int(2));
  }

  #[test]
  fn average_is_float() {
    assert_eq!(
      Fold::Average.apply(&ints(&[Some(1), Some(2)])),
      Value::Float(1.5)
    );
  }

  #[test]
  fn list_orders_by_id_and_drops_duplicates() {
    let items = vec![
      (3, Value::text("Hans")),
      (1, Value::text("Ada")),
      (3, Value::text("Hans")),
      (2, Value::None),
    ];
    assert_eq!(
      Fold::List.apply(&items),
      Value::List(vec![Value::text("Ada"), Value::text("Hans")])
    );
    assert_eq!(Fold::List.apply(&[]), Value::None);
  }

  #[test]
  fn max_and_min_pick_extremes() {
    let items = ints(&[Some(3000), Some(4100), None, Some(2500)]);
    assert_eq!(Fold::Max.apply(&items), Value::Int(4100));
    assert_eq!(Fold::Min.apply(&items), Value::Int(2500));
  }

  #[test]
  fn text_input_to_sum_is_none() {
    assert_eq!(Fold::Sum.apply(&[(1, Value::text("x"))]), Value::None);
  }

  #[test]
  fn overflowing_sum_keeps_the_column_type() {
    let items = ints(&[Some(i64::MAX), Some(1)]);
    assert_eq!(Fold::Sum.apply(&items), Value::None);
    assert_eq!(Fold::Sum.output_type(ValueType::Int), ValueType::Int);
    assert_eq!(
      Fold::Sum.apply(&ints(&[Some(i64::MAX), Some(-1)])),
      Value::Int(i64::MAX - 1)
    );
  }
}
