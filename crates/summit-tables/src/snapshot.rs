//! Immutable table copies handed to background workers.

use serde::{Deserialize, Serialize};
use summit_core::entity::EntityKind;

use crate::{
  catalog,
  dataset::Dataset,
  fold::Fold,
  value::{Value, ValueType},
};

/// Column metadata, available without any row data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
  pub name:       String,
  pub value_type: ValueType,
  pub numeric:    bool,
  pub fold:       Option<Fold>,
  pub suffix:     Option<String>,
  pub builtin:    bool,
  pub hidden:     bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
  /// Primary key of the root row; `None` for link rows.
  pub id:    Option<i64>,
  pub cells: Vec<Value>,
}

/// Columns and rows frozen at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
  pub root:    EntityKind,
  pub columns: Vec<ColumnMeta>,
  pub rows:    Vec<SnapshotRow>,
}

impl TableSnapshot {
  /// The base table of `kind` as stored: every stored column, primary key
  /// order.
  pub fn raw(data: &Dataset, kind: EntityKind) -> Self {
    let base: Vec<_> = catalog::base_columns(kind)
      .iter()
      .filter(|c| c.stored)
      .collect();
    let columns = base
      .iter()
      .map(|c| ColumnMeta {
        name:       c.name.to_owned(),
        value_type: c.value_type,
        numeric:    c.value_type.is_numeric(),
        fold:       None,
        suffix:     None,
        builtin:    true,
        hidden:     false,
      })
      .collect();
    let rows = data
      .rows(kind)
      .map(|record| SnapshotRow {
        id:    record.id(),
        cells: base
          .iter()
          .map(|c| catalog::base_value(record, c.name))
          .collect(),
      })
      .collect();
    Self { root: kind, columns, rows }
  }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use summit_core::entity::{Participation, Record, Trip};

  use super::*;

  #[test]
  fn raw_trip_table_leaves_out_computed_days() {
    let data = Dataset::from_records([Record::Trip(Trip {
      id:          1,
      name:        "Wallis".into(),
      start_date:  NaiveDate::from_ymd_opt(2024, 8, 1),
      end_date:    NaiveDate::from_ymd_opt(2024, 8, 3),
      description: None,
    })]);
    let snap = TableSnapshot::raw(&data, EntityKind::Trip);
    let names: Vec<&str> = snap.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "start_date", "end_date", "description"]);
    assert_eq!(snap.rows[0].cells.len(), names.len());
  }

  #[test]
  fn raw_link_table_has_no_ids() {
    let data = Dataset::from_records([
      Record::Participation(Participation { ascent_id: 2, hiker_id: 1 }),
      Record::Participation(Participation { ascent_id: 1, hiker_id: 3 }),
    ]);
    let snap = TableSnapshot::raw(&data, EntityKind::Participation);
    assert_eq!(snap.columns.len(), 2);
    assert_eq!(snap.rows[0].id, None);
    assert_eq!(snap.rows[0].cells, vec![Value::Int(1), Value::Int(3)]);
  }
}
