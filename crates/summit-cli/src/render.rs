//! Plain-text rendering of table snapshots.

use std::fmt::Write as _;

use summit_tables::{snapshot::TableSnapshot, value::Value};

fn display(value: &Value, suffix: Option<&str>) -> String {
  match suffix {
    Some(suffix) if !value.is_none() => format!("{value}{suffix}"),
    _ => value.to_string(),
  }
}

/// Left-aligned columns separated by two spaces, numbers right-aligned.
pub fn render(snapshot: &TableSnapshot, limit: Option<usize>) -> String {
  let rows: Vec<Vec<String>> = snapshot
    .rows
    .iter()
    .take(limit.unwrap_or(usize::MAX))
    .map(|row| {
      row
        .cells
        .iter()
        .zip(&snapshot.columns)
        .map(|(v, c)| display(v, c.suffix.as_deref()))
        .collect()
    })
    .collect();

  let widths: Vec<usize> = snapshot
    .columns
    .iter()
    .enumerate()
    .map(|(i, c)| {
      rows
        .iter()
        .map(|r| r[i].chars().count())
        .chain([c.name.chars().count()])
        .max()
        .unwrap_or(0)
    })
    .collect();

  let mut out = String::new();
  let header: Vec<String> = snapshot
    .columns
    .iter()
    .zip(&widths)
    .map(|(c, w)| format!("{:<w$}", c.name))
    .collect();
  let _ = writeln!(out, "{}", header.join("  ").trim_end());

  for row in &rows {
    let line: Vec<String> = row
      .iter()
      .zip(&snapshot.columns)
      .zip(&widths)
      .map(|((text, c), w)| {
        if c.numeric {
          format!("{text:>w$}")
        } else {
          format!("{text:<w$}")
        }
      })
      .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
  }

  if snapshot.rows.len() > rows.len() {
    let _ = writeln!(out, "… {} more rows", snapshot.rows.len() - rows.len());
  }
  out
}

#[cfg(test)]
mod tests {
  use summit_core::entity::EntityKind;
  use summit_tables::{
    snapshot::{ColumnMeta, SnapshotRow},
    value::ValueType,
  };

  use super::*;

  fn column(name: &str, value_type: ValueType, suffix: Option<&str>) -> ColumnMeta {
    ColumnMeta {
      name: name.into(),
      value_type,
      numeric: value_type.is_numeric(),
      fold: None,
      suffix: suffix.map(Into::into),
      builtin: true,
      hidden: false,
    }
  }

  #[test]
  fn numbers_align_right_and_carry_suffix() {
    let snapshot = TableSnapshot {
      root:    EntityKind::Peak,
      columns: vec![
        column("Name", ValueType::Text, None),
        column("Height", ValueType::Int, Some(" m")),
      ],
      rows:    vec![
        SnapshotRow {
          id:    Some(1),
          cells: vec![Value::text("Rigi"), Value::Int(1797)],
        },
        SnapshotRow {
          id:    Some(2),
          cells: vec![Value::text("Dom"), Value::None],
        },
      ],
    };
    assert_eq!(
      render(&snapshot, None),
      "Name  Height\nRigi  1797 m\nDom\n"
    );
    assert_eq!(
      render(&snapshot, Some(1)),
      "Name  Height\nRigi  1797 m\n… 1 more rows\n"
    );
  }
}
