//! Persisted table layouts: custom columns, filters and sort order.
//!
//! Layouts are stored as JSON next to the database and re-resolved when a
//! table is opened. Entries that no longer resolve are dropped with a
//! [`LayoutWarning`] instead of failing the open.

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};
use summit_core::entity::EntityKind;

use crate::{Result, descriptor::ColumnDescriptor, filter::Filter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
  pub column:    String,
  pub ascending: bool,
}

/// The user-editable state of one composite table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
  pub root:    EntityKind,
  /// Custom columns only; built-in columns are always present.
  #[serde(default)]
  pub columns: Vec<ColumnDescriptor>,
  /// Names of hidden built-in columns.
  #[serde(default)]
  pub hidden:  Vec<String>,
  #[serde(default)]
  pub filters: Vec<Filter>,
  #[serde(default)]
  pub sort:    Option<SortSpec>,
}

impl TableLayout {
  pub fn new(root: EntityKind) -> Self {
    Self {
      root,
      columns: Vec::new(),
      hidden: Vec::new(),
      filters: Vec::new(),
      sort: None,
    }
  }
}

/// Something in a stored layout that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutWarning {
  pub root:   EntityKind,
  /// The column, filter or sort entry concerned.
  pub item:   String,
  pub reason: String,
}

impl LayoutWarning {
  pub(crate) fn new(
    root: EntityKind,
    item: impl Into<String>,
    reason: impl ToString,
  ) -> Self {
    let warning = Self {
      root,
      item: item.into(),
      reason: reason.to_string(),
    };
    tracing::warn!(%root, item = %warning.item, reason = %warning.reason, "dropped layout entry");
    warning
  }
}

impl fmt::Display for LayoutWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} table: {}: {}", self.root, self.item, self.reason)
  }
}

/// All stored layouts of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutFile {
  #[serde(default)]
  pub tables: Vec<TableLayout>,
}

impl LayoutFile {
  /// Read layouts from `path`. A missing file is an empty layout set.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
      Ok(text) => Ok(serde_json::from_str(&text)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::debug!(path = %path.display(), "no layout file");
        Ok(Self::default())
      }
      Err(e) => Err(e.into()),
    }
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(self)?;
    std::fs::write(path, text)?;
    Ok(())
  }

  pub fn get(&self, root: EntityKind) -> Option<&TableLayout> {
    self.tables.iter().find(|t| t.root == root)
  }

  /// Insert or replace the layout for `layout.root`.
  pub fn put(&mut self, layout: TableLayout) {
    match self.tables.iter_mut().find(|t| t.root == layout.root) {
      Some(slot) => *slot = layout,
      None => self.tables.push(layout),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    filter::{ClassBuckets, Predicate},
    fold::Fold,
  };

  #[test]
  fn layout_survives_json() {
    let mut layout = TableLayout::new(EntityKind::Peak);
    layout.columns.push(
      ColumnDescriptor::new("Sum gain", EntityKind::Ascent, "elevation_gain")
        .folded(Fold::Sum),
    );
    layout.hidden.push("Volcano".into());
    layout.filters.push(Filter::new("Height", Predicate::IntClass {
      buckets: ClassBuckets { step: 1000, floor: 0, ceiling: 9000 },
      low:     4000,
    }));
    layout.sort = Some(SortSpec { column: "Height".into(), ascending: false });

    let mut file = LayoutFile::default();
    file.put(layout.clone());
    let json = serde_json::to_string(&file).unwrap();
    let back: LayoutFile = serde_json::from_str(&json).unwrap();
    assert_eq!(back.get(EntityKind::Peak), Some(&layout));
  }

  #[test]
  fn missing_fields_default() {
    let layout: TableLayout = serde_json::from_str(r#"{"root":"trip"}"#).unwrap();
    assert_eq!(layout, TableLayout::new(EntityKind::Trip));
  }
}
