//! Column descriptors: declarative, serialisable column definitions.

use serde::{Deserialize, Serialize};
use summit_core::entity::EntityKind;

use crate::{
  Error, Result,
  catalog::{self, IDENTITY},
  dataset::Dataset,
  fold::Fold,
  graph::{Cardinality, RelationshipGraph, ResolvedPath},
  snapshot::ColumnMeta,
  value::{Value, ValueType},
};

/// A column as the user defined it: which table to reach, which column to
/// read there, and how to fold many values into one.
///
/// Descriptors are data only. They are checked against the graph by
/// [`ColumnDescriptor::resolve`] each time they are attached to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
  /// Unique within its table.
  pub name:   String,
  pub target: EntityKind,
  pub column: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fold:   Option<Fold>,
  /// Appended to the displayed value, e.g. `" m"`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suffix: Option<String>,
}

impl ColumnDescriptor {
  pub fn new(
    name: impl Into<String>,
    target: EntityKind,
    column: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      target,
      column: column.into(),
      fold: None,
      suffix: None,
    }
  }

  /// A column showing the identity label of the target row.
  pub fn identity(name: impl Into<String>, target: EntityKind) -> Self {
    Self::new(name, target, IDENTITY)
  }

  pub fn folded(mut self, fold: Fold) -> Self {
    self.fold = Some(fold);
    self
  }

  pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.suffix = Some(suffix.into());
    self
  }

  /// Check the descriptor against `graph` for a table rooted at `root`.
  pub fn resolve(
    &self,
    graph: &RelationshipGraph,
    root: EntityKind,
  ) -> Result<ResolvedColumn> {
    if self.name.trim().is_empty() {
      return Err(Error::InvalidPath("column name is empty".into()));
    }
    let path = graph.resolve_path(root, self.target)?.clone();
    let input = catalog::column_type(self.target, &self.column).ok_or_else(
      || Error::InvalidPath(format!("{} has no column {:?}", self.target, self.column)),
    )?;

    let value_type = match (path.cardinality(), self.fold) {
      (Cardinality::One, None) => input,
      (Cardinality::Many, Some(fold)) => fold.output_type(input),
      (Cardinality::One, Some(fold)) => {
        return Err(Error::InvalidPath(format!(
          "{root} -> {} is to-one and cannot be folded with {fold}",
          self.target
        )));
      }
      (Cardinality::Many, None) => {
        return Err(Error::InvalidPath(format!(
          "{root} -> {} is to-many and needs a fold",
          self.target
        )));
      }
    };

    Ok(ResolvedColumn {
      descriptor: self.clone(),
      path,
      value_type,
      builtin: false,
      hidden: false,
    })
  }
}

/// A descriptor bound to a root table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
  pub descriptor: ColumnDescriptor,
  pub path:       ResolvedPath,
  pub value_type: ValueType,
  pub builtin:    bool,
  pub hidden:     bool,
}

impl ResolvedColumn {
  pub fn name(&self) -> &str { &self.descriptor.name }

  /// The cell of this column for root row `root_id`.
  pub fn evaluate(&self, data: &Dataset, root_id: i64) -> Value {
    let d = &self.descriptor;
    let reached = data.traverse(&self.path, root_id);
    match d.fold {
      None => reached
        .first()
        .map_or(Value::None, |id| data.value(d.target, *id, &d.column)),
      Some(fold) => {
        let items: Vec<(i64, Value)> = reached
          .into_iter()
          .map(|id| (id, data.value(d.target, id, &d.column)))
          .collect();
        fold.apply(&items)
      }
    }
  }

  pub fn meta(&self) -> ColumnMeta {
    ColumnMeta {
      name:       self.descriptor.name.clone(),
      value_type: self.value_type,
      numeric:    self.value_type.is_numeric(),
      fold:       self.descriptor.fold,
      suffix:     self.descriptor.suffix.clone(),
      builtin:    self.builtin,
      hidden:     self.hidden,
    }
  }
}
