//! Delete what-if reports.
//!
//! Before rows are removed the store reports every dependent row the delete
//! would touch. Rows that cannot exist without their parent are deleted with
//! it; every other reference is reset to none.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{entity::EntityKind, relation::ForeignKey};

/// What a delete does to a dependent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
  /// The dependent row is deleted together with its parent.
  Cascade,
  /// The dependent row stays; its reference becomes none.
  Unlink,
}

/// One dependent row affected by a delete.
///
/// For participation links `id` is the id of the row on the *other* side of
/// the link (the hiker when deleting an ascent, the ascent when deleting a
/// hiker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
  pub kind:   EntityKind,
  pub id:     i64,
  pub via:    ForeignKey,
  pub effect: Effect,
}

/// The consequences of deleting `ids` from table `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatIfReport {
  pub kind:    EntityKind,
  pub ids:     Vec<i64>,
  pub effects: Vec<Dependent>,
}

impl WhatIfReport {
  pub fn new(kind: EntityKind, ids: Vec<i64>) -> Self {
    Self { kind, ids, effects: Vec::new() }
  }

  /// `true` when nothing besides the named rows is touched; such a delete
  /// needs no confirmation.
  pub fn is_empty(&self) -> bool { self.effects.is_empty() }

  /// Number of affected dependents per (kind, effect).
  pub fn summary(&self) -> BTreeMap<(EntityKind, Effect), usize> {
    let mut out = BTreeMap::new();
    for dep in &self.effects {
      *out.entry((dep.kind, dep.effect)).or_insert(0) += 1;
    }
    out
  }

  /// Every table whose contents change if the delete goes through.
  pub fn touched_kinds(&self) -> Vec<EntityKind> {
    let mut kinds: Vec<EntityKind> = std::iter::once(self.kind)
      .chain(self.effects.iter().map(|d| d.kind))
      .collect();
    kinds.sort();
    kinds.dedup();
    kinds
  }
}
