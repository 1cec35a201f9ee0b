//! The `TableStore` trait, the contract of the base table store.
//!
//! The trait is implemented by storage backends (e.g. `summit-store-sqlite`).
//! The table engine (`summit-tables`) depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  delete::WhatIfReport,
  entity::{EntityKind, Record},
  relation::ForeignKey,
};

/// How name uniqueness is enforced for kinds where it is only recommended
/// (hikers). Country names are unique regardless of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
  /// Fail with a duplicate-name error.
  #[default]
  Reject,
  /// The user has acknowledged the duplicate.
  AllowDuplicate,
}

/// Abstraction over a base table store backend.
///
/// Every mutating method is atomic: it either applies completely or leaves
/// the store unchanged.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait TableStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate and persist a new row, returning its assigned id.
  ///
  /// The `id` carried by `record` is ignored. Photos inserted at a sort
  /// index inside the existing range shift the later photos back; indices
  /// past the end append.
  fn insert(
    &self,
    record: Record,
    policy: NamePolicy,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Validate and replace the row `id` of `record`'s kind.
  fn update(
    &self,
    id: i64,
    record: Record,
    policy: NamePolicy,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Report what deleting `ids` would do without changing anything.
  fn preview_delete(
    &self,
    kind: EntityKind,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<WhatIfReport, Self::Error>> + Send + '_;

  /// Delete `ids` in one transaction.
  ///
  /// When the delete has dependents and `confirmed` is `false` nothing is
  /// changed and the what-if report is returned as an error.
  fn delete(
    &self,
    kind: EntityKind,
    ids: Vec<i64>,
    confirmed: bool,
  ) -> impl Future<Output = Result<WhatIfReport, Self::Error>> + Send + '_;

  /// Replace the set of hikers that took part in an ascent.
  fn set_participants(
    &self,
    ascent_id: i64,
    hiker_ids: Vec<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Move a photo to `new_index` within its ascent, renumbering the others.
  fn move_photo(
    &self,
    photo_id: i64,
    new_index: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All rows of a table, ordered by primary key (link rows by their key
  /// pair).
  fn query_all(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  /// Rows of `fk`'s owning table whose key equals `value`.
  fn query_by_foreign_key(
    &self,
    fk: ForeignKey,
    value: i64,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;
}
