//! [`SqliteStore`], the SQLite implementation of [`TableStore`].

use std::path::Path;

use summit_core::{
  delete::WhatIfReport,
  entity::{EntityKind, Record},
  relation::ForeignKey,
  store::{NamePolicy, TableStore},
};

use crate::{
  Error, Result,
  schema::{CURRENT_SCHEMA_VERSION, PRAGMAS, SCHEMA},
  sql,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Summit base table store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and check its schema version.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Create the schema on a fresh file; refuse files written by another
  /// schema version.
  async fn init_schema(&self) -> Result<()> {
    self
      .read(|conn| {
        conn.execute_batch(PRAGMAS)?;
        let found: i64 =
          conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        match found {
          0 => {
            conn.execute_batch(SCHEMA)?;
            tracing::info!(version = CURRENT_SCHEMA_VERSION, "created schema");
            Ok(())
          }
          CURRENT_SCHEMA_VERSION => Ok(()),
          found if found < CURRENT_SCHEMA_VERSION => {
            Err(Error::SchemaUpgradeRequired {
              found,
              expected: CURRENT_SCHEMA_VERSION,
            })
          }
          found => Err(Error::UnsupportedSchemaVersion(found)),
        }
      })
      .await
  }

  /// The `user_version` stamped on the open file.
  pub async fn schema_version(&self) -> Result<i64> {
    self
      .read(|conn| {
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
      })
      .await
  }

  /// Run `f` on the connection thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok(f(conn)))
      .await?
  }

  /// Run `f` inside a transaction that commits only if `f` succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?
  }
}

// ─── TableStore impl ─────────────────────────────────────────────────────────

impl TableStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert(&self, record: Record, policy: NamePolicy) -> Result<i64> {
    record.validate()?;
    let kind = record.kind();

    let id = self
      .write(move |tx| {
        sql::check_references(tx, &record)?;
        sql::check_name(tx, &record, policy, None)?;
        sql::insert_record(tx, &record)
      })
      .await?;

    tracing::debug!(%kind, id, "inserted row");
    Ok(id)
  }

  async fn update(
    &self,
    id: i64,
    record: Record,
    policy: NamePolicy,
  ) -> Result<()> {
    record.validate()?;
    let kind = record.kind();

    self
      .write(move |tx| {
        sql::check_references(tx, &record)?;
        sql::check_name(tx, &record, policy, Some(id))?;
        sql::update_record(tx, id, &record)
      })
      .await?;

    tracing::debug!(%kind, id, "updated row");
    Ok(())
  }

  async fn preview_delete(
    &self,
    kind: EntityKind,
    ids: Vec<i64>,
  ) -> Result<WhatIfReport> {
    self.read(move |conn| sql::what_if(conn, kind, &ids)).await
  }

  async fn delete(
    &self,
    kind: EntityKind,
    ids: Vec<i64>,
    confirmed: bool,
  ) -> Result<WhatIfReport> {
    let report = self
      .write(move |tx| {
        let report = sql::what_if(tx, kind, &ids)?;
        if !report.is_empty() && !confirmed {
          return Err(summit_core::Error::UnconfirmedDelete(report).into());
        }
        sql::apply_delete(tx, &report)?;
        Ok(report)
      })
      .await?;

    tracing::info!(
      %kind,
      rows = report.ids.len(),
      dependents = report.effects.len(),
      "deleted rows"
    );
    Ok(report)
  }

  async fn set_participants(
    &self,
    ascent_id: i64,
    hiker_ids: Vec<i64>,
  ) -> Result<()> {
    self
      .write(move |tx| sql::set_participants(tx, ascent_id, &hiker_ids))
      .await
  }

  async fn move_photo(&self, photo_id: i64, new_index: i64) -> Result<()> {
    if new_index < 0 {
      return Err(summit_core::ValidationError::NegativeSortIndex(new_index).into());
    }
    self
      .write(move |tx| {
        let ascent_id = sql::photo_ascent(tx, photo_id)?;
        sql::place_photo(tx, photo_id, ascent_id, new_index)
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn query_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
    self.read(move |conn| sql::read_all(conn, kind)).await
  }

  async fn query_by_foreign_key(
    &self,
    fk: ForeignKey,
    value: i64,
  ) -> Result<Vec<Record>> {
    self
      .read(move |conn| sql::read_by_foreign_key(conn, fk, value))
      .await
  }
}
