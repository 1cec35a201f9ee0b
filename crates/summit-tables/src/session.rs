//! [`Session`]: the open database and every table built on it.
//!
//! All mutations go through the session so that it knows which base tables
//! changed. Composite tables are rebuilt lazily: a mutation only bumps the
//! version of the touched kinds, and the next call to [`Session::table`]
//! reloads the dataset and rebuilds the tables that depend on them.

use std::{
  collections::{BTreeMap, BTreeSet, btree_map::Entry},
  sync::Arc,
};

use summit_core::{
  delete::WhatIfReport,
  entity::{EntityKind, Record},
  store::{NamePolicy, TableStore},
};

use crate::{
  Error, Result,
  composite::CompositeTable,
  dataset::Dataset,
  graph::RelationshipGraph,
  layout::{LayoutFile, LayoutWarning},
  snapshot::TableSnapshot,
};

type Versions = BTreeMap<EntityKind, u64>;

struct Cached {
  table: CompositeTable,
  /// Versions of the table's dependencies when it was last built.
  seen:  Versions,
}

pub struct Session<S> {
  store:    S,
  graph:    Arc<RelationshipGraph>,
  data:     Arc<Dataset>,
  stale:    bool,
  versions: Versions,
  tables:   BTreeMap<EntityKind, Cached>,
}

impl<S: TableStore> Session<S> {
  /// Attach to an open store and load its contents.
  pub async fn open(store: S) -> Result<Self> {
    let data = Dataset::load(&store).await?;
    tracing::info!("session opened");
    Ok(Self {
      store,
      graph: Arc::new(RelationshipGraph::new()),
      data: Arc::new(data),
      stale: false,
      versions: Versions::new(),
      tables: BTreeMap::new(),
    })
  }

  /// Drop all tables and hand the store back.
  pub fn close(self) -> S {
    tracing::info!(tables = self.tables.len(), "session closed");
    self.store
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn graph(&self) -> &Arc<RelationshipGraph> { &self.graph }

  fn touch(&mut self, kinds: impl IntoIterator<Item = EntityKind>) {
    for kind in kinds {
      *self.versions.entry(kind).or_default() += 1;
    }
    self.stale = true;
  }

  // ── Mutations ───────────────────────────────────────────────────────────

  pub async fn insert(&mut self, record: Record, policy: NamePolicy) -> Result<i64> {
    let kind = record.kind();
    let id = self.store.insert(record, policy).await.map_err(Error::store)?;
    self.touch([kind]);
    Ok(id)
  }

  pub async fn update(
    &mut self,
    id: i64,
    record: Record,
    policy: NamePolicy,
  ) -> Result<()> {
    let kind = record.kind();
    self
      .store
      .update(id, record, policy)
      .await
      .map_err(Error::store)?;
    self.touch([kind]);
    Ok(())
  }

  /// Update several rows, each on its own. A row that fails validation
  /// does not stop the others.
  pub async fn update_batch(
    &mut self,
    rows: Vec<(i64, Record)>,
    policy: NamePolicy,
  ) -> Vec<Result<()>> {
    let mut results = Vec::with_capacity(rows.len());
    for (id, record) in rows {
      let out = self.update(id, record, policy).await;
      if let Err(e) = &out {
        tracing::debug!(id, error = %e, "row not updated");
      }
      results.push(out);
    }
    results
  }

  pub async fn preview_delete(
    &self,
    kind: EntityKind,
    ids: Vec<i64>,
  ) -> Result<WhatIfReport> {
    self
      .store
      .preview_delete(kind, ids)
      .await
      .map_err(Error::store)
  }

  /// Delete rows. Without `confirmed`, a delete that affects other rows
  /// fails and changes nothing.
  pub async fn delete(
    &mut self,
    kind: EntityKind,
    ids: Vec<i64>,
    confirmed: bool,
  ) -> Result<WhatIfReport> {
    let report = self
      .store
      .delete(kind, ids, confirmed)
      .await
      .map_err(Error::store)?;
    self.touch(report.touched_kinds());
    Ok(report)
  }

  pub async fn set_participants(
    &mut self,
    ascent_id: i64,
    hiker_ids: Vec<i64>,
  ) -> Result<()> {
    self
      .store
      .set_participants(ascent_id, hiker_ids)
      .await
      .map_err(Error::store)?;
    self.touch([EntityKind::Participation]);
    Ok(())
  }

  pub async fn move_photo(&mut self, photo_id: i64, new_index: i64) -> Result<()> {
    self
      .store
      .move_photo(photo_id, new_index)
      .await
      .map_err(Error::store)?;
    self.touch([EntityKind::Photo]);
    Ok(())
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  /// The current dataset, reloaded first if a mutation happened since the
  /// last read.
  pub async fn data(&mut self) -> Result<Arc<Dataset>> {
    if self.stale {
      self.data = Arc::new(Dataset::load(&self.store).await?);
      self.stale = false;
    }
    Ok(self.data.clone())
  }

  /// The composite table rooted at `root`, reflecting the committed state
  /// of the store.
  pub async fn table(&mut self, root: EntityKind) -> Result<&mut CompositeTable> {
    let data = self.data().await?;
    match self.tables.entry(root) {
      Entry::Occupied(entry) => {
        let cached = entry.into_mut();
        let now = versions_of(&self.versions, cached.table.dependencies());
        if now != cached.seen {
          cached.table.rebuild(data);
          cached.seen = now;
        } else if !Arc::ptr_eq(cached.table.data(), &data) {
          cached.table.adopt(data);
        }
        Ok(&mut cached.table)
      }
      Entry::Vacant(entry) => {
        let table = CompositeTable::new(root, self.graph.clone(), data)?;
        let seen = versions_of(&self.versions, table.dependencies());
        Ok(&mut entry.insert(Cached { table, seen }).table)
      }
    }
  }

  /// A base table exactly as stored.
  pub async fn raw_snapshot(&mut self, kind: EntityKind) -> Result<TableSnapshot> {
    let data = self.data().await?;
    Ok(TableSnapshot::raw(&data, kind))
  }

  // ── Layouts ─────────────────────────────────────────────────────────────

  /// Apply stored layouts to their tables, building them as needed.
  pub async fn apply_layouts(
    &mut self,
    file: &LayoutFile,
  ) -> Result<Vec<LayoutWarning>> {
    let mut warnings = Vec::new();
    for layout in &file.tables {
      if layout.root.is_link() {
        warnings.push(LayoutWarning::new(
          layout.root,
          layout.root.to_string(),
          "not a table",
        ));
        continue;
      }
      let table = self.table(layout.root).await?;
      warnings.extend(table.apply_layout(layout));
    }
    Ok(warnings)
  }

  /// Layouts of every table built in this session.
  pub fn layouts(&self) -> LayoutFile {
    LayoutFile {
      tables: self.tables.values().map(|c| c.table.layout()).collect(),
    }
  }
}

fn versions_of(versions: &Versions, kinds: BTreeSet<EntityKind>) -> Versions {
  kinds
    .into_iter()
    .map(|k| (k, versions.get(&k).copied().unwrap_or(0)))
    .collect()
}
