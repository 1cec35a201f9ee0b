//! [`CompositeTable`]: one row per root entity, with joined and folded
//! columns, filters and a sorted view.

use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

use summit_core::entity::EntityKind;

use crate::{
  Error, Result,
  builtin::builtin_columns,
  catalog::{self, IDENTITY},
  dataset::Dataset,
  descriptor::{ColumnDescriptor, ResolvedColumn},
  filter::Filter,
  graph::RelationshipGraph,
  layout::{LayoutWarning, SortSpec, TableLayout},
  snapshot::{ColumnMeta, SnapshotRow, TableSnapshot},
  value::Value,
};

/// A fully evaluated row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  /// Primary key of the root row.
  pub id:    i64,
  pub cells: Vec<Value>,
}

/// A derived view over the dataset, rooted at one entity kind.
///
/// Rows are evaluated eagerly when the table is built; [`Self::rebuild`]
/// recomputes everything from a fresh dataset. Row indices handed out by
/// [`Self::get_row`] refer to the current filtered and sorted view and are
/// invalidated by any change to data, filters or sort.
#[derive(Debug, Clone)]
pub struct CompositeTable {
  root:    EntityKind,
  graph:   Arc<RelationshipGraph>,
  columns: Vec<ResolvedColumn>,
  filters: Vec<Filter>,
  /// Sorted column index and direction (`true` = ascending).
  sort:    Option<(usize, bool)>,
  data:    Arc<Dataset>,
  /// All rows in primary key order.
  rows:    Vec<Row>,
  /// Indices into `rows` that pass the filters, in display order.
  view:    Vec<usize>,
}

impl CompositeTable {
  pub fn new(
    root: EntityKind,
    graph: Arc<RelationshipGraph>,
    data: Arc<Dataset>,
  ) -> Result<Self> {
    if root.is_link() {
      return Err(Error::UnknownPath { from: root, to: root });
    }
    let columns = builtin_columns(root)
      .iter()
      .map(|d| {
        let mut col = d.resolve(&graph, root)?;
        col.builtin = true;
        Ok(col)
      })
      .collect::<Result<Vec<_>>>()?;

    let mut table = Self {
      root,
      graph,
      columns,
      filters: Vec::new(),
      sort: None,
      data,
      rows: Vec::new(),
      view: Vec::new(),
    };
    table.evaluate_all();
    Ok(table)
  }

  pub fn root(&self) -> EntityKind { self.root }

  pub fn data(&self) -> &Arc<Dataset> { &self.data }

  // ── Rebuild ─────────────────────────────────────────────────────────────

  /// Recompute every row from `data`. Columns, filters and sort are kept.
  pub fn rebuild(&mut self, data: Arc<Dataset>) {
    self.data = data;
    self.evaluate_all();
  }

  /// Take `data` as the current dataset without recomputing. Only valid
  /// when none of [`Self::dependencies`] changed.
  pub(crate) fn adopt(&mut self, data: Arc<Dataset>) { self.data = data; }

  fn evaluate_all(&mut self) {
    let data = &self.data;
    self.rows = data
      .ids(self.root)
      .into_iter()
      .map(|id| Row {
        id,
        cells: self.columns.iter().map(|c| c.evaluate(data, id)).collect(),
      })
      .collect();
    tracing::debug!(
      root = %self.root,
      rows = self.rows.len(),
      columns = self.columns.len(),
      "rebuilt composite table"
    );
    self.refresh_view();
  }

  /// Every table whose contents affect this one.
  pub fn dependencies(&self) -> BTreeSet<EntityKind> {
    let mut deps = BTreeSet::from([self.root]);
    for col in &self.columns {
      deps.extend(col.path.tables());
      if col.descriptor.column == IDENTITY {
        deps.extend(catalog::identity_sources(col.descriptor.target));
      }
    }
    deps
  }

  // ── Columns ─────────────────────────────────────────────────────────────

  pub fn columns(&self) -> &[ResolvedColumn] { &self.columns }

  pub fn column_meta(&self) -> Vec<ColumnMeta> {
    self.columns.iter().map(ResolvedColumn::meta).collect()
  }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c.name() == name)
  }

  /// Resolve and append a user column, returning its index.
  pub fn add_custom_column(&mut self, descriptor: ColumnDescriptor) -> Result<usize> {
    if self.column_index(&descriptor.name).is_some() {
      return Err(Error::DuplicateName(descriptor.name));
    }
    let column = descriptor.resolve(&self.graph, self.root)?;
    for row in &mut self.rows {
      row.cells.push(column.evaluate(&self.data, row.id));
    }
    tracing::debug!(root = %self.root, name = column.name(), "added column");
    self.columns.push(column);
    self.refresh_view();
    Ok(self.columns.len() - 1)
  }

  /// Remove a user column. Filters on it are deactivated; sorting by it is
  /// cleared.
  pub fn remove_column(&mut self, index: usize) -> Result<ColumnDescriptor> {
    let column = self.columns.get(index).ok_or(Error::ColumnOutOfRange(index))?;
    if column.builtin {
      return Err(Error::BuiltinColumn(column.name().to_owned()));
    }

    let column = self.columns.remove(index);
    for row in &mut self.rows {
      row.cells.remove(index);
    }
    for filter in &mut self.filters {
      if filter.column == column.name() && filter.active {
        filter.active = false;
        tracing::info!(column = column.name(), "deactivated filter on removed column");
      }
    }
    self.sort = match self.sort {
      Some((i, _)) if i == index => None,
      Some((i, asc)) if i > index => Some((i - 1, asc)),
      other => other,
    };
    self.refresh_view();
    Ok(column.descriptor)
  }

  pub fn set_hidden(&mut self, index: usize, hidden: bool) -> Result<()> {
    let column = self
      .columns
      .get_mut(index)
      .ok_or(Error::ColumnOutOfRange(index))?;
    column.hidden = hidden;
    Ok(())
  }

  // ── Filters ─────────────────────────────────────────────────────────────

  pub fn filters(&self) -> &[Filter] { &self.filters }

  pub fn add_filter(&mut self, filter: Filter) -> Result<usize> {
    let index = self
      .column_index(&filter.column)
      .ok_or_else(|| Error::UnknownColumn(filter.column.clone()))?;
    filter.check(self.columns[index].value_type)?;
    self.filters.push(filter);
    self.refresh_view();
    Ok(self.filters.len() - 1)
  }

  pub fn remove_filter(&mut self, index: usize) -> Result<Filter> {
    if index >= self.filters.len() {
      return Err(Error::InvalidFilter(format!("no filter at {index}")));
    }
    let filter = self.filters.remove(index);
    self.refresh_view();
    Ok(filter)
  }

  /// Turn a filter on or off. A filter whose column was removed cannot be
  /// turned back on.
  pub fn set_filter_active(&mut self, index: usize, active: bool) -> Result<()> {
    let column = match self.filters.get(index) {
      Some(f) => f.column.clone(),
      None => return Err(Error::InvalidFilter(format!("no filter at {index}"))),
    };
    if active && self.column_index(&column).is_none() {
      return Err(Error::UnknownColumn(column));
    }
    self.filters[index].active = active;
    self.refresh_view();
    Ok(())
  }

  pub fn clear_filters(&mut self) {
    self.filters.clear();
    self.refresh_view();
  }

  // ── Sort ────────────────────────────────────────────────────────────────

  /// Stable sort by one column. Empty cells always come last; ties keep
  /// primary key order.
  pub fn sort(&mut self, index: usize, ascending: bool) -> Result<()> {
    if index >= self.columns.len() {
      return Err(Error::ColumnOutOfRange(index));
    }
    self.sort = Some((index, ascending));
    self.refresh_view();
    Ok(())
  }

  /// Back to primary key order.
  pub fn clear_sort(&mut self) {
    self.sort = None;
    self.refresh_view();
  }

  pub fn sort_order(&self) -> Option<(usize, bool)> { self.sort }

  // ── View ────────────────────────────────────────────────────────────────

  fn refresh_view(&mut self) {
    let active: Vec<(usize, &Filter)> = self
      .filters
      .iter()
      .filter(|f| f.active)
      .filter_map(|f| self.column_index(&f.column).map(|i| (i, f)))
      .collect();

    let mut view: Vec<usize> = self
      .rows
      .iter()
      .enumerate()
      .filter(|(_, row)| active.iter().all(|(i, f)| f.matches(&row.cells[*i])))
      .map(|(n, _)| n)
      .collect();

    if let Some((col, ascending)) = self.sort {
      let rows = &self.rows;
      view.sort_by(|&a, &b| {
        let (ra, rb) = (&rows[a], &rows[b]);
        order_cells(&ra.cells[col], &rb.cells[col], ascending)
          .then(ra.id.cmp(&rb.id))
      });
    }
    self.view = view;
  }

  /// Rows in the current view.
  pub fn row_count(&self) -> usize { self.view.len() }

  /// Rows in the table regardless of filters.
  pub fn total_rows(&self) -> usize { self.rows.len() }

  pub fn get_row(&self, index: usize) -> Result<&Row> {
    self
      .view
      .get(index)
      .map(|&n| &self.rows[n])
      .ok_or(Error::RowOutOfRange(index))
  }

  /// Rows in view order.
  pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
    self.view.iter().map(|&n| &self.rows[n])
  }

  /// Every distinct non-empty value of a column over all rows, with list
  /// cells split into their items. The domain of an identity filter.
  pub fn distinct_values(&self, index: usize) -> Result<Vec<Value>> {
    if index >= self.columns.len() {
      return Err(Error::ColumnOutOfRange(index));
    }
    let mut values: Vec<Value> = self
      .rows
      .iter()
      .flat_map(|row| row.cells[index].items())
      .filter(|v| !v.is_none())
      .cloned()
      .collect();
    values.sort_by(Value::compare);
    values.dedup_by(|a, b| a.compare(b) == Ordering::Equal);
    Ok(values)
  }

  /// Visible columns and filtered rows, frozen.
  pub fn snapshot(&self) -> TableSnapshot { self.freeze(false) }

  /// Like [`Self::snapshot`] but with hidden columns too, so column indices
  /// match the table's.
  pub fn snapshot_with_hidden(&self) -> TableSnapshot { self.freeze(true) }

  fn freeze(&self, with_hidden: bool) -> TableSnapshot {
    let shown: Vec<usize> = (0..self.columns.len())
      .filter(|&i| with_hidden || !self.columns[i].hidden)
      .collect();
    TableSnapshot {
      root:    self.root,
      columns: shown.iter().map(|&i| self.columns[i].meta()).collect(),
      rows:    self
        .visible_rows()
        .map(|row| SnapshotRow {
          id:    Some(row.id),
          cells: shown.iter().map(|&i| row.cells[i].clone()).collect(),
        })
        .collect(),
    }
  }

  // ── Layout ──────────────────────────────────────────────────────────────

  pub fn layout(&self) -> TableLayout {
    TableLayout {
      root:    self.root,
      columns: self
        .columns
        .iter()
        .filter(|c| !c.builtin)
        .map(|c| c.descriptor.clone())
        .collect(),
      hidden:  self
        .columns
        .iter()
        .filter(|c| c.builtin && c.hidden)
        .map(|c| c.name().to_owned())
        .collect(),
      filters: self.filters.clone(),
      sort:    self.sort.map(|(i, ascending)| SortSpec {
        column: self.columns[i].name().to_owned(),
        ascending,
      }),
    }
  }

  /// Apply a stored layout on top of the built-in columns. Entries that no
  /// longer resolve are skipped and reported.
  pub fn apply_layout(&mut self, layout: &TableLayout) -> Vec<LayoutWarning> {
    let mut warnings = Vec::new();
    if layout.root != self.root {
      warnings.push(LayoutWarning::new(
        self.root,
        layout.root.to_string(),
        "layout belongs to another table",
      ));
      return warnings;
    }

    for descriptor in &layout.columns {
      if let Err(e) = self.add_custom_column(descriptor.clone()) {
        warnings.push(LayoutWarning::new(self.root, &descriptor.name, e));
      }
    }
    for name in &layout.hidden {
      match self.column_index(name) {
        Some(i) => self.columns[i].hidden = true,
        None => warnings.push(LayoutWarning::new(self.root, name, "no such column")),
      }
    }
    for filter in &layout.filters {
      if let Err(e) = self.add_filter(filter.clone()) {
        warnings.push(LayoutWarning::new(
          self.root,
          format!("filter on {}", filter.column),
          e,
        ));
      }
    }
    if let Some(spec) = &layout.sort {
      match self.column_index(&spec.column) {
        Some(i) => {
          self.sort = Some((i, spec.ascending));
          self.refresh_view();
        }
        None => warnings.push(LayoutWarning::new(
          self.root,
          format!("sort by {}", spec.column),
          "no such column",
        )),
      }
    }
    warnings
  }
}

/// Cell order for sorting: empty cells after every value in both
/// directions.
fn order_cells(a: &Value, b: &Value, ascending: bool) -> Ordering {
  match (a.is_none(), b.is_none()) {
    (true, true) => Ordering::Equal,
    (true, false) => Ordering::Greater,
    (false, true) => Ordering::Less,
    (false, false) if ascending => a.compare(b),
    (false, false) => a.compare(b).reverse(),
  }
}
