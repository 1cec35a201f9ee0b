//! Statistics over table snapshots.
//!
//! A snapshot of a composite table holds its filtered view, so active
//! filters apply. Column indices are those of the snapshot; take it with
//! [`CompositeTable::snapshot_with_hidden`] to keep them equal to the
//! table's. Large tables go through [`crate::worker::spawn_stats`], which
//! runs the same code off the async runtime and can be cancelled.
//!
//! [`CompositeTable::snapshot_with_hidden`]: crate::composite::CompositeTable::snapshot_with_hidden

use std::collections::BTreeMap;

use chrono::{Datelike as _, NaiveDate};
use serde::Serialize;

use crate::{
  Error, Result,
  snapshot::{ColumnMeta, SnapshotRow, TableSnapshot},
  value::{Value, ValueType},
};

fn column(columns: &[ColumnMeta], index: usize) -> Result<&ColumnMeta> {
  columns.get(index).ok_or(Error::ColumnOutOfRange(index))
}

fn date_column(columns: &[ColumnMeta], index: usize) -> Result<()> {
  let col = column(columns, index)?;
  if col.value_type != ValueType::Date {
    return Err(Error::TypeMismatch {
      column:   col.name.clone(),
      expected: "a date column",
    });
  }
  Ok(())
}

fn numeric_column(columns: &[ColumnMeta], index: usize) -> Result<()> {
  let col = column(columns, index)?;
  if !col.numeric {
    return Err(Error::TypeMismatch {
      column:   col.name.clone(),
      expected: "numeric",
    });
  }
  Ok(())
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

/// One statistic over a snapshot, with the columns it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
  PerYear { date_col: usize, value_col: Option<usize> },
  Histogram { col: usize, width: i64 },
  Paired { date_col: usize, a: usize, b: usize },
  TopN { col: usize, n: usize, ranking: Ranking },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsReport {
  PerYear(YearlySeries),
  Histogram(Histogram),
  Paired { points: Vec<PairedPoint> },
  TopN { ranked: Vec<Ranked> },
}

impl Statistic {
  pub fn compute(&self, snapshot: &TableSnapshot) -> Result<StatsReport> {
    self.compute_over(&snapshot.columns, snapshot.rows.iter())
  }

  /// Compute over `rows`, which must belong to a table with `columns`.
  pub(crate) fn compute_over<'a>(
    &self,
    columns: &[ColumnMeta],
    rows: impl Iterator<Item = &'a SnapshotRow>,
  ) -> Result<StatsReport> {
    Ok(match *self {
      Self::PerYear { date_col, value_col } => {
        StatsReport::PerYear(per_year_over(columns, rows, date_col, value_col)?)
      }
      Self::Histogram { col, width } => {
        StatsReport::Histogram(histogram_over(columns, rows, col, width)?)
      }
      Self::Paired { date_col, a, b } => StatsReport::Paired {
        points: paired_over(columns, rows, date_col, a, b)?,
      },
      Self::TopN { col, n, ranking } => StatsReport::TopN {
        ranked: top_n_over(columns, rows, col, n, ranking)?,
      },
    })
  }
}

// ─── Per year ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearBucket {
  /// Rows dated in this year.
  pub rows: usize,
  /// Sum of the value column over those rows; `None` if no row had a value.
  pub sum:  Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearlySeries {
  pub years:   BTreeMap<i32, YearBucket>,
  /// Rows without a date. Not part of `years`.
  pub unknown: usize,
}

/// Row counts, and optionally sums of `value_col`, per year of `date_col`.
pub fn per_year(
  snapshot: &TableSnapshot,
  date_col: usize,
  value_col: Option<usize>,
) -> Result<YearlySeries> {
  per_year_over(&snapshot.columns, snapshot.rows.iter(), date_col, value_col)
}

fn per_year_over<'a>(
  columns: &[ColumnMeta],
  rows: impl Iterator<Item = &'a SnapshotRow>,
  date_col: usize,
  value_col: Option<usize>,
) -> Result<YearlySeries> {
  date_column(columns, date_col)?;
  if let Some(v) = value_col {
    numeric_column(columns, v)?;
  }

  let mut series = YearlySeries::default();
  for row in rows {
    let Some(date) = row.cells[date_col].as_date() else {
      series.unknown += 1;
      continue;
    };
    let bucket = series.years.entry(date.year()).or_default();
    bucket.rows += 1;
    if let Some(x) = value_col.and_then(|v| row.cells[v].as_f64()) {
      *bucket.sum.get_or_insert(0.0) += x;
    }
  }
  Ok(series)
}

// ─── Histogram ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
  pub width:   i64,
  /// Lower bound of each bucket -> rows in `[low, low + width)`.
  pub buckets: BTreeMap<i64, usize>,
  /// Rows with an empty cell.
  pub missing: usize,
}

pub fn histogram(
  snapshot: &TableSnapshot,
  col: usize,
  width: i64,
) -> Result<Histogram> {
  histogram_over(&snapshot.columns, snapshot.rows.iter(), col, width)
}

fn histogram_over<'a>(
  columns: &[ColumnMeta],
  rows: impl Iterator<Item = &'a SnapshotRow>,
  col: usize,
  width: i64,
) -> Result<Histogram> {
  numeric_column(columns, col)?;
  if width <= 0 {
    return Err(Error::BucketWidth(width));
  }

  let mut hist = Histogram { width, buckets: BTreeMap::new(), missing: 0 };
  for row in rows {
    match row.cells[col].as_f64() {
      Some(x) => {
        let low = (x.floor() as i64).div_euclid(width) * width;
        *hist.buckets.entry(low).or_insert(0) += 1;
      }
      None => hist.missing += 1,
    }
  }
  Ok(hist)
}

// ─── Paired series ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedPoint {
  pub id:   Option<i64>,
  pub date: NaiveDate,
  pub a:    Option<f64>,
  pub b:    Option<f64>,
}

/// Two numeric columns over time. Undated rows are left out.
pub fn paired_series(
  snapshot: &TableSnapshot,
  date_col: usize,
  a: usize,
  b: usize,
) -> Result<Vec<PairedPoint>> {
  paired_over(&snapshot.columns, snapshot.rows.iter(), date_col, a, b)
}

fn paired_over<'a>(
  columns: &[ColumnMeta],
  rows: impl Iterator<Item = &'a SnapshotRow>,
  date_col: usize,
  a: usize,
  b: usize,
) -> Result<Vec<PairedPoint>> {
  date_column(columns, date_col)?;
  numeric_column(columns, a)?;
  numeric_column(columns, b)?;

  let mut points: Vec<PairedPoint> = rows
    .filter_map(|row| {
      Some(PairedPoint {
        id:   row.id,
        date: row.cells[date_col].as_date()?,
        a:    row.cells[a].as_f64(),
        b:    row.cells[b].as_f64(),
      })
    })
    .collect();
  points.sort_by_key(|p| (p.date, p.id));
  Ok(points)
}

// ─── Top N ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
  Highest,
  Lowest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
  pub id:    Option<i64>,
  pub value: Value,
}

/// The `n` rows with the highest (or lowest) value in `col`.
///
/// Empty cells are not ranked. Ties are broken by primary key ascending.
/// Fewer than `n` rows are returned when fewer exist.
pub fn top_n(
  snapshot: &TableSnapshot,
  col: usize,
  n: usize,
  ranking: Ranking,
) -> Result<Vec<Ranked>> {
  top_n_over(&snapshot.columns, snapshot.rows.iter(), col, n, ranking)
}

fn top_n_over<'a>(
  columns: &[ColumnMeta],
  rows: impl Iterator<Item = &'a SnapshotRow>,
  col: usize,
  n: usize,
  ranking: Ranking,
) -> Result<Vec<Ranked>> {
  let column = column(columns, col)?;
  if column.value_type == ValueType::List {
    return Err(Error::TypeMismatch {
      column:   column.name.clone(),
      expected: "a single-valued column",
    });
  }

  let mut ranked: Vec<Ranked> = rows
    .filter(|row| !row.cells[col].is_none())
    .map(|row| Ranked { id: row.id, value: row.cells[col].clone() })
    .collect();
  ranked.sort_by(|x, y| {
    let ord = x.value.compare(&y.value);
    match ranking {
      Ranking::Highest => ord.reverse(),
      Ranking::Lowest => ord,
    }
    .then(x.id.cmp(&y.id))
  });
  ranked.truncate(n);
  Ok(ranked)
}
