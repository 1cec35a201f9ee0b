//! Background workers over table snapshots.
//!
//! A worker only ever reads a [`TableSnapshot`]; it never touches the store.
//! It runs on the blocking pool, reports [`Progress`] over a channel and
//! checks its [`CancelToken`] between batches. A cancelled or failed export
//! aborts its sink, which must then leave nothing behind; a cancelled
//! statistic is discarded.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
  Error, Result,
  snapshot::{ColumnMeta, SnapshotRow, TableSnapshot},
  stats::{Statistic, StatsReport},
};

// ─── Cancellation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed); }

  pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

// ─── Sinks ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
  /// This row could not be written; the run continues.
  #[error("{0}")]
  Row(String),
  /// The sink itself failed; the run stops.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Destination of an export run.
pub trait RowSink: Send + 'static {
  fn begin(&mut self, columns: &[ColumnMeta]) -> Result<(), SinkError>;

  fn write_row(&mut self, row: &SnapshotRow) -> Result<(), SinkError>;

  /// Make the output visible. Called once, after the last row.
  fn commit(self) -> std::io::Result<()>;

  /// Discard everything written so far.
  fn abort(self);
}

// ─── Progress ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
  /// Position of the row in the snapshot.
  pub index:   usize,
  pub id:      Option<i64>,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub rows_written: usize,
  pub row_errors:   Vec<RowError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
  Started { total: usize },
  Rows { done: usize, total: usize },
  Finished,
  Cancelled,
  Failed(String),
}

/// The last message of a run.
fn finished<T>(out: &Result<T>) -> Progress {
  match out {
    Ok(_) => Progress::Finished,
    Err(Error::Cancelled) => Progress::Cancelled,
    Err(e) => Progress::Failed(e.to_string()),
  }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

pub struct WorkerHandle<T> {
  pub progress: mpsc::UnboundedReceiver<Progress>,
  cancel:       CancelToken,
  join:         JoinHandle<Result<T>>,
}

impl<T> WorkerHandle<T> {
  pub fn cancel(&self) { self.cancel.cancel(); }

  pub fn cancel_token(&self) -> CancelToken { self.cancel.clone() }

  /// Wait for the run to end.
  pub async fn join(self) -> Result<T> {
    self
      .join
      .await
      .map_err(|e| Error::Worker(e.to_string()))?
  }
}

// ─── Export ──────────────────────────────────────────────────────────────────

/// Write every row of `snapshot` to `sink` on the blocking pool.
pub fn spawn_export<S: RowSink>(
  snapshot: TableSnapshot,
  sink: S,
  batch_size: usize,
) -> WorkerHandle<RunSummary> {
  spawn_export_with(snapshot, sink, batch_size, CancelToken::new())
}

/// [`spawn_export`] with a token created by the caller, e.g. to wire it to
/// a signal handler before the run starts.
pub fn spawn_export_with<S: RowSink>(
  snapshot: TableSnapshot,
  sink: S,
  batch_size: usize,
  cancel: CancelToken,
) -> WorkerHandle<RunSummary> {
  let (tx, progress) = mpsc::unbounded_channel();
  let token = cancel.clone();
  let join = tokio::task::spawn_blocking(move || {
    let out = run_export(&snapshot, sink, batch_size.max(1), &token, &tx);
    let _ = tx.send(finished(&out));
    out
  });
  WorkerHandle { progress, cancel, join }
}

fn run_export<S: RowSink>(
  snapshot: &TableSnapshot,
  mut sink: S,
  batch_size: usize,
  cancel: &CancelToken,
  tx: &mpsc::UnboundedSender<Progress>,
) -> Result<RunSummary> {
  let total = snapshot.rows.len();
  let _ = tx.send(Progress::Started { total });
  tracing::info!(root = %snapshot.root, rows = total, "export started");

  if let Err(e) = sink.begin(&snapshot.columns) {
    sink.abort();
    return Err(fatal(e));
  }

  let mut summary = RunSummary::default();
  let mut done = 0;
  for batch in snapshot.rows.chunks(batch_size) {
    if cancel.is_cancelled() {
      sink.abort();
      tracing::info!(done, "export cancelled");
      return Err(Error::Cancelled);
    }
    for row in batch {
      match sink.write_row(row) {
        Ok(()) => summary.rows_written += 1,
        Err(SinkError::Row(message)) => {
          tracing::warn!(index = done, id = ?row.id, %message, "row not exported");
          summary.row_errors.push(RowError { index: done, id: row.id, message });
        }
        Err(SinkError::Io(e)) => {
          sink.abort();
          return Err(e.into());
        }
      }
      done += 1;
    }
    let _ = tx.send(Progress::Rows { done, total });
  }

  if cancel.is_cancelled() {
    sink.abort();
    return Err(Error::Cancelled);
  }
  sink.commit()?;
  tracing::info!(
    written = summary.rows_written,
    failed = summary.row_errors.len(),
    "export finished"
  );
  Ok(summary)
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Compute `statistic` over `snapshot` on the blocking pool.
pub fn spawn_stats(
  snapshot: TableSnapshot,
  statistic: Statistic,
  batch_size: usize,
  cancel: CancelToken,
) -> WorkerHandle<StatsReport> {
  let (tx, progress) = mpsc::unbounded_channel();
  let token = cancel.clone();
  let join = tokio::task::spawn_blocking(move || {
    let out = run_stats(&snapshot, &statistic, batch_size.max(1), &token, &tx);
    let _ = tx.send(finished(&out));
    out
  });
  WorkerHandle { progress, cancel, join }
}

fn run_stats(
  snapshot: &TableSnapshot,
  statistic: &Statistic,
  batch_size: usize,
  cancel: &CancelToken,
  tx: &mpsc::UnboundedSender<Progress>,
) -> Result<StatsReport> {
  let total = snapshot.rows.len();
  let _ = tx.send(Progress::Started { total });

  let rows = Batches {
    rows: snapshot.rows.iter(),
    cancel,
    tx,
    batch_size,
    done: 0,
    total,
  };
  let report = statistic.compute_over(&snapshot.columns, rows)?;
  if cancel.is_cancelled() {
    tracing::info!(root = %snapshot.root, ?statistic, "statistic cancelled");
    return Err(Error::Cancelled);
  }
  tracing::debug!(
    root = %snapshot.root,
    ?statistic,
    rows = total,
    "statistic computed"
  );
  Ok(report)
}

/// Rows of a snapshot that stop early once `cancel` is set. The token is
/// checked, and progress reported, at every batch boundary.
struct Batches<'a> {
  rows:       std::slice::Iter<'a, SnapshotRow>,
  cancel:     &'a CancelToken,
  tx:         &'a mpsc::UnboundedSender<Progress>,
  batch_size: usize,
  done:       usize,
  total:      usize,
}

impl<'a> Iterator for Batches<'a> {
  type Item = &'a SnapshotRow;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done % self.batch_size == 0 {
      if self.done > 0 {
        let (done, total) = (self.done, self.total);
        let _ = self.tx.send(Progress::Rows { done, total });
      }
      if self.cancel.is_cancelled() {
        return None;
      }
    }
    let row = self.rows.next()?;
    self.done += 1;
    Some(row)
  }
}

fn fatal(e: SinkError) -> Error {
  match e {
    SinkError::Io(e) => Error::Io(e),
    SinkError::Row(message) => Error::Worker(message),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use summit_core::entity::EntityKind;

  use super::*;
  use crate::{
    stats::Ranking,
    value::{Value, ValueType},
  };

  #[derive(Debug, Default)]
  struct Outcome {
    rows:      Vec<Option<i64>>,
    committed: bool,
    aborted:   bool,
  }

  /// Keeps rows in memory and rejects the row with id 13.
  struct MemorySink(Arc<Mutex<Outcome>>);

  impl RowSink for MemorySink {
    fn begin(&mut self, _: &[ColumnMeta]) -> Result<(), SinkError> { Ok(()) }

    fn write_row(&mut self, row: &SnapshotRow) -> Result<(), SinkError> {
      if row.id == Some(13) {
        return Err(SinkError::Row("unlucky".into()));
      }
      self.0.lock().unwrap().rows.push(row.id);
      Ok(())
    }

    fn commit(self) -> std::io::Result<()> {
      self.0.lock().unwrap().committed = true;
      Ok(())
    }

    fn abort(self) { self.0.lock().unwrap().aborted = true; }
  }

  fn snapshot(ids: impl IntoIterator<Item = i64>) -> TableSnapshot {
    TableSnapshot {
      root:    EntityKind::Hiker,
      columns: vec![ColumnMeta {
        name:       "Id".into(),
        value_type: ValueType::Int,
        numeric:    true,
        fold:       None,
        suffix:     None,
        builtin:    true,
        hidden:     false,
      }],
      rows:    ids
        .into_iter()
        .map(|id| SnapshotRow { id: Some(id), cells: vec![Value::Int(id)] })
        .collect(),
    }
  }

  #[tokio::test]
  async fn row_errors_are_collected_not_fatal() {
    let outcome = Arc::new(Mutex::new(Outcome::default()));
    let mut handle =
      spawn_export(snapshot(10..16), MemorySink(outcome.clone()), 4);

    let mut last = None;
    while let Some(p) = handle.progress.recv().await {
      last = Some(p);
    }
    let summary = handle.join().await.unwrap();

    assert_eq!(summary.rows_written, 5);
    assert_eq!(summary.row_errors, vec![RowError {
      index:   3,
      id:      Some(13),
      message: "unlucky".into(),
    }]);
    assert_eq!(last, Some(Progress::Finished));
    let outcome = outcome.lock().unwrap();
    assert!(outcome.committed && !outcome.aborted);
  }

  #[tokio::test]
  async fn cancelled_run_aborts_the_sink() {
    let outcome = Arc::new(Mutex::new(Outcome::default()));
    let sink = MemorySink(outcome.clone());
    let cancel = CancelToken::new();
    cancel.cancel();
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = run_export(&snapshot(0..10), sink, 2, &cancel, &tx).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    let outcome = outcome.lock().unwrap();
    assert!(outcome.aborted && !outcome.committed);
    assert!(outcome.rows.is_empty());
  }

  #[tokio::test]
  async fn statistics_run_off_the_runtime() {
    let job = Statistic::Histogram { col: 0, width: 5 };
    let mut handle = spawn_stats(snapshot(1..8), job, 3, CancelToken::new());

    let mut seen = Vec::new();
    while let Some(p) = handle.progress.recv().await {
      seen.push(p);
    }
    let StatsReport::Histogram(hist) = handle.join().await.unwrap() else {
      panic!("wrong report");
    };
    assert_eq!(hist.buckets.get(&0), Some(&4));
    assert_eq!(hist.buckets.get(&5), Some(&3));
    assert_eq!(seen.first(), Some(&Progress::Started { total: 7 }));
    assert!(seen.contains(&Progress::Rows { done: 6, total: 7 }));
    assert_eq!(seen.last(), Some(&Progress::Finished));
  }

  #[tokio::test]
  async fn cancelled_statistic_is_discarded() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let job = Statistic::TopN { col: 0, n: 3, ranking: Ranking::Highest };
    let handle = spawn_stats(snapshot(0..100), job, 10, cancel);
    assert!(matches!(handle.join().await, Err(Error::Cancelled)));
  }
}
