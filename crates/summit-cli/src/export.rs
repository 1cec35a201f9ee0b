//! CSV export sink.
//!
//! Rows go to `<out>.tmp`; the file is renamed to `<out>` only when the run
//! commits, so a cancelled or failed export leaves no partial output.

use std::{
  fs::{self, File},
  io,
  path::PathBuf,
};

use summit_tables::{
  snapshot::{ColumnMeta, SnapshotRow},
  value::Value,
  worker::{RowSink, SinkError},
};

pub struct CsvSink {
  target: PathBuf,
  tmp:    PathBuf,
  writer: csv::Writer<File>,
  /// Write stored values instead of display values.
  raw:    bool,
  suffix: Vec<Option<String>>,
}

impl CsvSink {
  pub fn create(target: impl Into<PathBuf>, raw: bool) -> io::Result<Self> {
    let target = target.into();
    let mut tmp = target.clone().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let writer = csv::Writer::from_writer(File::create(&tmp)?);
    Ok(Self { target, tmp, writer, raw, suffix: Vec::new() })
  }

  fn cell(&self, index: usize, value: &Value) -> String {
    if self.raw {
      return raw_text(value);
    }
    match self.suffix.get(index).and_then(Option::as_deref) {
      Some(suffix) if !value.is_none() => format!("{value}{suffix}"),
      _ => value.to_string(),
    }
  }
}

/// Text of a value as the database stores it.
fn raw_text(value: &Value) -> String {
  match value {
    Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
    Value::Time(t) => t.format("%H:%M:%S").to_string(),
    other => other.to_string(),
  }
}

fn sink_error(e: csv::Error) -> SinkError {
  match e.into_kind() {
    csv::ErrorKind::Io(e) => SinkError::Io(e),
    other => SinkError::Row(format!("{other:?}")),
  }
}

impl RowSink for CsvSink {
  fn begin(&mut self, columns: &[ColumnMeta]) -> Result<(), SinkError> {
    self.suffix = columns.iter().map(|c| c.suffix.clone()).collect();
    self
      .writer
      .write_record(columns.iter().map(|c| c.name.as_str()))
      .map_err(sink_error)
  }

  fn write_row(&mut self, row: &SnapshotRow) -> Result<(), SinkError> {
    if row.cells.len() != self.suffix.len() {
      return Err(SinkError::Row(format!(
        "expected {} cells, got {}",
        self.suffix.len(),
        row.cells.len()
      )));
    }
    let record: Vec<String> = row
      .cells
      .iter()
      .enumerate()
      .map(|(i, v)| self.cell(i, v))
      .collect();
    self.writer.write_record(&record).map_err(sink_error)
  }

  fn commit(self) -> io::Result<()> {
    let file = self.writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    fs::rename(&self.tmp, &self.target)?;
    tracing::info!(path = %self.target.display(), "wrote export");
    Ok(())
  }

  fn abort(self) {
    drop(self.writer);
    if let Err(e) = fs::remove_file(&self.tmp) {
      tracing::warn!(path = %self.tmp.display(), error = %e, "could not remove partial export");
    }
  }
}
