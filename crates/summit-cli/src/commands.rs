//! Subcommand implementations.

use anyhow::{Context as _, bail};
use summit_core::delete::{Effect, WhatIfReport};
use summit_store_sqlite::SqliteStore;
use summit_tables::{
  composite::CompositeTable,
  descriptor::ColumnDescriptor,
  filter::{Filter, Predicate},
  layout::{LayoutFile, TableLayout},
  session::Session,
  stats::{Ranking, Statistic, StatsReport},
  worker::{self, CancelToken, Progress, WorkerHandle},
};

use crate::{Command, Stat, ViewArgs, export::CsvSink, render, settings::Settings};

/// An open database with its stored layouts applied.
struct Context {
  settings: Settings,
  session:  Session<SqliteStore>,
  layouts:  LayoutFile,
}

impl Context {
  async fn open(settings: Settings) -> anyhow::Result<Self> {
    let store = SqliteStore::open(&settings.database)
      .await
      .with_context(|| format!("failed to open {}", settings.database.display()))?;
    let mut session = Session::open(store).await?;

    let path = settings.layout_path();
    let layouts = LayoutFile::load(&path)
      .with_context(|| format!("failed to read layouts from {}", path.display()))?;
    for warning in session.apply_layouts(&layouts).await? {
      eprintln!("warning: {warning}");
    }
    Ok(Self { settings, session, layouts })
  }

  fn save_layout(&mut self, layout: TableLayout) -> anyhow::Result<()> {
    self.layouts.put(layout);
    let path = self.settings.layout_path();
    self
      .layouts
      .save(&path)
      .with_context(|| format!("failed to write layouts to {}", path.display()))
  }

  /// The table of `view.kind` with the view's filters and sort applied.
  async fn view(&mut self, view: &ViewArgs) -> anyhow::Result<&mut CompositeTable> {
    let table = self.session.table(view.kind).await?;
    for (arg, exact) in view
      .search
      .iter()
      .map(|a| (a, false))
      .chain(view.is.iter().map(|a| (a, true)))
    {
      let (column, text) = arg
        .split_once('=')
        .with_context(|| format!("expected COLUMN=VALUE, got {arg:?}"))?;
      let predicate = if exact {
        Predicate::Identity { value: text.to_owned() }
      } else {
        Predicate::Text { needle: text.to_owned() }
      };
      table.add_filter(Filter::new(column, predicate))?;
    }
    if let Some(name) = &view.sort {
      let index = column(table, name)?;
      table.sort(index, !view.desc)?;
    }
    Ok(table)
  }
}

fn column(table: &CompositeTable, name: &str) -> anyhow::Result<usize> {
  table
    .column_index(name)
    .with_context(|| format!("no column {name:?} on the {} table", table.root()))
}

/// A token that is cancelled when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancelToken {
  let cancel = CancelToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_signal.cancel();
    }
  });
  cancel
}

/// Drain progress messages, then wait for the result.
async fn finish<T>(mut handle: WorkerHandle<T>, what: &str) -> anyhow::Result<T> {
  while let Some(progress) = handle.progress.recv().await {
    if let Progress::Rows { done, total } = progress {
      tracing::debug!(done, total, "{what} progress");
    }
  }
  Ok(handle.join().await?)
}

pub async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
  let mut cx = Context::open(settings).await?;

  match command {
    Command::Init => {
      let version = cx.session.store().schema_version().await?;
      println!("{} (schema version {version})", cx.settings.database.display());
    }

    Command::Table { view, limit } => {
      let table = cx.view(&view).await?;
      print!("{}", render::render(&table.snapshot(), limit));
    }

    Command::Columns { kind } => {
      let table = cx.session.table(kind).await?;
      for meta in table.column_meta() {
        let fold = meta.fold.map(|f| f.to_string()).unwrap_or_default();
        let mut flags = Vec::new();
        if meta.builtin {
          flags.push("built-in");
        }
        if meta.hidden {
          flags.push("hidden");
        }
        println!(
          "{:<20} {:<6} {:<8} {}",
          meta.name,
          format!("{:?}", meta.value_type).to_lowercase(),
          fold,
          flags.join(", ")
        );
      }
    }

    Command::AddColumn { kind, name, target, column, fold, suffix } => {
      let mut descriptor = ColumnDescriptor::new(name, target, column);
      descriptor.fold = fold;
      descriptor.suffix = suffix;
      let table = cx.session.table(kind).await?;
      table.add_custom_column(descriptor)?;
      let layout = table.layout();
      cx.save_layout(layout)?;
    }

    Command::RemoveColumn { kind, name } => {
      let table = cx.session.table(kind).await?;
      let index = column(table, &name)?;
      table.remove_column(index)?;
      let layout = table.layout();
      cx.save_layout(layout)?;
    }

    Command::Hide { kind, name, show } => {
      let table = cx.session.table(kind).await?;
      let index = column(table, &name)?;
      table.set_hidden(index, !show)?;
      let layout = table.layout();
      cx.save_layout(layout)?;
    }

    Command::Stats { view, stat } => {
      let kind = view.kind;
      let table = cx.view(&view).await?;
      let statistic = match &stat {
        Stat::Yearly { date, value } => Statistic::PerYear {
          date_col:  column(table, date)?,
          value_col: value.as_deref().map(|v| column(table, v)).transpose()?,
        },
        Stat::Histogram { column: name, width } => {
          Statistic::Histogram { col: column(table, name)?, width: *width }
        }
        Stat::Paired { date, a, b } => Statistic::Paired {
          date_col: column(table, date)?,
          a:        column(table, a)?,
          b:        column(table, b)?,
        },
        Stat::Top { column: name, n, lowest } => Statistic::TopN {
          col:     column(table, name)?,
          n:       *n,
          ranking: if *lowest { Ranking::Lowest } else { Ranking::Highest },
        },
      };
      let snapshot = table.snapshot_with_hidden();
      let handle = worker::spawn_stats(
        snapshot,
        statistic,
        cx.settings.batch_size,
        cancel_on_ctrl_c(),
      );

      match finish(handle, "statistics").await? {
        StatsReport::PerYear(series) => {
          for (year, bucket) in &series.years {
            match bucket.sum {
              Some(sum) => println!("{year}  {:>5}  {sum:>10.0}", bucket.rows),
              None => println!("{year}  {:>5}", bucket.rows),
            }
          }
          if series.unknown > 0 {
            println!("unknown  {}", series.unknown);
          }
        }
        StatsReport::Histogram(hist) => {
          for (low, count) in &hist.buckets {
            println!("{low:>7} - {:<7} {count}", low + hist.width);
          }
          if hist.missing > 0 {
            println!("missing  {}", hist.missing);
          }
        }
        StatsReport::Paired { points } => {
          let show = |v: Option<f64>| v.map(|x| format!("{x:.0}")).unwrap_or_default();
          for point in points {
            println!("{}  {:>8}  {:>8}", point.date, show(point.a), show(point.b));
          }
        }
        StatsReport::TopN { ranked } => {
          let data = cx.session.data().await?;
          for (rank, entry) in ranked.iter().enumerate() {
            let label = entry
              .id
              .and_then(|id| data.identity(kind, id))
              .unwrap_or_default();
            println!("{:>3}. {:<40} {}", rank + 1, label, entry.value);
          }
        }
      }
    }

    Command::Export { view, out, raw } => {
      let snapshot = if raw {
        cx.session.raw_snapshot(view.kind).await?
      } else {
        cx.view(&view).await?.snapshot()
      };
      let sink = CsvSink::create(&out, raw)
        .with_context(|| format!("failed to create {}", out.display()))?;

      let handle = worker::spawn_export_with(
        snapshot,
        sink,
        cx.settings.batch_size,
        cancel_on_ctrl_c(),
      );
      let summary = finish(handle, "export").await?;
      for error in &summary.row_errors {
        eprintln!("row {}: {}", error.index, error.message);
      }
      println!("{} rows written to {}", summary.rows_written, out.display());
    }

    Command::Delete { kind, ids, yes } => {
      if kind.is_link() {
        bail!("{kind} rows are changed through their ascent, not deleted");
      }
      let report = cx.session.preview_delete(kind, ids.clone()).await?;
      print_report(&report);
      if !report.is_empty() && !yes {
        bail!("other rows are affected; re-run with --yes to delete");
      }
      cx.session.delete(kind, ids, true).await?;
      println!("deleted {} {kind} row(s)", report.ids.len());
    }
  }

  cx.session.close();
  Ok(())
}

fn print_report(report: &WhatIfReport) {
  if report.is_empty() {
    return;
  }
  println!("deleting {} {} row(s) will also:", report.ids.len(), report.kind);
  for ((kind, effect), count) in report.summary() {
    let verb = match effect {
      Effect::Cascade => "delete",
      Effect::Unlink => "unlink",
    };
    println!("  {verb} {count} {kind} row(s)");
  }
}
