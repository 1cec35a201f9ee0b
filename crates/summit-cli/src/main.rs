//! `summit`: composite tables over a climbing records database.
//!
//! # Usage
//!
//! ```
//! summit init
//! summit table ascent --search Peak=piz --sort Date --desc
//! summit add-column peak --name "Sum gain" --target ascent --column elevation_gain --fold sum
//! summit stats ascent yearly --date Date --value "Elevation gain"
//! summit export trip --out trips.csv
//! summit delete region 4 --yes
//! ```
//!
//! Settings come from `summit.toml` (or `--config`) and `SUMMIT_*`
//! environment variables.

mod commands;
mod export;
mod render;
mod settings;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use settings::Settings;
use summit_core::entity::EntityKind;
use summit_tables::fold::Fold;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Composite tables over a climbing records database")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "summit.toml")]
  config: PathBuf,

  /// Database file; overrides the config file.
  #[arg(long)]
  database: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

/// Which table to show and how.
#[derive(Args, Debug)]
struct ViewArgs {
  /// Root table, e.g. `ascent` or `peak`.
  kind: EntityKind,

  /// Keep rows whose column contains the text (case-insensitive).
  #[arg(long, value_name = "COLUMN=TEXT")]
  search: Vec<String>,

  /// Keep rows whose column shows exactly this value.
  #[arg(long = "is", value_name = "COLUMN=VALUE")]
  is: Vec<String>,

  /// Sort by this column.
  #[arg(long, value_name = "COLUMN")]
  sort: Option<String>,

  /// Sort descending.
  #[arg(long, requires = "sort")]
  desc: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create the database if needed and print its schema version.
  Init,

  /// Print a composite table.
  Table {
    #[command(flatten)]
    view:  ViewArgs,
    /// Print at most this many rows.
    #[arg(long)]
    limit: Option<usize>,
  },

  /// List the columns of a table.
  Columns { kind: EntityKind },

  /// Add a custom column to a table's stored layout.
  AddColumn {
    kind:   EntityKind,
    #[arg(long)]
    name:   String,
    /// Table to read from.
    #[arg(long)]
    target: EntityKind,
    #[arg(long)]
    column: String,
    /// Required when the target is reached through many rows.
    #[arg(long)]
    fold:   Option<Fold>,
    #[arg(long)]
    suffix: Option<String>,
  },

  /// Remove a custom column from a table's stored layout.
  RemoveColumn { kind: EntityKind, name: String },

  /// Hide (or show again) a column.
  Hide {
    kind: EntityKind,
    name: String,
    #[arg(long)]
    show: bool,
  },

  /// Statistics over the filtered rows of a table.
  Stats {
    #[command(flatten)]
    view: ViewArgs,
    #[command(subcommand)]
    stat: Stat,
  },

  /// Write a table to CSV.
  Export {
    #[command(flatten)]
    view: ViewArgs,
    #[arg(short, long)]
    out:  PathBuf,
    /// Export the base table as stored instead of the composite view.
    #[arg(long)]
    raw:  bool,
  },

  /// Delete rows, showing what else is affected first.
  Delete {
    kind: EntityKind,
    #[arg(required = true)]
    ids:  Vec<i64>,
    /// Go ahead even if other rows are affected.
    #[arg(long)]
    yes:  bool,
  },
}

#[derive(Subcommand, Debug)]
enum Stat {
  /// Rows and sums per year.
  Yearly {
    #[arg(long)]
    date:  String,
    #[arg(long)]
    value: Option<String>,
  },
  /// Frequency distribution of a numeric column.
  Histogram {
    #[arg(long)]
    column: String,
    #[arg(long)]
    width:  i64,
  },
  /// Two numeric columns over time.
  Paired {
    #[arg(long)]
    date: String,
    #[arg(long)]
    a:    String,
    #[arg(long)]
    b:    String,
  },
  /// The rows with the highest (or lowest) values.
  Top {
    #[arg(long)]
    column: String,
    #[arg(short, default_value_t = 10)]
    n:      usize,
    #[arg(long)]
    lowest: bool,
  },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  if let Some(database) = cli.database {
    settings.database = database;
  }

  // `RUST_LOG` wins over the config file.
  let filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
  let filter = match (&settings.log_filter, std::env::var_os(EnvFilter::DEFAULT_ENV)) {
    (Some(directives), None) => filter.parse_lossy(directives),
    _ => filter.from_env_lossy(),
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  commands::run(cli.command, settings).await
}
