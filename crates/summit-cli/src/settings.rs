//! `summit.toml` plus `SUMMIT_*` environment overrides.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite file holding the base tables.
  #[serde(default = "default_database")]
  pub database:   PathBuf,
  /// Stored table layouts. Defaults to `<database>.layout.json`.
  #[serde(default)]
  pub layout:     Option<PathBuf>,
  /// `tracing` filter directives; `RUST_LOG` wins when set.
  #[serde(default)]
  pub log_filter: Option<String>,
  /// Rows written between cancellation checks during export.
  #[serde(default = "default_batch_size")]
  pub batch_size: usize,
}

fn default_database() -> PathBuf { PathBuf::from("summit.db") }

fn default_batch_size() -> usize { 500 }

impl Settings {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SUMMIT"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.database = expand_tilde(&settings.database);
    settings.layout = settings.layout.as_deref().map(expand_tilde);
    Ok(settings)
  }

  pub fn layout_path(&self) -> PathBuf {
    self.layout.clone().unwrap_or_else(|| {
      let mut path = self.database.clone().into_os_string();
      path.push(".layout.json");
      path.into()
    })
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn file_values_and_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "database = \"/srv/summit/records.db\"").unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.database, PathBuf::from("/srv/summit/records.db"));
    assert_eq!(settings.batch_size, 500);
    assert_eq!(
      settings.layout_path(),
      PathBuf::from("/srv/summit/records.db.layout.json")
    );
  }

  #[test]
  fn missing_file_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.log_filter, None);
  }
}
