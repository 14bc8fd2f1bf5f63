//! Runtime configuration: an optional TOML file overlaid with `ARBOR_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use arbor_core::{
  coords::{DEFAULT_ZONE_LETTER, DEFAULT_ZONE_NUMBER},
  risk::RiskWeights,
};
use arbor_gps::CaptureConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
  /// SQLite file holding records, photos, and plans. `~` is expanded.
  pub store_path:         PathBuf,
  /// Zone applied to records entered without one, and to GPS readings.
  pub zone_number:        u8,
  pub zone_letter:        char,
  pub gps_window_secs:    u64,
  pub gps_max_accuracy_m: f64,
  /// Replaces the built-in factor weights; must list all sixteen.
  pub risk_weights:       Option<RiskWeights>,
}

impl Default for ArborConfig {
  fn default() -> Self {
    Self {
      store_path:         PathBuf::from("~/.local/share/arbor/inventory.db"),
      zone_number:        DEFAULT_ZONE_NUMBER,
      zone_letter:        DEFAULT_ZONE_LETTER,
      gps_window_secs:    10,
      gps_max_accuracy_m: 150.0,
      risk_weights:       None,
    }
  }
}

impl ArborConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ARBOR"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ArborConfig")
  }

  pub fn weights(&self) -> RiskWeights { self.risk_weights.unwrap_or_default() }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn capture(&self) -> CaptureConfig {
    CaptureConfig {
      window: Duration::from_secs(self.gps_window_secs),
      max_accuracy_m: self.gps_max_accuracy_m,
      zone_number: self.zone_number,
      ..CaptureConfig::default()
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
