//! Batch configuration: an optional TOML file overlaid with `HOARD_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `HOARD_PROBE__BASE_URL`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
  pub store_path:     PathBuf,
  /// Emit a progress line every this many source records; 0 disables.
  pub progress_every: u64,
  /// Create an all-unknown record for unresolved sources that carry both an
  /// id and a path.
  pub create_missing: bool,
  pub probe:          ProbeConfig,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("hoard.db"),
      progress_every: 10_000,
      create_missing: false,
      probe:          ProbeConfig::default(),
    }
  }
}

/// Settings for the HTTP visibility probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
  /// Repository pages live at `<base_url>/<owner>/<name>`.
  pub base_url:       String,
  pub timeout_secs:   u64,
  pub retry_delay_ms: u64,
}

impl Default for ProbeConfig {
  fn default() -> Self {
    Self {
      base_url:       "https://github.com".to_owned(),
      timeout_secs:   15,
      retry_delay_ms: 5_000,
    }
  }
}

impl BatchConfig {
  /// Load from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("HOARD")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}
