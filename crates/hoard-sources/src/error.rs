//! Error types for the source extractors.

use hoard_core::source::SourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A row or event that could not be understood. Recoverable: the caller
  /// skips it and moves on.
  #[error("line {line}: {message}")]
  Malformed { line: u64, message: String },

  #[error("line {line}: invalid JSON: {source}")]
  Json {
    line:   u64,
    #[source]
    source: serde_json::Error,
  },

  /// A GHTorrent project id with no row in `projects.csv`.
  #[error("GHTorrent project {0} not found in projects.csv")]
  UnknownProject(i64),

  #[error("{0} input requires a projects.csv index")]
  MissingProjectIndex(SourceKind),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  pub(crate) fn malformed(line: u64, message: impl Into<String>) -> Self {
    Self::Malformed { line, message: message.into() }
  }

  /// Whether the batch can skip the offending input and continue.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::Malformed { .. } | Self::Json { .. } | Self::UnknownProject(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
