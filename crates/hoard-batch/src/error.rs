//! Error types for the batch pipeline.

use thiserror::Error;

/// A failure that aborts the batch. Recoverable source errors never surface
/// here; the pipeline logs and skips them.
#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Source(#[from] hoard_sources::Error),

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
