//! Error types for `hoard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid repository path {0:?}: expected \"owner/name\"")]
  InvalidPath(String),

  #[error("invalid repository id: {0:?}")]
  InvalidRepoId(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use crate::record::{RepoId, RepoPath};

  #[test]
  fn parse_errors_quote_the_rejected_input() {
    let path = "nope".parse::<RepoPath>().unwrap_err();
    assert_eq!(path.to_string(), r#"invalid repository path "nope": expected "owner/name""#);
    let id = "x1".parse::<RepoId>().unwrap_err();
    assert_eq!(id.to_string(), r#"invalid repository id: "x1""#);
  }
}
