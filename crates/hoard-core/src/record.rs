//! Canonical repository records, the authoritative stored representation of
//! one repository's metadata.
//!
//! A record is created once (all fields unknown) and refined in place by
//! merges. Deletion is modelled as `is_deleted = true`; records are never
//! physically removed.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, field::Tri};

// ─── Identity ────────────────────────────────────────────────────────────────

/// The hosting service's stable numeric repository id. Immutable once
/// assigned; survives renames.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RepoId(pub u64);

impl fmt::Display for RepoId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for RepoId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.trim()
      .trim_start_matches('#')
      .parse()
      .map(Self)
      .map_err(|_| Error::InvalidRepoId(s.to_owned()))
  }
}

/// The `owner/name` composite key. May change over time (renames, transfers)
/// without the [`RepoId`] changing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath {
  pub owner: String,
  pub name:  String,
}

impl RepoPath {
  pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
    Self { owner: owner.into(), name: name.into() }
  }
}

impl fmt::Display for RepoPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.owner, self.name)
  }
}

impl FromStr for RepoPath {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim().trim_matches('/');
    match s.split_once('/') {
      Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
        Ok(Self::new(owner, name))
      }
      _ => Err(Error::InvalidPath(s.to_owned())),
    }
  }
}

impl TryFrom<String> for RepoPath {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<RepoPath> for String {
  fn from(p: RepoPath) -> Self { p.to_string() }
}

// ─── Forks ───────────────────────────────────────────────────────────────────

/// Details of a known fork. Either reference may be unknown even when the
/// repository is known to be a fork. Both are weak references by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkInfo {
  /// The immediate source of the fork.
  pub parent: Option<RepoPath>,
  /// The ultimate origin; equals `parent` for a single-level fork.
  pub root:   Option<RepoPath>,
}

impl ForkInfo {
  /// Fill whichever references are missing here from `other`. Returns
  /// `true` if anything changed.
  pub fn fill_from(&mut self, other: &ForkInfo) -> bool {
    let mut changed = false;
    if self.parent.is_none() && other.parent.is_some() {
      self.parent = other.parent.clone();
      changed = true;
    }
    if self.root.is_none() && other.root.is_some() {
      self.root = other.root.clone();
      changed = true;
    }
    changed
  }

  /// Whether [`Self::fill_from`] would change anything.
  pub fn would_fill_from(&self, other: &ForkInfo) -> bool {
    (self.parent.is_none() && other.parent.is_some())
      || (self.root.is_none() && other.root.is_some())
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// What the repository holds, as far as activity and size tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
  Empty,
  /// Has files: a release was published or the reported size is positive.
  Nonempty,
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// Upstream activity timestamps plus local bookkeeping. `None` = unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTimes {
  pub repo_created:   Option<DateTime<Utc>>,
  /// Last change to the repository object upstream (description, language).
  pub repo_updated:   Option<DateTime<Utc>>,
  /// Last push to any branch.
  pub repo_pushed:    Option<DateTime<Utc>>,
  /// When this record was last changed locally. Never decreases.
  pub data_refreshed: Option<DateTime<Utc>>,
}

// ─── CanonicalRecord ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
  pub id:             RepoId,
  pub owner:          String,
  pub name:           String,
  pub description:    Tri<String>,
  pub readme:         Tri<String>,
  pub homepage:       Tri<String>,
  pub default_branch: Tri<String>,
  /// Language names; order is irrelevant.
  pub languages:      Tri<Vec<String>>,
  /// `Absent` means known not to be a fork.
  pub fork:           Tri<ForkInfo>,
  pub is_deleted:     Tri<bool>,
  pub is_visible:     Tri<bool>,
  pub content_type:   Tri<ContentType>,
  pub time:           RecordTimes,
}

impl CanonicalRecord {
  /// A freshly catalogued record: identity only, every field unknown.
  pub fn new(id: RepoId, path: RepoPath) -> Self {
    Self {
      id,
      owner: path.owner,
      name: path.name,
      description: Tri::Unknown,
      readme: Tri::Unknown,
      homepage: Tri::Unknown,
      default_branch: Tri::Unknown,
      languages: Tri::Unknown,
      fork: Tri::Unknown,
      is_deleted: Tri::Unknown,
      is_visible: Tri::Unknown,
      content_type: Tri::Unknown,
      time: RecordTimes::default(),
    }
  }

  pub fn path(&self) -> RepoPath { RepoPath::new(&self.owner, &self.name) }

  pub fn has_path(&self, path: &RepoPath) -> bool {
    self.owner == path.owner && self.name == path.name
  }

  /// `owner/name (#id)`, the form used in diagnostics.
  pub fn summary(&self) -> String {
    format!("{}/{} (#{})", self.owner, self.name, self.id)
  }

  /// `is_deleted = true` implies `is_visible = false`.
  pub fn is_consistent(&self) -> bool {
    !matches!(
      (&self.is_deleted, &self.is_visible),
      (Tri::Present(true), Tri::Present(true) | Tri::Unknown | Tri::Absent)
    )
  }
}
