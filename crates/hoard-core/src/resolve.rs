//! Identity resolution: locating the canonical record a source record
//! describes.
//!
//! The numeric id is preferred because it survives renames; the `owner/name`
//! path is the fallback. Resolution never creates records.

use tracing::{debug, warn};

use crate::{
  record::{CanonicalRecord, RepoId, RepoPath},
  source::SourceRecord,
  store::RecordStore,
};

// ─── Resolution ──────────────────────────────────────────────────────────────

/// A disagreement between the source's keys and the matched record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSignal {
  /// Matched by id, but the source names a different path; usually a
  /// rename or transfer upstream.
  PathMismatch { claimed: RepoPath },
  /// Matched by path, but the source claims a different id; usually a
  /// repository deleted and re-created under the same name.
  IdMismatch { claimed: RepoId },
}

/// Several records could be the one the source describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConflict {
  pub candidates: Vec<CanonicalRecord>,
  /// The tie-break winner, or `None` when the conflict needs manual review.
  pub chosen:     Option<RepoId>,
}

impl IdentityConflict {
  pub fn chosen_record(&self) -> Option<&CanonicalRecord> {
    let id = self.chosen?;
    self.candidates.iter().find(|r| r.id == id)
  }

  fn describe(&self) -> String {
    self
      .candidates
      .iter()
      .map(|r| match r.time.repo_created {
        Some(t) => format!("{} created {}", r.summary(), t.to_rfc3339()),
        None => format!("{} created unknown", r.summary()),
      })
      .collect::<Vec<_>>()
      .join(", ")
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Matched {
    record: CanonicalRecord,
    signal: Option<MatchSignal>,
  },
  Conflict(IdentityConflict),
  /// No record matches any key. The caller decides whether to create one.
  Unresolved,
}

impl Resolution {
  /// The record a merge should target, if any.
  pub fn target(&self) -> Option<&CanonicalRecord> {
    match self {
      Self::Matched { record, .. } => Some(record),
      Self::Conflict(conflict) => conflict.chosen_record(),
      Self::Unresolved => None,
    }
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolve `source` against `store`.
///
/// 1. If the source carries an id and a record with that id exists, that
///    record matches, unless a *different* record currently holds the path
///    the source claims, which is an identity conflict.
/// 2. Otherwise the path is looked up. One hit matches; several hits are an
///    identity conflict.
/// 3. Otherwise the source is unresolved.
pub async fn resolve<S: RecordStore>(
  store: &S,
  source: &SourceRecord,
) -> Result<Resolution, S::Error> {
  let keys = &source.keys;

  if let Some(id) = keys.id
    && let Some(record) = store.get(id).await?
  {
    let Some(claimed) = keys.path.as_ref().filter(|p| !record.has_path(p)) else {
      return Ok(Resolution::Matched { record, signal: None });
    };

    let holders: Vec<CanonicalRecord> = store
      .find_by_path(claimed)
      .await?
      .into_iter()
      .filter(|r| r.id != id)
      .collect();

    if holders.is_empty() {
      debug!(record = %record.summary(), claimed = %claimed, "path mismatch");
      let signal = MatchSignal::PathMismatch { claimed: claimed.clone() };
      return Ok(Resolution::Matched { record, signal: Some(signal) });
    }

    let mut candidates = vec![record];
    candidates.extend(holders);
    return Ok(Resolution::Conflict(conflict(source, candidates)));
  }

  let Some(path) = &keys.path else {
    return Ok(Resolution::Unresolved);
  };

  let mut found = store.find_by_path(path).await?;
  match found.len() {
    0 => Ok(Resolution::Unresolved),
    1 => {
      let record = found.remove(0);
      let signal = keys
        .id
        .filter(|claimed| *claimed != record.id)
        .map(|claimed| MatchSignal::IdMismatch { claimed });
      if signal.is_some() {
        debug!(record = %record.summary(), source = %source.describe(), "id mismatch");
      }
      Ok(Resolution::Matched { record, signal })
    }
    _ => Ok(Resolution::Conflict(conflict(source, found))),
  }
}

fn conflict(source: &SourceRecord, candidates: Vec<CanonicalRecord>) -> IdentityConflict {
  let conflict = IdentityConflict { chosen: tie_break(&candidates), candidates };
  match conflict.chosen_record() {
    Some(winner) => warn!(
      "*** identity conflict: {} matches {}; keeping {} (oldest)",
      source.describe(),
      conflict.describe(),
      winner.summary(),
    ),
    None => warn!(
      "*** identity conflict needs review: {} matches {}",
      source.describe(),
      conflict.describe(),
    ),
  }
  conflict
}

/// The candidate with the strictly oldest `repo_created`. `None` when any
/// candidate's creation time is unknown or the oldest time is shared.
fn tie_break(candidates: &[CanonicalRecord]) -> Option<RepoId> {
  let mut dated = Vec::with_capacity(candidates.len());
  for record in candidates {
    dated.push((record.time.repo_created?, record.id));
  }
  dated.sort();
  match dated.as_slice() {
    [(first, id), (second, _), ..] if first < second => Some(*id),
    [(_, id)] => Some(*id),
    _ => None,
  }
}
