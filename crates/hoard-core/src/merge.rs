//! Merge engine: canonical record + source record → minimal update set.
//!
//! The default policy only moves fields from unknown to known. The
//! exceptions, where the source is treated as authoritative, are encoded in
//! the guards of [`FieldUpdate`]:
//!
//! - a deletion claim always wins and forces the record invisible;
//! - push and update times are latest-wins;
//! - any positive fork claim upgrades "unknown" or "not a fork";
//! - a language list replaces ours only when it has more distinct entries;
//! - a visibility observation newer than our last refresh replaces ours.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{
  field::Tri,
  record::CanonicalRecord,
  source::SourceRecord,
  update::{FieldUpdate, FieldUpdateSet},
};

/// Every update the source could contribute, before checking them against a
/// canonical record.
pub fn candidate_updates(source: &SourceRecord) -> Vec<FieldUpdate> {
  let mut out = Vec::new();

  if source.is_deleted == Tri::Present(true) {
    out.push(FieldUpdate::Deleted);
  } else if source.is_deleted == Tri::Present(false) {
    out.push(FieldUpdate::NotDeleted);
  }

  if let Tri::Present(visible) = source.is_visible {
    // A source that claims both "deleted" and "visible" is contradicting
    // itself; the deletion wins.
    if !(visible && source.is_deleted == Tri::Present(true)) {
      out.push(FieldUpdate::Visibility { visible, observed_at: source.observed_at });
    }
  }

  if source.description.is_known() {
    out.push(FieldUpdate::Description(source.description.clone()));
  }
  if source.readme.is_known() {
    out.push(FieldUpdate::Readme(source.readme.clone()));
  }
  if source.homepage.is_known() {
    out.push(FieldUpdate::Homepage(source.homepage.clone()));
  }
  if source.default_branch.is_known() {
    out.push(FieldUpdate::DefaultBranch(source.default_branch.clone()));
  }

  if source.languages.is_known() {
    out.push(FieldUpdate::Languages(source.languages.clone().map(distinct)));
  }

  if source.fork.is_known() {
    out.push(FieldUpdate::Fork(source.fork.clone()));
  }

  if let Tri::Present(content) = source.content_type {
    out.push(FieldUpdate::ContentType(content));
  }

  if let Some(t) = source.repo_created {
    out.push(FieldUpdate::RepoCreated(t));
  }
  if let Some(t) = source.repo_updated {
    out.push(FieldUpdate::RepoUpdated(t));
  }
  if let Some(t) = source.repo_pushed {
    out.push(FieldUpdate::RepoPushed(t));
  }

  out
}

/// Compute the updates needed to fold `source` into `canonical`.
///
/// Pure: nothing is written. Only updates that actually change the record
/// are returned, evaluated in order against a scratch copy so that earlier
/// updates (a deletion, say) are visible to later guards. When the set is
/// non-empty it carries `refreshed_at = now`.
pub fn merge(
  canonical: &CanonicalRecord,
  source: &SourceRecord,
  now: DateTime<Utc>,
) -> FieldUpdateSet {
  let mut scratch = canonical.clone();
  let updates: Vec<FieldUpdate> = candidate_updates(source)
    .into_iter()
    .filter(|u| u.apply(&mut scratch))
    .collect();

  tracing::debug!(
    record = %canonical.summary(),
    source = %source.describe(),
    fields = ?updates.iter().map(FieldUpdate::field_name).collect::<Vec<_>>(),
    "merge computed"
  );

  let refreshed_at = (!updates.is_empty()).then_some(now);
  FieldUpdateSet { updates, refreshed_at }
}

/// Remove duplicate names, keeping first occurrences in order.
fn distinct(mut names: Vec<String>) -> Vec<String> {
  let mut seen = HashSet::new();
  names.retain(|n| seen.insert(n.clone()));
  names
}
