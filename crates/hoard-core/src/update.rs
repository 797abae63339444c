//! Field-level updates and the guards that make them conditional.
//!
//! Every [`FieldUpdate`] carries its own guard (set-if-unknown,
//! set-if-newer, and so on). Guards are evaluated against the record state at
//! the moment of application, not at the moment the update was computed, so
//! an update set built from a stale read is still safe to apply, applying it
//! twice changes nothing, and sets from concurrent runs commute.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  field::Tri,
  record::{CanonicalRecord, ContentType, ForkInfo},
};

// ─── FieldUpdate ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
  Description(Tri<String>),
  Readme(Tri<String>),
  Homepage(Tri<String>),
  DefaultBranch(Tri<String>),
  /// Replaces unknown, absent, or strictly smaller language lists.
  Languages(Tri<Vec<String>>),
  /// Upgrades unknown or not-a-fork to a fork, or fills missing fork
  /// references. A not-a-fork claim only fills unknown.
  Fork(Tri<ForkInfo>),
  /// `is_deleted = true` and `is_visible = false`, unconditionally.
  Deleted,
  /// `is_deleted = false`, only when unknown.
  NotDeleted,
  /// Fills an unknown visibility; replaces a known one only when observed
  /// after the record was last refreshed. Never marks a deleted record
  /// visible.
  Visibility {
    visible:     bool,
    observed_at: Option<DateTime<Utc>>,
  },
  /// Only when unknown.
  ContentType(ContentType),
  /// Only when unknown.
  RepoCreated(DateTime<Utc>),
  /// Latest wins.
  RepoUpdated(DateTime<Utc>),
  /// Latest wins.
  RepoPushed(DateTime<Utc>),
}

fn distinct_count(items: &[String]) -> usize {
  items.iter().collect::<HashSet<_>>().len()
}

fn is_later(current: Option<DateTime<Utc>>, incoming: DateTime<Utc>) -> bool {
  current.is_none_or(|c| c < incoming)
}

impl FieldUpdate {
  /// The stored field this update writes; used in diagnostics.
  pub fn field_name(&self) -> &'static str {
    match self {
      Self::Description(_) => "description",
      Self::Readme(_) => "readme",
      Self::Homepage(_) => "homepage",
      Self::DefaultBranch(_) => "default_branch",
      Self::Languages(_) => "languages",
      Self::Fork(_) => "fork",
      Self::Deleted | Self::NotDeleted => "is_deleted",
      Self::Visibility { .. } => "is_visible",
      Self::ContentType(_) => "content_type",
      Self::RepoCreated(_) => "time.repo_created",
      Self::RepoUpdated(_) => "time.repo_updated",
      Self::RepoPushed(_) => "time.repo_pushed",
    }
  }

  /// Whether this update's guard passes against `record`, i.e. whether
  /// applying it would change anything.
  pub fn applies_to(&self, record: &CanonicalRecord) -> bool {
    match self {
      Self::Description(v) => record.description.accepts(v),
      Self::Readme(v) => record.readme.accepts(v),
      Self::Homepage(v) => record.homepage.accepts(v),
      Self::DefaultBranch(v) => record.default_branch.accepts(v),

      Self::Languages(incoming) => match incoming {
        Tri::Unknown => false,
        Tri::Absent => record.languages.is_unknown(),
        Tri::Present(theirs) if theirs.is_empty() => record.languages.is_unknown(),
        Tri::Present(theirs) => match &record.languages {
          Tri::Unknown | Tri::Absent => true,
          Tri::Present(ours) => distinct_count(ours) < distinct_count(theirs),
        },
      },

      Self::Fork(incoming) => match incoming {
        Tri::Unknown => false,
        Tri::Absent => record.fork.is_unknown(),
        Tri::Present(theirs) => match &record.fork {
          Tri::Unknown | Tri::Absent => true,
          Tri::Present(ours) => ours.would_fill_from(theirs),
        },
      },

      Self::Deleted => {
        record.is_deleted != Tri::Present(true) || record.is_visible != Tri::Present(false)
      }
      Self::NotDeleted => record.is_deleted.is_unknown(),

      Self::Visibility { visible, observed_at } => {
        if *visible && record.is_deleted == Tri::Present(true) {
          return false;
        }
        match &record.is_visible {
          Tri::Unknown => true,
          Tri::Present(current) if current == visible => false,
          _ => match (observed_at, record.time.data_refreshed) {
            (Some(seen), Some(refreshed)) => *seen > refreshed,
            (Some(_), None) => true,
            (None, _) => false,
          },
        }
      }

      Self::ContentType(_) => record.content_type.is_unknown(),
      Self::RepoCreated(_) => record.time.repo_created.is_none(),
      Self::RepoUpdated(t) => is_later(record.time.repo_updated, *t),
      Self::RepoPushed(t) => is_later(record.time.repo_pushed, *t),
    }
  }

  /// Apply to `record` if the guard passes. Returns `true` if the record
  /// changed.
  pub fn apply(&self, record: &mut CanonicalRecord) -> bool {
    if !self.applies_to(record) {
      return false;
    }
    match self {
      Self::Description(v) => record.description = v.clone(),
      Self::Readme(v) => record.readme = v.clone(),
      Self::Homepage(v) => record.homepage = v.clone(),
      Self::DefaultBranch(v) => record.default_branch = v.clone(),
      Self::Languages(v) => record.languages = v.clone(),
      Self::Fork(incoming) => match (&mut record.fork, incoming) {
        (Tri::Present(ours), Tri::Present(theirs)) => {
          ours.fill_from(theirs);
        }
        (fork, incoming) => *fork = incoming.clone(),
      },
      Self::Deleted => {
        record.is_deleted = Tri::Present(true);
        record.is_visible = Tri::Present(false);
      }
      Self::NotDeleted => record.is_deleted = Tri::Present(false),
      Self::Visibility { visible, .. } => record.is_visible = Tri::Present(*visible),
      Self::ContentType(v) => record.content_type = Tri::Present(*v),
      Self::RepoCreated(t) => record.time.repo_created = Some(*t),
      Self::RepoUpdated(t) => record.time.repo_updated = Some(*t),
      Self::RepoPushed(t) => record.time.repo_pushed = Some(*t),
    }
    true
  }
}

// ─── FieldUpdateSet ──────────────────────────────────────────────────────────

/// All updates destined for one record, applied as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdateSet {
  pub updates:      Vec<FieldUpdate>,
  /// The `data_refreshed` value to record if anything changes.
  pub refreshed_at: Option<DateTime<Utc>>,
}

impl FieldUpdateSet {
  pub fn is_empty(&self) -> bool { self.updates.is_empty() }

  pub fn len(&self) -> usize { self.updates.len() }

  pub fn field_names(&self) -> Vec<&'static str> {
    self.updates.iter().map(FieldUpdate::field_name).collect()
  }

  /// Apply every update whose guard passes, in order, then advance
  /// `data_refreshed` if anything changed. Returns the names of the fields
  /// that changed.
  pub fn apply_fields(&self, record: &mut CanonicalRecord) -> Vec<&'static str> {
    let changed: Vec<_> = self
      .updates
      .iter()
      .filter(|u| u.apply(record))
      .map(FieldUpdate::field_name)
      .collect();
    if !changed.is_empty() && let Some(at) = self.refreshed_at {
      record.time.data_refreshed = record.time.data_refreshed.max(Some(at));
    }
    changed
  }

  /// [`Self::apply_fields`], reporting only whether the record changed.
  pub fn apply_to(&self, record: &mut CanonicalRecord) -> bool {
    !self.apply_fields(record).is_empty()
  }
}
