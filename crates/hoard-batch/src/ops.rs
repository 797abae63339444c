//! Maintenance operations that run outside the merge pipeline.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hoard_core::{
  record::RepoId,
  resolve::{Resolution, resolve},
  source::SourceRecord,
  store::RecordStore,
  update::{FieldUpdate, FieldUpdateSet},
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{Error, Result, probe::VisibilityProbe};

/// Source records are checked against the store this many at a time.
const CHECK_CHUNK: usize = 1_000;

// ─── Missing ─────────────────────────────────────────────────────────────────

/// Source records with no counterpart in the catalogue, as
/// [`SourceRecord::describe`] labels, in input order.
///
/// Records carrying an id are checked in bulk by id only; the rest are
/// resolved by path.
pub async fn find_missing<S, I>(store: &S, records: I) -> Result<Vec<String>>
where
  S: RecordStore,
  I: IntoIterator<Item = hoard_sources::Result<SourceRecord>>,
{
  let mut missing = Vec::new();
  let mut pending = Chunk::default();

  for item in records {
    let source = match item {
      Ok(source) => source,
      Err(e) if e.is_recoverable() => {
        warn!("*** skipped input: {e}");
        continue;
      }
      Err(e) => return Err(e.into()),
    };

    pending.push(source);
    if pending.records.len() == CHECK_CHUNK {
      pending.flush(store, &mut missing).await?;
    }
  }
  pending.flush(store, &mut missing).await?;

  info!(missing = missing.len(), "missing scan finished");
  Ok(missing)
}

/// Records awaiting a bulk id check, kept in input order.
#[derive(Default)]
struct Chunk {
  records: Vec<SourceRecord>,
  ids:     Vec<RepoId>,
}

impl Chunk {
  fn push(&mut self, source: SourceRecord) {
    self.ids.extend(source.keys.id);
    self.records.push(source);
  }

  async fn flush<S: RecordStore>(&mut self, store: &S, missing: &mut Vec<String>) -> Result<()> {
    let existing = if self.ids.is_empty() {
      HashSet::new()
    } else {
      store.existing_ids(&self.ids).await.map_err(Error::store)?
    };
    self.ids.clear();

    for source in self.records.drain(..) {
      let found = match source.keys.id {
        Some(id) => existing.contains(&id),
        None => !matches!(
          resolve(store, &source).await.map_err(Error::store)?,
          Resolution::Unresolved
        ),
      };
      if !found {
        missing.push(source.describe());
      }
    }
    Ok(())
  }
}

// ─── Repair ──────────────────────────────────────────────────────────────────

/// Restore `is_deleted = true ⇒ is_visible = false` across the store.
pub async fn repair<S: RecordStore>(store: &S, now: DateTime<Utc>) -> Result<u64> {
  let fixed = store.repair_visibility(now).await.map_err(Error::store)?;
  if fixed > 0 {
    warn!("*** repaired visibility of {fixed} deleted records");
  } else {
    info!("no inconsistent records");
  }
  Ok(fixed)
}

// ─── Visibility verification ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilitySummary {
  pub checked: u64,
  pub visible: u64,
  pub hidden:  u64,
  /// The probe could not tell; the record stays unknown.
  pub unknown: u64,
  /// Records actually changed in the store.
  pub updated: u64,
}

/// Probe up to `limit` records of unknown visibility and record the answers
/// as observations made at `now`.
pub async fn verify_visibility<S, P>(
  store: &S,
  probe: &P,
  limit: usize,
  now: DateTime<Utc>,
) -> Result<VisibilitySummary>
where
  S: RecordStore,
  P: VisibilityProbe,
{
  let records = store.unknown_visibility(limit).await.map_err(Error::store)?;
  info!(candidates = records.len(), "verifying visibility");

  let mut summary = VisibilitySummary::default();
  for record in records {
    summary.checked += 1;
    let Some(visible) = probe.is_visible(&record.path()).await else {
      summary.unknown += 1;
      continue;
    };
    if visible {
      summary.visible += 1;
    } else {
      summary.hidden += 1;
    }

    let updates = FieldUpdateSet {
      updates:      vec![FieldUpdate::Visibility { visible, observed_at: Some(now) }],
      refreshed_at: Some(now),
    };
    if !store.apply(record.id, &updates).await.map_err(Error::store)?.is_empty() {
      summary.updated += 1;
    }
  }

  info!(
    checked = summary.checked,
    visible = summary.visible,
    hidden = summary.hidden,
    unknown = summary.unknown,
    "visibility verification finished"
  );
  Ok(summary)
}
