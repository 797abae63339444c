//! The batch pipeline: extract → resolve → merge → apply, one source record
//! at a time.

use std::time::Instant;

use chrono::Utc;
use hoard_core::{
  merge::merge,
  record::{CanonicalRecord, RepoId},
  resolve::{MatchSignal, Resolution, resolve},
  source::SourceRecord,
  store::RecordStore,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result, config::BatchConfig};

// ─── Options & results ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
  /// Progress line interval in source records; 0 disables.
  pub progress_every: u64,
  pub create_missing: bool,
}

impl Default for BatchOptions {
  fn default() -> Self { Self::from(&BatchConfig::default()) }
}

impl From<&BatchConfig> for BatchOptions {
  fn from(config: &BatchConfig) -> Self {
    Self {
      progress_every: config.progress_every,
      create_missing: config.create_missing,
    }
  }
}

/// What happened to one source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// `fields` are the fields the store actually changed.
  Updated { id: RepoId, fields: Vec<&'static str> },
  /// Matched, but the record already knew everything the source said.
  Unchanged { id: RepoId },
  /// Created under `create_missing`, then merged.
  Created { id: RepoId },
  Unresolved,
  /// Several candidates and no tie-break winner.
  Conflict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
  pub run_id:       Uuid,
  pub processed:    u64,
  pub updated:      u64,
  pub unchanged:    u64,
  pub created:      u64,
  pub unresolved:   u64,
  pub conflicts:    u64,
  pub parse_errors: u64,
}

// ─── Batch ───────────────────────────────────────────────────────────────────

/// One batch run against a store. Feed it any number of record streams,
/// then call [`Batch::finish`].
pub struct Batch<'s, S> {
  store:   &'s S,
  options: BatchOptions,
  started: Instant,
  summary: BatchSummary,
}

impl<'s, S: RecordStore> Batch<'s, S> {
  pub fn new(store: &'s S, options: BatchOptions) -> Self {
    let run_id = Uuid::new_v4();
    info!(%run_id, "batch started");
    Self {
      store,
      options,
      started: Instant::now(),
      summary: BatchSummary { run_id, ..BatchSummary::default() },
    }
  }

  /// Process every record in `records`. Recoverable extraction errors are
  /// logged and skipped; anything else, and any store error, aborts.
  pub async fn process_all<I>(&mut self, records: I) -> Result<()>
  where
    I: IntoIterator<Item = hoard_sources::Result<SourceRecord>>,
  {
    for item in records {
      match item {
        Ok(source) => {
          self.process(&source).await?;
        }
        Err(e) if e.is_recoverable() => {
          warn!("*** skipped input: {e}");
          self.summary.parse_errors += 1;
          self.tick();
        }
        Err(e) => return Err(e.into()),
      }
    }
    Ok(())
  }

  /// Resolve, merge, and apply one source record.
  pub async fn process(&mut self, source: &SourceRecord) -> Result<Outcome> {
    let outcome = self.reconcile(source).await?;
    match &outcome {
      Outcome::Updated { .. } => self.summary.updated += 1,
      Outcome::Unchanged { .. } => self.summary.unchanged += 1,
      Outcome::Created { .. } => self.summary.created += 1,
      Outcome::Unresolved => self.summary.unresolved += 1,
      Outcome::Conflict => self.summary.conflicts += 1,
    }
    self.tick();
    Ok(outcome)
  }

  async fn reconcile(&self, source: &SourceRecord) -> Result<Outcome> {
    let resolution = resolve(self.store, source).await.map_err(Error::store)?;

    if let Resolution::Matched { record, signal: Some(signal) } = &resolution {
      match signal {
        MatchSignal::PathMismatch { claimed } => {
          info!("{} is now {claimed} according to {}", record.summary(), source.kind)
        }
        MatchSignal::IdMismatch { claimed } => warn!(
          "*** id mismatch: {} claims #{claimed} but {} holds the path",
          source.describe(),
          record.summary(),
        ),
      }
    }

    if let Some(target) = resolution.target() {
      return self.merge_into(target, source).await;
    }

    if let Resolution::Conflict(_) = resolution {
      return Ok(Outcome::Conflict);
    }

    match (self.options.create_missing, source.keys.id, &source.keys.path) {
      (true, Some(id), Some(path)) => {
        let record = CanonicalRecord::new(id, path.clone());
        if self.store.create(record.clone()).await.map_err(Error::store)? {
          info!("created {} from {}", record.summary(), source.kind);
          self.merge_into(&record, source).await?;
          return Ok(Outcome::Created { id });
        }

        // Created by a concurrent run since we resolved.
        debug!(%id, "record appeared during create");
        match self.store.get(id).await.map_err(Error::store)? {
          Some(existing) => self.merge_into(&existing, source).await,
          None => Ok(Outcome::Unresolved),
        }
      }
      _ => {
        warn!("*** unresolved: {} is not in the catalogue", source.describe());
        Ok(Outcome::Unresolved)
      }
    }
  }

  /// Merge `source` into `target` and apply the result.
  async fn merge_into(&self, target: &CanonicalRecord, source: &SourceRecord) -> Result<Outcome> {
    let id = target.id;
    let updates = merge(target, source, Utc::now());
    if updates.is_empty() {
      return Ok(Outcome::Unchanged { id });
    }
    let fields = self.store.apply(id, &updates).await.map_err(Error::store)?;
    Ok(if fields.is_empty() {
      Outcome::Unchanged { id }
    } else {
      Outcome::Updated { id, fields }
    })
  }

  fn tick(&mut self) {
    self.summary.processed += 1;
    let every = self.options.progress_every;
    if every > 0 && self.summary.processed % every == 0 {
      info!(
        "{} [{:.2}]",
        self.summary.processed,
        self.started.elapsed().as_secs_f64()
      );
    }
  }

  pub fn finish(self) -> BatchSummary {
    let s = &self.summary;
    info!(
      run_id = %s.run_id,
      processed = s.processed,
      updated = s.updated,
      unchanged = s.unchanged,
      created = s.created,
      unresolved = s.unresolved,
      conflicts = s.conflicts,
      parse_errors = s.parse_errors,
      elapsed_secs = self.started.elapsed().as_secs_f64(),
      "batch finished"
    );
    self.summary
  }
}

/// Run a single record stream through a fresh [`Batch`].
pub async fn run_batch<S, I>(store: &S, records: I, options: BatchOptions) -> Result<BatchSummary>
where
  S: RecordStore,
  I: IntoIterator<Item = hoard_sources::Result<SourceRecord>>,
{
  let mut batch = Batch::new(store, options);
  batch.process_all(records).await?;
  Ok(batch.finish())
}

#[cfg(test)]
mod tests {
  use std::{collections::HashSet, convert::Infallible, sync::Mutex};

  use chrono::{DateTime, TimeZone};
  use hoard_core::{
    field::Tri,
    memory::MemoryStore,
    record::RepoPath,
    source::{MatchKeys, SourceKind},
    update::{FieldUpdate, FieldUpdateSet},
  };

  use super::*;

  /// A store shared with another writer that gets in first: `late` is
  /// inserted just before the next create, `interleaved` applied just
  /// before the next apply.
  #[derive(Default)]
  struct SharedStore {
    inner:       MemoryStore,
    late:        Mutex<Option<CanonicalRecord>>,
    interleaved: Mutex<Option<FieldUpdateSet>>,
  }

  impl RecordStore for SharedStore {
    type Error = Infallible;

    async fn get(&self, id: RepoId) -> Result<Option<CanonicalRecord>, Infallible> {
      self.inner.get(id).await
    }

    async fn find_by_path<'a>(
      &'a self,
      path: &'a RepoPath,
    ) -> Result<Vec<CanonicalRecord>, Infallible> {
      self.inner.find_by_path(path).await
    }

    async fn existing_ids<'a>(
      &'a self,
      ids: &'a [RepoId],
    ) -> Result<HashSet<RepoId>, Infallible> {
      self.inner.existing_ids(ids).await
    }

    async fn unknown_visibility(
      &self,
      limit: usize,
    ) -> Result<Vec<CanonicalRecord>, Infallible> {
      self.inner.unknown_visibility(limit).await
    }

    async fn create(&self, record: CanonicalRecord) -> Result<bool, Infallible> {
      let late = self.late.lock().unwrap().take();
      if let Some(late) = late {
        self.inner.create(late).await?;
      }
      self.inner.create(record).await
    }

    async fn apply<'a>(
      &'a self,
      id: RepoId,
      updates: &'a FieldUpdateSet,
    ) -> Result<Vec<&'static str>, Infallible> {
      let first = self.interleaved.lock().unwrap().take();
      if let Some(first) = first {
        self.inner.apply(id, &first).await?;
      }
      self.inner.apply(id, updates).await
    }

    async fn repair_visibility(&self, now: DateTime<Utc>) -> Result<u64, Infallible> {
      self.inner.repair_visibility(now).await
    }
  }

  fn at(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).single().unwrap()
  }

  fn dump(id: u64, path: &str) -> SourceRecord {
    let mut s = SourceRecord::new(SourceKind::GhtorrentDump, MatchKeys {
      id:   Some(RepoId(id)),
      path: Some(path.parse().unwrap()),
    });
    s.description = Tri::Present("a tool".into());
    s.fork = Tri::Absent;
    s
  }

  fn record(id: u64, path: &str) -> CanonicalRecord {
    CanonicalRecord::new(RepoId(id), path.parse().unwrap())
  }

  fn options() -> BatchOptions {
    BatchOptions { progress_every: 1, create_missing: false }
  }

  #[tokio::test]
  async fn matched_record_is_updated_once() {
    let store = MemoryStore::with_records([record(1, "o/a")]);
    let mut batch = Batch::new(&store, options());

    let first = batch.process(&dump(1, "o/a")).await.unwrap();
    assert_eq!(first, Outcome::Updated { id: RepoId(1), fields: vec!["description", "fork"] });
    let second = batch.process(&dump(1, "o/a")).await.unwrap();
    assert_eq!(second, Outcome::Unchanged { id: RepoId(1) });

    let s = batch.finish();
    assert_eq!((s.processed, s.updated, s.unchanged), (2, 1, 1));
    let stored = store.get(RepoId(1)).await.unwrap().unwrap();
    assert_eq!(stored.description, Tri::Present("a tool".into()));
    assert!(stored.time.data_refreshed.is_some());
  }

  #[tokio::test]
  async fn unresolved_records_are_skipped_unless_opted_in() {
    let store = MemoryStore::new();
    let summary = run_batch(&store, [Ok(dump(7, "o/new"))], options()).await.unwrap();
    assert_eq!(summary.unresolved, 1);
    assert!(store.is_empty());

    let create = BatchOptions { create_missing: true, ..options() };
    let summary = run_batch(&store, [Ok(dump(7, "o/new"))], create).await.unwrap();
    assert_eq!(summary.created, 1);
    let stored = store.get(RepoId(7)).await.unwrap().unwrap();
    assert_eq!(stored.path(), RepoPath::new("o", "new"));
    assert_eq!(stored.description, Tri::Present("a tool".into()));
  }

  #[tokio::test]
  async fn create_missing_needs_an_id() {
    let store = MemoryStore::new();
    let mut source = dump(7, "o/new");
    source.keys.id = None;
    let create = BatchOptions { create_missing: true, ..options() };
    let summary = run_batch(&store, [Ok(source)], create).await.unwrap();
    assert_eq!(summary.unresolved, 1);
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn conflicts_resolve_to_the_oldest_record() {
    let mut older = record(1, "o/dup");
    older.time.repo_created = Some(at(2010));
    let mut newer = record(2, "o/dup");
    newer.time.repo_created = Some(at(2014));
    let store = MemoryStore::with_records([older, newer]);

    let mut source = dump(3, "o/dup");
    source.keys.id = None;
    let mut batch = Batch::new(&store, options());
    let outcome = batch.process(&source).await.unwrap();
    assert!(matches!(outcome, Outcome::Updated { id: RepoId(1), .. }));

    let untouched = store.get(RepoId(2)).await.unwrap().unwrap();
    assert!(untouched.description.is_unknown());
  }

  #[tokio::test]
  async fn undecidable_conflicts_touch_nothing() {
    let store = MemoryStore::with_records([record(1, "o/dup"), record(2, "o/dup")]);
    let mut source = dump(3, "o/dup");
    source.keys.id = None;
    let summary = run_batch(&store, [Ok(source)], options()).await.unwrap();
    assert_eq!(summary.conflicts, 1);
    for id in [1, 2] {
      let r = store.get(RepoId(id)).await.unwrap().unwrap();
      assert!(r.description.is_unknown());
    }
  }

  #[tokio::test]
  async fn recoverable_errors_are_counted_and_fatal_ones_abort() {
    let store = MemoryStore::with_records([record(1, "o/a")]);
    let records = vec![
      Err(hoard_sources::Error::UnknownProject(42)),
      Ok(dump(1, "o/a")),
    ];
    let summary = run_batch(&store, records, options()).await.unwrap();
    assert_eq!((summary.processed, summary.parse_errors, summary.updated), (2, 1, 1));

    let io = std::io::Error::other("disk on fire");
    let records = vec![Err(hoard_sources::Error::Io(io)), Ok(dump(1, "o/a"))];
    let err = run_batch(&store, records, options()).await.unwrap_err();
    assert!(matches!(err, Error::Source(hoard_sources::Error::Io(_))));
  }

  #[tokio::test]
  async fn renamed_repository_is_still_updated_by_id() {
    let store = MemoryStore::with_records([record(1, "old/name")]);
    let mut batch = Batch::new(&store, options());
    let outcome = batch.process(&dump(1, "new/name")).await.unwrap();
    assert!(matches!(outcome, Outcome::Updated { id: RepoId(1), .. }));
  }

  #[tokio::test]
  async fn record_created_elsewhere_is_merged_not_counted_as_created() {
    let mut theirs = record(7, "o/new");
    theirs.description = Tri::Present("their tool".into());
    let store = SharedStore { late: Mutex::new(Some(theirs)), ..SharedStore::default() };

    let create = BatchOptions { create_missing: true, ..options() };
    let mut batch = Batch::new(&store, create);
    let outcome = batch.process(&dump(7, "o/new")).await.unwrap();
    assert_eq!(outcome, Outcome::Updated { id: RepoId(7), fields: vec!["fork"] });

    let s = batch.finish();
    assert_eq!((s.created, s.updated), (0, 1));
    let stored = store.get(RepoId(7)).await.unwrap().unwrap();
    assert_eq!(stored.description, Tri::Present("their tool".into()));
  }

  #[tokio::test]
  async fn updated_fields_are_those_the_store_changed() {
    let store = SharedStore {
      inner: MemoryStore::with_records([record(1, "o/a")]),
      interleaved: Mutex::new(Some(FieldUpdateSet {
        updates:      vec![FieldUpdate::Fork(Tri::Absent)],
        refreshed_at: Some(at(2015)),
      })),
      ..SharedStore::default()
    };

    let mut batch = Batch::new(&store, options());
    let outcome = batch.process(&dump(1, "o/a")).await.unwrap();
    assert_eq!(outcome, Outcome::Updated { id: RepoId(1), fields: vec!["description"] });
  }
}
