//! In-memory [`RecordStore`] implementation for tests and dry runs.
//!
//! Records live in a `BTreeMap` behind `std::sync::RwLock`, so every
//! operation is trivially atomic per record.

use std::{
  collections::{BTreeMap, HashSet},
  convert::Infallible,
  sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};

use crate::{
  field::Tri,
  record::{CanonicalRecord, RepoId, RepoPath},
  store::RecordStore,
  update::FieldUpdateSet,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
  records: RwLock<BTreeMap<RepoId, CanonicalRecord>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Build a store pre-populated with `records`.
  pub fn with_records(records: impl IntoIterator<Item = CanonicalRecord>) -> Self {
    let map = records.into_iter().map(|r| (r.id, r)).collect();
    Self { records: RwLock::new(map) }
  }

  pub fn len(&self) -> usize { self.read().len() }

  pub fn is_empty(&self) -> bool { self.read().is_empty() }

  // A poisoned lock still holds consistent records: every mutation below
  // completes before the guard is released.
  fn read(&self) -> RwLockReadGuard<'_, BTreeMap<RepoId, CanonicalRecord>> {
    self.records.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<RepoId, CanonicalRecord>> {
    self.records.write().unwrap_or_else(PoisonError::into_inner)
  }
}

impl RecordStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, id: RepoId) -> Result<Option<CanonicalRecord>, Infallible> {
    Ok(self.read().get(&id).cloned())
  }

  async fn find_by_path<'a>(
    &'a self,
    path: &'a RepoPath,
  ) -> Result<Vec<CanonicalRecord>, Infallible> {
    Ok(self.read().values().filter(|r| r.has_path(path)).cloned().collect())
  }

  async fn existing_ids<'a>(
    &'a self,
    ids: &'a [RepoId],
  ) -> Result<HashSet<RepoId>, Infallible> {
    let records = self.read();
    Ok(ids.iter().copied().filter(|id| records.contains_key(id)).collect())
  }

  async fn unknown_visibility(
    &self,
    limit: usize,
  ) -> Result<Vec<CanonicalRecord>, Infallible> {
    Ok(
      self
        .read()
        .values()
        .filter(|r| r.is_visible.is_unknown())
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  async fn create(&self, record: CanonicalRecord) -> Result<bool, Infallible> {
    let mut records = self.write();
    if records.contains_key(&record.id) {
      return Ok(false);
    }
    records.insert(record.id, record);
    Ok(true)
  }

  async fn apply<'a>(
    &'a self,
    id: RepoId,
    updates: &'a FieldUpdateSet,
  ) -> Result<Vec<&'static str>, Infallible> {
    Ok(match self.write().get_mut(&id) {
      Some(record) => updates.apply_fields(record),
      None => Vec::new(),
    })
  }

  async fn repair_visibility(&self, now: DateTime<Utc>) -> Result<u64, Infallible> {
    let mut fixed = 0;
    for record in self.write().values_mut() {
      if record.is_deleted == Tri::Present(true) && record.is_visible != Tri::Present(false) {
        record.is_visible = Tri::Present(false);
        record.time.data_refreshed = record.time.data_refreshed.max(Some(now));
        fixed += 1;
      }
    }
    Ok(fixed)
  }
}
