//! The `RecordStore` trait.
//!
//! Implemented by storage backends (e.g. `hoard-store-sqlite`) and by the
//! in-memory [`MemoryStore`](crate::memory::MemoryStore). The resolver and
//! the batch pipeline depend on this abstraction, not on any concrete
//! backend.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};

use crate::{
  record::{CanonicalRecord, RepoId, RepoPath},
  update::FieldUpdateSet,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a canonical record store.
///
/// Records are never removed. Writes are either an explicit create of an
/// all-unknown record or a conditional [`FieldUpdateSet`] applied atomically
/// to one record.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a record by id. Returns `None` if not found.
  fn get(
    &self,
    id: RepoId,
  ) -> impl Future<Output = Result<Option<CanonicalRecord>, Self::Error>> + Send + '_;

  /// All records whose current `owner/name` equals `path`, ordered by id.
  /// More than one is a data-quality condition, not an error.
  fn find_by_path<'a>(
    &'a self,
    path: &'a RepoPath,
  ) -> impl Future<Output = Result<Vec<CanonicalRecord>, Self::Error>> + Send + 'a;

  /// The subset of `ids` that exist in the store.
  fn existing_ids<'a>(
    &'a self,
    ids: &'a [RepoId],
  ) -> impl Future<Output = Result<HashSet<RepoId>, Self::Error>> + Send + 'a;

  /// Up to `limit` records whose visibility is unknown, ordered by id.
  fn unknown_visibility(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<CanonicalRecord>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `record` unless a record with its id already exists. Returns
  /// `true` if it was inserted.
  fn create(
    &self,
    record: CanonicalRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Apply `updates` to record `id` atomically, re-evaluating every guard
  /// against the stored state. Returns the names of the fields that
  /// changed; empty if nothing applied or the record does not exist.
  fn apply<'a>(
    &'a self,
    id: RepoId,
    updates: &'a FieldUpdateSet,
  ) -> impl Future<Output = Result<Vec<&'static str>, Self::Error>> + Send + 'a;

  /// Force `is_visible = false` on every record marked deleted whose
  /// visibility says otherwise, stamping `data_refreshed` with `now`.
  /// Returns the number of records fixed.
  fn repair_visibility(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
