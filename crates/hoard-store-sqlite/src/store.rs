//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use hoard_core::{
  field::Tri,
  record::{CanonicalRecord, RepoId, RepoPath},
  store::RecordStore,
  update::FieldUpdateSet,
};

use crate::{
  Error, Result,
  encode::{COLUMNS, RawRecord},
  schema::{MIGRATIONS, SCHEMA},
};

fn json_error(e: serde_json::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hoard record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every
/// conditional update runs as read-evaluate-write inside an `IMMEDIATE`
/// transaction, so batch runs sharing a database file serialise per record.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(30))?;
        let version: u32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        // Version 0 is a fresh database; SCHEMA creates the current layout.
        if version > 0 {
          for step in MIGRATIONS.iter().skip(version as usize - 1) {
            conn.execute_batch(step)?;
          }
        }
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Total number of catalogued records.
  pub async fn count(&self) -> Result<u64> {
    let n: u64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM repos", [], |r| r.get(0))?))
      .await?;
    Ok(n)
  }

  async fn select(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<CanonicalRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws.into_iter().map(RawRecord::into_record).collect())
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, id: RepoId) -> Result<Option<CanonicalRecord>> {
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM repos WHERE id = ?1"),
              rusqlite::params![id.0],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw.map(RawRecord::into_record))
  }

  async fn find_by_path<'a>(&'a self, path: &'a RepoPath) -> Result<Vec<CanonicalRecord>> {
    self
      .select(
        format!("SELECT {COLUMNS} FROM repos WHERE owner = ?1 AND name = ?2 ORDER BY id"),
        vec![path.owner.clone().into(), path.name.clone().into()],
      )
      .await
  }

  async fn existing_ids<'a>(&'a self, ids: &'a [RepoId]) -> Result<HashSet<RepoId>> {
    let ids = ids.to_vec();
    let found = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached("SELECT 1 FROM repos WHERE id = ?1")?;
        let mut found = HashSet::new();
        for id in ids {
          if stmt.exists(rusqlite::params![id.0])? {
            found.insert(id);
          }
        }
        Ok(found)
      })
      .await?;
    Ok(found)
  }

  async fn unknown_visibility(&self, limit: usize) -> Result<Vec<CanonicalRecord>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    self
      .select(
        format!("SELECT {COLUMNS} FROM repos WHERE is_visible IS NULL ORDER BY id LIMIT ?1"),
        vec![limit.into()],
      )
      .await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create(&self, record: CanonicalRecord) -> Result<bool> {
    let raw = RawRecord::from_record(&record)?;
    let inserted = self.conn.call(move |conn| Ok(raw.insert(conn)?)).await?;
    Ok(inserted)
  }

  async fn apply<'a>(
    &'a self,
    id: RepoId,
    updates: &'a FieldUpdateSet,
  ) -> Result<Vec<&'static str>> {
    if updates.is_empty() {
      return Ok(Vec::new());
    }
    let updates = updates.clone();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(raw) = tx
          .query_row(
            &format!("SELECT {COLUMNS} FROM repos WHERE id = ?1"),
            rusqlite::params![id.0],
            RawRecord::from_row,
          )
          .optional()?
        else {
          return Ok(Vec::new());
        };

        let mut record = raw.into_record();
        let changed = updates.apply_fields(&mut record);
        if changed.is_empty() {
          return Ok(changed);
        }

        RawRecord::from_record(&record).map_err(json_error)?.update(&tx)?;
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed)
  }

  async fn repair_visibility(&self, now: DateTime<Utc>) -> Result<u64> {
    let fixed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let broken: Vec<RawRecord> = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {COLUMNS} FROM repos
             WHERE json_extract(is_deleted, '$.value') = 1
               AND (is_visible IS NULL OR json_extract(is_visible, '$.value') IS NOT 0)"
          ))?;
          stmt
            .query_map([], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut fixed: u64 = 0;
        for raw in broken {
          let mut record = raw.into_record();
          record.is_visible = Tri::Present(false);
          record.time.data_refreshed = record.time.data_refreshed.max(Some(now));
          RawRecord::from_record(&record).map_err(json_error)?.update(&tx)?;
          fixed += 1;
        }
        tx.commit()?;
        Ok(fixed)
      })
      .await?;
    Ok(fixed)
  }
}
