//! Encoding and decoding helpers between hoard records and the plain-text
//! representations stored in SQLite columns.
//!
//! Decoding never fails: a stored value that does not parse is reported and
//! read back as unknown, so one corrupt cell cannot stop a batch.

use chrono::{DateTime, SecondsFormat, Utc};
use hoard_core::{
  field::Tri,
  record::{CanonicalRecord, RecordTimes, RepoId},
};
use rusqlite::{Connection, Row};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_dt(id: u64, column: &str, s: Option<String>) -> Option<DateTime<Utc>> {
  let s = s?;
  match DateTime::parse_from_rfc3339(&s) {
    Ok(dt) => Some(dt.with_timezone(&Utc)),
    Err(e) => {
      warn!("*** unreadable timestamp in repo {id} column {column}: {s:?} ({e})");
      None
    }
  }
}

// ─── Tri ─────────────────────────────────────────────────────────────────────

/// `NULL` for unknown, tagged JSON for absent and present.
pub fn encode_tri<T: Serialize>(value: &Tri<T>) -> serde_json::Result<Option<String>> {
  match value {
    Tri::Unknown => Ok(None),
    known => serde_json::to_string(known).map(Some),
  }
}

fn decode_tri<T: DeserializeOwned>(id: u64, column: &str, s: Option<String>) -> Tri<T> {
  let Some(s) = s else { return Tri::Unknown };
  match serde_json::from_str(&s) {
    Ok(value) => value,
    Err(e) => {
      warn!("*** unreadable value in repo {id} column {column}: {s:?} ({e})");
      Tri::Unknown
    }
  }
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that feeds [`RawRecord::from_row`].
pub const COLUMNS: &str = "id, owner, name, description, readme, homepage, \
                           default_branch, languages, fork, is_deleted, \
                           is_visible, repo_created, repo_updated, \
                           repo_pushed, data_refreshed, content_type";

/// Raw values read directly from, or about to be written to, a `repos` row.
pub struct RawRecord {
  pub id:             u64,
  pub owner:          String,
  pub name:           String,
  pub description:    Option<String>,
  pub readme:         Option<String>,
  pub homepage:       Option<String>,
  pub default_branch: Option<String>,
  pub languages:      Option<String>,
  pub fork:           Option<String>,
  pub is_deleted:     Option<String>,
  pub is_visible:     Option<String>,
  pub repo_created:   Option<String>,
  pub repo_updated:   Option<String>,
  pub repo_pushed:    Option<String>,
  pub data_refreshed: Option<String>,
  pub content_type:   Option<String>,
}

impl RawRecord {
  /// Read a row selected with [`COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      owner:          row.get(1)?,
      name:           row.get(2)?,
      description:    row.get(3)?,
      readme:         row.get(4)?,
      homepage:       row.get(5)?,
      default_branch: row.get(6)?,
      languages:      row.get(7)?,
      fork:           row.get(8)?,
      is_deleted:     row.get(9)?,
      is_visible:     row.get(10)?,
      repo_created:   row.get(11)?,
      repo_updated:   row.get(12)?,
      repo_pushed:    row.get(13)?,
      data_refreshed: row.get(14)?,
      content_type:   row.get(15)?,
    })
  }

  pub fn from_record(r: &CanonicalRecord) -> serde_json::Result<Self> {
    Ok(Self {
      id:             r.id.0,
      owner:          r.owner.clone(),
      name:           r.name.clone(),
      description:    encode_tri(&r.description)?,
      readme:         encode_tri(&r.readme)?,
      homepage:       encode_tri(&r.homepage)?,
      default_branch: encode_tri(&r.default_branch)?,
      languages:      encode_tri(&r.languages)?,
      fork:           encode_tri(&r.fork)?,
      is_deleted:     encode_tri(&r.is_deleted)?,
      is_visible:     encode_tri(&r.is_visible)?,
      repo_created:   r.time.repo_created.map(encode_dt),
      repo_updated:   r.time.repo_updated.map(encode_dt),
      repo_pushed:    r.time.repo_pushed.map(encode_dt),
      data_refreshed: r.time.data_refreshed.map(encode_dt),
      content_type:   encode_tri(&r.content_type)?,
    })
  }

  pub fn into_record(self) -> CanonicalRecord {
    let id = self.id;
    CanonicalRecord {
      id:             RepoId(id),
      owner:          self.owner,
      name:           self.name,
      description:    decode_tri(id, "description", self.description),
      readme:         decode_tri(id, "readme", self.readme),
      homepage:       decode_tri(id, "homepage", self.homepage),
      default_branch: decode_tri(id, "default_branch", self.default_branch),
      languages:      decode_tri(id, "languages", self.languages),
      fork:           decode_tri(id, "fork", self.fork),
      is_deleted:     decode_tri(id, "is_deleted", self.is_deleted),
      is_visible:     decode_tri(id, "is_visible", self.is_visible),
      content_type:   decode_tri(id, "content_type", self.content_type),
      time:           RecordTimes {
        repo_created:   decode_dt(id, "repo_created", self.repo_created),
        repo_updated:   decode_dt(id, "repo_updated", self.repo_updated),
        repo_pushed:    decode_dt(id, "repo_pushed", self.repo_pushed),
        data_refreshed: decode_dt(id, "data_refreshed", self.data_refreshed),
      },
    }
  }

  /// `INSERT OR IGNORE`; returns `true` if a row was inserted.
  pub fn insert(&self, conn: &Connection) -> rusqlite::Result<bool> {
    let n = conn.execute(
      "INSERT OR IGNORE INTO repos (
         id, owner, name, description, readme, homepage, default_branch,
         languages, fork, is_deleted, is_visible,
         repo_created, repo_updated, repo_pushed, data_refreshed, content_type
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
      rusqlite::params![
        self.id,
        self.owner,
        self.name,
        self.description,
        self.readme,
        self.homepage,
        self.default_branch,
        self.languages,
        self.fork,
        self.is_deleted,
        self.is_visible,
        self.repo_created,
        self.repo_updated,
        self.repo_pushed,
        self.data_refreshed,
        self.content_type,
      ],
    )?;
    Ok(n > 0)
  }

  /// Overwrite every mutable column of the row with this id. Identity
  /// columns (`id`, `owner`, `name`) are left alone.
  pub fn update(&self, conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
      "UPDATE repos SET
         description = ?2, readme = ?3, homepage = ?4, default_branch = ?5,
         languages = ?6, fork = ?7, is_deleted = ?8, is_visible = ?9,
         repo_created = ?10, repo_updated = ?11, repo_pushed = ?12,
         data_refreshed = ?13, content_type = ?14
       WHERE id = ?1",
      rusqlite::params![
        self.id,
        self.description,
        self.readme,
        self.homepage,
        self.default_branch,
        self.languages,
        self.fork,
        self.is_deleted,
        self.is_visible,
        self.repo_created,
        self.repo_updated,
        self.repo_pushed,
        self.data_refreshed,
        self.content_type,
      ],
    )?;
    Ok(())
  }
}
