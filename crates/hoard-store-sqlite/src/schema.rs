//! SQL schema for the hoard SQLite store.
//!
//! Executed once at connection startup. Databases created by an older
//! version are brought forward first, gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Every tri-state column uses `NULL` for unknown and a JSON document
/// (`{"state":"absent"}` or `{"state":"present","value":...}`) for the known
/// states. Timestamps are fixed-width RFC 3339 UTC strings, so they compare
/// correctly as text.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS repos (
    id              INTEGER PRIMARY KEY,  -- upstream repository id
    owner           TEXT NOT NULL,
    name            TEXT NOT NULL,
    description     TEXT,
    readme          TEXT,
    homepage        TEXT,
    default_branch  TEXT,
    languages       TEXT,
    fork            TEXT,
    is_deleted      TEXT,
    is_visible      TEXT,
    repo_created    TEXT,
    repo_updated    TEXT,
    repo_pushed     TEXT,
    data_refreshed  TEXT,
    content_type    TEXT
);

CREATE INDEX IF NOT EXISTS repos_path_idx ON repos(owner, name);
CREATE INDEX IF NOT EXISTS repos_visible_idx ON repos(is_visible);

PRAGMA user_version = 2;
";

/// Steps that bring a database at version `index + 1` to the next version.
/// Run in order before [`SCHEMA`].
pub const MIGRATIONS: &[&str] = &[
  // 1 → 2: content type; millisecond timestamps widened to nanoseconds.
  "ALTER TABLE repos ADD COLUMN content_type TEXT;
   UPDATE repos SET repo_created = substr(repo_created, 1, 23) || '000000Z'
     WHERE length(repo_created) = 24;
   UPDATE repos SET repo_updated = substr(repo_updated, 1, 23) || '000000Z'
     WHERE length(repo_updated) = 24;
   UPDATE repos SET repo_pushed = substr(repo_pushed, 1, 23) || '000000Z'
     WHERE length(repo_pushed) = 24;
   UPDATE repos SET data_refreshed = substr(data_refreshed, 1, 23) || '000000Z'
     WHERE length(data_refreshed) = 24;",
];
