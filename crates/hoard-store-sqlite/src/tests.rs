//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hoard_core::{
  field::Tri,
  merge::merge,
  record::{CanonicalRecord, ContentType, ForkInfo, RepoId, RepoPath},
  resolve::{Resolution, resolve},
  source::{MatchKeys, SourceKind, SourceRecord},
  store::RecordStore,
  update::{FieldUpdate, FieldUpdateSet},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(month: u32, day: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2016, month, day, 12, 0, 0).single().unwrap()
}

fn record(id: u64, owner: &str, name: &str) -> CanonicalRecord {
  CanonicalRecord::new(RepoId(id), RepoPath::new(owner, name))
}

fn dump_source(id: u64, path: &str) -> SourceRecord {
  SourceRecord::new(SourceKind::GhtorrentDump, MatchKeys {
    id:   Some(RepoId(id)),
    path: Some(path.parse().unwrap()),
  })
}

// ─── Create & read ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_record() {
  let s = store().await;
  assert!(s.create(record(16335, "mhucka", "casics")).await.unwrap());

  let got = s.get(RepoId(16335)).await.unwrap().unwrap();
  assert_eq!(got, record(16335, "mhucka", "casics"));
  assert_eq!(s.count().await.unwrap(), 1);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(RepoId(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn create_never_overwrites() {
  let s = store().await;
  assert!(s.create(record(1, "a", "b")).await.unwrap());
  assert!(!s.create(record(1, "c", "d")).await.unwrap());
  let got = s.get(RepoId(1)).await.unwrap().unwrap();
  assert_eq!(got.path(), RepoPath::new("a", "b"));
}

#[tokio::test]
async fn tri_states_survive_storage() {
  let s = store().await;
  let mut r = record(7, "o", "n");
  r.description = Tri::Absent;
  r.readme = Tri::Present(String::new());
  r.homepage = Tri::Present("https://example.org".into());
  r.languages = Tri::Present(vec!["Rust".into(), "C".into()]);
  r.fork = Tri::Present(ForkInfo {
    parent: Some(RepoPath::new("up", "stream")),
    root:   None,
  });
  r.is_deleted = Tri::Present(false);
  r.content_type = Tri::Present(ContentType::Nonempty);
  r.time.repo_pushed = Some(at(3, 4));
  s.create(r.clone()).await.unwrap();

  let got = s.get(RepoId(7)).await.unwrap().unwrap();
  assert_eq!(got, r);
  assert!(got.default_branch.is_unknown());
  assert!(got.description.is_absent());
  assert_eq!(got.content_type, Tri::Present(ContentType::Nonempty));
}

#[tokio::test]
async fn corrupt_cells_read_as_unknown() {
  let s = store().await;
  s.create(record(3, "o", "n")).await.unwrap();
  s.conn
    .call(|conn| {
      conn.execute(
        "UPDATE repos SET is_visible = 'maybe', repo_pushed = 'soon' WHERE id = 3",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let got = s.get(RepoId(3)).await.unwrap().unwrap();
  assert!(got.is_visible.is_unknown());
  assert_eq!(got.time.repo_pushed, None);
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_by_path_returns_all_holders_in_id_order() {
  let s = store().await;
  s.create(record(9, "a", "x")).await.unwrap();
  s.create(record(2, "a", "x")).await.unwrap();
  s.create(record(5, "a", "y")).await.unwrap();

  let found = s.find_by_path(&RepoPath::new("a", "x")).await.unwrap();
  assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), [RepoId(2), RepoId(9)]);
  assert!(s.find_by_path(&RepoPath::new("b", "x")).await.unwrap().is_empty());
}

#[tokio::test]
async fn existing_ids_is_a_subset() {
  let s = store().await;
  s.create(record(1, "a", "b")).await.unwrap();
  s.create(record(3, "c", "d")).await.unwrap();

  let found = s.existing_ids(&[RepoId(1), RepoId(2), RepoId(3)]).await.unwrap();
  assert_eq!(found.len(), 2);
  assert!(found.contains(&RepoId(1)));
  assert!(!found.contains(&RepoId(2)));
}

#[tokio::test]
async fn unknown_visibility_respects_limit() {
  let s = store().await;
  for id in 1..=4 {
    s.create(record(id, "o", &format!("r{id}"))).await.unwrap();
  }
  let set = FieldUpdateSet {
    updates:      vec![FieldUpdate::Visibility { visible: true, observed_at: None }],
    refreshed_at: Some(at(1, 1)),
  };
  s.apply(RepoId(2), &set).await.unwrap();

  let pending = s.unknown_visibility(2).await.unwrap();
  assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), [RepoId(1), RepoId(3)]);
}

// ─── Conditional updates ─────────────────────────────────────────────────────

#[tokio::test]
async fn apply_is_idempotent() {
  let s = store().await;
  s.create(record(1, "o", "n")).await.unwrap();

  let set = FieldUpdateSet {
    updates:      vec![
      FieldUpdate::Description(Tri::Present("tool".into())),
      FieldUpdate::RepoPushed(at(2, 1)),
    ],
    refreshed_at: Some(at(6, 1)),
  };
  assert_eq!(s.apply(RepoId(1), &set).await.unwrap(), ["description", "time.repo_pushed"]);
  let once = s.get(RepoId(1)).await.unwrap().unwrap();

  assert!(s.apply(RepoId(1), &set).await.unwrap().is_empty());
  let twice = s.get(RepoId(1)).await.unwrap().unwrap();
  assert_eq!(once, twice);
  assert_eq!(twice.time.data_refreshed, Some(at(6, 1)));
}

#[tokio::test]
async fn sub_millisecond_push_time_merges_once() {
  let s = store().await;
  s.create(record(1, "o", "n")).await.unwrap();

  let pushed = at(5, 1) + Duration::microseconds(123_456);
  let mut src = dump_source(1, "o/n");
  src.repo_pushed = Some(pushed);
  src.repo_updated = Some(pushed);

  let mut applied = Vec::new();
  let mut refreshed = Vec::new();
  for day in 1..=3 {
    let current = s.get(RepoId(1)).await.unwrap().unwrap();
    let updates = merge(&current, &src, at(6, day));
    applied.push(!s.apply(RepoId(1), &updates).await.unwrap().is_empty());
    refreshed.push(s.get(RepoId(1)).await.unwrap().unwrap().time.data_refreshed);
  }

  assert_eq!(applied, [true, false, false]);
  assert_eq!(refreshed, [Some(at(6, 1)); 3]);
  let got = s.get(RepoId(1)).await.unwrap().unwrap();
  assert_eq!(got.time.repo_pushed, Some(pushed));
  assert_eq!(got.time.repo_updated, Some(pushed));
}

#[tokio::test]
async fn stale_update_set_is_reevaluated() {
  let s = store().await;
  s.create(record(1, "o", "n")).await.unwrap();

  // Both sets were computed from the same all-unknown snapshot.
  let snapshot = s.get(RepoId(1)).await.unwrap().unwrap();
  let mut late = dump_source(1, "o/n");
  late.repo_pushed = Some(at(5, 1));
  let mut early = dump_source(1, "o/n");
  early.repo_pushed = Some(at(4, 1));

  let late_set = merge(&snapshot, &late, at(6, 1));
  let early_set = merge(&snapshot, &early, at(6, 2));

  s.apply(RepoId(1), &late_set).await.unwrap();
  assert!(s.apply(RepoId(1), &early_set).await.unwrap().is_empty());

  let got = s.get(RepoId(1)).await.unwrap().unwrap();
  assert_eq!(got.time.repo_pushed, Some(at(5, 1)));
}

#[tokio::test]
async fn apply_to_missing_record_is_a_no_op() {
  let s = store().await;
  let set = FieldUpdateSet {
    updates:      vec![FieldUpdate::Deleted],
    refreshed_at: Some(at(1, 1)),
  };
  assert!(s.apply(RepoId(404), &set).await.unwrap().is_empty());
  assert_eq!(s.count().await.unwrap(), 0);
}

#[tokio::test]
async fn deletion_merge_forces_invisible() {
  let s = store().await;
  let mut r = record(1, "o", "n");
  r.is_deleted = Tri::Present(false);
  r.is_visible = Tri::Present(true);
  s.create(r.clone()).await.unwrap();

  let mut src = dump_source(1, "o/n");
  src.is_deleted = Tri::Present(true);
  s.apply(RepoId(1), &merge(&r, &src, at(7, 1))).await.unwrap();

  let got = s.get(RepoId(1)).await.unwrap().unwrap();
  assert_eq!(got.is_deleted, Tri::Present(true));
  assert_eq!(got.is_visible, Tri::Present(false));
}

#[tokio::test]
async fn repair_fixes_only_inconsistent_records() {
  let s = store().await;
  let mut a = record(1, "o", "a");
  a.is_deleted = Tri::Present(true);
  a.is_visible = Tri::Present(true);
  let mut b = record(2, "o", "b");
  b.is_deleted = Tri::Present(true);
  let mut c = record(3, "o", "c");
  c.is_deleted = Tri::Present(true);
  c.is_visible = Tri::Present(false);
  let mut d = record(4, "o", "d");
  d.is_deleted = Tri::Present(false);
  d.is_visible = Tri::Present(true);
  for r in [a, b, c, d] {
    s.create(r).await.unwrap();
  }

  assert_eq!(s.repair_visibility(at(8, 1)).await.unwrap(), 2);
  assert_eq!(s.repair_visibility(at(8, 2)).await.unwrap(), 0);

  for id in 1..=4 {
    assert!(s.get(RepoId(id)).await.unwrap().unwrap().is_consistent());
  }
  let d = s.get(RepoId(4)).await.unwrap().unwrap();
  assert_eq!(d.is_visible, Tri::Present(true));
  assert_eq!(d.time.data_refreshed, None);
}

// ─── Resolution over SQLite ──────────────────────────────────────────────────

#[tokio::test]
async fn renamed_repo_resolves_by_id() {
  let s = store().await;
  s.create(record(10, "old", "name")).await.unwrap();

  let res = resolve(&s, &dump_source(10, "new/name")).await.unwrap();
  let Resolution::Matched { record, signal } = res else { panic!("expected match") };
  assert_eq!(record.id, RepoId(10));
  assert!(signal.is_some());
}

#[tokio::test]
async fn unresolved_source_creates_nothing() {
  let s = store().await;
  let res = resolve(&s, &dump_source(11, "no/where")).await.unwrap();
  assert_eq!(res, Resolution::Unresolved);
  assert_eq!(s.count().await.unwrap(), 0);
}

#[tokio::test]
async fn store_reopens_from_file() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("hoard.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.create(record(1, "o", "n")).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert!(s.get(RepoId(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn version_one_database_gains_content_type() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("hoard.db");

  {
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn
      .execute_batch(
        "CREATE TABLE repos (
           id INTEGER PRIMARY KEY, owner TEXT NOT NULL, name TEXT NOT NULL,
           description TEXT, readme TEXT, homepage TEXT, default_branch TEXT,
           languages TEXT, fork TEXT, is_deleted TEXT, is_visible TEXT,
           repo_created TEXT, repo_updated TEXT, repo_pushed TEXT,
           data_refreshed TEXT
         );
         INSERT INTO repos (id, owner, name, repo_pushed)
           VALUES (1, 'o', 'n', '2016-05-01T12:00:00.250Z');
         PRAGMA user_version = 1;",
      )
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let got = s.get(RepoId(1)).await.unwrap().unwrap();
  assert!(got.content_type.is_unknown());
  assert_eq!(got.time.repo_pushed, Some(at(5, 1) + Duration::milliseconds(250)));

  let set = FieldUpdateSet {
    updates:      vec![FieldUpdate::ContentType(ContentType::Nonempty)],
    refreshed_at: Some(at(6, 1)),
  };
  assert_eq!(s.apply(RepoId(1), &set).await.unwrap(), ["content_type"]);
  drop(s);

  // Reopening at the current version runs no migration.
  let s = SqliteStore::open(&path).await.unwrap();
  let got = s.get(RepoId(1)).await.unwrap().unwrap();
  assert_eq!(got.content_type, Tri::Present(ContentType::Nonempty));
  let raw: String = s
    .conn
    .call(|conn| Ok(conn.query_row("SELECT repo_pushed FROM repos WHERE id = 1", [], |r| r.get(0))?))
    .await
    .unwrap();
  assert_eq!(raw, "2016-05-01T12:00:00.250000000Z");
}
