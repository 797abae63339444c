//! GHTorrent repository documents: one GitHub API repository object per line,
//! as exported from GHTorrent's MongoDB (`mongoexport`).
//!
//! Unlike the CSV tables these carry the hosting service's own id, so they
//! match by id first.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use hoard_core::{
  field::Tri,
  record::{ContentType, ForkInfo, RepoId, RepoPath},
  source::{MatchKeys, SourceKind, SourceRecord},
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::{Result, json_lines, time::parse_timestamp};

/// Distinguishes a missing key (`None`) from an explicit `null`
/// (`Some(None)`).
fn nullable<'de, D, T>(d: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(d).map(Some)
}

fn tri<T>(value: Option<Option<T>>) -> Tri<T> {
  match value {
    None => Tri::Unknown,
    Some(inner) => Tri::observed(inner),
  }
}

#[derive(Debug, Deserialize)]
struct Owner {
  login: String,
}

#[derive(Debug, Deserialize)]
struct FullName {
  full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DumpRepo {
  id:             u64,
  name:           String,
  owner:          Owner,
  #[serde(default, deserialize_with = "nullable")]
  description:    Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  homepage:       Option<Option<String>>,
  #[serde(default, deserialize_with = "nullable")]
  default_branch: Option<Option<String>>,
  fork:           Option<bool>,
  parent:         Option<FullName>,
  source:         Option<FullName>,
  /// Kilobytes; GitHub reports 0 both for empty and for not-yet-counted
  /// repositories.
  size:           Option<u64>,
  #[serde(default)]
  created_at:     Value,
  #[serde(default)]
  updated_at:     Value,
  #[serde(default)]
  pushed_at:      Value,
}

/// A timestamp as a string, or as MongoDB extended JSON
/// (`{"$date": "..."}`, `{"$date": millis}`, `{"$date": {"$numberLong": "..."}}`).
fn time_value(v: &Value) -> Option<DateTime<Utc>> {
  match v {
    Value::String(s) => parse_timestamp(s),
    Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
    Value::Object(map) => match (map.get("$date"), map.get("$numberLong")) {
      (Some(date), _) => time_value(date),
      (None, Some(Value::String(millis))) => {
        millis.parse().ok().and_then(DateTime::from_timestamp_millis)
      }
      _ => None,
    },
    _ => None,
  }
}

fn full_name(line: u64, what: &str, value: Option<FullName>) -> Option<RepoPath> {
  let name = value?.full_name?;
  match name.parse() {
    Ok(path) => Some(path),
    Err(_) => {
      warn!("*** line {line}: unusable {what} full_name {name:?}");
      None
    }
  }
}

fn dump_record(line: u64, repo: DumpRepo) -> SourceRecord {
  let path = RepoPath::new(repo.owner.login, repo.name);
  let mut rec = SourceRecord::new(SourceKind::GhtorrentDump, MatchKeys {
    id:   Some(RepoId(repo.id)),
    path: Some(path),
  });
  rec.source_key = Some(repo.id.to_string());

  rec.description = tri(repo.description);
  rec.homepage = tri(repo.homepage);
  rec.default_branch = tri(repo.default_branch);

  rec.fork = match repo.fork {
    None => Tri::Unknown,
    Some(false) => Tri::Absent,
    Some(true) => {
      let parent = full_name(line, "parent", repo.parent);
      let root = full_name(line, "source", repo.source);
      if parent.is_none() {
        warn!("*** {} missing parent field", rec.describe());
      }
      Tri::Present(ForkInfo { parent, root })
    }
  };

  if repo.size.is_some_and(|kb| kb > 0) {
    rec.content_type = Tri::Present(ContentType::Nonempty);
  }

  rec.repo_created = time_value(&repo.created_at);
  rec.repo_updated = time_value(&repo.updated_at);
  rec.repo_pushed = time_value(&repo.pushed_at);
  rec
}

/// Extract one [`SourceRecord`] per repository document.
pub fn dump_records<'a, R: BufRead + 'a>(
  reader: R,
) -> impl Iterator<Item = Result<SourceRecord>> + 'a {
  json_lines::<_, DumpRepo>(reader).map(|item| {
    let (line, repo) = item?;
    Ok(dump_record(line, repo))
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::Error;

  fn one(line: &str) -> SourceRecord {
    dump_records(line.as_bytes()).next().unwrap().unwrap()
  }

  #[test]
  fn fork_document_carries_parent_and_root() {
    let rec = one(
      r#"{"id": 16335, "name": "casics", "owner": {"login": "mhucka"},
          "description": "Software inventory", "homepage": null,
          "default_branch": "master", "fork": true,
          "parent": {"full_name": "caltechlibrary/casics"},
          "source": {"full_name": "casics/casics"},
          "created_at": "2015-01-02T03:04:05Z",
          "updated_at": {"$date": "2016-01-02T03:04:05Z"},
          "pushed_at": {"$date": 1451703845000}}"#
        .replace('\n', " ")
        .as_str(),
    );

    assert_eq!(rec.keys.id, Some(RepoId(16335)));
    assert_eq!(rec.keys.path, Some(RepoPath::new("mhucka", "casics")));
    assert_eq!(rec.description, Tri::Present("Software inventory".into()));
    assert_eq!(rec.homepage, Tri::Absent);
    assert_eq!(rec.default_branch, Tri::Present("master".into()));
    assert_eq!(
      rec.fork,
      Tri::Present(ForkInfo {
        parent: Some(RepoPath::new("caltechlibrary", "casics")),
        root:   Some(RepoPath::new("casics", "casics")),
      })
    );
    assert_eq!(
      rec.repo_created,
      Some(Utc.with_ymd_and_hms(2015, 1, 2, 3, 4, 5).single().unwrap())
    );
    assert_eq!(
      rec.repo_updated,
      Some(Utc.with_ymd_and_hms(2016, 1, 2, 3, 4, 5).single().unwrap())
    );
    assert_eq!(rec.repo_pushed, rec.repo_updated);
  }

  #[test]
  fn missing_keys_stay_unknown() {
    let rec = one(r#"{"id": 1, "name": "n", "owner": {"login": "o"}, "fork": false}"#);
    assert!(rec.description.is_unknown());
    assert!(rec.homepage.is_unknown());
    assert_eq!(rec.fork, Tri::Absent);
    assert_eq!(rec.repo_created, None);
    assert!(rec.content_type.is_unknown());
  }

  #[test]
  fn positive_size_means_content_and_zero_says_nothing() {
    let sized = one(r#"{"id": 1, "name": "n", "owner": {"login": "o"}, "size": 2048}"#);
    assert_eq!(sized.content_type, Tri::Present(ContentType::Nonempty));
    let zero = one(r#"{"id": 2, "name": "n", "owner": {"login": "o"}, "size": 0}"#);
    assert!(zero.content_type.is_unknown());
  }

  #[test]
  fn broken_lines_report_their_position() {
    let input = "{\"id\": 1, \"name\": \"n\", \"owner\": {\"login\": \"o\"}}\n\n{not json\n";
    let results: Vec<_> = dump_records(input.as_bytes()).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::Json { line: 3, .. })));
  }
}
