//! GHTorrent MySQL dump extractors: `projects.csv` and
//! `project_languages.csv`.
//!
//! GHTorrent numbers projects with its own ids, which are *not* the hosting
//! service's repository ids. Records extracted here therefore match by path
//! only, and GHTorrent ids (in `forked_from` and in `project_languages.csv`)
//! are translated to paths through a [`ProjectIndex`].

use std::{
  collections::{BTreeMap, HashMap},
  io::BufRead,
};

use chrono::{DateTime, Utc};
use hoard_core::{
  field::Tri,
  record::{ForkInfo, RepoPath},
  source::{MatchKeys, SourceKind, SourceRecord},
};
use tracing::{info, warn};

use crate::{
  Error, Result,
  csv::{CsvReader, CsvRow},
  lang::canonical_language,
  time::parse_timestamp,
};

const API_PREFIX: &str = "https://api.github.com/repos/";

// ─── projects.csv ────────────────────────────────────────────────────────────

mod col {
  pub const ID: usize = 0;
  pub const URL: usize = 1;
  pub const DESCRIPTION: usize = 4;
  pub const LANGUAGE: usize = 5;
  pub const CREATED: usize = 6;
  pub const FORKED_FROM: usize = 7;
  pub const DELETED: usize = 8;
  pub const UPDATED: usize = 9;
}

/// One parsed `projects.csv` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRow {
  pub ghtorrent_id: i64,
  pub path:         RepoPath,
  /// `None` for `NULL`; `Some("")` for an empty description.
  pub description:  Option<String>,
  pub language:     Option<String>,
  pub created:      Option<DateTime<Utc>>,
  pub forked_from:  Option<i64>,
  pub deleted:      bool,
  /// When GHTorrent last refreshed the row.
  pub updated:      Option<DateTime<Utc>>,
}

fn parse_id(row: &CsvRow, i: usize, what: &str) -> Result<i64> {
  let raw = row
    .get(i)
    .ok_or_else(|| Error::malformed(row.line, format!("missing {what}")))?;
  raw
    .trim()
    .parse()
    .map_err(|_| Error::malformed(row.line, format!("invalid {what} {raw:?}")))
}

/// Parse a `projects.csv` row. `Ok(None)` for GHTorrent's placeholder rows
/// (id `-1`).
pub fn parse_project_row(row: &CsvRow) -> Result<Option<ProjectRow>> {
  let ghtorrent_id = parse_id(row, col::ID, "project id")?;
  if ghtorrent_id == -1 {
    return Ok(None);
  }

  let url = row
    .get(col::URL)
    .ok_or_else(|| Error::malformed(row.line, "missing url"))?;
  let path: RepoPath = url
    .strip_prefix(API_PREFIX)
    .unwrap_or(url)
    .parse()
    .map_err(|_| Error::malformed(row.line, format!("unusable url {url:?}")))?;

  let forked_from = match row.get(col::FORKED_FROM) {
    Some(raw) if raw != "N" && !raw.is_empty() => {
      Some(parse_id(row, col::FORKED_FROM, "forked_from")?)
    }
    _ => None,
  };

  Ok(Some(ProjectRow {
    ghtorrent_id,
    path,
    description: row.get(col::DESCRIPTION).map(str::to_owned),
    language: row
      .get(col::LANGUAGE)
      .map(str::trim)
      .filter(|l| !l.is_empty())
      .map(str::to_owned),
    created: row.get(col::CREATED).and_then(parse_timestamp),
    forked_from,
    deleted: row.get(col::DELETED).is_some_and(|d| d.trim() != "0"),
    updated: row.get(col::UPDATED).and_then(parse_timestamp),
  }))
}

// ─── ProjectIndex ────────────────────────────────────────────────────────────

/// GHTorrent project id → repository path, built in a first pass over
/// `projects.csv`.
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
  paths: HashMap<i64, RepoPath>,
}

impl ProjectIndex {
  /// Build the index, skipping (and reporting) rows that do not parse.
  /// Only I/O errors abort.
  pub fn build(reader: impl BufRead) -> Result<Self> {
    let mut paths = HashMap::new();
    for row in CsvReader::new(reader) {
      match row.and_then(|row| parse_project_row(&row)) {
        Ok(Some(project)) => {
          paths.insert(project.ghtorrent_id, project.path);
          if paths.len() % 1_000_000 == 0 {
            info!("{} projects indexed", paths.len());
          }
        }
        Ok(None) => {}
        Err(e) if e.is_recoverable() => warn!("*** skipping projects.csv row: {e}"),
        Err(e) => return Err(e),
      }
    }
    info!(projects = paths.len(), "project index built");
    Ok(Self { paths })
  }

  pub fn get(&self, ghtorrent_id: i64) -> Option<&RepoPath> { self.paths.get(&ghtorrent_id) }

  pub fn len(&self) -> usize { self.paths.len() }

  pub fn is_empty(&self) -> bool { self.paths.is_empty() }
}

impl FromIterator<(i64, RepoPath)> for ProjectIndex {
  fn from_iter<I: IntoIterator<Item = (i64, RepoPath)>>(iter: I) -> Self {
    Self { paths: iter.into_iter().collect() }
  }
}

/// Turn a project row into what it tells us about the repository.
pub fn project_record(project: ProjectRow, index: &ProjectIndex) -> SourceRecord {
  let mut rec = SourceRecord::new(SourceKind::GhtorrentProjects, MatchKeys {
    id:   None,
    path: Some(project.path),
  });
  rec.source_key = Some(project.ghtorrent_id.to_string());
  rec.observed_at = project.updated;

  rec.description = match project.description {
    None => Tri::Unknown,
    Some(d) if d.trim().is_empty() => Tri::Absent,
    Some(d) => Tri::Present(d),
  };
  // projects.csv names only the main language, so it never claims "none".
  if let Some(lang) = project.language {
    rec.languages = Tri::Present(vec![canonical_language(&lang)]);
  }
  rec.fork = match project.forked_from {
    None => Tri::Absent,
    Some(parent_id) => Tri::Present(ForkInfo {
      parent: index.get(parent_id).cloned(),
      root:   None,
    }),
  };
  if project.deleted {
    rec.is_deleted = Tri::Present(true);
  } else {
    rec.is_deleted = Tri::Present(false);
    rec.is_visible = Tri::Present(true);
  }
  rec.repo_created = project.created;
  rec
}

/// Extract one [`SourceRecord`] per project row.
pub fn project_records<'a, R: BufRead + 'a>(
  reader: R,
  index: &'a ProjectIndex,
) -> impl Iterator<Item = Result<SourceRecord>> + 'a {
  CsvReader::new(reader).filter_map(move |row| {
    match row.and_then(|row| parse_project_row(&row)) {
      Ok(Some(project)) => Some(Ok(project_record(project, index))),
      Ok(None) => None,
      Err(e) => Some(Err(e)),
    }
  })
}

// ─── project_languages.csv ───────────────────────────────────────────────────

/// Aggregate `project_languages.csv` (`project_id, language, bytes,
/// created_at`) into one record per project carrying the distinct,
/// canonically spelled languages, in first-seen order.
///
/// The whole file is read before anything is returned. Rows that do not
/// parse come first as errors; projects missing from `index` appear as
/// errors in id order alongside the records.
pub fn language_records<R: BufRead>(
  reader: R,
  index: &ProjectIndex,
) -> Result<Vec<Result<SourceRecord>>> {
  let mut out = Vec::new();
  let mut languages: BTreeMap<i64, Vec<String>> = BTreeMap::new();

  for row in CsvReader::new(reader) {
    let row = match row {
      Ok(row) => row,
      Err(e) if e.is_recoverable() => {
        out.push(Err(e));
        continue;
      }
      Err(e) => return Err(e),
    };
    let id = match parse_id(&row, 0, "project id") {
      Ok(-1) => continue,
      Ok(id) => id,
      Err(e) => {
        out.push(Err(e));
        continue;
      }
    };
    let Some(lang) = row.get(1).map(str::trim).filter(|l| !l.is_empty()) else {
      out.push(Err(Error::malformed(row.line, "missing language")));
      continue;
    };
    let lang = canonical_language(lang);
    let list = languages.entry(id).or_default();
    if !list.contains(&lang) {
      list.push(lang);
    }
  }

  for (id, list) in languages {
    let Some(path) = index.get(id) else {
      out.push(Err(Error::UnknownProject(id)));
      continue;
    };
    let mut rec = SourceRecord::new(SourceKind::GhtorrentLanguages, MatchKeys {
      id:   None,
      path: Some(path.clone()),
    });
    rec.source_key = Some(id.to_string());
    rec.languages = Tri::Present(list);
    out.push(Ok(rec));
  }
  Ok(out)
}
