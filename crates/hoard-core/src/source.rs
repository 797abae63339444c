//! Source records: ephemeral, partial descriptions of a repository taken from
//! one row or event of an external dump.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  field::Tri,
  record::{ContentType, ForkInfo, RepoId, RepoPath},
};

/// The kind of external dump a record was extracted from.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SourceKind {
  /// GHTorrent `projects.csv`.
  GhtorrentProjects,
  /// GHTorrent `project_languages.csv`, keyed through `projects.csv`.
  GhtorrentLanguages,
  /// GHTorrent repository documents, one JSON object per line.
  GhtorrentDump,
  /// GH Archive hourly event logs (gzip, one JSON event per line).
  ArchiveEvents,
}

/// The keys a source offers for locating the canonical record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchKeys {
  /// Only set when the source uses the canonical id space.
  pub id:   Option<RepoId>,
  pub path: Option<RepoPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
  pub kind:           SourceKind,
  /// The source's own identifier, which need not match the canonical id.
  pub source_key:     Option<String>,
  pub keys:           MatchKeys,
  /// When the source observed this state; set for activity-derived records.
  pub observed_at:    Option<DateTime<Utc>>,
  pub description:    Tri<String>,
  pub readme:         Tri<String>,
  pub homepage:       Tri<String>,
  pub default_branch: Tri<String>,
  pub languages:      Tri<Vec<String>>,
  pub fork:           Tri<ForkInfo>,
  pub is_deleted:     Tri<bool>,
  pub is_visible:     Tri<bool>,
  pub content_type:   Tri<ContentType>,
  pub repo_created:   Option<DateTime<Utc>>,
  pub repo_updated:   Option<DateTime<Utc>>,
  pub repo_pushed:    Option<DateTime<Utc>>,
}

impl SourceRecord {
  /// A record that claims nothing beyond its keys.
  pub fn new(kind: SourceKind, keys: MatchKeys) -> Self {
    Self {
      kind,
      source_key: None,
      keys,
      observed_at: None,
      description: Tri::Unknown,
      readme: Tri::Unknown,
      homepage: Tri::Unknown,
      default_branch: Tri::Unknown,
      languages: Tri::Unknown,
      fork: Tri::Unknown,
      is_deleted: Tri::Unknown,
      is_visible: Tri::Unknown,
      content_type: Tri::Unknown,
      repo_created: None,
      repo_updated: None,
      repo_pushed: None,
    }
  }

  /// Human-readable label for diagnostics: `owner/name (#id)` with whatever
  /// parts the source supplied.
  pub fn describe(&self) -> String {
    match (&self.keys.path, self.keys.id, &self.source_key) {
      (Some(path), Some(id), _) => format!("{path} (#{id})"),
      (Some(path), None, _) => path.to_string(),
      (None, Some(id), _) => format!("#{id}"),
      (None, None, Some(key)) => format!("{} key {key}", self.kind),
      (None, None, None) => format!("{} record without keys", self.kind),
    }
  }
}
