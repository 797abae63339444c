//! GH Archive hourly event logs: one JSON event per line, usually gzipped.
//!
//! Every event is evidence about the repository it happened in: its
//! visibility (`public`) at the event time. Push events also carry the push
//! time, release events show the repository has content, and fork events
//! describe a newly created fork.
//!
//! The archive has changed shape over the years. Events from 2015 onwards
//! name the repository as `repo: {id, name: "owner/name"}`. Earlier
//! "timeline" events use `repository: {id, owner, name}`, or only
//! `payload.repo` plus the actor, or only an html `url` plus the actor.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use hoard_core::{
  field::Tri,
  record::{ContentType, ForkInfo, RepoId, RepoPath},
  source::{MatchKeys, SourceKind, SourceRecord},
};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result, json_lines, time::parse_timestamp};

const HTML_PREFIX: &str = "https://github.com/";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Event {
  #[serde(rename = "type")]
  kind:       Option<String>,
  public:     Option<bool>,
  created_at: Option<String>,
  repo:       Option<ModernRepo>,
  repository: Option<TimelineRepo>,
  actor:      Option<Actor>,
  url:        Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  payload:    Payload,
}

fn null_as_default<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Payload, D::Error> {
  Option::<Payload>::deserialize(d).map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
struct ModernRepo {
  id:   Option<u64>,
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelineRepo {
  id:    Option<u64>,
  owner: Option<String>,
  name:  Option<String>,
}

/// A login string in timeline events, an object in modern ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Actor {
  Login(String),
  Object { login: Option<String> },
}

impl Actor {
  fn login(&self) -> Option<&str> {
    match self {
      Self::Login(login) => Some(login),
      Self::Object { login } => login.as_deref(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
  repo:   Option<Value>,
  actor:  Option<String>,
  forkee: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Forkee {
  id:         Option<u64>,
  full_name:  Option<String>,
  name:       Option<String>,
  owner:      Option<ForkeeOwner>,
  private:    Option<bool>,
  created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForkeeOwner {
  login: Option<String>,
}

// ─── Repository identification ───────────────────────────────────────────────

/// The keys an event offers for the repository it happened in.
fn event_keys(event: &Event) -> Option<MatchKeys> {
  if let Some(repo) = &event.repo {
    let path = repo.name.as_deref().and_then(|n| n.parse().ok());
    if path.is_some() || repo.id.is_some() {
      return Some(MatchKeys { id: repo.id.map(RepoId), path });
    }
  }

  if let Some(repo) = &event.repository
    && let (Some(owner), Some(name)) = (&repo.owner, &repo.name)
  {
    return Some(MatchKeys {
      id:   repo.id.map(RepoId),
      path: Some(RepoPath::new(owner, name)),
    });
  }

  let actor = event
    .actor
    .as_ref()
    .and_then(Actor::login)
    .or(event.payload.actor.as_deref());

  if let Some(repo) = event.payload.repo.as_ref().and_then(Value::as_str) {
    let path = match (repo.split_once('/'), actor) {
      (Some((owner, name)), _) if !owner.is_empty() => Some(RepoPath::new(owner, name)),
      (Some((_, name)), Some(owner)) => Some(RepoPath::new(owner, name)),
      (None, Some(owner)) => Some(RepoPath::new(owner, repo)),
      (_, None) => None,
    };
    if let Some(path) = path {
      return Some(MatchKeys { id: None, path: Some(path) });
    }
  }

  // `https://github.com/<owner>/<name>/...`
  let rest = event.url.as_deref()?.strip_prefix(HTML_PREFIX)?;
  let mut segments = rest.split('/');
  let owner = segments.next().filter(|s| !s.is_empty()).or(actor)?;
  let name = segments.next().filter(|s| !s.is_empty())?;
  Some(MatchKeys { id: None, path: Some(RepoPath::new(owner, name)) })
}

fn forkee_record(
  parent: Option<RepoPath>,
  forkee: &Value,
  observed_at: Option<DateTime<Utc>>,
) -> Option<SourceRecord> {
  let forkee = Forkee::deserialize(forkee).ok()?;
  let path = forkee
    .full_name
    .as_deref()
    .and_then(|n| n.parse().ok())
    .or_else(|| {
      let owner = forkee.owner.as_ref()?.login.as_deref()?;
      Some(RepoPath::new(owner, forkee.name.as_deref()?))
    });
  if path.is_none() && forkee.id.is_none() {
    return None;
  }

  let mut rec = SourceRecord::new(SourceKind::ArchiveEvents, MatchKeys {
    id: forkee.id.map(RepoId),
    path,
  });
  rec.observed_at = observed_at;
  rec.fork = Tri::Present(ForkInfo { parent, root: None });
  rec.repo_created = forkee.created_at.as_deref().and_then(parse_timestamp);
  if let Some(private) = forkee.private {
    rec.is_visible = Tri::Present(!private);
  }
  Some(rec)
}

/// The records one event yields: one for the event's repository, plus one
/// for the new repository when the event is a fork.
fn event_records(line: u64, event: Event) -> Result<Vec<SourceRecord>> {
  let keys = event_keys(&event)
    .ok_or_else(|| Error::malformed(line, "event does not identify a repository"))?;
  let observed_at = event.created_at.as_deref().and_then(parse_timestamp);

  let mut rec = SourceRecord::new(SourceKind::ArchiveEvents, keys);
  rec.source_key = event.kind.clone();
  rec.observed_at = observed_at;
  if let Some(public) = event.public {
    rec.is_visible = Tri::Present(public);
  }

  let mut out = Vec::with_capacity(2);
  match event.kind.as_deref() {
    Some("PushEvent") => rec.repo_pushed = observed_at,
    Some("ReleaseEvent") => rec.content_type = Tri::Present(ContentType::Nonempty),
    Some("ForkEvent") => {
      if let Some(forkee) = event
        .payload
        .forkee
        .as_ref()
        .and_then(|f| forkee_record(rec.keys.path.clone(), f, observed_at))
      {
        out.push(forkee);
      }
    }
    _ => {}
  }
  out.insert(0, rec);
  Ok(out)
}

/// Extract the records carried by each event.
pub fn archive_records<'a, R: BufRead + 'a>(
  reader: R,
) -> impl Iterator<Item = Result<SourceRecord>> + 'a {
  json_lines::<_, Event>(reader).flat_map(|item| {
    let records = item.and_then(|(line, event)| event_records(line, event));
    match records {
      Ok(records) => records.into_iter().map(Ok).collect::<Vec<_>>(),
      Err(e) => vec![Err(e)],
    }
  })
}
