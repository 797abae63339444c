//! Visibility probes: asking the hosting service whether a repository is
//! publicly reachable right now.

use std::{future::Future, time::Duration};

use hoard_core::record::RepoPath;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::{Result, config::ProbeConfig};

/// Answers "is this repository publicly visible?". `None` means the question
/// could not be answered, which leaves the stored visibility unknown.
pub trait VisibilityProbe: Send + Sync {
  fn is_visible<'a>(
    &'a self,
    path: &'a RepoPath,
  ) -> impl Future<Output = Option<bool>> + Send + 'a;
}

/// The outcome of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
  Visible,
  Hidden,
  /// Rate limiting, server errors, network failures: worth one retry.
  Transient,
}

fn classify(status: StatusCode) -> Answer {
  match status {
    s if s.is_success() || s.is_redirection() => Answer::Visible,
    StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
      Answer::Hidden
    }
    _ => Answer::Transient,
  }
}

/// Probes `HEAD <base_url>/<owner>/<name>`, retrying once after
/// `retry_delay` when the first answer is inconclusive.
#[derive(Clone)]
pub struct HttpProbe {
  client:      Client,
  base_url:    String,
  retry_delay: Duration,
}

impl HttpProbe {
  pub fn new(config: &ProbeConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_owned(),
      retry_delay: Duration::from_millis(config.retry_delay_ms),
    })
  }

  fn url(&self, path: &RepoPath) -> String {
    format!("{}/{}/{}", self.base_url, path.owner, path.name)
  }

  async fn ask(&self, url: &str) -> Answer {
    match self.client.head(url).send().await {
      Ok(resp) => classify(resp.status()),
      Err(e) => {
        debug!(url, error = %e, "visibility request failed");
        Answer::Transient
      }
    }
  }
}

impl VisibilityProbe for HttpProbe {
  async fn is_visible<'a>(&'a self, path: &'a RepoPath) -> Option<bool> {
    let url = self.url(path);
    let mut answer = self.ask(&url).await;
    if answer == Answer::Transient {
      tokio::time::sleep(self.retry_delay).await;
      answer = self.ask(&url).await;
    }
    match answer {
      Answer::Visible => Some(true),
      Answer::Hidden => Some(false),
      Answer::Transient => {
        warn!("*** visibility unknown: {path} did not answer after a retry");
        None
      }
    }
  }
}
