//! Remote progress API client.
//!
//! Two calls only: `GET {base}/progress/` and
//! `POST {base}/update-progress/`. Both carry an opaque session credential
//! issued by the authentication layer; we forward it as a cookie header and
//! never inspect or log it.
//!
//! The trait keeps the store testable against an in-memory double; the HTTP
//! implementation is the production collaborator.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::domain::LessonId;
use crate::util::trunc_for_log;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

const UA: &str = "academy-client/0.1";

/// Wire shape of `GET progress`. Every field defaults: a sparse or slightly
/// older server payload still deserializes.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProgressPayload {
  #[serde(default)]
  pub completed_lessons: Vec<LessonId>,
  #[serde(default)]
  pub progress: BTreeMap<LessonId, RecordPayload>,
  #[serde(default)]
  pub certification_earned: bool,
  #[serde(default)]
  pub certification_date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecordPayload {
  #[serde(default)]
  pub score: u32,
  #[serde(default)]
  pub completed: bool,
  #[serde(default)]
  pub completed_at: Option<String>,
}

#[derive(Serialize)]
struct UpdateProgressReq {
  lesson_id: LessonId,
  score: u32,
}

/// The remote progress collaborator, abstract so tests (and offline builds)
/// can substitute their own.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
  async fn fetch_progress(&self) -> Result<ProgressPayload, String>;

  /// Ok(true) = confirmed write, Ok(false) = server rejected the update,
  /// Err = transport failure. Writes are idempotent per (learner, lesson),
  /// so replaying a completion later is safe.
  async fn push_completion(&self, lesson: LessonId, score: u32) -> Result<bool, String>;
}

#[derive(Clone)]
pub struct HttpProgressApi {
  client: reqwest::Client,
  base_url: String,
  session_cookie: String,
}

impl HttpProgressApi {
  /// `session_cookie` is the opaque credential from the auth layer, already
  /// formatted as a cookie header value.
  pub fn new(base_url: impl Into<String>, session_cookie: impl Into<String>) -> Result<Self, String> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| e.to_string())?;

    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      session_cookie: session_cookie.into(),
    })
  }

  /// Construct the client if we find ACADEMY_SESSION_COOKIE; otherwise None
  /// (the store then runs on the session cache alone).
  pub fn from_env() -> Option<Self> {
    let session_cookie = std::env::var("ACADEMY_SESSION_COOKIE").ok()?;
    let base_url =
      std::env::var("ACADEMY_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());

    match Self::new(base_url, session_cookie) {
      Ok(api) => Some(api),
      Err(e) => {
        error!(target: "academy_client", error = %e, "Failed to build HTTP client for the progress API");
        None
      }
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }
}

#[async_trait]
impl ProgressBackend for HttpProgressApi {
  #[instrument(level = "info", skip(self))]
  async fn fetch_progress(&self) -> Result<ProgressPayload, String> {
    let url = format!("{}/progress/", self.base_url);
    let res = self
      .client
      .get(&url)
      .header(USER_AGENT, UA)
      .header(COOKIE, &self.session_cookie)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(format!("progress API HTTP {}: {}", status, trunc_for_log(&msg, 200)));
    }

    let payload: ProgressPayload = res.json().await.map_err(|e| e.to_string())?;
    info!(
      target: "progress",
      completed = payload.completed_lessons.len(),
      certified = payload.certification_earned,
      "Fetched server progress"
    );
    Ok(payload)
  }

  #[instrument(level = "info", skip(self), fields(%lesson, score))]
  async fn push_completion(&self, lesson: LessonId, score: u32) -> Result<bool, String> {
    let url = format!("{}/update-progress/", self.base_url);
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(COOKIE, &self.session_cookie)
      .json(&UpdateProgressReq { lesson_id: lesson, score })
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if res.status().is_success() {
      info!(target: "progress", %lesson, "Completion accepted by server");
      return Ok(true);
    }

    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let msg = extract_api_error(&body).unwrap_or(body);
    error!(
      target: "progress",
      %lesson,
      %status,
      error = %trunc_for_log(&msg, 200),
      "Server rejected completion update"
    );
    Ok(false)
  }
}

/// Try to extract a clean message from an API error body (`{"error": "..."}`).
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: String,
  }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error),
    Err(_) => None,
  }
}
