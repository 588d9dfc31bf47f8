//! Async HTTP client wrapping the Parley JSON API.
//!
//! Implements the reconciler transports, so the optimistic vote and edit
//! flows run directly against a server.

use std::time::Duration;

use parley_core::{
  flatten::FlatReply,
  reconcile::{EditTransport, VoteTransport},
  reply::Reply,
  subject::SubjectRef,
  thread::SortMode,
  vote::{VoteSummary, VoteValue},
};
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Connection settings for the Parley API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with an error body.
  #[error("{code} ({status}): {message}")]
  Api {
    status:  u16,
    code:    String,
    message: String,
  },
}

#[derive(Deserialize)]
struct ErrorBody {
  error:   String,
  #[serde(default)]
  message: String,
}

/// Async HTTP client for the Parley JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Decode a success body, or turn an error body into [`ClientError::Api`].
  async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp.json().await?);
    }
    let body: ErrorBody = resp.json().await.unwrap_or(ErrorBody {
      error:   "http_error".into(),
      message: status.to_string(),
    });
    Err(ClientError::Api {
      status:  status.as_u16(),
      code:    body.error,
      message: body.message,
    })
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  /// `GET /votes/{subject_type}/{subject_id}`
  pub async fn vote_summary(&self, subject: SubjectRef) -> Result<VoteSummary, ClientError> {
    let path = format!("/votes/{}/{}", subject.subject_type, subject.subject_id);
    let resp = self.auth(self.client.get(self.url(&path))).send().await?;
    Self::decode(resp).await
  }

  /// `POST /votes`
  pub async fn cast(
    &self,
    subject: SubjectRef,
    requested: VoteValue,
  ) -> Result<VoteSummary, ClientError> {
    let body = json!({
      "subject_type": subject.subject_type,
      "subject_id":   subject.subject_id,
      "value":        requested.as_i8(),
    });
    let resp = self
      .auth(self.client.post(self.url("/votes")))
      .json(&body)
      .send()
      .await?;
    Self::decode(resp).await
  }

  // ── Replies ───────────────────────────────────────────────────────────────

  /// `GET /topics/{id}/replies?sort=..&max_depth=..`
  pub async fn thread(
    &self,
    topic_id: Uuid,
    sort: SortMode,
    max_depth: usize,
  ) -> Result<Vec<FlatReply>, ClientError> {
    let sort = match sort {
      SortMode::Oldest => "oldest",
      SortMode::Newest => "newest",
      SortMode::MostVoted => "most_voted",
    };
    let resp = self
      .auth(self.client.get(self.url(&format!("/topics/{topic_id}/replies"))))
      .query(&[("sort", sort.to_string()), ("max_depth", max_depth.to_string())])
      .send()
      .await?;
    Self::decode(resp).await
  }

  /// `GET /replies/{id}`
  pub async fn reply(&self, reply_id: Uuid) -> Result<Reply, ClientError> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/replies/{reply_id}"))))
      .send()
      .await?;
    Self::decode(resp).await
  }

  /// `PATCH /replies/{id}`
  pub async fn edit(&self, reply_id: Uuid, content: String) -> Result<Reply, ClientError> {
    let resp = self
      .auth(self.client.patch(self.url(&format!("/replies/{reply_id}"))))
      .json(&json!({ "content": content }))
      .send()
      .await?;
    Self::decode(resp).await
  }
}

// ─── Transports ──────────────────────────────────────────────────────────────

impl VoteTransport for ApiClient {
  type Error = ClientError;

  async fn fetch_vote(&self, subject: SubjectRef) -> Result<VoteSummary, ClientError> {
    self.vote_summary(subject).await
  }

  async fn cast_vote(
    &self,
    subject: SubjectRef,
    requested: VoteValue,
  ) -> Result<VoteSummary, ClientError> {
    self.cast(subject, requested).await
  }
}

impl EditTransport for ApiClient {
  type Error = ClientError;

  async fn fetch_reply(&self, reply_id: Uuid) -> Result<Reply, ClientError> {
    self.reply(reply_id).await
  }

  async fn edit_reply(&self, reply_id: Uuid, content: String) -> Result<Reply, ClientError> {
    self.edit(reply_id, content).await
  }
}
