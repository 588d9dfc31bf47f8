//! JSON REST API for Parley.
//!
//! Exposes an axum [`Router`] backed by any [`ForumStore`]. Every route
//! requires HTTP Basic auth against the configured accounts.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use parley_core::{clock::Clock, store::ForumStore};
use tower_http::trace::TraceLayer;

pub use config::{AccountConfig, ServerConfig};
pub use error::ApiError;
use handlers::{replies, topics, votes};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub clock:  Arc<dyn Clock>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      config: self.config.clone(),
      clock:  self.clock.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ForumStore + 'static,
{
  Router::new()
    // Votes
    .route("/votes", post(votes::cast::<S>))
    .route("/votes/{subject_type}/{subject_id}", get(votes::get_one::<S>))
    // Topics
    .route("/topics", post(topics::create::<S>))
    .route("/topics/{id}", get(topics::get_one::<S>).patch(topics::update::<S>))
    .route("/topics/{id}/accept", post(topics::accept::<S>))
    .route(
      "/topics/{id}/replies",
      get(replies::thread::<S>).post(replies::create::<S>),
    )
    // Replies
    .route(
      "/replies/{id}",
      get(replies::get_one::<S>)
        .patch(replies::edit::<S>)
        .delete(replies::delete::<S>),
    )
    .route("/replies/{id}/hide", post(replies::hide::<S>))
    .route("/replies/{id}/unhide", post(replies::unhide::<S>))
    .route("/replies/{id}/move", post(replies::move_reply::<S>))
    .route("/replies/{id}/revisions", get(replies::revisions::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
  use std::path::PathBuf;

  use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString,
  };
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use parley_core::{
    actor::Role, clock::SystemClock, reply::ReplyPolicy, thread::MAX_TREE_DEPTH,
  };
  use parley_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  /// An argon2 hash with minimal cost parameters; verification reads the
  /// parameters back out of the PHC string, so tests stay fast.
  pub(crate) fn cheap_hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  pub(crate) fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  fn account(username: &str, id: u128, role: Role, can_downvote: Option<bool>) -> AccountConfig {
    AccountConfig {
      username: username.into(),
      password_hash: cheap_hash("secret"),
      user_id: Uuid::from_u128(id),
      role,
      can_downvote,
    }
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    AppState {
      store:  Arc::new(store),
      config: Arc::new(ServerConfig {
        host:       "127.0.0.1".into(),
        port:       8080,
        store_path: PathBuf::from(":memory:"),
        policy:     ReplyPolicy::default(),
        accounts:   vec![
          account("alice", 1, Role::Member, None),
          account("bob", 2, Role::Member, None),
          account("carol", 3, Role::Member, Some(true)),
          account("mod", 4, Role::Moderator, None),
        ],
      }),
      clock:  Arc::new(SystemClock),
    }
  }

  async fn call(
    state: &AppState<SqliteStore>,
    user: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(header::AUTHORIZATION, basic(user, "secret"));
    }
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp: Response = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn new_topic(state: &AppState<SqliteStore>, user: &str, kind: &str) -> String {
    let (status, topic) = call(
      state,
      Some(user),
      "POST",
      "/topics",
      Some(json!({ "kind": kind, "title": "Borrow checker woes" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    topic["topic_id"].as_str().unwrap().to_owned()
  }

  async fn new_reply(
    state: &AppState<SqliteStore>,
    user: &str,
    topic: &str,
    parent: Option<&str>,
    content: &str,
  ) -> String {
    let (status, reply) = call(
      state,
      Some(user),
      "POST",
      &format!("/topics/{topic}/replies"),
      Some(json!({ "parent_reply_id": parent, "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{reply}");
    reply["reply_id"].as_str().unwrap().to_owned()
  }

  // ── Auth ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unauthenticated_requests_return_401() {
    let state = make_state().await;
    let req = Request::builder()
      .uri(format!("/topics/{}", Uuid::new_v4()))
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  // ── Votes ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn vote_toggle_and_standing() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let reply = new_reply(&state, "alice", &topic, None, "hello world").await;
    let vote = |value: i64| json!({ "subject_type": "reply", "subject_id": reply, "value": value });

    let (status, body) = call(&state, Some("bob"), "POST", "/votes", Some(vote(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "score": 1, "user_vote": 1 }));

    let (_, body) = call(&state, Some("bob"), "POST", "/votes", Some(vote(1))).await;
    assert_eq!(body, json!({ "score": 0, "user_vote": 0 }));

    let (status, body) = call(&state, Some("bob"), "POST", "/votes", Some(vote(-1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient_standing");

    let (status, body) = call(&state, Some("carol"), "POST", "/votes", Some(vote(-1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "score": -1, "user_vote": -1 }));

    let (status, body) = call(&state, Some("carol"), "POST", "/votes", Some(vote(2))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_value");

    let (status, body) =
      call(&state, Some("carol"), "GET", &format!("/votes/reply/{reply}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "score": -1, "user_vote": -1 }));
  }

  #[tokio::test]
  async fn vote_on_missing_subject_is_404() {
    let state = make_state().await;
    let body = json!({ "subject_type": "topic", "subject_id": Uuid::new_v4(), "value": 1 });
    let (status, body) = call(&state, Some("bob"), "POST", "/votes", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
  }

  // ── Threads ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn thread_as_tree_and_flat() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let r1 = new_reply(&state, "alice", &topic, None, "first reply").await;
    let r2 = new_reply(&state, "bob", &topic, None, "second reply").await;
    new_reply(&state, "carol", &topic, Some(&r1), "nested reply").await;
    for user in ["alice", "bob", "carol"] {
      let body = json!({ "subject_type": "reply", "subject_id": r2, "value": 1 });
      call(&state, Some(user), "POST", "/votes", Some(body)).await;
    }

    let (status, tree) = call(
      &state,
      Some("bob"),
      "GET",
      &format!("/topics/{topic}/replies?sort=most_voted"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree[0]["reply_id"], r2.as_str());
    assert_eq!(tree[0]["score"], 3);
    assert_eq!(tree[1]["reply_id"], r1.as_str());
    assert_eq!(tree[1]["children"].as_array().unwrap().len(), 1);

    let (_, flat) = call(
      &state,
      Some("bob"),
      "GET",
      &format!("/topics/{topic}/replies?sort=oldest&max_depth=0"),
      None,
    )
    .await;
    let flat = flat.as_array().unwrap();
    assert_eq!(flat.len(), 3);
    assert_eq!(flat[1]["depth"], 1);
    assert_eq!(flat[1]["display_level"], 0);
  }

  #[tokio::test]
  async fn missing_topic_is_404() {
    let state = make_state().await;
    let (status, body) = call(
      &state,
      Some("alice"),
      "GET",
      &format!("/topics/{}/replies", Uuid::new_v4()),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
  }

  #[tokio::test]
  async fn deep_threads_are_served_flat_only() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let mut parent = new_reply(&state, "alice", &topic, None, "level 0").await;
    for level in 1..=MAX_TREE_DEPTH + 1 {
      let content = format!("level {level}");
      parent = new_reply(&state, "bob", &topic, Some(parent.as_str()), &content).await;
    }

    let path = format!("/topics/{topic}/replies");
    let (status, body) = call(&state, Some("alice"), "GET", &path, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "thread_too_deep");

    let (status, flat) =
      call(&state, Some("alice"), "GET", &format!("{path}?max_depth=4"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flat.as_array().unwrap().len(), MAX_TREE_DEPTH + 2);
  }

  // ── Reply lifecycle ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn edit_delete_and_revisions() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let reply = new_reply(&state, "alice", &topic, None, "original text").await;
    let path = format!("/replies/{reply}");

    let (status, body) =
      call(&state, Some("bob"), "PATCH", &path, Some(json!({ "content": "hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_author");

    let (status, body) =
      call(&state, Some("alice"), "PATCH", &path, Some(json!({ "content": "edited text" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "edited text");

    let (status, _) = call(&state, Some("alice"), "DELETE", &path, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&state, Some("alice"), "DELETE", &path, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_deleted");

    let history = |user: &'static str| {
      let state = state.clone();
      let path = format!("{path}/revisions");
      async move {
        let (status, body) = call(&state, Some(user), "GET", &path, None).await;
        assert_eq!(status, StatusCode::OK);
        body
          .as_array()
          .unwrap()
          .iter()
          .map(|r| {
            (
              r["kind"].as_str().unwrap().to_owned(),
              r["previous_content"].as_str().unwrap().to_owned(),
            )
          })
          .collect::<Vec<_>>()
      }
    };

    // The tombstone must not be undone by reading the history.
    assert_eq!(history("bob").await, vec![
      ("author_edit".to_owned(), "[redacted]".to_owned()),
      ("deletion".to_owned(), "[redacted]".to_owned()),
    ]);
    assert_eq!(history("alice").await, vec![
      ("author_edit".to_owned(), "original text".to_owned()),
      ("deletion".to_owned(), "edited text".to_owned()),
    ]);
    let for_moderator = history("mod").await;
    assert_eq!(for_moderator[1].1, "edited text");
  }

  #[tokio::test]
  async fn short_content_is_rejected() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let (status, body) = call(
      &state,
      Some("alice"),
      "POST",
      &format!("/topics/{topic}/replies"),
      Some(json!({ "content": " x " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "content_too_short");
  }

  #[tokio::test]
  async fn moderation_routes() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let a = new_reply(&state, "alice", &topic, None, "parent reply").await;
    let b = new_reply(&state, "bob", &topic, Some(&a), "child reply").await;

    let (status, _) =
      call(&state, Some("alice"), "POST", &format!("/replies/{b}/hide"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) =
      call(&state, Some("mod"), "POST", &format!("/replies/{b}/hide"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_hidden"], true);

    let (_, seen_by_alice) =
      call(&state, Some("alice"), "GET", &format!("/replies/{b}"), None).await;
    assert_eq!(seen_by_alice["content"], parley_core::reply::HIDDEN_MARKER);
    let (_, seen_by_bob) =
      call(&state, Some("bob"), "GET", &format!("/replies/{b}"), None).await;
    assert_eq!(seen_by_bob["content"], "child reply");

    let (status, body) = call(
      &state,
      Some("mod"),
      "POST",
      &format!("/replies/{a}/move"),
      Some(json!({ "parent_reply_id": b })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "reparent_cycle");

    let (status, body) = call(
      &state,
      Some("mod"),
      "PATCH",
      &format!("/topics/{topic}"),
      Some(json!({ "locked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_locked"], true);

    let (status, body) = call(
      &state,
      Some("bob"),
      "POST",
      &format!("/topics/{topic}/replies"),
      Some(json!({ "content": "after the lock" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "topic_locked");
  }

  // ── Acceptance ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn accept_moves_between_answers() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "question").await;
    let a = new_reply(&state, "bob", &topic, None, "answer a").await;
    let b = new_reply(&state, "carol", &topic, None, "answer b").await;
    let accept = format!("/topics/{topic}/accept");

    let (status, body) =
      call(&state, Some("bob"), "POST", &accept, Some(json!({ "reply_id": a }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_authorized");

    call(&state, Some("alice"), "POST", &accept, Some(json!({ "reply_id": a }))).await;
    let (status, body) =
      call(&state, Some("alice"), "POST", &accept, Some(json!({ "reply_id": b }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted_answer_id"], b.as_str());

    let (_, tree) =
      call(&state, Some("alice"), "GET", &format!("/topics/{topic}/replies"), None).await;
    let accepted: Vec<_> = tree
      .as_array()
      .unwrap()
      .iter()
      .filter(|n| n["is_accepted"] == true)
      .map(|n| n["reply_id"].as_str().unwrap().to_owned())
      .collect();
    assert_eq!(accepted, vec![b]);
  }

  #[tokio::test]
  async fn accept_on_discussion_is_rejected() {
    let state = make_state().await;
    let topic = new_topic(&state, "alice", "discussion").await;
    let a = new_reply(&state, "bob", &topic, None, "an answer").await;
    let (status, body) = call(
      &state,
      Some("alice"),
      "POST",
      &format!("/topics/{topic}/accept"),
      Some(json!({ "reply_id": a })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_question_type");
  }
}
