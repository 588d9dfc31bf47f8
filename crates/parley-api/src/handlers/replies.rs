//! Handlers for reply endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/topics/{id}/replies` | `?sort=oldest\|newest\|most_voted[&max_depth=N]` |
//! | `POST`   | `/topics/{id}/replies` | Body: [`CreateReplyBody`]; returns 201 + reply |
//! | `GET`    | `/replies/{id}` | Hidden content masked for other members |
//! | `PATCH`  | `/replies/{id}` | Body: `{"content": "...", "reason": "..."}` |
//! | `DELETE` | `/replies/{id}` | Soft delete; 204 |
//! | `POST`   | `/replies/{id}/hide`, `/replies/{id}/unhide` | Moderators only |
//! | `POST`   | `/replies/{id}/move` | Body: `{"parent_reply_id": null \| "..."}` |
//! | `GET`    | `/replies/{id}/revisions` | Oldest first |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use parley_core::{
  flatten::{FlatReply, flatten},
  replies::ReplyService,
  reply::{NewReply, Reply, ReplyRevision},
  store::ForumStore,
  thread::{SortMode, ThreadNode, check_tree_depth},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError};

fn service<S: ForumStore>(state: &AppState<S>) -> ReplyService<'_, S> {
  ReplyService::new(&*state.store, &*state.clock, &state.config.policy)
}

// ─── Thread ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ThreadParams {
  #[serde(default)]
  pub sort:      SortMode,
  /// When set, return a flat pre-order list with display levels capped here.
  pub max_depth: Option<usize>,
}

/// Either shape of `GET /topics/{id}/replies`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ThreadView {
  Tree(Vec<ThreadNode>),
  Flat(Vec<FlatReply>),
}

/// `GET /topics/{id}/replies`
pub async fn thread<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(topic_id): Path<Uuid>,
  Query(params): Query<ThreadParams>,
) -> Result<Json<ThreadView>, ApiError>
where
  S: ForumStore + 'static,
{
  let forest = service(&state).thread(&actor, topic_id, params.sort).await?;
  let view = match params.max_depth {
    Some(max_depth) => ThreadView::Flat(flatten(&forest, max_depth)),
    None => {
      check_tree_depth(topic_id, &forest)?;
      ThreadView::Tree(forest)
    }
  };
  Ok(Json(view))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateReplyBody {
  pub parent_reply_id: Option<Uuid>,
  pub content:         String,
  pub quoted_reply_id: Option<Uuid>,
}

/// `POST /topics/{id}/replies`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(topic_id): Path<Uuid>,
  Json(body): Json<CreateReplyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ForumStore + 'static,
{
  let input = NewReply {
    topic_id,
    parent_reply_id: body.parent_reply_id,
    content: body.content,
    quoted_reply_id: body.quoted_reply_id,
  };
  let reply = service(&state).create(&actor, input).await?;
  Ok((StatusCode::CREATED, Json(reply)))
}

/// `GET /replies/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Reply>, ApiError>
where
  S: ForumStore + 'static,
{
  let reply = service(&state).get(id).await?;
  Ok(Json(reply.redact_for(&actor)))
}

// ─── Mutations ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub content: String,
  /// Recorded on moderation edits.
  pub reason:  Option<String>,
}

/// `PATCH /replies/{id}`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<EditBody>,
) -> Result<Json<Reply>, ApiError>
where
  S: ForumStore + 'static,
{
  let reply = service(&state)
    .update(&actor, id, &body.content, body.reason)
    .await?;
  Ok(Json(reply))
}

/// `DELETE /replies/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ForumStore + 'static,
{
  service(&state).soft_delete(&actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /replies/{id}/hide`
pub async fn hide<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Reply>, ApiError>
where
  S: ForumStore + 'static,
{
  Ok(Json(service(&state).set_hidden(&actor, id, true).await?))
}

/// `POST /replies/{id}/unhide`
pub async fn unhide<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Reply>, ApiError>
where
  S: ForumStore + 'static,
{
  Ok(Json(service(&state).set_hidden(&actor, id, false).await?))
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
  pub parent_reply_id: Option<Uuid>,
}

/// `POST /replies/{id}/move`
pub async fn move_reply<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<MoveBody>,
) -> Result<Json<Reply>, ApiError>
where
  S: ForumStore + 'static,
{
  let reply = service(&state)
    .reparent(&actor, id, body.parent_reply_id)
    .await?;
  Ok(Json(reply))
}

/// `GET /replies/{id}/revisions`
pub async fn revisions<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReplyRevision>>, ApiError>
where
  S: ForumStore + 'static,
{
  Ok(Json(service(&state).revisions(&actor, id).await?))
}
