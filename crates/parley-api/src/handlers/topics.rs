//! Handlers for `/topics` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/topics` | Body: [`NewTopic`]; returns 201 + topic |
//! | `GET`   | `/topics/{id}` | |
//! | `PATCH` | `/topics/{id}` | Body: [`TopicFlagsBody`]; moderators only |
//! | `POST`  | `/topics/{id}/accept` | Body: `{"reply_id": "..."}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use parley_core::{
  acceptance::AcceptanceController,
  store::ForumStore,
  topic::{NewTopic, Topic},
  topics::TopicService,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError};

/// `POST /topics`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Json(body): Json<NewTopic>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ForumStore + 'static,
{
  let topic = TopicService::new(&*state.store, &*state.clock)
    .create(&actor, body)
    .await?;
  Ok((StatusCode::CREATED, Json(topic)))
}

/// `GET /topics/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Topic>, ApiError>
where
  S: ForumStore + 'static,
{
  let topic = TopicService::new(&*state.store, &*state.clock).get(id).await?;
  Ok(Json(topic))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicFlagsBody {
  pub locked: Option<bool>,
  pub pinned: Option<bool>,
}

/// `PATCH /topics/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<TopicFlagsBody>,
) -> Result<Json<Topic>, ApiError>
where
  S: ForumStore + 'static,
{
  let topic = TopicService::new(&*state.store, &*state.clock)
    .set_flags(&actor, id, body.locked, body.pinned)
    .await?;
  Ok(Json(topic))
}

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
  pub reply_id: Uuid,
}

/// `POST /topics/{id}/accept`
pub async fn accept<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<AcceptBody>,
) -> Result<Json<Topic>, ApiError>
where
  S: ForumStore + 'static,
{
  let topic = AcceptanceController::new(&*state.store)
    .accept(&actor, id, body.reply_id)
    .await?;
  Ok(Json(topic))
}
