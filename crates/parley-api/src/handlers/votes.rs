//! Handlers for `/votes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/votes` | Body: [`CastVoteBody`]; toggles like the ledger |
//! | `GET`  | `/votes/{subject_type}/{subject_id}` | Score plus the caller's vote |

use axum::{
  Json,
  extract::{Path, State},
};
use parley_core::{
  ledger::VoteLedger,
  store::ForumStore,
  subject::{SubjectRef, SubjectType},
  vote::{VoteSummary, VoteValue},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CastVoteBody {
  pub subject_type: SubjectType,
  pub subject_id:   Uuid,
  /// Kept as a raw integer so that out-of-range values surface as
  /// `invalid_value` rather than a generic body rejection.
  pub value:        i64,
}

/// `POST /votes`
pub async fn cast<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Json(body): Json<CastVoteBody>,
) -> Result<Json<VoteSummary>, ApiError>
where
  S: ForumStore + 'static,
{
  let requested = VoteValue::try_from(body.value)?;
  let subject = SubjectRef { subject_type: body.subject_type, subject_id: body.subject_id };
  let summary = VoteLedger::new(&*state.store, &*state.clock)
    .cast_vote(&actor, subject, requested)
    .await?;
  Ok(Json(summary))
}

/// `GET /votes/{subject_type}/{subject_id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path((subject_type, subject_id)): Path<(SubjectType, Uuid)>,
) -> Result<Json<VoteSummary>, ApiError>
where
  S: ForumStore + 'static,
{
  let summary = VoteLedger::new(&*state.store, &*state.clock)
    .summary(SubjectRef { subject_type, subject_id }, actor.user_id)
    .await?;
  Ok(Json(summary))
}
