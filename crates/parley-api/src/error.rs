//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"error": "<code>", "message": "<text>"}`.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use parley_core::ErrorClass;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] parley_core::Error),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(e) if e.is_not_found() => StatusCode::NOT_FOUND,
      ApiError::Core(e) => match e.class() {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::Authorization => StatusCode::FORBIDDEN,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Invariant | ErrorClass::Store => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Unauthorized => "unauthorized",
      ApiError::BadRequest(_) => "bad_request",
      ApiError::Core(e) => e.code(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(code = self.code(), error = %self, "request failed");
    }

    let body = Json(json!({ "error": self.code(), "message": self.to_string() }));
    let mut res = (status, body).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"parley\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use parley_core::Error;
  use uuid::Uuid;

  use super::*;

  #[test]
  fn status_follows_error_class() {
    let cases = [
      (Error::InvalidValue(2), StatusCode::BAD_REQUEST),
      (Error::TopicNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
      (Error::InsufficientStanding, StatusCode::FORBIDDEN),
      (Error::TopicLocked(Uuid::nil()), StatusCode::CONFLICT),
      (
        Error::ReparentCycle { reply_id: Uuid::nil(), new_parent: Uuid::nil() },
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }
}
