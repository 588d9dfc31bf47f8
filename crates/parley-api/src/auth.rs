//! HTTP Basic-auth extractor resolving the caller's [`Actor`].

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use parley_core::{actor::Actor, store::ForumStore};
use rand_core::OsRng;
use tracing::debug;

use crate::{AppState, config::AccountConfig, error::ApiError};

/// The authenticated caller. Present in a handler means the request carried
/// valid credentials for a configured account.
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

/// Produce the argon2id PHC string stored as an account's `password_hash`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify Basic credentials against `accounts` and resolve the actor.
pub fn verify_auth(
  headers: &HeaderMap,
  accounts: &[AccountConfig],
) -> Result<Actor, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  let account = accounts
    .iter()
    .find(|a| a.username == username)
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| {
      debug!(%username, "password mismatch");
      ApiError::Unauthorized
    })?;

  Ok(account.actor())
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: ForumStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.config.accounts).map(Caller)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::{HeaderValue, header};
  use parley_core::actor::Role;
  use uuid::Uuid;

  use super::*;
  use crate::tests::{basic, cheap_hash};

  fn accounts() -> Vec<AccountConfig> {
    vec![AccountConfig {
      username:      "alice".into(),
      password_hash: cheap_hash("secret"),
      user_id:       Uuid::from_u128(1),
      role:          Role::Member,
      can_downvote:  None,
    }]
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn correct_credentials_resolve_the_actor() {
    let actor = verify_auth(&headers(&basic("alice", "secret")), &accounts()).unwrap();
    assert_eq!(actor.user_id, Uuid::from_u128(1));
    assert!(!actor.can_downvote);
  }

  #[test]
  fn wrong_password() {
    let res = verify_auth(&headers(&basic("alice", "wrong")), &accounts());
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn unknown_user() {
    let res = verify_auth(&headers(&basic("mallory", "secret")), &accounts());
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn missing_header() {
    let res = verify_auth(&HeaderMap::new(), &accounts());
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let res = verify_auth(&headers("Basic !!!not-base64!!!"), &accounts());
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn generated_hashes_verify() {
    let mut accounts = accounts();
    accounts[0].password_hash = hash_password("correct horse").unwrap();
    assert!(accounts[0].password_hash.starts_with("$argon2id$"));

    let actor = verify_auth(&headers(&basic("alice", "correct horse")), &accounts);
    assert!(actor.is_ok());
    let res = verify_auth(&headers(&basic("alice", "secret")), &accounts);
    assert!(matches!(res, Err(ApiError::Unauthorized)));
  }
}
