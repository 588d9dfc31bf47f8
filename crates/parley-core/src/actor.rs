//! The identity on whose behalf a mutation runs.
//!
//! Identity and role lookup belong to an external collaborator; this crate
//! only consumes the resolved [`Actor`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Member,
  Moderator,
  Admin,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id:      Uuid,
  pub role:         Role,
  /// Externally supplied standing required to cast a downvote.
  pub can_downvote: bool,
}

impl Actor {
  pub fn member(user_id: Uuid) -> Self {
    Self { user_id, role: Role::Member, can_downvote: false }
  }

  pub fn moderator(user_id: Uuid) -> Self {
    Self { user_id, role: Role::Moderator, can_downvote: true }
  }

  pub fn with_downvote(mut self, allowed: bool) -> Self {
    self.can_downvote = allowed;
    self
  }

  pub fn is_moderator(&self) -> bool {
    matches!(self.role, Role::Moderator | Role::Admin)
  }

  pub fn is(&self, user_id: Uuid) -> bool { self.user_id == user_id }
}
