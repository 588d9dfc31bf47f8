//! Error types for `parley-core`.
//!
//! Every variant carries a stable machine code ([`Error::code`]) that the HTTP
//! layer puts on the wire, and an [`ErrorClass`] that decides whether the
//! caller may retry.

use thiserror::Error;
use uuid::Uuid;

use crate::subject::SubjectRef;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  /// Rejected before any state change; safe to retry with corrected input.
  Validation,
  /// Terminal for this request; the client must not auto-retry.
  Authorization,
  /// The target changed or vanished underneath the caller.
  Conflict,
  /// A structural invariant would be broken. Indicates a bug upstream.
  Invariant,
  /// The storage backend failed.
  Store,
}

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("vote value {0} is outside {{-1, 0, 1}}")]
  InvalidValue(i64),

  #[error("content is too short ({len} < {min} characters)")]
  ContentTooShort { len: usize, min: usize },

  #[error("content is too long ({len} > {max} characters)")]
  ContentTooLong { len: usize, max: usize },

  #[error("parent reply not found in this topic: {0}")]
  ParentNotFound(Uuid),

  #[error("quoted reply not found in this topic: {0}")]
  QuotedReplyNotFound(Uuid),

  #[error(
    "thread of topic {topic_id} nests {depth} levels, deeper than the {limit} \
     a tree response allows; request a flat view with max_depth"
  )]
  ThreadTooDeep { topic_id: Uuid, depth: usize, limit: usize },

  #[error("topic not found: {0}")]
  TopicNotFound(Uuid),

  #[error("reply not found: {0}")]
  ReplyNotFound(Uuid),

  // ── Authorization ───────────────────────────────────────────────────────
  #[error("downvoting requires additional standing")]
  InsufficientStanding,

  #[error("the edit window for reply {0} has expired")]
  EditWindowExpired(Uuid),

  #[error("only the author may modify reply {0}")]
  NotAuthor(Uuid),

  #[error("not authorized")]
  NotAuthorized,

  // ── Conflict ────────────────────────────────────────────────────────────
  #[error("subject not found: {0}")]
  SubjectNotFound(SubjectRef),

  #[error("topic {0} is locked")]
  TopicLocked(Uuid),

  #[error("reply {0} is deleted")]
  AlreadyDeleted(Uuid),

  #[error("topic {0} is not a question")]
  NotQuestionType(Uuid),

  #[error("reply {reply_id} does not belong to topic {topic_id}")]
  ReplyNotInTopic { topic_id: Uuid, reply_id: Uuid },

  #[error("acceptance of reply {reply_id} on topic {topic_id} lost a race")]
  AcceptanceConflict { topic_id: Uuid, reply_id: Uuid },

  // ── Invariant ───────────────────────────────────────────────────────────
  #[error("moving reply {reply_id} under {new_parent} would create a cycle")]
  ReparentCycle { reply_id: Uuid, new_parent: Uuid },

  #[error("{count} replies in topic {topic_id} are unreachable from any root")]
  UnreachableReplies { topic_id: Uuid, count: usize },

  // ── Store ───────────────────────────────────────────────────────────────
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Stable wire code for this error.
  pub fn code(&self) -> &'static str {
    match self {
      Self::InvalidValue(_) => "invalid_value",
      Self::ContentTooShort { .. } => "content_too_short",
      Self::ContentTooLong { .. } => "content_too_long",
      Self::ParentNotFound(_) => "parent_not_found",
      Self::QuotedReplyNotFound(_) => "quoted_reply_not_found",
      Self::ThreadTooDeep { .. } => "thread_too_deep",
      Self::TopicNotFound(_) | Self::ReplyNotFound(_) => "not_found",
      Self::InsufficientStanding => "insufficient_standing",
      Self::EditWindowExpired(_) => "edit_window_expired",
      Self::NotAuthor(_) => "not_author",
      Self::NotAuthorized => "not_authorized",
      Self::SubjectNotFound(_) => "not_found",
      Self::TopicLocked(_) => "topic_locked",
      Self::AlreadyDeleted(_) => "already_deleted",
      Self::NotQuestionType(_) => "not_question_type",
      Self::ReplyNotInTopic { .. } => "reply_not_in_topic",
      Self::AcceptanceConflict { .. } => "acceptance_conflict",
      Self::ReparentCycle { .. } => "reparent_cycle",
      Self::UnreachableReplies { .. } => "unreachable_replies",
      Self::Store(_) => "store_error",
    }
  }

  pub fn class(&self) -> ErrorClass {
    match self {
      Self::InvalidValue(_)
      | Self::ContentTooShort { .. }
      | Self::ContentTooLong { .. }
      | Self::ParentNotFound(_)
      | Self::QuotedReplyNotFound(_)
      | Self::ThreadTooDeep { .. }
      | Self::TopicNotFound(_)
      | Self::ReplyNotFound(_) => ErrorClass::Validation,
      Self::InsufficientStanding
      | Self::EditWindowExpired(_)
      | Self::NotAuthor(_)
      | Self::NotAuthorized => ErrorClass::Authorization,
      Self::SubjectNotFound(_)
      | Self::TopicLocked(_)
      | Self::AlreadyDeleted(_)
      | Self::NotQuestionType(_)
      | Self::ReplyNotInTopic { .. }
      | Self::AcceptanceConflict { .. } => ErrorClass::Conflict,
      Self::ReparentCycle { .. } | Self::UnreachableReplies { .. } => {
        ErrorClass::Invariant
      }
      Self::Store(_) => ErrorClass::Store,
    }
  }

  /// Whether the same request may be retried as-is or after fixing input.
  pub fn is_retriable(&self) -> bool {
    matches!(self.class(), ErrorClass::Validation | ErrorClass::Store)
  }

  /// Whether the error denotes a missing entity (HTTP 404).
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::TopicNotFound(_) | Self::ReplyNotFound(_) | Self::SubjectNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validation_errors_are_retriable_authorization_errors_are_not() {
    assert!(Error::InvalidValue(2).is_retriable());
    assert!(!Error::InsufficientStanding.is_retriable());
    assert!(!Error::EditWindowExpired(Uuid::nil()).is_retriable());
  }

  #[test]
  fn not_found_variants_share_a_code() {
    let subject = SubjectRef::reply(Uuid::nil());
    assert_eq!(Error::SubjectNotFound(subject).code(), "not_found");
    assert_eq!(Error::TopicNotFound(Uuid::nil()).code(), "not_found");
    assert!(Error::ReplyNotFound(Uuid::nil()).is_not_found());
  }
}
