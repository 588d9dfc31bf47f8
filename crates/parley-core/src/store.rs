//! The `ForumStore` trait: the durable-storage boundary.
//!
//! Implemented by storage backends (e.g. `parley-store-sqlite`). The services
//! in this crate hold all policy; a backend only has to persist rows and make
//! the guarded writes ([`ForumStore::apply_vote`],
//! [`ForumStore::set_accepted_answer`], [`ForumStore::rewrite_reply`] and
//! [`ForumStore::move_reply`]) atomic.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  reply::{Reply, ReplyRevision, RevisionKind},
  subject::SubjectRef,
  topic::Topic,
  vote::{Vote, VoteValue},
};

/// A content change applied by [`ForumStore::rewrite_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRewrite {
  pub reply_id:    Uuid,
  pub revision_id: Uuid,
  pub editor_id:   Uuid,
  pub kind:        RevisionKind,
  pub content:     String,
  pub reason:      Option<String>,
  pub at:          DateTime<Utc>,
}

/// Result of an atomic vote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedVote {
  pub previous:  VoteValue,
  pub effective: VoteValue,
}

pub trait ForumStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Topics ────────────────────────────────────────────────────────────

  fn insert_topic(
    &self,
    topic: Topic,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  /// Overwrite the lock and pin flags. Returns `false` if the topic does not
  /// exist.
  fn set_topic_flags(
    &self,
    id: Uuid,
    is_locked: bool,
    is_pinned: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Point the topic's accepted answer at `reply_id` in one atomic write.
  ///
  /// The write only happens if, at commit time, the topic is a question and
  /// the reply belongs to it and is not deleted. Returns whether it happened.
  fn set_accepted_answer(
    &self,
    topic_id: Uuid,
    reply_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Replies ───────────────────────────────────────────────────────────

  fn insert_reply(
    &self,
    reply: Reply,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_reply(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Reply>, Self::Error>> + Send + '_;

  /// Replace the content of a live reply and append a revision holding the
  /// content it replaced, both in one transaction.
  ///
  /// The replaced content is read inside that transaction, so concurrent
  /// rewrites each record exactly what they overwrote. A
  /// [`RevisionKind::Deletion`] also sets `is_deleted`; any other kind sets
  /// `edited_at`. Nothing is written if the reply is already deleted. Returns
  /// whether the write happened.
  fn rewrite_reply(
    &self,
    rewrite: ReplyRewrite,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Set only `is_hidden`. Returns `false` if the reply does not exist.
  fn set_reply_hidden(
    &self,
    reply_id: Uuid,
    hidden: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Set only `parent_reply_id`.
  ///
  /// The write only happens if, at commit time, `new_parent` is `None` or a
  /// reply of the same topic whose ancestor chain does not contain
  /// `reply_id`. Returns whether it happened.
  fn move_reply(
    &self,
    reply_id: Uuid,
    new_parent: Option<Uuid>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All replies of a topic, in no particular order.
  fn list_replies(
    &self,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Reply>, Self::Error>> + Send + '_;

  /// A reply's history, oldest first.
  fn list_revisions(
    &self,
    reply_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ReplyRevision>, Self::Error>> + Send + '_;

  // ── Votes ─────────────────────────────────────────────────────────────

  /// Atomically read the stored vote for `(subject, user_id)`, resolve
  /// `requested` against it with [`VoteValue::toggle`], and write the result
  /// (deleting the row when it is [`VoteValue::None`]).
  fn apply_vote(
    &self,
    subject: SubjectRef,
    user_id: Uuid,
    requested: VoteValue,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<AppliedVote, Self::Error>> + Send + '_;

  fn get_vote(
    &self,
    subject: SubjectRef,
    user_id: Uuid,
  ) -> impl Future<Output = Result<VoteValue, Self::Error>> + Send + '_;

  fn list_votes(
    &self,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<Vec<Vote>, Self::Error>> + Send + '_;

  /// Sum of all stored values for `subject`, computed from the rows.
  fn score(
    &self,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Scores of every reply in a topic that has at least one vote.
  fn reply_scores(
    &self,
    topic_id: Uuid,
  ) -> impl Future<Output = Result<HashMap<Uuid, i64>, Self::Error>> + Send + '_;
}
