//! Reply records, their edit history, and the pure rules that gate mutation.
//!
//! Replies are never physically removed. A soft-deleted reply keeps its node
//! (so descendants stay addressable) and its content becomes [`TOMBSTONE`].

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, actor::Actor};

/// Content shown in place of a soft-deleted reply.
pub const TOMBSTONE: &str = "[deleted]";

/// Content shown to ordinary viewers in place of a hidden reply.
pub const HIDDEN_MARKER: &str = "[hidden by a moderator]";

/// Replaced content in a revision, as shown to anyone but the author and
/// moderators.
pub const REDACTED_MARKER: &str = "[redacted]";

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Tunable limits on reply content and editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyPolicy {
  /// How long after creation the author may still edit.
  pub edit_window_secs: i64,
  /// Minimum trimmed length in characters.
  pub min_content_len:  usize,
  /// Maximum trimmed length in characters.
  pub max_content_len:  usize,
}

impl Default for ReplyPolicy {
  fn default() -> Self {
    Self {
      edit_window_secs: 15 * 60,
      min_content_len:  2,
      max_content_len:  10_000,
    }
  }
}

impl ReplyPolicy {
  pub fn edit_window(&self) -> TimeDelta {
    TimeDelta::seconds(self.edit_window_secs)
  }

  /// Reject content outside the configured length bounds.
  pub fn validate_content(&self, content: &str) -> Result<()> {
    let len = content.trim().chars().count();
    if len < self.min_content_len {
      return Err(Error::ContentTooShort { len, min: self.min_content_len });
    }
    if len > self.max_content_len {
      return Err(Error::ContentTooLong { len, max: self.max_content_len });
    }
    Ok(())
  }

  /// Whether the author of `reply` may still edit it at `now`.
  pub fn author_may_edit(&self, reply: &Reply, now: DateTime<Utc>) -> bool {
    within_edit_window(
      reply.created_at,
      now,
      self.edit_window(),
      reply.is_deleted,
    )
  }
}

/// `now - created_at < window` and the reply is not deleted.
pub fn within_edit_window(
  created_at: DateTime<Utc>,
  now: DateTime<Utc>,
  window: TimeDelta,
  is_deleted: bool,
) -> bool {
  !is_deleted && now - created_at < window
}

// ─── Reply ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
  pub reply_id:        Uuid,
  pub topic_id:        Uuid,
  /// `None` for top-level replies.
  pub parent_reply_id: Option<Uuid>,
  pub author_id:       Uuid,
  pub content:         String,
  pub created_at:      DateTime<Utc>,
  pub edited_at:       Option<DateTime<Utc>>,
  pub is_deleted:      bool,
  pub is_hidden:       bool,
  pub quoted_reply_id: Option<Uuid>,
}

impl Reply {
  /// Mask hidden content for viewers who are neither the author nor a
  /// moderator.
  pub fn redact_for(mut self, viewer: &Actor) -> Self {
    if self.is_hidden
      && !self.is_deleted
      && !viewer.is_moderator()
      && !viewer.is(self.author_id)
    {
      self.content = HIDDEN_MARKER.to_owned();
    }
    self
  }
}

/// Input to [`crate::replies::ReplyService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
  pub topic_id:        Uuid,
  pub parent_reply_id: Option<Uuid>,
  pub content:         String,
  pub quoted_reply_id: Option<Uuid>,
}

impl NewReply {
  pub fn top_level(topic_id: Uuid, content: impl Into<String>) -> Self {
    Self {
      topic_id,
      parent_reply_id: None,
      content: content.into(),
      quoted_reply_id: None,
    }
  }

  pub fn under(
    topic_id: Uuid,
    parent_reply_id: Uuid,
    content: impl Into<String>,
  ) -> Self {
    Self {
      topic_id,
      parent_reply_id: Some(parent_reply_id),
      content: content.into(),
      quoted_reply_id: None,
    }
  }
}

// ─── Revisions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
  AuthorEdit,
  ModerationEdit,
  Deletion,
}

impl RevisionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::AuthorEdit => "author_edit",
      Self::ModerationEdit => "moderation_edit",
      Self::Deletion => "deletion",
    }
  }
}

/// One append-only entry in a reply's history, holding the content that was
/// replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRevision {
  pub revision_id:      Uuid,
  pub reply_id:         Uuid,
  pub editor_id:        Uuid,
  pub kind:             RevisionKind,
  pub previous_content: String,
  pub reason:           Option<String>,
  pub recorded_at:      DateTime<Utc>,
}

impl ReplyRevision {
  /// Mask `previous_content` unless `viewer` wrote the reply or moderates.
  /// Tombstoned and hidden text must not resurface through the history.
  pub fn redact_for(mut self, viewer: &Actor, author_id: Uuid) -> Self {
    if !viewer.is_moderator() && !viewer.is(author_id) {
      self.previous_content = REDACTED_MARKER.to_owned();
    }
    self
  }
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// A reply annotated with its live score and accepted flag. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredReply {
  #[serde(flatten)]
  pub reply:       Reply,
  pub score:       i64,
  pub is_accepted: bool,
}

impl ScoredReply {
  pub fn redact_for(mut self, viewer: &Actor) -> Self {
    self.reply = self.reply.redact_for(viewer);
    self
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn t(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  #[test]
  fn edit_window_is_exclusive_at_fifteen_minutes() {
    let window = ReplyPolicy::default().edit_window();
    assert!(within_edit_window(t(0), t(0), window, false));
    assert!(within_edit_window(t(0), t(15 * 60 - 1), window, false));
    assert!(!within_edit_window(t(0), t(15 * 60), window, false));
    assert!(!within_edit_window(t(0), t(20 * 60), window, false));
  }

  #[test]
  fn deleted_replies_are_never_editable() {
    let window = ReplyPolicy::default().edit_window();
    assert!(!within_edit_window(t(0), t(1), window, true));
  }

  #[test]
  fn content_length_is_measured_trimmed() {
    let policy = ReplyPolicy { min_content_len: 2, max_content_len: 5, ..Default::default() };
    assert!(matches!(
      policy.validate_content("  a   "),
      Err(Error::ContentTooShort { len: 1, min: 2 })
    ));
    assert!(policy.validate_content(" ab ").is_ok());
    assert!(matches!(
      policy.validate_content("abcdef"),
      Err(Error::ContentTooLong { len: 6, max: 5 })
    ));
    // Characters, not bytes.
    assert!(policy.validate_content("ééééé").is_ok());
  }

  #[test]
  fn hidden_content_is_masked_for_bystanders_only() {
    let author = Uuid::new_v4();
    let scored = ScoredReply {
      reply:       Reply {
        reply_id:        Uuid::new_v4(),
        topic_id:        Uuid::new_v4(),
        parent_reply_id: None,
        author_id:       author,
        content:         "secret".into(),
        created_at:      t(0),
        edited_at:       None,
        is_deleted:      false,
        is_hidden:       true,
        quoted_reply_id: None,
      },
      score:       0,
      is_accepted: false,
    };

    let bystander = Actor::member(Uuid::new_v4());
    assert_eq!(scored.clone().redact_for(&bystander).reply.content, HIDDEN_MARKER);
    assert_eq!(scored.clone().redact_for(&Actor::member(author)).reply.content, "secret");
    assert_eq!(
      scored.redact_for(&Actor::moderator(Uuid::new_v4())).reply.content,
      "secret"
    );
  }

  #[test]
  fn revision_history_is_redacted_for_bystanders() {
    let author = Uuid::new_v4();
    let revision = ReplyRevision {
      revision_id:      Uuid::new_v4(),
      reply_id:         Uuid::new_v4(),
      editor_id:        author,
      kind:             RevisionKind::Deletion,
      previous_content: "original".into(),
      reason:           None,
      recorded_at:      t(0),
    };

    let bystander = Actor::member(Uuid::new_v4());
    assert_eq!(
      revision.clone().redact_for(&bystander, author).previous_content,
      REDACTED_MARKER
    );
    assert_eq!(
      revision.clone().redact_for(&Actor::member(author), author).previous_content,
      "original"
    );
    assert_eq!(
      revision
        .redact_for(&Actor::moderator(Uuid::new_v4()), author)
        .previous_content,
      "original"
    );
  }
}
