//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Closed enums are stored as their wire names.

use chrono::{DateTime, Utc};
use parley_core::{
  reply::{Reply, ReplyRevision, RevisionKind},
  subject::{SubjectRef, SubjectType},
  topic::{Topic, TopicKind},
  vote::{Vote, VoteValue},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Closed sets ─────────────────────────────────────────────────────────────

fn unknown(column: &'static str, value: &str) -> Error {
  Error::UnknownVariant { column, value: value.to_owned() }
}

pub fn decode_topic_kind(s: &str) -> Result<TopicKind> {
  match s {
    "discussion" => Ok(TopicKind::Discussion),
    "question" => Ok(TopicKind::Question),
    other => Err(unknown("topic kind", other)),
  }
}

pub fn decode_revision_kind(s: &str) -> Result<RevisionKind> {
  match s {
    "author_edit" => Ok(RevisionKind::AuthorEdit),
    "moderation_edit" => Ok(RevisionKind::ModerationEdit),
    "deletion" => Ok(RevisionKind::Deletion),
    other => Err(unknown("revision kind", other)),
  }
}

pub fn decode_subject_type(s: &str) -> Result<SubjectType> {
  match s {
    "topic" => Ok(SubjectType::Topic),
    "reply" => Ok(SubjectType::Reply),
    other => Err(unknown("subject type", other)),
  }
}

/// `None` for an absent row.
pub fn decode_vote_value(v: Option<i64>) -> Result<VoteValue> {
  Ok(v.map(VoteValue::try_from).transpose()?.unwrap_or_default())
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const TOPIC_COLUMNS: &str = "topic_id, kind, author_id, title, created_at, \
                                 is_locked, is_pinned, accepted_answer_id";

/// Raw values read directly from a `topics` row, in [`TOPIC_COLUMNS`] order.
pub struct RawTopic {
  pub topic_id:           String,
  pub kind:               String,
  pub author_id:          String,
  pub title:              String,
  pub created_at:         String,
  pub is_locked:          bool,
  pub is_pinned:          bool,
  pub accepted_answer_id: Option<String>,
}

impl RawTopic {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:           row.get(0)?,
      kind:               row.get(1)?,
      author_id:          row.get(2)?,
      title:              row.get(3)?,
      created_at:         row.get(4)?,
      is_locked:          row.get(5)?,
      is_pinned:          row.get(6)?,
      accepted_answer_id: row.get(7)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    Ok(Topic {
      topic_id:           decode_uuid(&self.topic_id)?,
      kind:               decode_topic_kind(&self.kind)?,
      author_id:          decode_uuid(&self.author_id)?,
      title:              self.title,
      created_at:         decode_dt(&self.created_at)?,
      is_locked:          self.is_locked,
      is_pinned:          self.is_pinned,
      accepted_answer_id: decode_opt_uuid(self.accepted_answer_id)?,
    })
  }
}

pub const REPLY_COLUMNS: &str = "reply_id, topic_id, parent_reply_id, author_id, \
                                 content, created_at, edited_at, is_deleted, \
                                 is_hidden, quoted_reply_id";

/// Raw values read directly from a `replies` row, in [`REPLY_COLUMNS`] order.
pub struct RawReply {
  pub reply_id:        String,
  pub topic_id:        String,
  pub parent_reply_id: Option<String>,
  pub author_id:       String,
  pub content:         String,
  pub created_at:      String,
  pub edited_at:       Option<String>,
  pub is_deleted:      bool,
  pub is_hidden:       bool,
  pub quoted_reply_id: Option<String>,
}

impl RawReply {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reply_id:        row.get(0)?,
      topic_id:        row.get(1)?,
      parent_reply_id: row.get(2)?,
      author_id:       row.get(3)?,
      content:         row.get(4)?,
      created_at:      row.get(5)?,
      edited_at:       row.get(6)?,
      is_deleted:      row.get(7)?,
      is_hidden:       row.get(8)?,
      quoted_reply_id: row.get(9)?,
    })
  }

  pub fn into_reply(self) -> Result<Reply> {
    Ok(Reply {
      reply_id:        decode_uuid(&self.reply_id)?,
      topic_id:        decode_uuid(&self.topic_id)?,
      parent_reply_id: decode_opt_uuid(self.parent_reply_id)?,
      author_id:       decode_uuid(&self.author_id)?,
      content:         self.content,
      created_at:      decode_dt(&self.created_at)?,
      edited_at:       self.edited_at.as_deref().map(decode_dt).transpose()?,
      is_deleted:      self.is_deleted,
      is_hidden:       self.is_hidden,
      quoted_reply_id: decode_opt_uuid(self.quoted_reply_id)?,
    })
  }
}

/// Raw values read directly from a `reply_revisions` row.
pub struct RawRevision {
  pub revision_id:      String,
  pub reply_id:         String,
  pub editor_id:        String,
  pub kind:             String,
  pub previous_content: String,
  pub reason:           Option<String>,
  pub recorded_at:      String,
}

impl RawRevision {
  pub fn into_revision(self) -> Result<ReplyRevision> {
    Ok(ReplyRevision {
      revision_id:      decode_uuid(&self.revision_id)?,
      reply_id:         decode_uuid(&self.reply_id)?,
      editor_id:        decode_uuid(&self.editor_id)?,
      kind:             decode_revision_kind(&self.kind)?,
      previous_content: self.previous_content,
      reason:           self.reason,
      recorded_at:      decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `votes` row.
pub struct RawVote {
  pub subject_type: String,
  pub subject_id:   String,
  pub user_id:      String,
  pub value:        i64,
  pub updated_at:   String,
}

impl RawVote {
  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      subject:    SubjectRef {
        subject_type: decode_subject_type(&self.subject_type)?,
        subject_id:   decode_uuid(&self.subject_id)?,
      },
      user_id:    decode_uuid(&self.user_id)?,
      value:      VoteValue::try_from(self.value)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absent_vote_row_decodes_to_none() {
    assert_eq!(decode_vote_value(None).unwrap(), VoteValue::None);
    assert_eq!(decode_vote_value(Some(-1)).unwrap(), VoteValue::Down);
    assert!(decode_vote_value(Some(2)).is_err());
  }

  #[test]
  fn unknown_kind_names_its_column() {
    let err = decode_topic_kind("poll").unwrap_err();
    assert_eq!(err.to_string(), "unknown topic kind value: \"poll\"");
  }
}
