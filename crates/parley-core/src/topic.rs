//! Topics: the roots that replies hang from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length for a topic title in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
  Discussion,
  Question,
}

impl TopicKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Discussion => "discussion",
      Self::Question => "question",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
  pub topic_id:           Uuid,
  pub kind:               TopicKind,
  pub author_id:          Uuid,
  pub title:              String,
  pub created_at:         DateTime<Utc>,
  pub is_locked:          bool,
  pub is_pinned:          bool,
  /// Only ever set on question topics. Written solely by the acceptance
  /// controller.
  pub accepted_answer_id: Option<Uuid>,
}

impl Topic {
  pub fn acceptance(&self) -> AcceptanceState {
    match self.accepted_answer_id {
      Some(id) => AcceptanceState::Accepted(id),
      None => AcceptanceState::Unanswered,
    }
  }
}

/// Answer state of a question topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reply_id", rename_all = "snake_case")]
pub enum AcceptanceState {
  Unanswered,
  Accepted(Uuid),
}

/// Input to [`crate::topics::TopicService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTopic {
  pub kind:  TopicKind,
  pub title: String,
}
