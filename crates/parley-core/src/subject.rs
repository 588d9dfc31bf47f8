//! Subject: anything that can be voted on.
//!
//! A subject is addressed by its type and id; neither ever changes after the
//! underlying topic or reply is created.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of entity a subject refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
  Topic,
  Reply,
}

impl SubjectType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Topic => "topic",
      Self::Reply => "reply",
    }
  }
}

impl fmt::Display for SubjectType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A `(type, id)` pair identifying one votable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
  pub subject_type: SubjectType,
  pub subject_id:   Uuid,
}

impl SubjectRef {
  pub fn topic(id: Uuid) -> Self {
    Self { subject_type: SubjectType::Topic, subject_id: id }
  }

  pub fn reply(id: Uuid) -> Self {
    Self { subject_type: SubjectType::Reply, subject_id: id }
  }
}

impl fmt::Display for SubjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.subject_type, self.subject_id)
  }
}
