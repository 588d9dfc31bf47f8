//! Vote values and records.
//!
//! A vote is stored only while it is non-zero; "no vote" is the absence of a
//! row. Integers appear only at the storage and wire boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, subject::SubjectRef};

/// A user's stance on a subject.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteValue {
  Down,
  #[default]
  None,
  Up,
}

impl VoteValue {
  pub fn as_i8(self) -> i8 {
    match self {
      Self::Down => -1,
      Self::None => 0,
      Self::Up => 1,
    }
  }

  pub fn as_i64(self) -> i64 { i64::from(self.as_i8()) }

  pub fn is_none(self) -> bool { self == Self::None }

  /// Resolve a request against the currently stored value.
  ///
  /// Asking for the value you already hold retracts it.
  pub fn toggle(current: Self, requested: Self) -> Self {
    if current == requested { Self::None } else { requested }
  }
}

impl From<VoteValue> for i8 {
  fn from(v: VoteValue) -> Self { v.as_i8() }
}

impl TryFrom<i64> for VoteValue {
  type Error = Error;

  fn try_from(v: i64) -> Result<Self, Self::Error> {
    match v {
      -1 => Ok(Self::Down),
      0 => Ok(Self::None),
      1 => Ok(Self::Up),
      other => Err(Error::InvalidValue(other)),
    }
  }
}

impl TryFrom<i8> for VoteValue {
  type Error = Error;

  fn try_from(v: i8) -> Result<Self, Self::Error> { Self::try_from(i64::from(v)) }
}

/// A persisted non-zero vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
  pub subject:    SubjectRef,
  pub user_id:    Uuid,
  pub value:      VoteValue,
  pub updated_at: DateTime<Utc>,
}

/// The authoritative state of one user's vote on one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
  pub score:     i64,
  pub user_vote: VoteValue,
}

impl VoteSummary {
  /// Locally project the effect of `requested` without asking the ledger.
  pub fn project(self, requested: VoteValue) -> Self {
    let effective = VoteValue::toggle(self.user_vote, requested);
    Self {
      score:     self.score - self.user_vote.as_i64() + effective.as_i64(),
      user_vote: effective,
    }
  }
}
