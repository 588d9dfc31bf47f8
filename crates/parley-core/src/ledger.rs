//! VoteLedger: the only writer of vote rows.
//!
//! Scores are never cached: every read sums the stored rows, so the aggregate
//! cannot drift from the per-user values under concurrent writers.

use tracing::debug;

use crate::{
  Error, Result,
  actor::Actor,
  clock::Clock,
  store::ForumStore,
  subject::{SubjectRef, SubjectType},
  vote::{Vote, VoteSummary, VoteValue},
};

pub struct VoteLedger<'a, S> {
  store: &'a S,
  clock: &'a dyn Clock,
}

impl<'a, S: ForumStore> VoteLedger<'a, S> {
  pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self { Self { store, clock } }

  /// Cast (or toggle off) `actor`'s vote on `subject`.
  ///
  /// Requesting the value already held retracts it. A downvote request needs
  /// [`Actor::can_downvote`]; without it nothing is written.
  pub async fn cast_vote(
    &self,
    actor: &Actor,
    subject: SubjectRef,
    requested: VoteValue,
  ) -> Result<VoteSummary> {
    if requested == VoteValue::Down && !actor.can_downvote {
      return Err(Error::InsufficientStanding);
    }
    self.ensure_exists(subject).await?;

    let applied = self
      .store
      .apply_vote(subject, actor.user_id, requested, self.clock.now())
      .await
      .map_err(Error::store)?;
    let score = self.store.score(subject).await.map_err(Error::store)?;

    debug!(
      %subject,
      user_id = %actor.user_id,
      previous = applied.previous.as_i8(),
      effective = applied.effective.as_i8(),
      score,
      "vote cast"
    );

    Ok(VoteSummary { score, user_vote: applied.effective })
  }

  pub async fn get_user_vote(
    &self,
    subject: SubjectRef,
    user_id: uuid::Uuid,
  ) -> Result<VoteValue> {
    self.ensure_exists(subject).await?;
    self.store.get_vote(subject, user_id).await.map_err(Error::store)
  }

  pub async fn get_score(&self, subject: SubjectRef) -> Result<i64> {
    self.ensure_exists(subject).await?;
    self.store.score(subject).await.map_err(Error::store)
  }

  /// Score plus the given user's vote; what a client seeds its optimistic
  /// cache with.
  pub async fn summary(
    &self,
    subject: SubjectRef,
    user_id: uuid::Uuid,
  ) -> Result<VoteSummary> {
    self.ensure_exists(subject).await?;
    let score = self.store.score(subject).await.map_err(Error::store)?;
    let user_vote =
      self.store.get_vote(subject, user_id).await.map_err(Error::store)?;
    Ok(VoteSummary { score, user_vote })
  }

  pub async fn list_votes(&self, subject: SubjectRef) -> Result<Vec<Vote>> {
    self.ensure_exists(subject).await?;
    self.store.list_votes(subject).await.map_err(Error::store)
  }

  async fn ensure_exists(&self, subject: SubjectRef) -> Result<()> {
    let exists = match subject.subject_type {
      SubjectType::Topic => self
        .store
        .get_topic(subject.subject_id)
        .await
        .map_err(Error::store)?
        .is_some(),
      SubjectType::Reply => self
        .store
        .get_reply(subject.subject_id)
        .await
        .map_err(Error::store)?
        .is_some(),
    };
    if exists { Ok(()) } else { Err(Error::SubjectNotFound(subject)) }
  }
}
