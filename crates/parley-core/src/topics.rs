//! TopicService: topic creation and the moderator-only lock/pin flags.

use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::Actor,
  clock::Clock,
  store::ForumStore,
  topic::{MAX_TITLE_LENGTH, NewTopic, Topic},
};

pub struct TopicService<'a, S> {
  store: &'a S,
  clock: &'a dyn Clock,
}

impl<'a, S: ForumStore> TopicService<'a, S> {
  pub fn new(store: &'a S, clock: &'a dyn Clock) -> Self { Self { store, clock } }

  pub async fn create(&self, actor: &Actor, input: NewTopic) -> Result<Topic> {
    let title = input.title.trim();
    let len = title.chars().count();
    if len == 0 {
      return Err(Error::ContentTooShort { len, min: 1 });
    }
    if len > MAX_TITLE_LENGTH {
      return Err(Error::ContentTooLong { len, max: MAX_TITLE_LENGTH });
    }

    let topic = Topic {
      topic_id:           Uuid::new_v4(),
      kind:               input.kind,
      author_id:          actor.user_id,
      title:              title.to_owned(),
      created_at:         self.clock.now(),
      is_locked:          false,
      is_pinned:          false,
      accepted_answer_id: None,
    };
    self
      .store
      .insert_topic(topic.clone())
      .await
      .map_err(Error::store)?;

    debug!(topic_id = %topic.topic_id, kind = topic.kind.as_str(), "topic created");
    Ok(topic)
  }

  pub async fn get(&self, topic_id: Uuid) -> Result<Topic> {
    self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))
  }

  /// Change the lock and/or pin flags. Moderators only; `None` leaves a flag
  /// untouched.
  pub async fn set_flags(
    &self,
    actor: &Actor,
    topic_id: Uuid,
    locked: Option<bool>,
    pinned: Option<bool>,
  ) -> Result<Topic> {
    if !actor.is_moderator() {
      return Err(Error::NotAuthorized);
    }
    let mut topic = self.get(topic_id).await?;
    topic.is_locked = locked.unwrap_or(topic.is_locked);
    topic.is_pinned = pinned.unwrap_or(topic.is_pinned);

    let found = self
      .store
      .set_topic_flags(topic_id, topic.is_locked, topic.is_pinned)
      .await
      .map_err(Error::store)?;
    if !found {
      return Err(Error::TopicNotFound(topic_id));
    }

    debug!(%topic_id, locked = topic.is_locked, pinned = topic.is_pinned, "topic flags set");
    Ok(topic)
  }
}
