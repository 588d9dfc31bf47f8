//! AcceptanceController: the single writer of a topic's accepted answer.
//!
//! The accepted flag on a reply is derived from `Topic::accepted_answer_id`
//! at read time, so overwriting that one column is the whole transition: no
//! reader can ever see zero or two accepted replies mid-change.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::Actor,
  store::ForumStore,
  topic::{Topic, TopicKind},
};

pub struct AcceptanceController<'a, S> {
  store: &'a S,
}

impl<'a, S: ForumStore> AcceptanceController<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Mark `reply_id` as the answer to question topic `topic_id`, replacing any
  /// previous answer.
  ///
  /// Allowed for the topic author and moderators. There is no way to clear an
  /// accepted answer; only to move it.
  pub async fn accept(
    &self,
    actor: &Actor,
    topic_id: Uuid,
    reply_id: Uuid,
  ) -> Result<Topic> {
    let mut topic = self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))?;

    if topic.kind != TopicKind::Question {
      return Err(Error::NotQuestionType(topic_id));
    }
    if !actor.is(topic.author_id) && !actor.is_moderator() {
      return Err(Error::NotAuthorized);
    }

    let reply = self
      .store
      .get_reply(reply_id)
      .await
      .map_err(Error::store)?
      .filter(|r| r.topic_id == topic_id)
      .ok_or(Error::ReplyNotInTopic { topic_id, reply_id })?;
    if reply.is_deleted {
      return Err(Error::AlreadyDeleted(reply_id));
    }

    // The store re-checks the preconditions inside the write itself.
    let applied = self
      .store
      .set_accepted_answer(topic_id, reply_id)
      .await
      .map_err(Error::store)?;
    if !applied {
      warn!(%topic_id, %reply_id, "acceptance preconditions changed before commit");
      return Err(Error::AcceptanceConflict { topic_id, reply_id });
    }

    debug!(
      %topic_id,
      %reply_id,
      previous = ?topic.accepted_answer_id,
      "answer accepted"
    );
    topic.accepted_answer_id = Some(reply_id);
    Ok(topic)
  }
}
