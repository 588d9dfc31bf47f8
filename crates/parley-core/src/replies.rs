//! ReplyService: create, edit, delete, hide and list replies.
//!
//! Every mutation that replaces content appends a [`ReplyRevision`] in the
//! same store write, so moderation edits and deletions stay auditable.

use std::collections::HashMap;

use tracing::{debug, error};
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::Actor,
  clock::Clock,
  reply::{
    NewReply, Reply, ReplyPolicy, ReplyRevision, RevisionKind, ScoredReply,
    TOMBSTONE,
  },
  store::{ForumStore, ReplyRewrite},
  thread::{SortMode, ThreadNode, assemble},
  topic::Topic,
};

pub struct ReplyService<'a, S> {
  store:  &'a S,
  clock:  &'a dyn Clock,
  policy: &'a ReplyPolicy,
}

impl<'a, S: ForumStore> ReplyService<'a, S> {
  pub fn new(store: &'a S, clock: &'a dyn Clock, policy: &'a ReplyPolicy) -> Self {
    Self { store, clock, policy }
  }

  // ── Writes ──────────────────────────────────────────────────────────────

  /// Post a reply to an unlocked topic.
  pub async fn create(&self, actor: &Actor, input: NewReply) -> Result<Reply> {
    self.policy.validate_content(&input.content)?;

    let topic = self.topic(input.topic_id).await?;
    if topic.is_locked {
      return Err(Error::TopicLocked(topic.topic_id));
    }
    if let Some(parent_id) = input.parent_reply_id {
      self
        .reply_in_topic(parent_id, topic.topic_id)
        .await?
        .ok_or(Error::ParentNotFound(parent_id))?;
    }
    if let Some(quoted_id) = input.quoted_reply_id {
      self
        .reply_in_topic(quoted_id, topic.topic_id)
        .await?
        .ok_or(Error::QuotedReplyNotFound(quoted_id))?;
    }

    let reply = Reply {
      reply_id:        Uuid::new_v4(),
      topic_id:        topic.topic_id,
      parent_reply_id: input.parent_reply_id,
      author_id:       actor.user_id,
      content:         input.content.trim().to_owned(),
      created_at:      self.clock.now(),
      edited_at:       None,
      is_deleted:      false,
      is_hidden:       false,
      quoted_reply_id: input.quoted_reply_id,
    };
    self
      .store
      .insert_reply(reply.clone())
      .await
      .map_err(Error::store)?;

    debug!(reply_id = %reply.reply_id, topic_id = %reply.topic_id, "reply created");
    Ok(reply)
  }

  /// Replace a reply's content.
  ///
  /// The author may edit inside the edit window; a moderator may edit at any
  /// time, which is recorded as a moderation edit carrying `reason`.
  pub async fn update(
    &self,
    actor: &Actor,
    reply_id: Uuid,
    content: &str,
    reason: Option<String>,
  ) -> Result<Reply> {
    self.policy.validate_content(content)?;

    let reply = self.get(reply_id).await?;
    if reply.is_deleted {
      return Err(Error::AlreadyDeleted(reply_id));
    }

    let now = self.clock.now();
    let is_author = actor.is(reply.author_id);
    let kind = if is_author && self.policy.author_may_edit(&reply, now) {
      RevisionKind::AuthorEdit
    } else if actor.is_moderator() {
      RevisionKind::ModerationEdit
    } else if is_author {
      return Err(Error::EditWindowExpired(reply_id));
    } else {
      return Err(Error::NotAuthor(reply_id));
    };

    let rewrite = ReplyRewrite {
      reply_id,
      revision_id: Uuid::new_v4(),
      editor_id: actor.user_id,
      kind,
      content: content.trim().to_owned(),
      reason,
      at: now,
    };
    if !self.store.rewrite_reply(rewrite).await.map_err(Error::store)? {
      return Err(Error::AlreadyDeleted(reply_id));
    }

    debug!(%reply_id, kind = kind.as_str(), "reply edited");
    self.get(reply_id).await
  }

  /// Replace a reply with a tombstone, keeping its node and children.
  pub async fn soft_delete(&self, actor: &Actor, reply_id: Uuid) -> Result<Reply> {
    let reply = self.get(reply_id).await?;
    if !actor.is(reply.author_id) && !actor.is_moderator() {
      return Err(Error::NotAuthor(reply_id));
    }
    if reply.is_deleted {
      return Err(Error::AlreadyDeleted(reply_id));
    }

    let rewrite = ReplyRewrite {
      reply_id,
      revision_id: Uuid::new_v4(),
      editor_id: actor.user_id,
      kind: RevisionKind::Deletion,
      content: TOMBSTONE.to_owned(),
      reason: None,
      at: self.clock.now(),
    };
    if !self.store.rewrite_reply(rewrite).await.map_err(Error::store)? {
      return Err(Error::AlreadyDeleted(reply_id));
    }

    debug!(%reply_id, "reply soft-deleted");
    self.get(reply_id).await
  }

  /// Hide or unhide a reply. Moderators only.
  pub async fn set_hidden(
    &self,
    actor: &Actor,
    reply_id: Uuid,
    hidden: bool,
  ) -> Result<Reply> {
    if !actor.is_moderator() {
      return Err(Error::NotAuthorized);
    }
    if !self
      .store
      .set_reply_hidden(reply_id, hidden)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::ReplyNotFound(reply_id));
    }

    debug!(%reply_id, hidden, "reply visibility changed");
    self.get(reply_id).await
  }

  /// Move a reply (with its subtree) under `new_parent`, or to the top level.
  /// Moderators only. Refuses to move a reply into its own subtree.
  pub async fn reparent(
    &self,
    actor: &Actor,
    reply_id: Uuid,
    new_parent: Option<Uuid>,
  ) -> Result<Reply> {
    if !actor.is_moderator() {
      return Err(Error::NotAuthorized);
    }
    let reply = self.get(reply_id).await?;

    if let Some(parent_id) = new_parent {
      let siblings: HashMap<Uuid, Reply> = self
        .store
        .list_replies(reply.topic_id)
        .await
        .map_err(Error::store)?
        .into_iter()
        .map(|r| (r.reply_id, r))
        .collect();
      if !siblings.contains_key(&parent_id) {
        return Err(Error::ParentNotFound(parent_id));
      }

      // Walk up from the new parent; reaching `reply_id` means a cycle. The
      // step bound also stops on a cycle that is already stored.
      let mut cursor = Some(parent_id);
      let mut steps = 0;
      while let Some(id) = cursor {
        if id == reply_id || steps > siblings.len() {
          error!(%reply_id, %parent_id, "refusing reparent that would create a cycle");
          return Err(Error::ReparentCycle { reply_id, new_parent: parent_id });
        }
        cursor = siblings.get(&id).and_then(|r| r.parent_reply_id);
        steps += 1;
      }
    }

    let moved = self
      .store
      .move_reply(reply_id, new_parent)
      .await
      .map_err(Error::store)?;
    // Replies are never removed, so a refused write means a concurrent move
    // made `new_parent` a descendant after the walk above.
    if let (false, Some(parent_id)) = (moved, new_parent) {
      error!(%reply_id, %parent_id, "reparent lost a race and would create a cycle");
      return Err(Error::ReparentCycle { reply_id, new_parent: parent_id });
    }

    debug!(%reply_id, ?new_parent, "reply moved");
    self.get(reply_id).await
  }

  // ── Reads ───────────────────────────────────────────────────────────────

  pub async fn get(&self, reply_id: Uuid) -> Result<Reply> {
    self
      .store
      .get_reply(reply_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ReplyNotFound(reply_id))
  }

  /// All replies of a topic as a flat sequence, annotated with live scores
  /// and the accepted flag, and redacted for `viewer`.
  pub async fn list_by_topic(
    &self,
    viewer: &Actor,
    topic_id: Uuid,
  ) -> Result<Vec<ScoredReply>> {
    let topic = self.topic(topic_id).await?;
    let replies = self
      .store
      .list_replies(topic_id)
      .await
      .map_err(Error::store)?;
    let scores = self
      .store
      .reply_scores(topic_id)
      .await
      .map_err(Error::store)?;

    Ok(
      replies
        .into_iter()
        .map(|reply| ScoredReply {
          score:       scores.get(&reply.reply_id).copied().unwrap_or(0),
          is_accepted: topic.accepted_answer_id == Some(reply.reply_id),
          reply,
        })
        .map(|scored| scored.redact_for(viewer))
        .collect(),
    )
  }

  /// The topic's replies assembled into a sorted forest.
  pub async fn thread(
    &self,
    viewer: &Actor,
    topic_id: Uuid,
    sort: SortMode,
  ) -> Result<Vec<ThreadNode>> {
    let replies = self.list_by_topic(viewer, topic_id).await?;
    assemble(topic_id, replies, sort)
  }

  /// A reply's history, oldest first. Replaced content is only shown to the
  /// author and moderators; other members see who changed what and when.
  pub async fn revisions(
    &self,
    viewer: &Actor,
    reply_id: Uuid,
  ) -> Result<Vec<ReplyRevision>> {
    let reply = self.get(reply_id).await?;
    let history = self
      .store
      .list_revisions(reply_id)
      .await
      .map_err(Error::store)?;
    Ok(
      history
        .into_iter()
        .map(|revision| revision.redact_for(viewer, reply.author_id))
        .collect(),
    )
  }

  // ── Helpers ─────────────────────────────────────────────────────────────

  async fn topic(&self, topic_id: Uuid) -> Result<Topic> {
    self
      .store
      .get_topic(topic_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TopicNotFound(topic_id))
  }

  async fn reply_in_topic(
    &self,
    reply_id: Uuid,
    topic_id: Uuid,
  ) -> Result<Option<Reply>> {
    Ok(
      self
        .store
        .get_reply(reply_id)
        .await
        .map_err(Error::store)?
        .filter(|r| r.topic_id == topic_id),
    )
  }
}
