//! [`SqliteStore`]: the SQLite implementation of [`ForumStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use parley_core::{
  reply::{Reply, ReplyRevision, RevisionKind},
  store::{AppliedVote, ForumStore, ReplyRewrite},
  subject::SubjectRef,
  topic::Topic,
  vote::{Vote, VoteValue},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::trace;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    REPLY_COLUMNS, RawReply, RawRevision, RawTopic, RawVote, TOPIC_COLUMNS,
    decode_uuid, decode_vote_value, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Parley forum store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted, and all
/// clones share one connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ForumStore impl ─────────────────────────────────────────────────────────

impl ForumStore for SqliteStore {
  type Error = crate::Error;

  // ── Topics ────────────────────────────────────────────────────────────────

  async fn insert_topic(&self, topic: Topic) -> Result<()> {
    let id_str       = encode_uuid(topic.topic_id);
    let kind_str     = topic.kind.as_str();
    let author_str   = encode_uuid(topic.author_id);
    let at_str       = encode_dt(topic.created_at);
    let accepted_str = topic.accepted_answer_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO topics (
             topic_id, kind, author_id, title, created_at,
             is_locked, is_pinned, accepted_answer_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            kind_str,
            author_str,
            topic.title,
            at_str,
            topic.is_locked,
            topic.is_pinned,
            accepted_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTopic> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE topic_id = ?1"),
            rusqlite::params![id_str],
            RawTopic::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTopic::into_topic).transpose()
  }

  async fn set_topic_flags(
    &self,
    id: Uuid,
    is_locked: bool,
    is_pinned: bool,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE topics SET is_locked = ?2, is_pinned = ?3 WHERE topic_id = ?1",
          rusqlite::params![id_str, is_locked, is_pinned],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  async fn set_accepted_answer(&self, topic_id: Uuid, reply_id: Uuid) -> Result<bool> {
    let topic_str = encode_uuid(topic_id);
    let reply_str = encode_uuid(reply_id);

    // Preconditions and write in one statement: nothing can slip in between.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE topics SET accepted_answer_id = ?2
           WHERE topic_id = ?1
             AND kind = 'question'
             AND EXISTS (
               SELECT 1 FROM replies
               WHERE reply_id = ?2 AND topic_id = ?1 AND is_deleted = 0
             )",
          rusqlite::params![topic_str, reply_str],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Replies ───────────────────────────────────────────────────────────────

  async fn insert_reply(&self, reply: Reply) -> Result<()> {
    let id_str     = encode_uuid(reply.reply_id);
    let topic_str  = encode_uuid(reply.topic_id);
    let parent_str = reply.parent_reply_id.map(encode_uuid);
    let author_str = encode_uuid(reply.author_id);
    let at_str     = encode_dt(reply.created_at);
    let edited_str = reply.edited_at.map(encode_dt);
    let quoted_str = reply.quoted_reply_id.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO replies (
             reply_id, topic_id, parent_reply_id, author_id, content,
             created_at, edited_at, is_deleted, is_hidden, quoted_reply_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            topic_str,
            parent_str,
            author_str,
            reply.content,
            at_str,
            edited_str,
            reply.is_deleted,
            reply.is_hidden,
            quoted_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_reply(&self, id: Uuid) -> Result<Option<Reply>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReply> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REPLY_COLUMNS} FROM replies WHERE reply_id = ?1"),
            rusqlite::params![id_str],
            RawReply::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReply::into_reply).transpose()
  }

  async fn rewrite_reply(&self, rewrite: ReplyRewrite) -> Result<bool> {
    let reply_str   = encode_uuid(rewrite.reply_id);
    let rev_str     = encode_uuid(rewrite.revision_id);
    let editor_str  = encode_uuid(rewrite.editor_id);
    let kind        = rewrite.kind;
    let at_str      = encode_dt(rewrite.at);
    let content     = rewrite.content;
    let reason      = rewrite.reason;

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Snapshot the replaced content from the row itself, and only while
        // the reply is live.
        let recorded = tx.execute(
          "INSERT INTO reply_revisions (
             revision_id, reply_id, editor_id, kind,
             previous_content, reason, recorded_at
           )
           SELECT ?1, reply_id, ?3, ?4, content, ?5, ?6
           FROM replies
           WHERE reply_id = ?2 AND is_deleted = 0",
          rusqlite::params![rev_str, reply_str, editor_str, kind.as_str(), reason, at_str],
        )?;
        if recorded == 0 {
          return Ok(false);
        }

        if kind == RevisionKind::Deletion {
          tx.execute(
            "UPDATE replies SET content = ?2, is_deleted = 1 WHERE reply_id = ?1",
            rusqlite::params![reply_str, content],
          )?;
        } else {
          tx.execute(
            "UPDATE replies SET content = ?2, edited_at = ?3 WHERE reply_id = ?1",
            rusqlite::params![reply_str, content, at_str],
          )?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    trace!(reply_id = %rewrite.reply_id, written, "rewrite_reply");
    Ok(written)
  }

  async fn set_reply_hidden(&self, reply_id: Uuid, hidden: bool) -> Result<bool> {
    let id_str = encode_uuid(reply_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE replies SET is_hidden = ?2 WHERE reply_id = ?1",
          rusqlite::params![id_str, hidden],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  async fn move_reply(&self, reply_id: Uuid, new_parent: Option<Uuid>) -> Result<bool> {
    let id_str     = encode_uuid(reply_id);
    let parent_str = new_parent.map(encode_uuid);

    // The ancestor walk runs inside the write, so two crossing moves cannot
    // both pass. `UNION` stops on a cycle that is already stored.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE replies SET parent_reply_id = ?2
           WHERE reply_id = ?1
             AND (
               ?2 IS NULL
               OR (
                 EXISTS (
                   SELECT 1 FROM replies p
                   WHERE p.reply_id = ?2 AND p.topic_id = replies.topic_id
                 )
                 AND NOT EXISTS (
                   WITH RECURSIVE ancestors(id) AS (
                     SELECT ?2
                     UNION
                     SELECT r.parent_reply_id
                     FROM replies r JOIN ancestors a ON r.reply_id = a.id
                     WHERE r.parent_reply_id IS NOT NULL
                   )
                   SELECT 1 FROM ancestors WHERE id = ?1
                 )
               )
             )",
          rusqlite::params![id_str, parent_str],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  async fn list_replies(&self, topic_id: Uuid) -> Result<Vec<Reply>> {
    let topic_str = encode_uuid(topic_id);

    let raws: Vec<RawReply> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {REPLY_COLUMNS} FROM replies WHERE topic_id = ?1"))?;
        let rows = stmt
          .query_map(rusqlite::params![topic_str], RawReply::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReply::into_reply).collect()
  }

  async fn list_revisions(&self, reply_id: Uuid) -> Result<Vec<ReplyRevision>> {
    let reply_str = encode_uuid(reply_id);

    let raws: Vec<RawRevision> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT revision_id, reply_id, editor_id, kind,
                  previous_content, reason, recorded_at
           FROM reply_revisions
           WHERE reply_id = ?1
           ORDER BY recorded_at ASC, rowid ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![reply_str], |row| {
            Ok(RawRevision {
              revision_id:      row.get(0)?,
              reply_id:         row.get(1)?,
              editor_id:        row.get(2)?,
              kind:             row.get(3)?,
              previous_content: row.get(4)?,
              reason:           row.get(5)?,
              recorded_at:      row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRevision::into_revision).collect()
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  async fn apply_vote(
    &self,
    subject: SubjectRef,
    user_id: Uuid,
    requested: VoteValue,
    at: DateTime<Utc>,
  ) -> Result<AppliedVote> {
    let type_str    = subject.subject_type.as_str();
    let subject_str = encode_uuid(subject.subject_id);
    let user_str    = encode_uuid(user_id);
    let at_str      = encode_dt(at);

    let applied = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the read below cannot
        // go stale before the write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: Option<i64> = tx
          .query_row(
            "SELECT value FROM votes
             WHERE subject_type = ?1 AND subject_id = ?2 AND user_id = ?3",
            rusqlite::params![type_str, subject_str, user_str],
            |row| row.get(0),
          )
          .optional()?;
        let previous = decode_vote_value(stored)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let effective = VoteValue::toggle(previous, requested);

        if effective.is_none() {
          tx.execute(
            "DELETE FROM votes
             WHERE subject_type = ?1 AND subject_id = ?2 AND user_id = ?3",
            rusqlite::params![type_str, subject_str, user_str],
          )?;
        } else {
          tx.execute(
            "INSERT INTO votes (subject_type, subject_id, user_id, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (subject_type, subject_id, user_id)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
              type_str,
              subject_str,
              user_str,
              effective.as_i64(),
              at_str,
            ],
          )?;
        }
        tx.commit()?;
        Ok(AppliedVote { previous, effective })
      })
      .await?;

    trace!(%subject, %user_id, ?applied, "vote row written");
    Ok(applied)
  }

  async fn get_vote(&self, subject: SubjectRef, user_id: Uuid) -> Result<VoteValue> {
    let type_str    = subject.subject_type.as_str();
    let subject_str = encode_uuid(subject.subject_id);
    let user_str    = encode_uuid(user_id);

    let stored: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM votes
             WHERE subject_type = ?1 AND subject_id = ?2 AND user_id = ?3",
            rusqlite::params![type_str, subject_str, user_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    decode_vote_value(stored)
  }

  async fn list_votes(&self, subject: SubjectRef) -> Result<Vec<Vote>> {
    let type_str    = subject.subject_type.as_str();
    let subject_str = encode_uuid(subject.subject_id);

    let raws: Vec<RawVote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_type, subject_id, user_id, value, updated_at
           FROM votes
           WHERE subject_type = ?1 AND subject_id = ?2
           ORDER BY updated_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![type_str, subject_str], |row| {
            Ok(RawVote {
              subject_type: row.get(0)?,
              subject_id:   row.get(1)?,
              user_id:      row.get(2)?,
              value:        row.get(3)?,
              updated_at:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVote::into_vote).collect()
  }

  async fn score(&self, subject: SubjectRef) -> Result<i64> {
    let type_str    = subject.subject_type.as_str();
    let subject_str = encode_uuid(subject.subject_id);

    let score = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(value), 0) FROM votes
           WHERE subject_type = ?1 AND subject_id = ?2",
          rusqlite::params![type_str, subject_str],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(score)
  }

  async fn reply_scores(&self, topic_id: Uuid) -> Result<HashMap<Uuid, i64>> {
    let topic_str = encode_uuid(topic_id);

    let raws: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT v.subject_id, SUM(v.value)
           FROM votes v
           JOIN replies r ON r.reply_id = v.subject_id
           WHERE v.subject_type = 'reply' AND r.topic_id = ?1
           GROUP BY v.subject_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![topic_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(id, score)| Ok((decode_uuid(&id)?, score)))
      .collect()
  }
}
