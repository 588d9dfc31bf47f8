//! SQL schema for the Parley SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS topics (
    topic_id           TEXT PRIMARY KEY,
    kind               TEXT NOT NULL,   -- 'discussion' | 'question'
    author_id          TEXT NOT NULL,
    title              TEXT NOT NULL,
    created_at         TEXT NOT NULL,   -- RFC 3339 UTC
    is_locked          INTEGER NOT NULL DEFAULT 0,
    is_pinned          INTEGER NOT NULL DEFAULT 0,
    accepted_answer_id TEXT REFERENCES replies(reply_id),
    CHECK (accepted_answer_id IS NULL OR kind = 'question')
);

-- Replies are never deleted; soft deletion rewrites content and sets is_deleted.
CREATE TABLE IF NOT EXISTS replies (
    reply_id        TEXT PRIMARY KEY,
    topic_id        TEXT NOT NULL REFERENCES topics(topic_id),
    parent_reply_id TEXT REFERENCES replies(reply_id),
    author_id       TEXT NOT NULL,
    content         TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    edited_at       TEXT,
    is_deleted      INTEGER NOT NULL DEFAULT 0,
    is_hidden       INTEGER NOT NULL DEFAULT 0,
    quoted_reply_id TEXT REFERENCES replies(reply_id),
    CHECK (parent_reply_id IS NULL OR parent_reply_id != reply_id)
);

-- Strictly append-only.
CREATE TABLE IF NOT EXISTS reply_revisions (
    revision_id      TEXT PRIMARY KEY,
    reply_id         TEXT NOT NULL REFERENCES replies(reply_id),
    editor_id        TEXT NOT NULL,
    kind             TEXT NOT NULL,   -- 'author_edit' | 'moderation_edit' | 'deletion'
    previous_content TEXT NOT NULL,
    reason           TEXT,
    recorded_at      TEXT NOT NULL
);

-- A missing row means the user's vote is 0.
CREATE TABLE IF NOT EXISTS votes (
    subject_type TEXT NOT NULL CHECK (subject_type IN ('topic', 'reply')),
    subject_id   TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    value        INTEGER NOT NULL CHECK (value IN (-1, 1)),
    updated_at   TEXT NOT NULL,
    PRIMARY KEY (subject_type, subject_id, user_id)
);

CREATE INDEX IF NOT EXISTS replies_topic_idx     ON replies(topic_id);
CREATE INDEX IF NOT EXISTS revisions_reply_idx   ON reply_revisions(reply_id);

PRAGMA user_version = 1;
";
