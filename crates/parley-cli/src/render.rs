//! Plain-text rendering for command output.

use parley_core::{
  flatten::FlatReply,
  reply::Reply,
  vote::{VoteSummary, VoteValue},
};

const INDENT: &str = "  ";

pub fn vote(summary: VoteSummary) -> String {
  let stance = match summary.user_vote {
    VoteValue::Up => "up",
    VoteValue::Down => "down",
    VoteValue::None => "none",
  };
  format!("score {} (your vote: {stance})", summary.score)
}

pub fn reply(reply: &Reply) -> String {
  let edited = reply
    .edited_at
    .map(|at| format!(" (edited {})", at.format("%Y-%m-%d %H:%M")))
    .unwrap_or_default();
  format!("{}{edited}\n{}", reply.reply_id, reply.content)
}

/// One line per reply, indented by its display level.
pub fn thread(rows: &[FlatReply]) -> String {
  let mut out = String::new();
  for row in rows {
    let indent = INDENT.repeat(row.display_level);
    let accepted = if row.reply.is_accepted { " [accepted]" } else { "" };
    let first_line = row.reply.reply.content.lines().next().unwrap_or("");
    out.push_str(&format!(
      "{indent}[{:+}] {}{accepted}: {first_line}\n",
      row.reply.score, row.reply.reply.reply_id
    ));
  }
  out
}
