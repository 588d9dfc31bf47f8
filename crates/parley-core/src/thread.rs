//! ThreadAssembler: turns a topic's flat replies into a sorted forest.
//!
//! Sorting is applied independently to every sibling set; there is no global
//! ordering across levels.

use std::{
  cmp::Ordering,
  collections::{HashMap, HashSet},
};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{Error, Result, reply::ScoredReply};

/// Comparator applied within each sibling set.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
  /// `created_at` ascending, then id ascending.
  #[default]
  Oldest,
  /// `created_at` descending, then id descending.
  Newest,
  /// Score descending, then `created_at` ascending (first movers win ties).
  MostVoted,
}

impl SortMode {
  pub fn compare(self, a: &ScoredReply, b: &ScoredReply) -> Ordering {
    let (ra, rb) = (&a.reply, &b.reply);
    let oldest = || {
      ra.created_at
        .cmp(&rb.created_at)
        .then_with(|| ra.reply_id.cmp(&rb.reply_id))
    };
    match self {
      Self::Oldest => oldest(),
      Self::Newest => oldest().reverse(),
      Self::MostVoted => b.score.cmp(&a.score).then_with(oldest),
    }
  }
}

/// A reply together with its sorted children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadNode {
  #[serde(flatten)]
  pub reply:    ScoredReply,
  pub children: Vec<ThreadNode>,
}

impl ThreadNode {
  /// Number of nodes in this subtree, including `self`.
  pub fn size(&self) -> usize { 1 + count(&self.children) }
}

// Reply chains can be arbitrarily long, so the default recursive drop could
// exhaust the stack.
impl Drop for ThreadNode {
  fn drop(&mut self) {
    let mut pending = std::mem::take(&mut self.children);
    while let Some(mut node) = pending.pop() {
      pending.append(&mut node.children);
    }
  }
}

/// Deepest nesting level in a forest; a lone root is at depth 0 and an empty
/// forest has no depth.
pub fn depth(forest: &[ThreadNode]) -> Option<usize> {
  let mut stack: Vec<(&ThreadNode, usize)> = forest.iter().map(|n| (n, 0)).collect();
  let mut deepest = None;
  while let Some((node, level)) = stack.pop() {
    deepest = deepest.max(Some(level));
    stack.extend(node.children.iter().map(|child| (child, level + 1)));
  }
  deepest
}

/// Deepest level a nested tree response may carry. JSON serializers and
/// parsers recurse once per level; deeper threads are read flattened.
pub const MAX_TREE_DEPTH: usize = 48;

/// Refuse a forest too deep to be handed out as nested JSON.
pub fn check_tree_depth(topic_id: Uuid, forest: &[ThreadNode]) -> Result<()> {
  match depth(forest) {
    Some(depth) if depth > MAX_TREE_DEPTH => {
      Err(Error::ThreadTooDeep { topic_id, depth, limit: MAX_TREE_DEPTH })
    }
    _ => Ok(()),
  }
}

/// Number of nodes in a forest.
pub fn count(forest: &[ThreadNode]) -> usize {
  let mut stack: Vec<&ThreadNode> = forest.iter().collect();
  let mut total = 0;
  while let Some(node) = stack.pop() {
    total += 1;
    stack.extend(node.children.iter());
  }
  total
}

/// Group `replies` by parent and sort every sibling set by `sort`.
///
/// A reply whose parent is not in `replies` is promoted to a root so that no
/// content is lost. Replies that cannot be reached from any root (a parent
/// cycle) are a broken invariant and fail the whole assembly.
pub fn assemble(
  topic_id: Uuid,
  replies: Vec<ScoredReply>,
  sort: SortMode,
) -> Result<Vec<ThreadNode>> {
  let total = replies.len();
  let known: HashSet<Uuid> = replies.iter().map(|r| r.reply.reply_id).collect();

  let mut groups: HashMap<Option<Uuid>, Vec<ScoredReply>> = HashMap::new();
  for scored in replies {
    let key = match scored.reply.parent_reply_id {
      Some(parent) if known.contains(&parent) => Some(parent),
      Some(parent) => {
        warn!(
          reply_id = %scored.reply.reply_id,
          missing_parent = %parent,
          "orphaned reply promoted to root"
        );
        None
      }
      None => None,
    };
    groups.entry(key).or_default().push(scored);
  }
  for siblings in groups.values_mut() {
    siblings.sort_by(|a, b| sort.compare(a, b));
  }

  let roots = groups.remove(&None).unwrap_or_default();
  let forest: Vec<ThreadNode> = roots
    .into_iter()
    .map(|root| build(root, &mut groups))
    .collect();

  let placed = count(&forest);
  if placed != total {
    error!(%topic_id, unreachable = total - placed, "reply parent cycle detected");
    return Err(Error::UnreachableReplies { topic_id, count: total - placed });
  }
  Ok(forest)
}

/// A node whose children are still being built.
struct Frame {
  reply:    ScoredReply,
  pending:  std::vec::IntoIter<ScoredReply>,
  children: Vec<ThreadNode>,
}

impl Frame {
  fn open(
    reply: ScoredReply,
    groups: &mut HashMap<Option<Uuid>, Vec<ScoredReply>>,
  ) -> Self {
    let pending = groups.remove(&Some(reply.reply.reply_id)).unwrap_or_default();
    Self { reply, children: Vec::with_capacity(pending.len()), pending: pending.into_iter() }
  }
}

/// Build the subtree under `root` bottom-up with an explicit stack.
fn build(
  root: ScoredReply,
  groups: &mut HashMap<Option<Uuid>, Vec<ScoredReply>>,
) -> ThreadNode {
  let mut ancestors: Vec<Frame> = Vec::new();
  let mut frame = Frame::open(root, groups);
  loop {
    if let Some(child) = frame.pending.next() {
      ancestors.push(frame);
      frame = Frame::open(child, groups);
      continue;
    }
    let node = ThreadNode { reply: frame.reply, children: frame.children };
    match ancestors.pop() {
      Some(parent) => {
        frame = parent;
        frame.children.push(node);
      }
      None => return node,
    }
  }
}
