//! TreeFlattener: projects an assembled forest onto a bounded-depth list.
//!
//! Nodes deeper than `max_depth` are emitted at the saturated level instead of
//! being dropped, so the output always has exactly one entry per node and
//! every parent precedes its descendants.

use serde::{Deserialize, Serialize};

use crate::{reply::ScoredReply, thread::ThreadNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatReply {
  #[serde(flatten)]
  pub reply:         ScoredReply,
  /// Distance from the topic root; top-level replies are at depth 0.
  pub depth:         usize,
  /// `min(depth, max_depth)`.
  pub display_level: usize,
}

/// Depth-first pre-order walk of `forest`, capping the display level at
/// `max_depth`.
pub fn flatten(forest: &[ThreadNode], max_depth: usize) -> Vec<FlatReply> {
  let mut out = Vec::with_capacity(crate::thread::count(forest));
  let mut stack: Vec<(&ThreadNode, usize)> =
    forest.iter().rev().map(|node| (node, 0)).collect();

  while let Some((node, depth)) = stack.pop() {
    out.push(FlatReply {
      reply: node.reply.clone(),
      depth,
      display_level: depth.min(max_depth),
    });
    stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
  }
  out
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use proptest::prelude::*;
  use uuid::Uuid;

  use super::*;
  use crate::thread::{SortMode, assemble, count, tests::scored};

  fn levels(flat: &[FlatReply]) -> Vec<(u128, usize)> {
    flat
      .iter()
      .map(|f| (f.reply.reply.reply_id.as_u128(), f.display_level))
      .collect()
  }

  fn chain() -> Vec<ThreadNode> {
    // 1 ─ 2 ─ 3 ─ 4, plus a sibling 5 under 2.
    let replies = vec![
      scored(1, None, 1, 0),
      scored(2, Some(1), 2, 0),
      scored(3, Some(2), 3, 0),
      scored(4, Some(3), 4, 0),
      scored(5, Some(2), 5, 0),
    ];
    assemble(Uuid::nil(), replies, SortMode::Oldest).unwrap()
  }

  #[test]
  fn levels_saturate_at_max_depth() {
    let flat = flatten(&chain(), 1);
    assert_eq!(levels(&flat), vec![(1, 0), (2, 1), (3, 1), (4, 1), (5, 1)]);
    assert_eq!(flat[3].depth, 3);
  }

  #[test]
  fn zero_depth_puts_everything_at_level_zero() {
    let flat = flatten(&chain(), 0);
    assert_eq!(flat.len(), 5);
    assert!(flat.iter().all(|f| f.display_level == 0));
  }

  #[test]
  fn generous_depth_keeps_structure() {
    let flat = flatten(&chain(), 10);
    assert_eq!(levels(&flat), vec![(1, 0), (2, 1), (3, 2), (4, 3), (5, 2)]);
  }

  /// Random forest: reply `i` may only point at an earlier reply, so the
  /// input is always acyclic.
  fn forest_strategy() -> impl Strategy<Value = Vec<ThreadNode>> {
    prop::collection::vec((any::<prop::sample::Index>(), any::<bool>(), -5i64..5), 0..60)
      .prop_map(|specs| {
        let replies = specs
          .iter()
          .enumerate()
          .map(|(i, (pick, is_root, score))| {
            let parent = if i == 0 || *is_root {
              None
            } else {
              Some(pick.index(i) as u128 + 1)
            };
            scored(i as u128 + 1, parent, i as i64, *score)
          })
          .collect();
        assemble(Uuid::nil(), replies, SortMode::MostVoted).unwrap()
      })
  }

  proptest! {
    #[test]
    fn flattening_preserves_count_and_preorder(
      forest in forest_strategy(),
      max_depth in 0usize..6,
    ) {
      let flat = flatten(&forest, max_depth);
      prop_assert_eq!(flat.len(), count(&forest));

      let position: HashMap<Uuid, usize> = flat
        .iter()
        .enumerate()
        .map(|(i, f)| (f.reply.reply.reply_id, i))
        .collect();
      for (i, entry) in flat.iter().enumerate() {
        prop_assert!(entry.display_level <= max_depth);
        if let Some(parent) = entry.reply.reply.parent_reply_id {
          prop_assert!(position[&parent] < i);
        }
      }
    }
  }
}
