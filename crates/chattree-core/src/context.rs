//! Selection of the history and node set forwarded upstream.

use std::collections::BTreeSet;

use crate::dialog::TurnNumber;
use crate::node::{Node, NodeId};
use crate::wire::{NodeSet, SimplifiedNode};

/// Turns to send as history for the next model call.
///
/// With context mode off everything is sent. With it on, a turn survives when
/// its 1-based position in `turns` is an active number, so callers must pass
/// the complete ledger in order.
pub fn filter_turns<T: Clone>(
    turns: &[T],
    active_numbers: &BTreeSet<TurnNumber>,
    context_mode: bool,
) -> Vec<T> {
    if !context_mode {
        return turns.to_vec();
    }
    turns
        .iter()
        .zip(1..)
        .filter(|(_, position)| active_numbers.contains(position))
        .map(|(turn, _)| turn.clone())
        .collect()
}

/// Simplified nodes to send to the topic resolver.
///
/// In context mode only active nodes and root are kept. Kept nodes may then
/// name a parent or child that is not in the set.
pub fn filter_nodes<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    active_ids: &BTreeSet<NodeId>,
    context_mode: bool,
) -> NodeSet {
    nodes
        .into_iter()
        .filter(|node| !context_mode || node.id.is_root() || active_ids.contains(&node.id))
        .map(SimplifiedNode::from)
        .collect()
}
