//! Local validation of topic resolver answers.
//!
//! The resolver is a language model, so its answer is never trusted: blank
//! fields get defaults and an unknown parent is repaired before the graph
//! sees it.

use crate::node::NodeId;
use crate::wire::{NodeSet, RawTopicResolution, TopicResolution};

pub const DEFAULT_RELATION: &str = "related";
pub const PLACEHOLDER_KEYWORD: &str = "???";

/// Trimmed keyword, or `None` when missing or blank.
pub fn normalize_keyword(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
}

fn non_blank(value: Option<String>) -> Option<String> {
    normalize_keyword(value.as_deref())
}

/// Turn a raw resolver answer into one that is safe to attach with.
///
/// An unknown parent id is replaced by the first node in `nodes` whose
/// keyword occurs inside the returned keyword, or by root.
pub fn validate_resolution(raw: RawTopicResolution, nodes: &NodeSet) -> TopicResolution {
    let keyword = non_blank(raw.keyword).unwrap_or_else(|| PLACEHOLDER_KEYWORD.to_string());
    let relation = non_blank(raw.relation).unwrap_or_else(|| DEFAULT_RELATION.to_string());
    let proposed = non_blank(raw.parent_node_id).map_or_else(NodeId::root, NodeId::from);

    let parent_node_id = if nodes.contains(proposed.as_str()) {
        proposed
    } else {
        let fallback = nodes
            .iter()
            .find(|node| !node.keyword.is_empty() && keyword.contains(&node.keyword))
            .map_or_else(NodeId::root, |node| node.id.clone());
        tracing::warn!(
            proposed = %proposed,
            fallback = %fallback,
            "resolver proposed an unknown parent"
        );
        fallback
    };

    TopicResolution {
        keyword,
        parent_node_id,
        relation,
    }
}
