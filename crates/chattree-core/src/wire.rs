//! Request and response bodies of the `/chat` and `/update-graph` endpoints.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dialog::{DialogTurn, Role};
use crate::node::{Node, NodeId};

// ---------------------------------------------------------------------------
// /chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl From<&DialogTurn> for ChatMessage {
    fn from(turn: &DialogTurn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// A missing or blank `keyword` means the exchange is not filed in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

// ---------------------------------------------------------------------------
// /update-graph
// ---------------------------------------------------------------------------

/// A node without its dialog, as shown to the topic resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedNode {
    pub id: NodeId,
    pub keyword: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl From<&Node> for SimplifiedNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            keyword: node.keyword.clone(),
            parent: node.parent.clone(),
            relation: node.relation.clone(),
            children: node.children.clone(),
        }
    }
}

/// Ordered set of simplified nodes. On the wire it is a JSON object keyed by
/// node id, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet(Vec<SimplifiedNode>);

impl NodeSet {
    pub fn get(&self, id: &str) -> Option<&SimplifiedNode> {
        self.0.iter().find(|node| node.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SimplifiedNode> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.0.iter().map(|node| node.keyword.as_str()).collect()
    }
}

impl FromIterator<SimplifiedNode> for NodeSet {
    fn from_iter<I: IntoIterator<Item = SimplifiedNode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a SimplifiedNode;
    type IntoIter = std::slice::Iter<'a, SimplifiedNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for NodeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for node in &self.0 {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NodeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeSetVisitor;

        impl<'de> Visitor<'de> for NodeSetVisitor {
            type Value = NodeSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of node id to node")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<NodeSet, A::Error> {
                let mut nodes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_, node)) = access.next_entry::<NodeId, SimplifiedNode>()? {
                    nodes.push(node);
                }
                Ok(NodeSet(nodes))
            }
        }

        deserializer.deserialize_map(NodeSetVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGraphRequest {
    #[serde(default)]
    pub nodes: NodeSet,
    pub keyword: String,
    pub user_message: String,
    pub gpt_message: String,
}

/// Resolver answer after validation: every field is usable as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResolution {
    pub keyword: String,
    pub parent_node_id: NodeId,
    pub relation: String,
}

/// Resolver answer as produced by the model. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTopicResolution {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub parent_node_id: Option<String>,
    #[serde(default)]
    pub relation: Option<String>,
}
