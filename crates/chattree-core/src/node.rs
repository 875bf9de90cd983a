use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialog::TurnNumber;

pub const ROOT_ID: &str = "root";
pub const ROOT_KEYWORD: &str = "Root";

/// Identifier of a topic node. Non-root ids are `<parent>-<n>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    /// The `n`-th child id under this node.
    pub(crate) fn child(&self, n: u32) -> NodeId {
        NodeId(format!("{}-{n}", self.0))
    }

    /// Numeric suffix after the last `-`, if there is one.
    pub(crate) fn suffix(&self) -> Option<u32> {
        self.0.rsplit_once('-')?.1.parse().ok()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Global turn numbers of one question/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPair {
    pub question: TurnNumber,
    pub answer: TurnNumber,
}

impl TurnPair {
    /// The pair whose question is `question`; the answer always follows it.
    pub fn starting_at(question: TurnNumber) -> Self {
        Self {
            question,
            answer: question + 1,
        }
    }

    pub fn numbers(self) -> [TurnNumber; 2] {
        [self.question, self.answer]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogEntry {
    pub user_message: String,
    pub gpt_message: String,
    pub turns: TurnPair,
}

/// A topic vertex. `parent` and `children` are id references into the
/// owning [`NodeGraph`](crate::graph::NodeGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub keyword: String,
    pub parent: Option<NodeId>,
    pub relation: Option<String>,
    pub children: Vec<NodeId>,
    /// Local dialog index (1..=len) to exchange.
    pub dialog: BTreeMap<usize, DialogEntry>,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self {
            id: NodeId::root(),
            keyword: ROOT_KEYWORD.to_string(),
            parent: None,
            relation: None,
            children: Vec::new(),
            dialog: BTreeMap::new(),
        }
    }

    pub fn next_dialog_index(&self) -> usize {
        self.dialog.len() + 1
    }

    /// Global turn numbers of every exchange filed here, in local order.
    pub fn turn_numbers(&self) -> impl Iterator<Item = TurnNumber> + '_ {
        self.dialog.values().flat_map(|entry| entry.turns.numbers())
    }

    /// True when any exchange of this node has a turn in `active`.
    pub fn has_active_turn(&self, active: &BTreeSet<TurnNumber>) -> bool {
        self.dialog
            .values()
            .any(|entry| entry.turns.numbers().iter().any(|n| active.contains(n)))
    }
}
