use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::node::{DialogEntry, Node, NodeId, TurnPair};
use crate::resolver::DEFAULT_RELATION;

/// Where an exchange ended up after [`NodeGraph::resolve_attachment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub node_id: NodeId,
    /// False when the keyword already had a node.
    pub created: bool,
}

/// Arena of topic nodes addressed by id.
///
/// The tree only grows: nodes are never removed or re-parented, so ids and
/// insertion order are stable for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeGraph {
    /// A graph holding only the root node.
    pub fn new() -> Self {
        let root = Node::root();
        let mut index = HashMap::new();
        index.insert(root.id.clone(), 0);
        Self {
            nodes: vec![root],
            index,
        }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        let i = *self.index.get(id)?;
        Some(&mut self.nodes[i])
    }

    /// Nodes in creation order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// First node (in creation order) whose keyword equals `keyword`.
    pub fn find_by_keyword(&self, keyword: &str) -> Option<&NodeId> {
        self.nodes
            .iter()
            .find(|node| node.keyword == keyword)
            .map(|node| &node.id)
    }

    /// File an exchange under `node_id` at the next local index.
    ///
    /// Only records the global numbers it is given; assigning them is the
    /// dialog store's job.
    pub fn append_dialog(
        &mut self,
        node_id: &str,
        user_message: impl Into<String>,
        gpt_message: impl Into<String>,
        turns: TurnPair,
    ) -> Result<usize> {
        let node = self
            .get_mut(node_id)
            .ok_or_else(|| Error::NodeNotFound(NodeId::from(node_id)))?;

        let local_index = node.next_dialog_index();
        if node.dialog.contains_key(&local_index) {
            return Err(Error::InvariantViolation(format!(
                "node '{node_id}' already has dialog {local_index}"
            )));
        }
        node.dialog.insert(
            local_index,
            DialogEntry {
                user_message: user_message.into(),
                gpt_message: gpt_message.into(),
                turns,
            },
        );
        Ok(local_index)
    }

    /// The id the next child of `parent_id` would get: one past the highest
    /// numeric suffix among its current children.
    pub fn next_child_id(&self, parent_id: &str) -> Result<NodeId> {
        let parent = self
            .get(parent_id)
            .ok_or_else(|| Error::NodeNotFound(NodeId::from(parent_id)))?;
        let max_suffix = parent
            .children
            .iter()
            .filter_map(NodeId::suffix)
            .max()
            .unwrap_or(0);
        Ok(parent.id.child(max_suffix + 1))
    }

    /// Create a node under `parent_id`. A blank relation gets the default
    /// label. Fails with [`Error::NodeNotFound`] for an unknown parent.
    pub fn create_node(
        &mut self,
        keyword: impl Into<String>,
        parent_id: &str,
        relation: &str,
    ) -> Result<NodeId> {
        let id = self.next_child_id(parent_id)?;
        if self.contains(id.as_str()) {
            return Err(Error::InvariantViolation(format!(
                "generated id '{id}' is already taken"
            )));
        }

        let relation = match relation.trim() {
            "" => DEFAULT_RELATION.to_string(),
            trimmed => trimmed.to_string(),
        };
        let parent = NodeId::from(parent_id);

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node {
            id: id.clone(),
            keyword: keyword.into(),
            parent: Some(parent.clone()),
            relation: Some(relation),
            children: Vec::new(),
            dialog: Default::default(),
        });
        if let Some(parent) = self.get_mut(parent.as_str()) {
            parent.children.push(id.clone());
        }

        tracing::debug!(node = %id, parent = %parent_id, "created topic node");
        Ok(id)
    }

    /// Pick the node a new exchange with `keyword` belongs to.
    ///
    /// A known keyword always returns its existing node, whatever parent is
    /// proposed. Otherwise a node is created under `candidate_parent`, or
    /// under root when the candidate is missing or unknown.
    pub fn resolve_attachment(
        &mut self,
        keyword: &str,
        candidate_parent: Option<&str>,
        relation: Option<&str>,
    ) -> Result<Attachment> {
        if let Some(existing) = self.find_by_keyword(keyword) {
            return Ok(Attachment {
                node_id: existing.clone(),
                created: false,
            });
        }

        let parent = match candidate_parent {
            Some(candidate) if self.contains(candidate) => NodeId::from(candidate),
            Some(candidate) => {
                tracing::warn!(candidate, keyword, "unknown parent, attaching to root");
                NodeId::root()
            }
            None => NodeId::root(),
        };
        let node_id = self.create_node(keyword, parent.as_str(), relation.unwrap_or(""))?;
        Ok(Attachment {
            node_id,
            created: true,
        })
    }

    /// Ids from the immediate parent of `id` up to root. Empty for root or
    /// an unknown id.
    pub fn ancestors_of(&self, id: &str) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.get(id).and_then(|node| node.parent.as_ref()),
            remaining: self.nodes.len(),
        }
    }

    /// Breadth-first walk of the subtree rooted at `id`, starting with `id`.
    pub fn descendants_of(&self, id: &str) -> Descendants<'_> {
        let mut queue = VecDeque::new();
        if let Some(node) = self.get(id) {
            queue.push_back(&node.id);
        }
        Descendants { graph: self, queue }
    }

    /// `id` followed by all its ancestors.
    pub fn path_to_root(&self, id: &str) -> Result<Vec<NodeId>> {
        let node = self
            .get(id)
            .ok_or_else(|| Error::NodeNotFound(NodeId::from(id)))?;
        let mut path = vec![node.id.clone()];
        path.extend(self.ancestors_of(id).cloned());
        Ok(path)
    }

    /// Verify the tree and dialog-table invariants.
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |msg: String| Err(Error::InvariantViolation(msg));

        let roots: Vec<&NodeId> = self
            .nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| &node.id)
            .collect();
        if roots.len() != 1 || !roots[0].is_root() {
            return violation(format!("expected a single root, found {roots:?}"));
        }

        for node in &self.nodes {
            if let Some(parent_id) = &node.parent {
                let Some(parent) = self.get(parent_id.as_str()) else {
                    return violation(format!("'{}' has missing parent '{parent_id}'", node.id));
                };
                if !parent.children.contains(&node.id) {
                    return violation(format!("'{parent_id}' does not list child '{}'", node.id));
                }
            }

            let mut seen = HashSet::new();
            for child_id in &node.children {
                if !seen.insert(child_id) {
                    return violation(format!("'{}' lists '{child_id}' twice", node.id));
                }
                match self.get(child_id.as_str()) {
                    Some(child) if child.parent.as_ref() == Some(&node.id) => {}
                    Some(_) => {
                        return violation(format!(
                            "'{child_id}' is listed by '{}' but has another parent",
                            node.id
                        ));
                    }
                    None => {
                        return violation(format!("'{}' lists missing child '{child_id}'", node.id));
                    }
                }
            }

            if let Some((gap, _)) = node
                .dialog
                .keys()
                .enumerate()
                .find(|(position, key)| **key != position + 1)
            {
                return violation(format!("'{}' dialog has a gap at {}", node.id, gap + 1));
            }
        }

        let reachable = self.descendants_of(self.root().id.as_str()).count();
        if reachable != self.nodes.len() {
            return violation(format!(
                "{reachable} of {} nodes reachable from root",
                self.nodes.len()
            ));
        }
        Ok(())
    }
}

pub struct Ancestors<'a> {
    graph: &'a NodeGraph,
    next: Option<&'a NodeId>,
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        // `remaining` bounds the walk even if a parent chain were corrupted.
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next?;
        self.next = self
            .graph
            .get(current.as_str())
            .and_then(|node| node.parent.as_ref());
        Some(current)
    }
}

pub struct Descendants<'a> {
    graph: &'a NodeGraph,
    queue: VecDeque<&'a NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        if let Some(node) = self.graph.get(id.as_str()) {
            self.queue.extend(node.children.iter());
        }
        Some(id)
    }
}
