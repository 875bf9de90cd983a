use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dialog::{DialogStore, Role, TurnNumber};
use crate::error::{Error, Result};
use crate::graph::NodeGraph;
use crate::node::{NodeId, TurnPair};

/// Which nodes and turns are currently selected as context.
///
/// `active_node_ids` is derived: a node with dialog is active exactly when
/// one of its turns is in `active_dialog_numbers`. Nodes without dialog only
/// enter the set through an explicit toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationState {
    pub active_node_ids: BTreeSet<NodeId>,
    pub active_dialog_numbers: BTreeSet<TurnNumber>,
    /// Highest active turn after the last activation; the view scrolls here.
    pub current_focused_dialog: Option<TurnNumber>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivationEngine {
    state: ActivationState,
    hovered: Vec<NodeId>,
}

impl ActivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    pub fn is_node_active(&self, id: &str) -> bool {
        self.state.active_node_ids.contains(id)
    }

    pub fn is_turn_active(&self, number: TurnNumber) -> bool {
        self.state.active_dialog_numbers.contains(&number)
    }

    pub fn toggle_node(&mut self, graph: &NodeGraph, id: &str) -> Result<()> {
        self.toggle_nodes(graph, [id])
    }

    /// Flip every id in turn. Unknown ids fail the whole batch before
    /// anything changes.
    pub fn toggle_nodes<'a>(
        &mut self,
        graph: &NodeGraph,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let ids: Vec<&str> = ids.into_iter().collect();
        if let Some(missing) = ids.iter().find(|id| !graph.contains(id)) {
            return Err(Error::NodeNotFound(NodeId::from(*missing)));
        }

        for id in ids {
            let Some(node) = graph.get(id) else { continue };
            if self.state.active_node_ids.remove(id) {
                for number in node.turn_numbers() {
                    self.state.active_dialog_numbers.remove(&number);
                }
                tracing::debug!(node = id, "deactivated node");
            } else {
                self.state.active_node_ids.insert(node.id.clone());
                self.state.active_dialog_numbers.extend(node.turn_numbers());
                self.state.current_focused_dialog =
                    self.state.active_dialog_numbers.last().copied();
                tracing::debug!(node = id, "activated node");
            }
            self.recompute(graph);
        }
        Ok(())
    }

    /// Flip the exchange whose question is turn `question`.
    ///
    /// Answers, unknown numbers and unanswered questions are ignored.
    /// Returns whether anything was toggled.
    pub fn toggle_dialog_pair(
        &mut self,
        graph: &NodeGraph,
        dialogs: &DialogStore,
        question: TurnNumber,
    ) -> bool {
        if question % 2 == 0 || question == TurnNumber::MAX {
            return false;
        }
        let pair = TurnPair::starting_at(question);
        let is_question = dialogs
            .get(pair.question)
            .is_some_and(|turn| turn.role == Role::User);
        if !is_question || dialogs.get(pair.answer).is_none() {
            return false;
        }

        let active = &mut self.state.active_dialog_numbers;
        if active.contains(&pair.question) && active.contains(&pair.answer) {
            active.remove(&pair.question);
            active.remove(&pair.answer);
        } else {
            active.extend(pair.numbers());
            self.state.current_focused_dialog = active.last().copied();
        }
        self.recompute(graph);
        true
    }

    /// Mark a freshly filed exchange active without going through a toggle.
    pub fn auto_activate_on_create(
        &mut self,
        graph: &NodeGraph,
        node_id: &str,
        local_index: usize,
    ) -> Result<()> {
        let node = graph
            .get(node_id)
            .ok_or_else(|| Error::NodeNotFound(NodeId::from(node_id)))?;
        let entry = node.dialog.get(&local_index).ok_or_else(|| {
            Error::InvalidState(format!("node '{node_id}' has no dialog {local_index}"))
        })?;

        self.state.active_node_ids.insert(node.id.clone());
        self.state.active_dialog_numbers.extend(entry.turns.numbers());
        self.state.current_focused_dialog = Some(entry.turns.answer);
        Ok(())
    }

    pub fn set_hover(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.hovered = ids.into_iter().collect();
    }

    pub fn clear_hover(&mut self) {
        self.hovered.clear();
    }

    pub fn hovered(&self) -> &[NodeId] {
        &self.hovered
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Rebuild `active_node_ids` from the active turn numbers.
    fn recompute(&mut self, graph: &NodeGraph) {
        let previous = std::mem::take(&mut self.state.active_node_ids);
        self.state.active_node_ids = graph
            .nodes()
            .filter(|node| {
                if node.dialog.is_empty() {
                    previous.contains(&node.id)
                } else {
                    node.has_active_turn(&self.state.active_dialog_numbers)
                }
            })
            .map(|node| node.id.clone())
            .collect();
    }
}
