use serde::{Deserialize, Serialize};

use crate::activation::{ActivationEngine, ActivationState};
use crate::context::{filter_nodes, filter_turns};
use crate::conversation::TurnOutcome;
use crate::dialog::{DialogStore, DialogTurn, TurnNumber};
use crate::error::Result;
use crate::graph::NodeGraph;
use crate::mode::ModeFlags;
use crate::node::{Node, NodeId};
use crate::wire::{ChatMessage, NodeSet};

/// Where a committed exchange should be filed in the tree.
#[derive(Debug, Clone)]
pub(crate) struct Filing {
    pub keyword: String,
    pub parent: Option<NodeId>,
    pub relation: Option<String>,
}

/// Everything one chat session owns. All mutation goes through `&mut self`,
/// so readers only ever see the state between two complete operations.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    graph: NodeGraph,
    dialogs: DialogStore,
    activation: ActivationEngine,
    modes: ModeFlags,
    pending_input: Option<String>,
}

/// Owned copy of a session, for rendering or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub nodes: Vec<Node>,
    pub turns: Vec<DialogTurn>,
    pub activation: ActivationState,
    pub hovered_node_ids: Vec<NodeId>,
    pub modes: ModeFlags,
    pub pending_input: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn dialogs(&self) -> &DialogStore {
        &self.dialogs
    }

    pub fn activation(&self) -> &ActivationEngine {
        &self.activation
    }

    pub fn modes(&self) -> ModeFlags {
        self.modes
    }

    /// Text of a turn that was sent but not answered.
    pub fn pending_input(&self) -> Option<&str> {
        self.pending_input.as_deref()
    }

    pub(crate) fn set_pending_input(&mut self, input: impl Into<String>) {
        self.pending_input = Some(input.into());
    }

    pub(crate) fn clear_pending_input(&mut self) {
        self.pending_input = None;
    }

    // -- activation --

    pub fn toggle_node(&mut self, id: &str) -> Result<()> {
        self.activation.toggle_node(&self.graph, id)
    }

    pub fn toggle_nodes<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
        self.activation.toggle_nodes(&self.graph, ids)
    }

    /// Toggle `id` and every ancestor up to root as one batch.
    pub fn toggle_path(&mut self, id: &str) -> Result<()> {
        let path = self.graph.path_to_root(id)?;
        self.activation
            .toggle_nodes(&self.graph, path.iter().map(NodeId::as_str))
    }

    pub fn toggle_dialog_pair(&mut self, question: TurnNumber) -> bool {
        self.activation
            .toggle_dialog_pair(&self.graph, &self.dialogs, question)
    }

    pub fn set_hover(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.activation.set_hover(ids);
    }

    pub fn clear_hover(&mut self) {
        self.activation.clear_hover();
    }

    // -- modes --

    pub fn toggle_context_mode(&mut self) {
        self.modes.toggle_context_mode();
    }

    pub fn toggle_linear_mode(&mut self) {
        self.modes.toggle_linear_mode();
    }

    pub fn toggle_tree_mode(&mut self) {
        self.modes.toggle_tree_mode();
    }

    /// Back to a root-only tree with nothing active and default modes.
    pub fn reset(&mut self) {
        *self = Self::default();
        tracing::info!("session reset");
    }

    // -- outbound context --

    /// The whole ledger as chat messages.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.dialogs.turns().iter().map(ChatMessage::from).collect()
    }

    /// History to forward with the next question.
    pub fn outbound_history(&self) -> Vec<ChatMessage> {
        filter_turns(
            &self.history(),
            &self.activation.state().active_dialog_numbers,
            self.modes.context_mode,
        )
    }

    /// Node set to show the topic resolver.
    pub fn outbound_nodes(&self) -> NodeSet {
        filter_nodes(
            self.graph.nodes(),
            &self.activation.state().active_node_ids,
            self.modes.context_mode,
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            nodes: self.graph.nodes().cloned().collect(),
            turns: self.dialogs.turns().to_vec(),
            activation: self.activation.state().clone(),
            hovered_node_ids: self.activation.hovered().to_vec(),
            modes: self.modes,
            pending_input: self.pending_input.clone(),
        }
    }

    /// Record an answered exchange in the ledger and, with a filing, in the
    /// tree. Nothing changes when this returns an error.
    pub(crate) fn commit_exchange(
        &mut self,
        user_message: &str,
        reply: &str,
        filing: Option<Filing>,
    ) -> Result<TurnOutcome> {
        let turns = self.dialogs.next_exchange()?;

        let Some(filing) = filing else {
            self.dialogs
                .append_exchange(user_message, reply, NodeId::root())?;
            tracing::info!(question = turns.question, "committed unfiled exchange");
            return Ok(TurnOutcome {
                reply: reply.to_string(),
                turns,
                node_id: None,
                local_index: None,
                created_node: false,
            });
        };

        let attachment = self.graph.resolve_attachment(
            &filing.keyword,
            filing.parent.as_ref().map(NodeId::as_str),
            filing.relation.as_deref(),
        )?;
        let node_id = attachment.node_id;
        let local_index = self
            .graph
            .append_dialog(node_id.as_str(), user_message, reply, turns)?;
        self.dialogs
            .append_exchange(user_message, reply, node_id.clone())?;

        if self.modes.context_mode {
            self.activation
                .auto_activate_on_create(&self.graph, node_id.as_str(), local_index)?;
        }
        debug_assert!(self.graph.check_invariants().is_ok());

        tracing::info!(
            node = %node_id,
            keyword = %filing.keyword,
            created = attachment.created,
            local_index,
            question = turns.question,
            "committed exchange"
        );
        Ok(TurnOutcome {
            reply: reply.to_string(),
            turns,
            node_id: Some(node_id),
            local_index: Some(local_index),
            created_node: attachment.created,
        })
    }
}
