//! Plain-text views of a session.

use std::fmt::Write;

use chattree_core::{DisplayMode, Node, Role, SessionState};

/// The view for the current display mode, if it shows anything beyond the
/// reply itself.
pub fn view(state: &SessionState) -> Option<String> {
    match state.modes().display() {
        DisplayMode::Plain => None,
        DisplayMode::Linear => Some(linear(state)),
        DisplayMode::Tree => Some(tree(state)),
    }
}

pub fn status(state: &SessionState) -> String {
    let modes = state.modes();
    let view = match modes.display() {
        DisplayMode::Plain => "plain",
        DisplayMode::Linear => "linear",
        DisplayMode::Tree => "tree",
    };
    let activation = state.activation().state();
    format!(
        "view: {view}, context: {}, active nodes: {}, active turns: {}",
        if modes.context_mode { "on" } else { "off" },
        activation.active_node_ids.len(),
        activation.active_dialog_numbers.len(),
    )
}

/// Indented topic tree. `*` marks active nodes, `>` hovered ones.
pub fn tree(state: &SessionState) -> String {
    let mut out = String::new();
    write_node(state, state.graph().root(), 0, &mut out);
    out
}

fn write_node(state: &SessionState, node: &Node, depth: usize, out: &mut String) {
    let active = if state.activation().is_node_active(node.id.as_str()) { '*' } else { ' ' };
    let hovered = if state.activation().hovered().contains(&node.id) { '>' } else { ' ' };
    let _ = write!(out, "{hovered}{active} {}{} {}", "  ".repeat(depth), node.id, node.keyword);
    if let Some(relation) = &node.relation {
        let _ = write!(out, " ({relation})");
    }
    if !node.dialog.is_empty() {
        let turns: Vec<String> = node.turn_numbers().map(|n| n.to_string()).collect();
        let _ = write!(out, " [{}]", turns.join(","));
    }
    out.push('\n');

    for child in &node.children {
        if let Some(child) = state.graph().get(child.as_str()) {
            write_node(state, child, depth + 1, out);
        }
    }
}

/// Every turn in order. `*` marks turns in the active set.
pub fn linear(state: &SessionState) -> String {
    let mut out = String::new();
    for turn in state.dialogs().turns() {
        let active = if state.activation().is_turn_active(turn.number) { '*' } else { ' ' };
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "bot",
        };
        let _ = writeln!(out, "{active}{:>4} {who} [{}] {}", turn.number, turn.node_id, turn.content);
    }
    if let Some(pending) = state.pending_input() {
        let _ = writeln!(out, "   ... you (unsent) {pending}");
    }
    out
}
