//! Conversation topic tree.
//!
//! A chat session is filed into a tree of topic nodes. Every question/answer
//! exchange lands in the node whose keyword matches, or in a new node that an
//! external topic resolver attaches somewhere in the tree. Activation state
//! picks which exchanges (and nodes) are forwarded as context on the next turn.

pub mod activation;
pub mod context;
pub mod conversation;
pub mod dialog;
pub mod error;
pub mod graph;
pub mod mode;
pub mod node;
pub mod resolver;
pub mod session;
pub mod upstream;
pub mod wire;

pub use activation::{ActivationEngine, ActivationState};
pub use context::{filter_nodes, filter_turns};
pub use conversation::{Conversation, TurnOutcome};
pub use dialog::{DialogStore, DialogTurn, Role, TurnNumber, TurnsAsOf};
pub use error::{Error, Result};
pub use graph::{Ancestors, Attachment, Descendants, NodeGraph};
pub use mode::{DisplayMode, ModeFlags};
pub use node::{DialogEntry, Node, NodeId, TurnPair};
pub use resolver::{DEFAULT_RELATION, PLACEHOLDER_KEYWORD, normalize_keyword, validate_resolution};
pub use session::{SessionSnapshot, SessionState};
pub use upstream::Upstream;
pub use wire::{
    ChatMessage, ChatRequest, ChatResponse, NodeSet, RawTopicResolution, SimplifiedNode,
    TopicResolution, UpdateGraphRequest,
};
