use crate::error::{Error, Result};
use crate::node::{NodeId, TurnPair};
use crate::resolver::{normalize_keyword, validate_resolution};
use crate::session::{Filing, SessionState};
use crate::upstream::Upstream;
use crate::wire::{ChatRequest, NodeSet, SimplifiedNode, UpdateGraphRequest};

/// What one successful turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub turns: TurnPair,
    /// `None` when the backend named no topic for the exchange.
    pub node_id: Option<NodeId>,
    pub local_index: Option<usize>,
    pub created_node: bool,
}

/// Drives a [`SessionState`] against an [`Upstream`], one turn at a time.
///
/// A turn only touches the session after every upstream call for it has
/// succeeded. On failure the question is kept as pending input and the tree,
/// ledger and activation are exactly as before.
pub struct Conversation<U> {
    upstream: U,
    state: SessionState,
}

impl<U: Upstream> Conversation<U> {
    pub fn new(upstream: U) -> Self {
        Self::with_state(upstream, SessionState::new())
    }

    pub fn with_state(upstream: U, state: SessionState) -> Self {
        Self { upstream, state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    /// Ask `input`, file the answer and return what happened.
    pub async fn send(&mut self, input: &str) -> Result<TurnOutcome> {
        let message = input.trim();
        if message.is_empty() {
            return Err(Error::InvalidState("message is empty".into()));
        }

        self.state.set_pending_input(message);
        let outcome = self.exchange(message).await.inspect_err(|err| {
            tracing::warn!(error = %err, "turn failed, keeping input as pending");
        })?;
        self.state.clear_pending_input();
        Ok(outcome)
    }

    async fn exchange(&mut self, message: &str) -> Result<TurnOutcome> {
        // Fail before spending upstream calls on a ledger that cannot take
        // another exchange.
        self.state.dialogs().next_exchange()?;

        let response = self
            .upstream
            .chat(ChatRequest {
                message: message.to_string(),
                history: self.state.outbound_history(),
            })
            .await?;
        if response.message.trim().is_empty() {
            return Err(Error::InvalidResponse("chat reply is empty".into()));
        }
        let reply = response.message;

        let filing = match normalize_keyword(response.keyword.as_deref()) {
            None => None,
            Some(keyword) if self.state.graph().find_by_keyword(&keyword).is_some() => {
                Some(Filing {
                    keyword,
                    parent: None,
                    relation: None,
                })
            }
            Some(keyword) => {
                let raw = self
                    .upstream
                    .resolve_topic(UpdateGraphRequest {
                        nodes: self.state.outbound_nodes(),
                        keyword: keyword.clone(),
                        user_message: message.to_string(),
                        gpt_message: reply.clone(),
                    })
                    .await?;
                let known: NodeSet = self
                    .state
                    .graph()
                    .nodes()
                    .map(SimplifiedNode::from)
                    .collect();
                let resolution = validate_resolution(raw, &known);
                Some(Filing {
                    keyword,
                    parent: Some(resolution.parent_node_id),
                    relation: Some(resolution.relation),
                })
            }
        };

        self.state.commit_exchange(message, &reply, filing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{ChatResponse, RawTopicResolution};
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Scripted {
        chats: Mutex<VecDeque<Result<ChatResponse>>>,
        resolutions: Mutex<VecDeque<Result<RawTopicResolution>>>,
        chat_requests: Mutex<Vec<ChatRequest>>,
        graph_requests: Mutex<Vec<UpdateGraphRequest>>,
    }

    impl Scripted {
        fn reply(self, message: &str, keyword: Option<&str>) -> Self {
            self.chats.lock().unwrap().push_back(Ok(ChatResponse {
                message: message.to_string(),
                keyword: keyword.map(str::to_string),
            }));
            self
        }

        fn chat_error(self) -> Self {
            let err = Error::upstream(std::io::Error::other("connection reset"));
            self.chats.lock().unwrap().push_back(Err(err));
            self
        }

        fn resolve(self, parent: &str, relation: &str) -> Self {
            self.resolutions.lock().unwrap().push_back(Ok(RawTopicResolution {
                keyword: None,
                parent_node_id: Some(parent.to_string()),
                relation: Some(relation.to_string()),
            }));
            self
        }

        fn resolve_error(self) -> Self {
            let err = Error::InvalidResponse("not json".into());
            self.resolutions.lock().unwrap().push_back(Err(err));
            self
        }
    }

    impl Upstream for Scripted {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.chat_requests.lock().unwrap().push(request);
            let next = self.chats.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(Error::InvalidState("no scripted chat reply".into())))
        }

        async fn resolve_topic(&self, request: UpdateGraphRequest) -> Result<RawTopicResolution> {
            self.graph_requests.lock().unwrap().push(request);
            let next = self.resolutions.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(Error::InvalidState("no scripted resolution".into())))
        }
    }

    #[tokio::test]
    async fn new_topic_is_resolved_and_attached() {
        let upstream = Scripted::default()
            .reply("Rust is a language", Some("Rust"))
            .resolve("root", "language");
        let mut conversation = Conversation::new(upstream);

        let outcome = conversation.send("what is rust?").await.unwrap();

        assert_eq!(outcome.reply, "Rust is a language");
        assert_eq!(outcome.node_id, Some(NodeId::from("root-1")));
        assert!(outcome.created_node);
        let node = conversation.state().graph().get("root-1").unwrap();
        assert_eq!(node.keyword, "Rust");
        assert_eq!(node.relation.as_deref(), Some("language"));

        let requests = conversation.upstream().graph_requests.lock().unwrap();
        assert_eq!(requests[0].keyword, "Rust");
        assert_eq!(requests[0].gpt_message, "Rust is a language");
        assert!(requests[0].nodes.contains("root"));
    }

    #[tokio::test]
    async fn known_topic_skips_the_resolver() {
        let upstream = Scripted::default()
            .reply("a1", Some("Rust"))
            .resolve("root", "language")
            .reply("a2", Some(" Rust "));
        let mut conversation = Conversation::new(upstream);

        conversation.send("q1").await.unwrap();
        let outcome = conversation.send("q2").await.unwrap();

        assert!(!outcome.created_node);
        assert_eq!(outcome.local_index, Some(2));
        assert_eq!(conversation.upstream().graph_requests.lock().unwrap().len(), 1);
        let chat_requests = conversation.upstream().chat_requests.lock().unwrap();
        assert_eq!(chat_requests[1].history.len(), 2);
    }

    #[tokio::test]
    async fn missing_keyword_is_not_an_error() {
        let upstream = Scripted::default().reply("hello", None).reply("again", Some("  "));
        let mut conversation = Conversation::new(upstream);

        assert_eq!(conversation.send("hi").await.unwrap().node_id, None);
        assert_eq!(conversation.send("hi again").await.unwrap().node_id, None);
        assert_eq!(conversation.state().dialogs().len(), 4);
        assert_eq!(conversation.state().graph().len(), 1);
    }

    #[tokio::test]
    async fn hallucinated_parent_attaches_under_root() {
        let upstream = Scripted::default()
            .reply("y", Some("Y"))
            .resolve("ghost-9", "");
        let mut conversation = Conversation::new(upstream);

        conversation.send("q").await.unwrap();

        let node = conversation.state().graph().get("root-1").unwrap();
        assert_eq!(node.parent, Some(NodeId::root()));
        assert_eq!(node.relation.as_deref(), Some(crate::DEFAULT_RELATION));
    }

    #[tokio::test]
    async fn failed_turns_leave_no_trace() {
        let upstream = Scripted::default()
            .reply("a1", Some("Rust"))
            .resolve("root", "language")
            .chat_error()
            .reply("   ", Some("Tokio"))
            .reply("a2", Some("Tokio"))
            .resolve_error();
        let mut conversation = Conversation::new(upstream);
        conversation.send("q1").await.unwrap();
        let before = conversation.state().snapshot();

        for input in ["boom", "blank", "unresolved"] {
            assert!(conversation.send(input).await.is_err());
            let after = conversation.state().snapshot();
            assert_eq!(after.nodes, before.nodes);
            assert_eq!(after.turns, before.turns);
            assert_eq!(after.activation, before.activation);
            assert_eq!(after.pending_input.as_deref(), Some(input));
        }

        assert!(matches!(
            conversation.send("  ").await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn context_mode_auto_activates_new_exchanges() {
        let upstream = Scripted::default()
            .reply("a1", Some("A"))
            .resolve("root", "r")
            .reply("a2", Some("B"))
            .resolve("root", "r")
            .reply("a3", Some("A"));
        let mut conversation = Conversation::new(upstream);
        conversation.send("q1").await.unwrap();
        conversation.state_mut().toggle_context_mode();

        let outcome = conversation.send("q2").await.unwrap();

        let state = conversation.state().activation().state();
        assert_eq!(outcome.node_id, Some(NodeId::from("root-2")));
        assert!(state.active_node_ids.contains("root-2"));
        assert_eq!(state.active_dialog_numbers, BTreeSet::from([3, 4]));
        assert!(!state.active_node_ids.contains("root-1"));

        conversation.send("q3").await.unwrap();

        let chat_requests = conversation.upstream().chat_requests.lock().unwrap();
        let forwarded: Vec<_> = chat_requests[2].history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(forwarded, vec!["q2", "a2"]);
        let graph_requests = conversation.upstream().graph_requests.lock().unwrap();
        assert_eq!(graph_requests[1].nodes.len(), 1);

        let state = conversation.state().activation().state();
        assert_eq!(state.active_dialog_numbers, BTreeSet::from([3, 4, 5, 6]));
        assert!(state.active_node_ids.contains("root-1"));
    }
}
