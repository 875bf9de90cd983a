use std::future::Future;

use crate::error::Result;
use crate::wire::{ChatRequest, ChatResponse, RawTopicResolution, UpdateGraphRequest};

/// The language-model side of a conversation: the `/chat` and
/// `/update-graph` operations, wherever they run.
///
/// Answers are taken as untrusted. The [`Conversation`](crate::Conversation)
/// validates resolver output against its own graph before using it.
pub trait Upstream: Send + Sync {
    /// Answer `request.message` given the forwarded history, and name the
    /// topic of the exchange if one can be found.
    fn chat(&self, request: ChatRequest) -> impl Future<Output = Result<ChatResponse>> + Send;

    /// Propose where a new topic attaches in the node set.
    fn resolve_topic(
        &self,
        request: UpdateGraphRequest,
    ) -> impl Future<Output = Result<RawTopicResolution>> + Send;
}

impl<U: Upstream> Upstream for std::sync::Arc<U> {
    fn chat(&self, request: ChatRequest) -> impl Future<Output = Result<ChatResponse>> + Send {
        (**self).chat(request)
    }

    fn resolve_topic(
        &self,
        request: UpdateGraphRequest,
    ) -> impl Future<Output = Result<RawTopicResolution>> + Send {
        (**self).resolve_topic(request)
    }
}
