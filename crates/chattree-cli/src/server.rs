use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chattree_core::{
    ChatRequest, ChatResponse, TopicResolution, UpdateGraphRequest, Upstream, validate_resolution,
};
use tokio::net::TcpListener;

/// Routes `/chat` and `/update-graph` to `upstream`.
pub fn router<U: Upstream + 'static>(upstream: Arc<U>) -> Router {
    Router::new()
        .route("/chat", post(chat::<U>))
        .route("/update-graph", post(update_graph::<U>))
        .with_state(upstream)
}

/// Serve until Ctrl-C.
pub async fn serve<U: Upstream + 'static>(listener: TcpListener, upstream: Arc<U>) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(upstream))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}

async fn chat<U: Upstream>(
    State(upstream): State<Arc<U>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    tracing::debug!(history = request.history.len(), "chat request");
    let response = upstream.chat(request).await?;
    Ok(Json(response))
}

async fn update_graph<U: Upstream>(
    State(upstream): State<Arc<U>>,
    payload: Result<Json<UpdateGraphRequest>, JsonRejection>,
) -> Result<Json<TopicResolution>, ApiError> {
    let Json(request) = payload?;
    tracing::debug!(
        keyword = %request.keyword,
        keywords = ?request.nodes.keywords(),
        "update-graph request"
    );
    let nodes = request.nodes.clone();
    let raw = upstream.resolve_topic(request).await?;
    let resolution = validate_resolution(raw, &nodes);
    tracing::info!(
        keyword = %resolution.keyword,
        parent = %resolution.parent_node_id,
        relation = %resolution.relation,
        "placed topic"
    );
    Ok(Json(resolution))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler failure, rendered as `{"error": "..."}`.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Core(chattree_core::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<chattree_core::Error> for ApiError {
    fn from(err: chattree_core::Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use chattree_core::Error;

        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Core(err @ (Error::Upstream(_) | Error::InvalidResponse(_))) => {
                tracing::error!(error = %err, "upstream model failed");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            ApiError::Core(err) => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmBackend;
    use crate::remote::HttpUpstream;
    use crate::testing::{ScriptedModel, settings};
    use chattree_core::{Conversation, NodeId};
    use serde_json::{Value, json};

    async fn spawn(backend: LlmBackend) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(backend))).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(chat: &[&str], resolver: &[&str]) -> LlmBackend {
        let (chat, _) = ScriptedModel::new(chat.iter().copied());
        let (resolver, _) = ScriptedModel::new(resolver.iter().copied());
        LlmBackend::new(chat, resolver, settings(2))
    }

    #[tokio::test]
    async fn chat_endpoint_returns_message_and_keyword() {
        let base = spawn(backend(&["Hello there", r#"{"keyword":"Greeting"}"#], &[])).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "message": "hi", "history": [] }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "message": "Hello there", "keyword": "Greeting" }));
    }

    #[tokio::test]
    async fn update_graph_repairs_unknown_parent() {
        let base = spawn(backend(
            &[],
            &[r#"{"keyword":"Y","parentNodeId":"ghost-9","relation":""}"#],
        ))
        .await;

        let response = reqwest::Client::new()
            .post(format!("{base}/update-graph"))
            .json(&json!({
                "nodes": {
                    "root": { "id": "root", "keyword": "Root", "parent": null, "relation": null, "children": [] }
                },
                "keyword": "Y",
                "userMessage": "q",
                "gptMessage": "a"
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({ "keyword": "Y", "parentNodeId": "root", "relation": "related" })
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let base = spawn(backend(&[], &[])).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "history": [] }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn model_failure_is_a_bad_gateway() {
        let base = spawn(backend(&["", ""], &[])).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "message": "hi" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 502);
    }

    #[tokio::test]
    async fn conversation_over_http_builds_the_tree() {
        let base = spawn(backend(
            &[
                "Rust is a systems language",
                r#"{"keyword":"Rust"}"#,
                "Cargo builds Rust code",
                r#"{"keyword":"Cargo"}"#,
                "Ownership is about moves",
                r#"{"keyword":"Rust"}"#,
            ],
            &[
                r#"{"keyword":"Rust","parentNodeId":"root","relation":"language"}"#,
                r#"{"keyword":"Cargo","parentNodeId":"root-1","relation":"tool"}"#,
            ],
        ))
        .await;
        let mut conversation = Conversation::new(HttpUpstream::new(&base).unwrap());

        let first = conversation.send("what is rust").await.unwrap();
        let second = conversation.send("how do I build it").await.unwrap();
        let third = conversation.send("what is ownership").await.unwrap();

        assert_eq!(first.node_id, Some(NodeId::from("root-1")));
        assert_eq!(second.node_id, Some(NodeId::from("root-1-1")));
        assert_eq!(third.node_id, Some(NodeId::from("root-1")));
        assert_eq!(third.local_index, Some(2));

        let graph = conversation.state().graph();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.get("root-1-1").unwrap().relation.as_deref(), Some("tool"));
        graph.check_invariants().unwrap();
    }
}
