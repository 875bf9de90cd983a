use chattree_core::{
    ChatRequest, ChatResponse, Error, RawTopicResolution, Result, UpdateGraphRequest, Upstream,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Non-success answer from a `chattree serve` backend.
#[derive(Debug, thiserror::Error)]
#[error("backend returned {status}: {message}")]
pub struct StatusError {
    pub status: reqwest::StatusCode,
    pub message: String,
}

/// [`Upstream`] that talks to a running `chattree serve` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base: Url,
}

impl HttpUpstream {
    pub fn new(server_url: &str) -> std::result::Result<Self, url::ParseError> {
        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.base.join(endpoint).map_err(Error::upstream)?;
        tracing::debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::upstream)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|body| body["error"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(Error::upstream(StatusError { status, message }));
        }

        response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("{endpoint}: {err}")))
    }
}

impl Upstream for HttpUpstream {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.post("chat", &request).await
    }

    /// The reply is taken as raw; the caller validates it against its own graph.
    async fn resolve_topic(&self, request: UpdateGraphRequest) -> Result<RawTopicResolution> {
        self.post("update-graph", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chattree_core::{ChatMessage, Conversation, DEFAULT_RELATION, NodeSet, Role};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_url_keeps_its_path_prefix() {
        let upstream = HttpUpstream::new("http://localhost:8080/api").unwrap();
        assert_eq!(upstream.base_url().join("chat").unwrap().path(), "/api/chat");
        assert!(HttpUpstream::new("not a url").is_err());
    }

    #[tokio::test]
    async fn chat_posts_message_and_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(json!({
                "message": "and now?",
                "history": [{ "role": "user", "content": "hi" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "now this" })))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = HttpUpstream::new(&server.uri()).unwrap();
        let response = upstream
            .chat(ChatRequest {
                message: "and now?".into(),
                history: vec![ChatMessage { role: Role::User, content: "hi".into() }],
            })
            .await
            .unwrap();

        assert_eq!(response.message, "now this");
        assert_eq!(response.keyword, None);
    }

    #[tokio::test]
    async fn update_graph_returns_the_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/update-graph"))
            .and(body_partial_json(json!({ "keyword": "Tokio", "userMessage": "q" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keyword": "Tokio",
                "parentNodeId": "root-1",
                "relation": "runtime"
            })))
            .mount(&server)
            .await;

        let upstream = HttpUpstream::new(&server.uri()).unwrap();
        let raw = upstream
            .resolve_topic(UpdateGraphRequest {
                nodes: NodeSet::default(),
                keyword: "Tokio".into(),
                user_message: "q".into(),
                gpt_message: "a".into(),
            })
            .await
            .unwrap();

        assert_eq!(raw.parent_node_id.as_deref(), Some("root-1"));
        assert_eq!(raw.relation.as_deref(), Some("runtime"));
    }

    #[tokio::test]
    async fn partial_resolution_is_filed_with_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "a", "keyword": "Y" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/update-graph"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keyword": "Y",
                "parentNodeId": "ghost-9",
                "relation": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut conversation = Conversation::new(HttpUpstream::new(&server.uri()).unwrap());
        let outcome = conversation.send("q").await.unwrap();

        assert_eq!(outcome.node_id.as_ref().map(|id| id.as_str()), Some("root-1"));
        assert!(outcome.created_node);
        let node = conversation.state().graph().get("root-1").unwrap();
        assert_eq!(node.keyword, "Y");
        assert_eq!(node.parent.as_ref().map(|id| id.as_str()), Some("root"));
        assert_eq!(node.relation.as_deref(), Some(DEFAULT_RELATION));
    }

    #[tokio::test]
    async fn error_body_becomes_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(502).set_body_json(json!({ "error": "model unavailable" })),
            )
            .mount(&server)
            .await;

        let upstream = HttpUpstream::new(&server.uri()).unwrap();
        let err = upstream
            .chat(ChatRequest { message: "q".into(), history: vec![] })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn garbage_body_is_an_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let upstream = HttpUpstream::new(&server.uri()).unwrap();
        let err = upstream
            .chat(ChatRequest { message: "q".into(), history: vec![] })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}
