use chattree_app::LlmConfig;
use chattree_core::{
    ChatRequest, ChatResponse, Error, RawTopicResolution, Result, Role, UpdateGraphRequest,
    Upstream, normalize_keyword,
};
use chattree_llm::{
    Completion, Describe, GenerateRequest, LanguageModel, Message, Property, Schema, Structured,
};
use chattree_llm_openai::{OpenAI, OpenAIConfig};
use serde::Deserialize;

const KEYWORD_PROMPT: &str = "Name the topic of the following exchange with a single short \
keyword (one to three words). Answer with JSON only.";

const RESOLVER_PROMPT: &str = "You organize a conversation into a tree of topics. Given the \
current graph, the existing keywords and the latest exchange, decide where the new keyword \
belongs: pick the most closely related existing node as its parent and describe the relation \
to that parent in one word or a short phrase. Answer with JSON only.";

/// Limits that apply to every model call of the backend.
#[derive(Debug, Clone)]
pub struct Settings {
    pub system_prompt: String,
    pub max_output_tokens: u32,
    pub max_attempts: u32,
}

impl From<&LlmConfig> for Settings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_output_tokens: config.max_output_tokens,
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Answers `/chat` and `/update-graph` with language models.
///
/// The chat model writes the reply and names its topic; the resolver model
/// places new topics in the tree.
pub struct LlmBackend {
    chat_model: LanguageModel,
    resolver_model: LanguageModel,
    settings: Settings,
}

#[derive(Debug, Deserialize)]
struct KeywordReply {
    keyword: String,
}

impl Describe for KeywordReply {
    fn describe() -> Schema {
        Schema::object([Property::new(
            "keyword",
            Schema::string("Topic of the exchange, one to three words"),
        )])
    }
}

impl Structured for KeywordReply {
    const NAME: &'static str = "topic_keyword";
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementReply {
    keyword: String,
    parent_node_id: String,
    relation: String,
}

impl Describe for PlacementReply {
    fn describe() -> Schema {
        Schema::object([
            Property::new("keyword", Schema::string("The keyword being placed")),
            Property::new("parentNodeId", Schema::string("Id of the parent node")),
            Property::new("relation", Schema::string("Relation to the parent")),
        ])
    }
}

impl Structured for PlacementReply {
    const NAME: &'static str = "topic_placement";
}

impl LlmBackend {
    pub fn new(chat_model: LanguageModel, resolver_model: LanguageModel, settings: Settings) -> Self {
        Self {
            chat_model,
            resolver_model,
            settings,
        }
    }

    /// Backend on the OpenAI Responses API.
    pub fn openai(config: &LlmConfig) -> Self {
        let openai = OpenAI::new(OpenAIConfig {
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.clone(),
        });
        if config.api_key.is_none() {
            tracing::warn!("no OpenAI API key configured, model calls will be rejected");
        }
        Self::new(
            openai.model(config.chat_model.as_str()),
            openai.model(config.resolver_model.as_str()),
            Settings::from(config),
        )
    }

    /// Run `request` until the model says something, up to `max_attempts`
    /// times.
    async fn generate_text(
        &self,
        model: &LanguageModel,
        request: &GenerateRequest,
    ) -> Result<Completion> {
        let attempts = self.settings.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match model.generate(request.clone()).collect().await {
                Ok(completion) if !completion.text.trim().is_empty() => {
                    tracing::debug!(
                        model = model.model_id(),
                        input_tokens = completion.usage.input_tokens,
                        output_tokens = completion.usage.output_tokens,
                        stop = ?completion.stop,
                        "model call finished"
                    );
                    return Ok(completion);
                }
                Ok(_) => {
                    tracing::warn!(model = model.model_id(), attempt, attempts, "empty model output");
                }
                Err(err) => {
                    tracing::warn!(model = model.model_id(), attempt, attempts, error = %err, "model call failed");
                    last_error = Some(err);
                }
            }
        }

        Err(match last_error {
            Some(err) => Error::upstream(err),
            None => Error::InvalidResponse(format!(
                "{} returned no text in {attempts} attempts",
                model.model_id()
            )),
        })
    }

    fn answer_request(&self, request: &ChatRequest) -> GenerateRequest {
        let mut builder = chattree_llm::request();
        builder
            .system(self.settings.system_prompt.as_str())
            .messages(request.history.iter().map(|message| match message.role {
                Role::User => Message::user(message.content.as_str()),
                Role::Assistant => Message::assistant(message.content.as_str()),
            }))
            .user(request.message.as_str())
            .max_output_tokens(self.settings.max_output_tokens);
        builder.build()
    }

    fn keyword_request(&self, question: &str, answer: &str) -> GenerateRequest {
        let mut builder = chattree_llm::request();
        builder
            .system(KEYWORD_PROMPT)
            .user(question)
            .assistant(answer)
            .structured::<KeywordReply>()
            .max_output_tokens(self.settings.max_output_tokens);
        builder.build()
    }

    fn placement_request(&self, request: &UpdateGraphRequest) -> Result<GenerateRequest> {
        let encode = |value: serde_json::Value| value.to_string();
        let nodes = serde_json::to_value(&request.nodes)
            .map_err(|err| Error::InvalidState(format!("cannot encode node set: {err}")))?;

        let mut builder = chattree_llm::request();
        builder
            .system(RESOLVER_PROMPT)
            .user(format!("Current graph: {}", encode(nodes)))
            .user(format!(
                "Existing keywords: {}",
                encode(serde_json::json!(request.nodes.keywords()))
            ))
            .user(format!(
                "Latest exchange: {}",
                encode(serde_json::json!({
                    "userMessage": request.user_message,
                    "gptMessage": request.gpt_message,
                }))
            ))
            .user(format!("Keyword to place: {}", request.keyword))
            .structured::<PlacementReply>()
            .max_output_tokens(self.settings.max_output_tokens);
        Ok(builder.build())
    }

    /// Best effort: a missing keyword only means the exchange stays unfiled.
    async fn extract_keyword(&self, question: &str, answer: &str) -> Option<String> {
        let request = self.keyword_request(question, answer);
        let completion = match self.generate_text(&self.chat_model, &request).await {
            Ok(completion) => completion,
            Err(err) => {
                tracing::warn!(error = %err, "keyword extraction failed");
                return None;
            }
        };
        match completion.parse::<KeywordReply>() {
            Ok(reply) => normalize_keyword(Some(&reply.keyword)),
            Err(err) => {
                tracing::warn!(error = %err, "keyword reply is not valid JSON");
                None
            }
        }
    }
}

impl Upstream for LlmBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let reply = self
            .generate_text(&self.chat_model, &self.answer_request(&request))
            .await?
            .text
            .trim()
            .to_string();
        let keyword = self.extract_keyword(&request.message, &reply).await;
        tracing::info!(keyword = keyword.as_deref().unwrap_or("-"), "answered chat turn");
        Ok(ChatResponse {
            message: reply,
            keyword,
        })
    }

    async fn resolve_topic(&self, request: UpdateGraphRequest) -> Result<RawTopicResolution> {
        let generate = self.placement_request(&request)?;
        let reply: PlacementReply = self
            .generate_text(&self.resolver_model, &generate)
            .await?
            .parse()
            .map_err(|err| Error::InvalidResponse(format!("placement is not valid JSON: {err}")))?;
        Ok(RawTopicResolution {
            keyword: Some(reply.keyword),
            parent_node_id: Some(reply.parent_node_id),
            relation: Some(reply.relation),
        })
    }
}
