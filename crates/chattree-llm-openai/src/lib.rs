//! [`chattree_llm`] backend for the OpenAI Responses API.
//!
//! ```no_run
//! # async fn demo() -> Result<(), chattree_llm::Error> {
//! use chattree_llm_openai::{OpenAI, OpenAIConfig};
//!
//! let openai = OpenAI::new(OpenAIConfig {
//!     api_key: "sk-...".into(),
//!     ..Default::default()
//! });
//! let answer = openai
//!     .model("gpt-4o-mini")
//!     .generate(chattree_llm::request().user("hi").build())
//!     .collect()
//!     .await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

mod convert;
mod stream;
mod types;

use chattree_llm::{GenerateRequest, LanguageModel, ModelBackend, Response};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Any Responses-compatible endpoint, e.g. a local proxy.
    pub base_url: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

/// Shared connection pool and credentials; hands out per-model handles.
#[derive(Debug, Clone)]
pub struct OpenAI {
    endpoint: Endpoint,
}

impl OpenAI {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            endpoint: Endpoint {
                client: reqwest::Client::new(),
                api_key: config.api_key,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            },
        }
    }

    pub fn model(&self, model_id: impl Into<String>) -> LanguageModel {
        LanguageModel::new(ResponsesModel {
            model_id: model_id.into(),
            endpoint: self.endpoint.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct Endpoint {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    base_url: String,
}

impl Endpoint {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

struct ResponsesModel {
    model_id: String,
    endpoint: Endpoint,
}

impl ModelBackend for ResponsesModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate(&self, request: GenerateRequest) -> Response {
        let body = convert::request_body(&self.model_id, &request);
        Response::new(stream::open(self.endpoint.clone(), body))
    }
}
