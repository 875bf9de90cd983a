//! JSON bodies exchanged with `POST /responses`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub input: Vec<InputMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextOptions>,
}

/// Plain-string message input; the API accepts it for both roles.
#[derive(Debug, Serialize)]
pub struct InputMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TextOptions {
    pub format: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub struct JsonSchemaFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TextDelta {
    pub delta: String,
}

/// Payload of the terminal `response.*` events.
#[derive(Debug, Deserialize)]
pub struct Terminal {
    pub response: TerminalResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TerminalResponse {
    pub usage: Option<TokenCounts>,
    pub incomplete_details: Option<Incomplete>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct TokenCounts {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct Incomplete {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
