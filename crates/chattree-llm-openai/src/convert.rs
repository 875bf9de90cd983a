use chattree_llm::{GenerateRequest, Role};

use crate::types::{InputMessage, JsonSchemaFormat, ResponsesRequest, TextOptions};

/// Build the streaming request body for `model`.
///
/// System messages are folded into `instructions`, separated by a blank line.
pub fn request_body(model: &str, request: &GenerateRequest) -> ResponsesRequest {
    let mut system: Vec<&str> = Vec::new();
    let mut input = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        let role = match message.role {
            Role::System => {
                system.push(&message.content);
                continue;
            }
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        input.push(InputMessage {
            role,
            content: message.content.clone(),
        });
    }

    let text = request.output.as_ref().map(|output| TextOptions {
        format: JsonSchemaFormat {
            kind: "json_schema",
            name: output.name.clone(),
            schema: output.schema.to_json_schema(),
            strict: true,
        },
    });

    ResponsesRequest {
        model: model.to_string(),
        instructions: (!system.is_empty()).then(|| system.join("\n\n")),
        input,
        stream: true,
        max_output_tokens: request.max_output_tokens,
        temperature: request.temperature,
        text,
    }
}
