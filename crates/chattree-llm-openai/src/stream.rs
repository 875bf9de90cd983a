//! Server-sent events from the Responses API, mapped onto [`StreamEvent`].

use chattree_llm::{Error, StopReason, StreamEvent, Usage};
use eventsource_stream::Eventsource;
use futures::Stream;
use tokio_stream::StreamExt;

use crate::Endpoint;
use crate::types::{ResponsesRequest, Terminal, TextDelta};

pub fn open(
    endpoint: Endpoint,
    body: ResponsesRequest,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
    async_stream::try_stream! {
        let url = endpoint.url("responses");
        tracing::debug!(model = %body.model, %url, "requesting completion");

        let response = endpoint
            .client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Error::transport)?;
        let response = check_status(response).await?;

        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| Error::Stream(e.to_string()))?;
            if let Some(mapped) = map_event(&event.event, &event.data)? {
                yield mapped;
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, "completion request rejected");
    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}

fn map_event(kind: &str, data: &str) -> Result<Option<StreamEvent>, Error> {
    let event = match kind {
        "response.output_text.delta" => {
            let TextDelta { delta } = serde_json::from_str(data)?;
            StreamEvent::Delta(delta)
        }
        "response.completed" | "response.incomplete" => {
            let Terminal { response } = serde_json::from_str(data)?;
            let stop = match response.incomplete_details {
                None => StopReason::Complete,
                Some(details) => match details.reason.as_str() {
                    "max_output_tokens" => StopReason::MaxTokens,
                    "content_filter" => StopReason::Filtered,
                    _ => StopReason::Other(details.reason),
                },
            };
            let usage = response.usage.map(|counts| Usage {
                input_tokens: counts.input_tokens,
                output_tokens: counts.output_tokens,
            });
            StreamEvent::Done { stop, usage }
        }
        "response.failed" => {
            let Terminal { response } = serde_json::from_str(data)?;
            let message = match response.error {
                Some(err) => match err.code {
                    Some(code) => format!("{code}: {}", err.message),
                    None => err.message,
                },
                None => "response failed".to_string(),
            };
            StreamEvent::Failed(message)
        }
        "error" => StreamEvent::Failed(data.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(event))
}
