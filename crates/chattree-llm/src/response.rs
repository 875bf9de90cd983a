use std::pin::Pin;

use futures::Stream;
use serde::de::DeserializeOwned;
use tokio_stream::StreamExt;

use crate::error::Error;

/// An event emitted while a model streams its answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    Done {
        stop: StopReason,
        usage: Option<Usage>,
    },
    /// The provider gave up mid-stream.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Complete,
    MaxTokens,
    Filtered,
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>;

/// A live streaming answer.
pub struct Response {
    events: EventStream,
}

impl Response {
    pub fn new(events: impl Stream<Item = Result<StreamEvent, Error>> + Send + 'static) -> Self {
        Self {
            events: Box::pin(events),
        }
    }

    /// A response that replays `events` in order.
    pub fn from_events(events: Vec<Result<StreamEvent, Error>>) -> Self {
        Self::new(futures::stream::iter(events))
    }

    pub fn events(self) -> EventStream {
        self.events
    }

    /// Drain the stream into one [`Completion`].
    pub async fn collect(self) -> Result<Completion, Error> {
        let mut completion = Completion {
            text: String::new(),
            stop: StopReason::Complete,
            usage: Usage::default(),
        };

        let mut events = self.events;
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Delta(delta) => completion.text.push_str(&delta),
                StreamEvent::Done { stop, usage } => {
                    completion.stop = stop;
                    completion.usage = usage.unwrap_or_default();
                }
                StreamEvent::Failed(message) => return Err(Error::Failed(message)),
            }
        }
        Ok(completion)
    }
}

/// A finished answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub stop: StopReason,
    pub usage: Usage,
}

impl Completion {
    /// Decode a structured answer.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_str(self.text.trim())?)
    }
}
