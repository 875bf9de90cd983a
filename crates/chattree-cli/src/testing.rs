//! Scripted language model for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chattree_llm::{
    Error, GenerateRequest, LanguageModel, ModelBackend, Response, StopReason, StreamEvent,
};

use crate::backend::Settings;

pub type RequestLog = Arc<Mutex<Vec<GenerateRequest>>>;

/// Answers each request with the next scripted text and records the request.
pub struct ScriptedModel {
    outputs: Mutex<VecDeque<String>>,
    log: RequestLog,
}

impl ScriptedModel {
    pub fn new<I>(outputs: I) -> (LanguageModel, RequestLog)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let log = RequestLog::default();
        let model = ScriptedModel {
            outputs: Mutex::new(outputs.into_iter().map(Into::into).collect()),
            log: Arc::clone(&log),
        };
        (LanguageModel::new(model), log)
    }
}

impl ModelBackend for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: GenerateRequest) -> Response {
        self.log.lock().unwrap().push(request);
        match self.outputs.lock().unwrap().pop_front() {
            Some(text) => Response::from_events(vec![
                Ok(StreamEvent::Delta(text)),
                Ok(StreamEvent::Done {
                    stop: StopReason::Complete,
                    usage: None,
                }),
            ]),
            None => Response::from_events(vec![Err(Error::Failed("script exhausted".into()))]),
        }
    }
}

pub fn settings(max_attempts: u32) -> Settings {
    Settings {
        system_prompt: chattree_app::DEFAULT_SYSTEM_PROMPT.into(),
        max_output_tokens: 800,
        max_attempts,
    }
}
