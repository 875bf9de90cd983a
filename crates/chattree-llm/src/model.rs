use std::sync::Arc;

use crate::request::GenerateRequest;
use crate::response::Response;

/// Cheaply clonable handle to one model of one provider.
#[derive(Clone)]
pub struct LanguageModel {
    inner: Arc<dyn ModelBackend>,
}

impl LanguageModel {
    pub fn new(backend: impl ModelBackend + 'static) -> Self {
        Self {
            inner: Arc::new(backend),
        }
    }

    pub fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    /// Start a generation. Nothing is sent until the [`Response`] is polled.
    pub fn generate(&self, request: GenerateRequest) -> Response {
        self.inner.generate(request)
    }
}

impl std::fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageModel")
            .field("model_id", &self.model_id())
            .finish()
    }
}

/// Implemented by provider crates.
pub trait ModelBackend: Send + Sync {
    fn model_id(&self) -> &str;
    fn generate(&self, request: GenerateRequest) -> Response;
}
