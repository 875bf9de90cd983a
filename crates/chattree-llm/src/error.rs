/// Errors from a generation, whatever the provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never got an answer (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("event stream broke: {0}")]
    Stream(String),

    /// The provider reported a failure inside an otherwise healthy stream.
    #[error("generation failed: {0}")]
    Failed(String),
}

impl Error {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Transport(Box::new(err))
    }
}
