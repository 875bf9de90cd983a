use crate::node::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced node does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The chat backend or the topic resolver answered with unusable content.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// An operation would break the ledger's ordering rules.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A structural invariant of the tree or dialog table does not hold.
    #[error("state invariant violated: {0}")]
    InvariantViolation(String),

    /// The upstream transport failed.
    #[error("upstream error: {0}")]
    Upstream(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn upstream(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Upstream(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
