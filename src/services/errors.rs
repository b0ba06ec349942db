use thiserror::Error;

/// Failure taxonomy of the attempt lifecycle. Every variant is an expected,
/// caller-recoverable condition; the transport layer maps them onto its own
/// status codes.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    PolicyViolation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Dependency(String),
}

impl AttemptError {
    /// Log the underlying fault with context and return a `Dependency`
    /// variant carrying only the context message, so storage details never
    /// leak across the service boundary.
    pub(crate) fn dependency(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Dependency(context.to_string())
    }
}
