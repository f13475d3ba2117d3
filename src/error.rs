use axum::http::StatusCode;
use thiserror::Error;

/// Which step of a publish failed after the thread itself was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    /// Recording the article url on the thread's root post.
    LinkbackField,
    /// Writing the article → thread binding.
    Binding,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkbackField => f.write_str("linkback field write"),
            Self::Binding => f.write_str("binding write"),
        }
    }
}

/// Errors surfaced by the bridge layer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The request origin is not in the trusted list. Never shown to clients.
    #[error("origin {origin:?} is not trusted")]
    UntrustedOrigin { origin: Option<String> },

    #[error("{0}")]
    AuthorizationDenied(String),

    #[error("[[error:invalid-csrf-token]]")]
    InvalidCsrfToken,

    #[error("malformed {field}: {message}")]
    MalformedInput {
        field: &'static str,
        message: String,
    },

    /// The thread exists but is not fully wired to its article.
    #[error("topic {tid} was created but the {stage} failed: {source}")]
    PartialPublish {
        tid: i64,
        stage: PublishStage,
        #[source]
        source: anyhow::Error,
    },

    /// A collaborator failed; its message is passed through verbatim.
    #[error("{0}")]
    Upstream(#[from] anyhow::Error),
}

impl BridgeError {
    pub(crate) fn malformed(field: &'static str, message: impl ToString) -> Self {
        Self::MalformedInput {
            field,
            message: message.to_string(),
        }
    }

    /// HTTP status used when this error is rendered as JSON.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UntrustedOrigin { .. } => StatusCode::NO_CONTENT,
            Self::AuthorizationDenied(_) | Self::InvalidCsrfToken => StatusCode::FORBIDDEN,
            Self::MalformedInput { .. } => StatusCode::BAD_REQUEST,
            Self::PartialPublish { .. } | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
