use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Rate limited by upstream")]
    RateLimited,

    #[error("Upstream credits exhausted")]
    CreditsExhausted,

    #[error("Stream read error: {0}")]
    Stream(String),

    #[error("Chat interrupted after {} bytes of reply: {source}", .partial.len())]
    Interrupted {
        partial: String,
        #[source]
        source: Box<AssistantError>,
    },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl AssistantError {
    /// Wrap a failure that happened after the user message was sent,
    /// keeping whatever reply text had already streamed in.
    pub fn interrupted(partial: String, source: AssistantError) -> Self {
        AssistantError::Interrupted {
            partial,
            source: Box::new(source),
        }
    }

    /// Reply text received before the failure, if any.
    pub fn partial_reply(&self) -> Option<&str> {
        match self {
            AssistantError::Interrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
