use futures::StreamExt;
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::models::chat::ChatMessage;
use crate::provider::ByteStream;
use crate::streaming::DeltaStream;

pub const ASSISTANT_FUNCTION: &str = "ai-assistant";

/// User-facing message shown instead of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub description: &'static str,
}

impl Notice {
    pub const RATE_LIMITED: Notice = Notice {
        title: "Too many requests",
        description: "Wait a moment before asking another question.",
    };

    pub const CREDITS_EXHAUSTED: Notice = Notice {
        title: "Insufficient credits",
        description: "Please contact support.",
    };

    pub const FAILED: Notice = Notice {
        title: "Error",
        description: "Your message could not be processed.",
    };
}

/// Result of starting a chat request
pub enum ChatResponse {
    Streaming(DeltaStream<ByteStream>),
    /// HTTP 429, nothing to decode
    RateLimited,
    /// HTTP 402, nothing to decode
    CreditsExhausted,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: &'a [ChatMessage],
}

/// Client for the `ai-assistant` function
pub struct AssistantClient {
    client: Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        // Idle limit per read; a streamed reply may run longer than this overall
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| {
                AssistantError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// POST the conversation and return a delta stream over the reply
    pub async fn start_chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let url = self.config.function_url(ASSISTANT_FUNCTION);
        let body = serde_json::to_vec(&ChatBody { messages })?;

        info!(messages = messages.len(), "Assistant: sending chat to {}", url);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.config.publishable_key)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Assistant rate limited");
                Ok(ChatResponse::RateLimited)
            }
            StatusCode::PAYMENT_REQUIRED => {
                warn!("Assistant credits exhausted");
                Ok(ChatResponse::CreditsExhausted)
            }
            s if !s.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(AssistantError::Upstream {
                    status: s.as_u16(),
                    body,
                })
            }
            _ => {
                let stream: ByteStream = Box::pin(response.bytes_stream());
                Ok(ChatResponse::Streaming(DeltaStream::with_limits(
                    stream,
                    self.config.decoder_limits(),
                )))
            }
        }
    }
}

/// How a chat turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Replied(String),
    RateLimited(Notice),
    CreditsExhausted(Notice),
}

impl ChatOutcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            ChatOutcome::Replied(_) => None,
            ChatOutcome::RateLimited(notice) | ChatOutcome::CreditsExhausted(notice) => {
                Some(notice)
            }
        }
    }
}

/// Optimistically appended user message, removed again unless committed
struct PendingTurn<'a> {
    messages: &'a mut Vec<ChatMessage>,
    rollback_len: usize,
    committed: bool,
}

impl<'a> PendingTurn<'a> {
    fn begin(messages: &'a mut Vec<ChatMessage>, user: ChatMessage) -> Self {
        let rollback_len = messages.len();
        messages.push(user);
        Self {
            messages,
            rollback_len,
            committed: false,
        }
    }

    fn commit(mut self, reply: Option<ChatMessage>) {
        if let Some(reply) = reply {
            self.messages.push(reply);
        }
        self.committed = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.messages.truncate(self.rollback_len);
        }
    }
}

/// Conversation with the assistant.
///
/// Each [`ask`](Self::ask) sends the whole history. The user message is
/// rolled back when the turn does not complete, including when the `ask`
/// future is dropped mid-stream.
pub struct ChatSession {
    client: AssistantClient,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(client: AssistantClient) -> Self {
        Self {
            client,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Send `input` and stream the reply through `on_delta`.
    ///
    /// Failures after the request went out come back as
    /// [`AssistantError::Interrupted`] carrying the partial reply. The
    /// session is borrowed mutably until the turn ends, so turns never overlap.
    pub async fn ask<F>(&mut self, input: &str, mut on_delta: F) -> Result<ChatOutcome>
    where
        F: FnMut(&str),
    {
        if input.trim().is_empty() {
            return Err(AssistantError::InvalidRequest(
                "Message cannot be empty".into(),
            ));
        }

        let turn = PendingTurn::begin(&mut self.messages, ChatMessage::user(input));

        let response = self
            .client
            .start_chat(turn.messages.as_slice())
            .await
            .map_err(|e| AssistantError::interrupted(String::new(), e))?;

        let mut stream = match response {
            ChatResponse::RateLimited => return Ok(ChatOutcome::RateLimited(Notice::RATE_LIMITED)),
            ChatResponse::CreditsExhausted => {
                return Ok(ChatOutcome::CreditsExhausted(Notice::CREDITS_EXHAUSTED));
            }
            ChatResponse::Streaming(stream) => stream,
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => on_delta(&delta),
                Err(e) => {
                    return Err(AssistantError::interrupted(stream.reply().to_string(), e));
                }
            }
        }

        let reply = stream.into_reply();
        info!(reply_len = reply.len(), "Assistant reply complete");

        let message = (!reply.is_empty()).then(|| ChatMessage::assistant(reply.clone()));
        turn.commit(message);

        Ok(ChatOutcome::Replied(reply))
    }
}
